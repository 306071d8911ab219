//! Randomized soundness checks for projection and maximization.

use mbp_arith::rat::rat;
use mbp_arith::{MbpSolver, Optimum, RelKind, Term};
use proptest::prelude::*;

/// Per-variable `(lo, model, hi)` with `lo <= model <= hi`.
fn boxes(n: usize) -> impl Strategy<Value = Vec<(i64, i64, i64)>> {
    prop::collection::vec((-50i64..=50, -50i64..=50, -50i64..=50), 1..=n).prop_map(|v| {
        v.into_iter()
            .map(|(a, b, c)| {
                let mut t = [a, b, c];
                t.sort_unstable();
                (t[0], t[1], t[2])
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn projection_of_boxed_reals_is_sound(bounds in boxes(5)) {
        let mut s = MbpSolver::new();
        let mut vars = Vec::new();
        for &(lo, model, hi) in &bounds {
            let x = s.add_var(rat(model), false);
            s.add_lower_bound(x, rat(lo));
            s.add_upper_bound(x, rat(hi));
            vars.push(x);
        }
        for (i, &x) in vars.iter().enumerate() {
            let (lo, _, hi) = bounds[i];
            let d = s.project(x, true).unwrap().unwrap();
            let w = s.eval_def(d);
            prop_assert!(w >= rat(lo) && w <= rat(hi));
            prop_assert!(s.check_invariants().is_ok());
            prop_assert!(s.live_rows().iter().all(|r| r.coeff_of(x) == rat(0)));
        }
        // per-variable boxes leave at most constant tautologies behind
        prop_assert!(s.live_rows().iter().all(|r| r.terms.is_empty()));
    }

    #[test]
    fn projection_of_boxed_integers_without_defs(bounds in boxes(5)) {
        let mut s = MbpSolver::new();
        let mut vars = Vec::new();
        for &(lo, model, hi) in &bounds {
            let x = s.add_var(rat(model), true);
            s.add_lower_bound(x, rat(lo));
            s.add_upper_bound(x, rat(hi));
            vars.push(x);
        }
        let defs = s.project_all(&vars, false).unwrap();
        prop_assert!(defs.iter().all(|d| d.is_none()));
        prop_assert!(s.live_rows().is_empty());
        prop_assert!(s.check_invariants().is_ok());
    }

    #[test]
    fn maximize_reaches_the_box_corner(
        data in boxes(4).prop_flat_map(|b| {
            let n = b.len();
            (Just(b), prop::collection::vec((1i64..=9, any::<bool>()), n..=n))
        })
    ) {
        let (bounds, coeffs) = data;
        let mut s = MbpSolver::new();
        let mut objective = Vec::new();
        let mut expected = 0i64;
        for (&(lo, model, hi), &(mag, neg)) in bounds.iter().zip(&coeffs) {
            let c = if neg { -mag } else { mag };
            let x = s.add_var(rat(model), false);
            s.add_lower_bound(x, rat(lo));
            s.add_upper_bound(x, rat(hi));
            objective.push(Term::new(x, rat(c)));
            expected += c * if c > 0 { hi } else { lo };
        }
        s.set_objective(&objective, rat(0));
        let opt = s.maximize().unwrap();
        prop_assert_eq!(opt, Optimum::Finite { value: rat(expected), strict: false });
        // the assignment moved onto the optimal corner
        for (t, &(lo, _, hi)) in objective.iter().zip(&bounds) {
            let at = if t.coeff > rat(0) { hi } else { lo };
            prop_assert_eq!(s.value(t.var), &rat(at));
        }
        prop_assert!(s.check_invariants().is_ok());
    }

    #[test]
    fn divisibility_projection_stays_in_bounds(
        model in -40i64..=40,
        modulus in 1i64..=9,
    ) {
        let mut s = MbpSolver::new();
        let x = s.add_var(rat(model), true);
        // d | (x - model) holds at the model point
        let c = rat((-model).rem_euclid(modulus));
        s.add_divides(&[Term::new(x, rat(1))], c, rat(modulus)).unwrap();
        s.add_lower_bound(x, rat(model - 20));
        s.add_upper_bound(x, rat(model + 20));
        let d = s.project(x, true).unwrap().unwrap();
        let w = s.eval_def(d);
        prop_assert!(w >= rat(model - 20) && w <= rat(model + 20));
        prop_assert!(s.check_invariants().is_ok());
        prop_assert!(s.live_rows().iter().all(|r| r.coeff_of(x) == rat(0)));
    }

    #[test]
    fn equality_projection_keeps_links(slope in 1i64..=5, offset in -10i64..=10) {
        let mut s = MbpSolver::new();
        let y_val = 3 * slope + offset;
        let x = s.add_var(rat(3), true);
        let y = s.add_var(rat(y_val), true);
        // y = slope*x + offset
        s.add_constraint(
            &[Term::new(x, rat(slope)), Term::new(y, rat(-1))],
            rat(offset),
            RelKind::Eq,
        );
        let d = s.project(y, true).unwrap().unwrap();
        prop_assert_eq!(s.eval_def(d), rat(y_val));
        s.update_value(x, rat(4));
        prop_assert_eq!(s.eval_def(d), rat(4 * slope + offset));
        prop_assert!(s.live_rows().is_empty());
    }
}
