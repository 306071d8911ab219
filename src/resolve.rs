//! Resolution of a variable between pairs of rows.
//!
//! Rational resolution is plain Fourier–Motzkin: scale the source row so
//! the pivot coefficient cancels and add it to the destination. Integer
//! resolution must not lose integer solutions, so opposite-sign bound
//! pairs go through [`MbpSolver::mul_add_int`]: when the rounding slack
//! `(|a|-1)(|b|-1)` still fits under the current assignment (or one of the
//! coefficients is a unit), the strengthened sum is exact on its own;
//! otherwise the combination holds only together with a divisibility
//! constraint picked from the model, resolved on the side with the smaller
//! coefficient.

use crate::error::Result;
use crate::rat::floor_mod;
use crate::row::{RelKind, RowId, VarId};
use crate::solver::{coeffs_without, MbpSolver, OBJECTIVE_ROW};
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};

fn n_sign(b: &BigRational) -> BigRational {
    if b.is_positive() {
        -BigRational::one()
    } else {
        BigRational::one()
    }
}

impl MbpSolver {
    /// Eliminate `x` from `dst` against the bound row `src`, where `a1` is
    /// the coefficient of `x` in `src`. Dead destinations are skipped.
    pub(crate) fn resolve(
        &mut self,
        src: RowId,
        a1: &BigRational,
        dst: RowId,
        x: VarId,
    ) -> Result<()> {
        debug_assert_eq!(self.rows[src].coeff_of(x), *a1);
        debug_assert!(!a1.is_zero());
        debug_assert_ne!(src, dst);
        if !self.rows[dst].alive {
            return Ok(());
        }
        let a2 = self.rows[dst].coeff_of(x);
        self.stats.resolutions += 1;
        if self.is_int(x) {
            if a1.is_positive() != a2.is_positive() || self.rows[src].kind == RelKind::Eq {
                self.mul_add_int(x, a1, src, &a2, dst)?;
            } else {
                // same-direction bounds cancel without rounding concerns
                let abs_a1 = a1.abs();
                self.scale_row(dst, &abs_a1);
                self.mul_add_row(false, dst, &-a2.abs(), src);
            }
            self.normalize(dst);
        } else {
            let same_sign = dst != OBJECTIVE_ROW && a1.is_positive() == a2.is_positive();
            self.mul_add_row(same_sign, dst, &(-&a2 / a1), src);
        }
        Ok(())
    }

    /// Eliminate `x` from `dst` against the equality row `src` with
    /// positive pivot coefficient `a1`.
    pub(crate) fn solve(&mut self, src: RowId, a1: &BigRational, dst: RowId, x: VarId) {
        debug_assert_eq!(self.rows[src].coeff_of(x), *a1);
        debug_assert!(a1.is_positive());
        debug_assert_ne!(src, dst);
        if !self.rows[dst].alive {
            return;
        }
        let a2 = self.rows[dst].coeff_of(x);
        self.scale_row(dst, a1);
        self.mul_add_row(false, dst, &-a2, src);
        self.normalize(dst);
        debug_assert!(self.rows[dst].coeff_of(x).is_zero());
    }

    /// Integer-sound combination of an opposite-sign bound pair on `x`.
    ///
    /// With `src = a*x + t1 <= 0` and `dst = b*x + t2 <= 0`, `a` and `b` of
    /// opposite signs, the exact combination is `|a|*t2 + |b|*t1 +
    /// (|a|-1)(|b|-1) <= 0` whenever the current assignment leaves enough
    /// slack (or a unit coefficient makes the shadow exact). Otherwise the
    /// variable's residue is pinned by the model: a divisibility constraint
    /// on the smaller-coefficient side shifts that bound to a point where
    /// the division is exact, and the pair resolves like the unit case.
    pub(crate) fn mul_add_int(
        &mut self,
        x: VarId,
        src_c: &BigRational,
        src_id: RowId,
        dst_c: &BigRational,
        dst_id: RowId,
    ) -> Result<()> {
        debug_assert!(self.is_int(x));
        debug_assert!(src_c.is_integer() && dst_c.is_integer());
        debug_assert_eq!(self.rows[dst_id].kind, RelKind::Le);
        debug_assert!(matches!(self.rows[src_id].kind, RelKind::Le | RelKind::Eq));
        debug_assert!(self.var_value[x].is_integer());
        let one = BigRational::one();
        let abs_src_c = src_c.abs();
        let abs_dst_c = dst_c.abs();
        let x_val = self.var_value[x].clone();
        let slack = (&abs_src_c - &one) * (&abs_dst_c - &one);
        let dst_val = &self.rows[dst_id].value - &x_val * dst_c;
        let src_val = &self.rows[src_id].value - &x_val * src_c;
        let distance = &abs_src_c * &dst_val + &abs_dst_c * &src_val + &slack;
        if !distance.is_positive() || abs_src_c.is_one() || abs_dst_c.is_one() {
            self.scale_row(dst_id, &abs_src_c);
            self.add_const_row(dst_id, &slack);
            self.mul_add_row(false, dst_id, &abs_dst_c, src_id);
            return Ok(());
        }
        self.stats.finite_disjunctions += 1;
        tracing::trace!(var = x, src = %src_c, dst = %dst_c, distance = %distance,
            "integer resolution falls back to a model-pinned residue");
        if abs_dst_c <= abs_src_c {
            // shift dst up to the next point where |b| divides its bound
            let mut z = floor_mod(&dst_val, &abs_dst_c);
            if !z.is_zero() {
                z = &abs_dst_c - &z;
            }
            let coeffs = coeffs_without(&self.rows[dst_id].terms, x);
            let c0 = &self.rows[dst_id].coeff + &z;
            self.add_divides(&coeffs, c0, abs_dst_c.clone())?;
            self.add_const_row(dst_id, &z);
            let scale = src_c * n_sign(dst_c);
            self.scale_row(dst_id, &scale);
            self.mul_add_row(false, dst_id, &abs_dst_c, src_id);
        } else {
            let mut z = floor_mod(&src_val, &abs_src_c);
            if !z.is_zero() {
                z = &abs_src_c - &z;
            }
            let coeffs = coeffs_without(&self.rows[src_id].terms, x);
            let c0 = &self.rows[src_id].coeff + &z;
            self.add_divides(&coeffs, c0, abs_src_c.clone())?;
            self.scale_row(dst_id, &abs_src_c);
            let sgn = n_sign(src_c);
            self.add_const_row(dst_id, &(&z * dst_c * &sgn));
            self.mul_add_row(false, dst_id, &(dst_c * &sgn), src_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rat::rat;
    use crate::row::Term;

    fn linear(terms: &[(VarId, i64)]) -> Vec<Term> {
        terms.iter().map(|&(v, c)| Term::new(v, rat(c))).collect()
    }

    #[test]
    fn test_rational_resolution_cancels_pivot() {
        let mut s = MbpSolver::new();
        let x = s.add_var(rat(0), false);
        let y = s.add_var(rat(0), false);
        // y <= 2x resolved against x <= 1 gives y <= 2
        let up = s.add_constraint(&linear(&[(x, 1)]), rat(-1), RelKind::Le);
        let lo = s.add_constraint(&linear(&[(x, -2), (y, 1)]), rat(0), RelKind::Le);
        let a1 = s.rows[up].coeff_of(x);
        s.resolve(up, &a1, lo, x).unwrap();
        assert_eq!(s.rows[lo].coeff_of(x), rat(0));
        assert_eq!(s.rows[lo].coeff_of(y), rat(1));
        assert_eq!(s.rows[lo].coeff, rat(-2));
        assert!(s.check_row(lo).is_ok());
    }

    #[test]
    fn test_strict_source_keeps_result_strict() {
        let mut s = MbpSolver::new();
        let x = s.add_var(rat(-1), false);
        let y = s.add_var(rat(0), false);
        let up = s.add_constraint(&linear(&[(x, 1), (y, 1)]), rat(0), RelKind::Lt);
        let lo = s.add_constraint(&linear(&[(x, -1)]), rat(-1), RelKind::Le);
        let a1 = s.rows[up].coeff_of(x);
        s.resolve(up, &a1, lo, x).unwrap();
        assert_eq!(s.rows[lo].kind, RelKind::Lt);
    }

    #[test]
    fn test_integer_unit_pair_exact() {
        let mut s = MbpSolver::new();
        let x = s.add_var(rat(3), true);
        // x - 5 <= 0 and -x + 1 <= 0 collapse to the constant row -4 <= 0,
        // which retires
        let up = s.add_constraint(&linear(&[(x, 1)]), rat(-5), RelKind::Le);
        let lo = s.add_constraint(&linear(&[(x, -1)]), rat(1), RelKind::Le);
        let a1 = s.rows[up].coeff_of(x);
        s.resolve(up, &a1, lo, x).unwrap();
        assert!(!s.rows[lo].alive);
        assert_eq!(s.stats().finite_disjunctions, 0);
    }

    #[test]
    fn test_integer_dark_shadow_within_slack() {
        let mut s = MbpSolver::new();
        let x = s.add_var(rat(0), true);
        let y = s.add_var(rat(0), true);
        let z = s.add_var(rat(0), true);
        // 2x - y <= 0 and -3x + z <= 0 at the origin: distance is
        // 3*0 + 2*0 + 2 > 0 slack fails, but the test model below moves
        // the bounds apart far enough for the dark shadow.
        s.update_value(y, rat(8));
        let up = s.add_constraint(&linear(&[(x, 2), (y, -1)]), rat(0), RelKind::Le);
        let lo = s.add_constraint(&linear(&[(x, -3), (z, 1)]), rat(0), RelKind::Le);
        let a1 = s.rows[up].coeff_of(x);
        s.resolve(up, &a1, lo, x).unwrap();
        // 2*(-3x + z) + 3*(2x - y) + 2 = 2z - 3y + 2 <= 0
        assert_eq!(s.rows[lo].coeff_of(x), rat(0));
        assert_eq!(s.rows[lo].coeff_of(y), rat(-3));
        assert_eq!(s.rows[lo].coeff_of(z), rat(2));
        assert_eq!(s.rows[lo].coeff, rat(2));
        assert_eq!(s.stats().finite_disjunctions, 0);
        assert!(s.check_row(lo).is_ok());
    }

    #[test]
    fn test_integer_fallback_adds_divisibility() {
        let mut s = MbpSolver::new();
        let x = s.add_var(rat(0), true);
        let y = s.add_var(rat(0), true);
        let z = s.add_var(rat(0), true);
        // tight opposite bounds with non-unit coefficients force the
        // model-pinned residue path
        let up = s.add_constraint(&linear(&[(x, 2), (y, -1)]), rat(0), RelKind::Le);
        let lo = s.add_constraint(&linear(&[(x, -3), (z, 1)]), rat(0), RelKind::Le);
        let a1 = s.rows[up].coeff_of(x);
        s.resolve(up, &a1, lo, x).unwrap();
        assert_eq!(s.stats().finite_disjunctions, 1);
        assert_eq!(s.rows[lo].coeff_of(x), rat(0));
        let divides: Vec<_> = s
            .live_rows()
            .into_iter()
            .filter(|r| r.kind == RelKind::Divides)
            .collect();
        assert_eq!(divides.len(), 1);
        assert!(s.check_invariants().is_ok());
    }
}
