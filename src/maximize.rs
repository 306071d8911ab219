//! Model-guided maximization of the objective row.
//!
//! Variables are peeled off the objective one at a time. For each, the row
//! that binds the objective's direction most tightly under the current
//! assignment is chosen; every other row mentioning the variable is
//! resolved against it, and the bound itself is folded into the objective.
//! Folded rows are kept on a trail so the assignment can be moved to the
//! optimum afterwards, walking the trail backwards and backing strict
//! bounds off by a positive epsilon.

use crate::error::Result;
use crate::rat::rat;
use crate::row::{RelKind, RowId, VarId};
use crate::solver::{MbpSolver, OBJECTIVE_ROW};
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};
use rustc_hash::FxHashSet;

/// Result of [`MbpSolver::maximize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Optimum {
    /// The objective is bounded. With `strict`, the value is a supremum
    /// approached but never attained; the updated assignment then sits
    /// strictly below it.
    Finite {
        /// Least upper bound of the objective.
        value: BigRational,
        /// Whether the bound comes from a strict inequality.
        strict: bool,
    },
    /// The objective can be made arbitrarily large.
    Unbounded,
}

impl MbpSolver {
    /// Maximize the objective row subject to the live rows. On return the
    /// assignment is moved to an optimal (or, for a strict bound, a
    /// near-optimal) point and still satisfies every live row.
    ///
    /// Equality rows should be eliminated by projection beforehand when
    /// maximizing over integral variables.
    pub fn maximize(&mut self) -> Result<Optimum> {
        debug_assert!(self.check_invariants().is_ok());
        let mut bound_trail: Vec<RowId> = Vec::new();
        let mut bound_vars: Vec<VarId> = Vec::new();
        while let Some(t) = self.rows[OBJECTIVE_ROW].terms.last().cloned() {
            let x = t.var;
            let coeff = t.coeff;
            let Some((bound_row, bound_coeff)) = self.find_bound(x, coeff.is_positive()) else {
                tracing::debug!(var = x, "objective unbounded");
                self.update_values(&bound_vars, &bound_trail);
                return Ok(Optimum::Unbounded);
            };
            debug_assert!(!bound_coeff.is_zero());
            self.stats.maximize_pivots += 1;
            let above = std::mem::take(&mut self.above);
            let below = std::mem::take(&mut self.below);
            for &r in above.iter().chain(below.iter()) {
                self.resolve(bound_row, &bound_coeff, r, x)?;
            }
            // fold the binding bound into the objective, cancelling x
            let scale = -&coeff / &bound_coeff;
            self.mul_add_row(false, OBJECTIVE_ROW, &scale, bound_row);
            self.retire_row(bound_row);
            bound_trail.push(bound_row);
            bound_vars.push(x);
        }
        self.update_values(&bound_vars, &bound_trail);
        let obj = &self.rows[OBJECTIVE_ROW];
        Ok(Optimum::Finite {
            value: obj.value.clone(),
            strict: obj.kind == RelKind::Lt,
        })
    }

    /// Find the row binding `x` against the objective's direction under
    /// the current assignment: the tightest upper bound when the objective
    /// grows with `x`, the tightest lower bound otherwise. Equality rows
    /// always qualify. The remaining rows mentioning `x` are split into
    /// `above` (same direction, to be resolved) and `below` (opposite
    /// direction).
    fn find_bound(&mut self, x: VarId, increasing: bool) -> Option<(RowId, BigRational)> {
        let mut bound: Option<(RowId, BigRational)> = None;
        let mut bound_val = BigRational::zero();
        let x_val = self.var_value[x].clone();
        let mut above = std::mem::take(&mut self.above);
        let mut below = std::mem::take(&mut self.below);
        above.clear();
        below.clear();
        let mut visited: FxHashSet<RowId> = FxHashSet::default();
        for row_id in self.var_rows[x].clone() {
            debug_assert_ne!(row_id, OBJECTIVE_ROW);
            if !visited.insert(row_id) {
                continue;
            }
            let r = &self.rows[row_id];
            if !r.alive {
                continue;
            }
            let a = r.coeff_of(x);
            if a.is_zero() {
                continue;
            }
            if a.is_positive() == increasing || r.kind == RelKind::Eq {
                let value = &x_val - &r.value / &a;
                let tighter = match &bound {
                    None => true,
                    Some(_) => {
                        (value == bound_val && r.kind == RelKind::Lt)
                            || (increasing && value < bound_val)
                            || (!increasing && value > bound_val)
                    }
                };
                if tighter {
                    if let Some((prev, _)) = bound.take() {
                        above.push(prev);
                    }
                    bound_val = value;
                    bound = Some((row_id, a));
                } else {
                    above.push(row_id);
                }
            } else {
                below.push(row_id);
            }
        }
        self.above = above;
        self.below = below;
        bound
    }

    /// Replay the bound trail backwards, moving each variable onto its
    /// binding bound (or just off it, for a strict bound) and refreshing
    /// the cached values of the live rows it appears in.
    fn update_values(&mut self, bound_vars: &[VarId], bound_trail: &[RowId]) {
        for i in (0..bound_trail.len()).rev() {
            let x = bound_vars[i];
            let r = self.rows[bound_trail[i]].clone();
            let mut val = r.coeff.clone();
            let mut x_coeff = BigRational::zero();
            for t in &r.terms {
                if t.var == x {
                    x_coeff = t.coeff.clone();
                } else {
                    val = val + &self.var_value[t.var] * &t.coeff;
                }
            }
            debug_assert!(!x_coeff.is_zero());
            let mut new_val = -&val / &x_coeff;
            if r.kind == RelKind::Lt {
                // back off the open bound by half the distance moved,
                // capped at one
                let mut eps = (&self.var_value[x] - &new_val).abs() / rat(2);
                if eps > BigRational::one() {
                    eps = BigRational::one();
                }
                debug_assert!(!eps.is_zero());
                if x_coeff.is_positive() {
                    new_val = &new_val - &eps;
                } else {
                    new_val = &new_val + &eps;
                }
            }
            self.var_value[x] = new_val;
            let v = self.eval_row(&self.rows[bound_trail[i]]);
            self.rows[bound_trail[i]].value = v;
        }
        for &x in bound_vars.iter().rev() {
            for row_id in self.var_rows[x].clone() {
                let v = self.eval_row(&self.rows[row_id]);
                self.rows[row_id].value = v;
                debug_assert!(self.row_ok(row_id));
            }
        }
        debug_assert!(self.check_invariants().is_ok());
        self.maybe_validate();
    }
}
