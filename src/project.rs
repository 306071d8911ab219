//! Model-guided variable elimination.
//!
//! [`MbpSolver::project`] removes one variable from every live row while
//! keeping the current assignment a model of the result. Rows mentioning
//! the variable are classified in one pass; divisibility atoms are handled
//! first (they change the variable basis), then mod/div atoms, then an
//! equality if one exists, and finally inequalities by resolution against
//! a bound chosen under the model. Optionally a definition is produced: a
//! term over the remaining variables that can replace the variable in any
//! formula this projection came from.

use crate::def::DefId;
use crate::error::{MbpError, Result};
use crate::rat::{floor_div, floor_mod, rat_lcm};
use crate::row::{RelKind, RowId, Term, VarId};
use crate::solver::{coeffs_without, MbpSolver};
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};
use rustc_hash::FxHashSet;
use smallvec::SmallVec;

type RowVec = SmallVec<[RowId; 8]>;

impl MbpSolver {
    /// Eliminate `x` from all live rows. With `compute_def` a definition
    /// for `x` over the remaining variables is returned; without it,
    /// rows that only bound `x` from one side are dropped instead.
    ///
    /// The assignment still satisfies every live row afterwards. The value
    /// of `x` is updated to match the returned definition when one is
    /// computed.
    pub fn project(&mut self, x: VarId, compute_def: bool) -> Result<Option<DefId>> {
        self.stats.projections += 1;
        let mut lub_rows: RowVec = SmallVec::new();
        let mut glb_rows: RowVec = SmallVec::new();
        let mut divide_rows: RowVec = SmallVec::new();
        let mut mod_rows: RowVec = SmallVec::new();
        let mut div_rows: RowVec = SmallVec::new();
        let mut eq_row: Option<RowId> = None;
        let mut lub_index: Option<RowId> = None;
        let mut glb_index: Option<RowId> = None;
        let mut lub_strict = false;
        let mut glb_strict = false;
        let mut lub_val = BigRational::zero();
        let mut glb_val = BigRational::zero();
        let mut lub_is_unit = true;
        let mut glb_is_unit = true;
        let x_val = self.var_value[x].clone();
        let mut visited: FxHashSet<RowId> = FxHashSet::default();
        for row_id in self.var_rows[x].clone() {
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
            match r.kind {
                RelKind::Eq => eq_row = Some(row_id),
                RelKind::Divides => divide_rows.push(row_id),
                RelKind::Mod => mod_rows.push(row_id),
                RelKind::Div => div_rows.push(row_id),
                RelKind::Lt | RelKind::Le if a.is_positive() => {
                    // upper bound x <= x_val - value/a
                    let bound = &x_val - &r.value / &a;
                    if lub_rows.is_empty()
                        || bound < lub_val
                        || (bound == lub_val && r.kind == RelKind::Lt && !lub_strict)
                    {
                        lub_val = bound;
                        lub_index = Some(row_id);
                        lub_strict = r.kind == RelKind::Lt;
                    }
                    lub_is_unit &= a.is_one();
                    lub_rows.push(row_id);
                }
                RelKind::Lt | RelKind::Le => {
                    let bound = &x_val - &r.value / &a;
                    if glb_rows.is_empty()
                        || bound > glb_val
                        || (bound == glb_val && r.kind == RelKind::Lt && !glb_strict)
                    {
                        glb_val = bound;
                        glb_index = Some(row_id);
                        glb_strict = r.kind == RelKind::Lt;
                    }
                    glb_is_unit &= (-a).is_one();
                    glb_rows.push(row_id);
                }
            }
        }
        tracing::trace!(
            var = x,
            upper = lub_rows.len(),
            lower = glb_rows.len(),
            divides = divide_rows.len(),
            mods = mod_rows.len(),
            divs = div_rows.len(),
            eq = eq_row.is_some(),
            "project"
        );

        if !divide_rows.is_empty() {
            return self.solve_divides(x, &divide_rows, compute_def);
        }
        if !mod_rows.is_empty() || !div_rows.is_empty() {
            return self.solve_mod_div(x, &mod_rows, &div_rows, compute_def);
        }
        if let Some(eq) = eq_row {
            return self.solve_for(eq, x, compute_def);
        }

        let lub_size = lub_rows.len();
        let glb_size = glb_rows.len();
        let row_index = if lub_size <= glb_size { lub_index } else { glb_index };
        let Some(row_index) = row_index else {
            // bounded from at most one side
            let result = if compute_def {
                let result = if let Some(lub) = lub_index {
                    self.solve_for(lub, x, true)?
                } else if let Some(glb) = glb_index {
                    self.solve_for(glb, x, true)?
                } else {
                    Some(self.defs.constant(x_val))
                };
                debug_assert_eq!(
                    result.map(|d| self.eval_def(d)),
                    result.map(|_| self.var_value[x].clone())
                );
                result
            } else {
                for &r in lub_rows.iter().chain(glb_rows.iter()) {
                    self.retire_row(r);
                }
                None
            };
            self.maybe_validate();
            return Ok(result);
        };

        // both sides present; the definition comes from the bound row on
        // the smaller side, picked under the model
        let result = if compute_def {
            let r = self.rows[row_index].clone();
            Some(self.defs.from_row(&r, x))
        } else {
            None
        };
        if (lub_size <= 2 || glb_size <= 2)
            && lub_size <= 3
            && glb_size <= 3
            && (!self.is_int(x) || lub_is_unit || glb_is_unit)
        {
            // pairwise resolution without blowup
            for i in 0..lub_size {
                let r1 = lub_rows[i];
                let last = i + 1 == lub_size;
                let coeff = self.rows[r1].coeff_of(x);
                for gi in 0..glb_size {
                    let r2 = glb_rows[gi];
                    if last {
                        self.resolve(r1, &coeff, r2, x)?;
                    } else {
                        let r3 = self.copy_row(r2);
                        self.resolve(r1, &coeff, r3, x)?;
                    }
                }
            }
            for &r in &lub_rows {
                self.retire_row(r);
            }
        } else {
            // resolve everything against one representative bound
            let coeff = self.rows[row_index].coeff_of(x);
            for &r in lub_rows.iter().chain(glb_rows.iter()) {
                if r != row_index {
                    self.resolve(row_index, &coeff, r, x)?;
                }
            }
            self.retire_row(row_index);
        }
        self.maybe_validate();
        Ok(result)
    }

    /// Eliminate several variables in order, substituting each definition
    /// into the definitions computed before it. Entry `i` of the result
    /// defines `vars[i]` over variables untouched by the whole sequence
    /// (`None` without `compute_def`, or when a variable had no
    /// definition-producing elimination).
    pub fn project_all(
        &mut self,
        vars: &[VarId],
        compute_def: bool,
    ) -> Result<Vec<Option<DefId>>> {
        self.results.clear();
        for &x in vars {
            let d = self.project(x, compute_def)?;
            self.results.push(d);
            if compute_def {
                if let Some(d) = d {
                    self.eliminate(x, d);
                }
            }
        }
        Ok(std::mem::take(&mut self.results))
    }

    /// Substitute `v := d` into every pending projection result.
    pub(crate) fn eliminate(&mut self, v: VarId, d: DefId) {
        let mut results = std::mem::take(&mut self.results);
        for r in results.iter_mut().flatten() {
            *r = self.defs.substitute(*r, v, d);
        }
        self.results = results;
    }

    /// Eliminate `x` constrained by divisibility atoms: with `d` the lcm of
    /// their moduli and `u = x_val mod d`, substitute `x := d*y + u` for a
    /// fresh integral `y`, which the atoms no longer constrain, and project
    /// `y` instead.
    pub(crate) fn solve_divides(
        &mut self,
        x: VarId,
        divide_rows: &[RowId],
        compute_def: bool,
    ) -> Result<Option<DefId>> {
        debug_assert!(!divide_rows.is_empty());
        let mut d = BigRational::one();
        for &ri in divide_rows {
            d = rat_lcm(&d, &self.rows[ri].modulus);
        }
        if d.is_zero() {
            return Err(MbpError::ZeroModulus);
        }
        let d = d.abs();
        let x_val = self.var_value[x].clone();
        let u = floor_mod(&x_val, &d);
        debug_assert!(!u.is_negative() && u < d);
        tracing::trace!(var = x, lcm = %d, residue = %u, "solve_divides");
        for &ri in divide_rows {
            self.replace_var_const(ri, x, &u);
            debug_assert!(self.row_ok(ri));
            self.normalize(ri);
        }
        let y_val = (&x_val - &u) / &d;
        debug_assert!(y_val.is_integer());
        let y = self.add_var(y_val, true);
        let mut visited: FxHashSet<RowId> = FxHashSet::default();
        for row_id in self.var_rows[x].clone() {
            if !visited.insert(row_id) {
                continue;
            }
            self.replace_var_linear(row_id, x, &d, y, &u);
            self.normalize(row_id);
        }
        let result = self.project(y, compute_def)?;
        if let Some(y_def) = result {
            let scaled = self.defs.mul_const(y_def, d);
            let full = self.defs.add_const(scaled, u);
            self.var_value[x] = self.eval_def(full);
            return Ok(Some(full));
        }
        Ok(None)
    }

    /// Eliminate `x` constrained by mod/div atoms. With `k` the lcm of the
    /// moduli, `x` splits as `k*y + z` with fresh integral `y`, `z` and
    /// `0 <= z < k`; each atom's auxiliary variable is characterized by
    /// linear rows over `y`, `z` and fresh atoms free of `x`, then the
    /// auxiliaries, `z` and `y` are projected in turn.
    pub(crate) fn solve_mod_div(
        &mut self,
        x: VarId,
        mod_rows: &[RowId],
        div_rows: &[RowId],
        compute_def: bool,
    ) -> Result<Option<DefId>> {
        debug_assert!(!mod_rows.is_empty() || !div_rows.is_empty());
        debug_assert!(self.var_is_int[x]);
        let mut k = BigRational::one();
        for &ri in div_rows.iter().chain(mod_rows.iter()) {
            k = rat_lcm(&k, &self.rows[ri].modulus);
        }
        if k.is_zero() {
            return Err(MbpError::ZeroModulus);
        }
        let k = k.abs();
        let one = BigRational::one();
        let x_val = self.var_value[x].clone();
        let z_val = floor_mod(&x_val, &k);
        let y_val = floor_div(&x_val, &k);
        debug_assert_eq!(x_val, &k * &y_val + &z_val);
        tracing::trace!(var = x, lcm = %k, "solve_mod_div");
        let z = self.add_var(z_val.clone(), true);
        let y = self.add_var(y_val, true);
        // detach the atoms before rewriting the remaining rows, so the
        // substitution below does not touch them
        let mut visited: FxHashSet<RowId> = FxHashSet::default();
        let mut dvs: Vec<RowId> = Vec::new();
        for &ri in div_rows {
            if !visited.insert(ri) {
                continue;
            }
            let scale = &k / &self.rows[ri].modulus;
            self.scale_row(ri, &scale);
            self.rows[ri].alive = false;
            dvs.push(ri);
        }
        let mut mds: Vec<RowId> = Vec::new();
        for &ri in mod_rows {
            if !visited.insert(ri) {
                continue;
            }
            self.rows[ri].alive = false;
            mds.push(ri);
        }
        for row_id in self.var_rows[x].clone() {
            if !visited.insert(row_id) {
                continue;
            }
            self.replace_var_split(row_id, x, &k, y, &one, z);
            self.normalize(row_id);
        }
        self.add_lower_bound(z, BigRational::zero());
        self.add_upper_bound(z, &k - &one);

        let mut vs: Vec<VarId> = Vec::new();
        for ri in dvs {
            // v = (a*x + t + b) div k after scaling to the common modulus;
            // with x = k*y + z this is a*y + ((t + b) div k) + k0 where
            // k0 = (a*z + ((t + b) mod k)) div k
            let a = self.rows[ri].coeff_of(x);
            self.replace_var_const(ri, x, &BigRational::zero());
            let coeffs = self.rows[ri].terms.clone();
            let coeff = self.rows[ri].coeff.clone();
            let v = self.rows[ri].aux;
            let mut w: Option<VarId> = None;
            let mut offset = BigRational::zero();
            if k.is_one() {
                offset = coeff.clone();
            } else if coeffs.is_empty() {
                offset = floor_div(&coeff, &k);
            } else {
                w = Some(self.add_div(&coeffs, coeff.clone(), k.clone())?);
            }
            let body_val = self.eval_terms(&coeffs) + &coeff;
            let k0 = floor_div(&(&a * &z_val + floor_mod(&body_val, &k)), &k);
            let mut div_coeffs = vec![Term::new(v, -BigRational::one()), Term::new(y, a.clone())];
            if let Some(w) = w {
                div_coeffs.push(Term::new(w, BigRational::one()));
            } else if k.is_one() {
                div_coeffs.extend(coeffs.iter().cloned());
            }
            self.add_constraint(&div_coeffs, &k0 + &offset, RelKind::Eq);
            let mut u: Option<VarId> = None;
            let mut offset2 = BigRational::zero();
            if k.is_one() {
                // no residue part
            } else if coeffs.is_empty() {
                offset2 = floor_mod(&coeff, &k);
            } else {
                u = Some(self.add_mod(&coeffs, coeff.clone(), k.clone())?);
            }
            // pin k0 between the floors: k0*k <= a*z + (t+b mod k) < (k0+1)*k
            let mut bound_coeffs = vec![Term::new(z, a.clone())];
            if let Some(u) = u {
                bound_coeffs.push(Term::new(u, BigRational::one()));
            }
            let hi = &one - &k * (&k0 + &one) + &offset2;
            self.add_constraint(&bound_coeffs, hi, RelKind::Le);
            for t in &mut bound_coeffs {
                t.coeff = -t.coeff.clone();
            }
            let lo = &k0 * &k - &offset2;
            self.add_constraint(&bound_coeffs, lo, RelKind::Le);
            self.retire_row(ri);
            vs.push(v);
        }
        for ri in mds {
            // v = (a*x + t + b) mod m; with x = k*y + z and m | k the y
            // part drops out of the residue: v = (a*z + ((t + b) mod m))
            // shifted into [0, m) by a model-determined constant
            let a = self.rows[ri].coeff_of(x);
            self.replace_var_const(ri, x, &BigRational::zero());
            let m = self.rows[ri].modulus.clone();
            let coeffs = self.rows[ri].terms.clone();
            let coeff = self.rows[ri].coeff.clone();
            let v = self.rows[ri].aux;
            let v_val = self.var_value[v].clone();
            let mut w: Option<VarId> = None;
            let mut offset = BigRational::zero();
            if coeffs.is_empty() || m.is_one() {
                offset = floor_mod(&coeff, &m);
            } else {
                w = Some(self.add_mod(&coeffs, coeff.clone(), m.clone())?);
            }
            let w_val = match w {
                Some(w) => self.var_value[w].clone(),
                None => offset.clone(),
            };
            let shift = &v_val - &a * &z_val - &w_val;
            let mut mod_coeffs = vec![Term::new(v, -BigRational::one()), Term::new(z, a.clone())];
            if let Some(w) = w {
                mod_coeffs.push(Term::new(w, BigRational::one()));
            }
            self.add_constraint(&mod_coeffs, &shift + &offset, RelKind::Eq);
            self.add_lower_bound(v, BigRational::zero());
            self.add_upper_bound(v, &m - &one);
            self.retire_row(ri);
            vs.push(v);
        }
        for v in vs {
            let v_def = self.project(v, compute_def)?;
            if let Some(v_def) = v_def {
                self.eliminate(v, v_def);
            }
        }
        let z_def = self.project(z, compute_def)?;
        let y_def = self.project(y, compute_def)?;
        if let (Some(z_def), Some(y_def)) = (z_def, y_def) {
            let z_def = self.defs.substitute(z_def, y, y_def);
            self.eliminate(y, y_def);
            self.eliminate(z, z_def);
            let scaled = self.defs.mul_const(y_def, k);
            let result = self.defs.add(scaled, z_def);
            self.var_value[x] = self.eval_def(result);
            return Ok(Some(result));
        }
        Ok(None)
    }

    /// Eliminate `x` using row `row_id1`, treated as the equation
    /// `a*x + t = 0` (strict rows are first shifted to their non-strict
    /// boundary, which requires `compute_def`). Over the integers a
    /// non-unit leading coefficient forces the residue of `t`, recorded as
    /// a divisibility atom on the remaining variables. Every other row
    /// mentioning `x` is solved against the equation; the row itself is
    /// retired.
    pub(crate) fn solve_for(
        &mut self,
        row_id1: RowId,
        x: VarId,
        compute_def: bool,
    ) -> Result<Option<DefId>> {
        tracing::trace!(var = x, row = row_id1, "solve_for");
        debug_assert!(self.rows[row_id1].alive);
        let mut a = self.rows[row_id1].coeff_of(x);
        debug_assert!(!a.is_zero());
        if a.is_negative() {
            a = -a;
            self.rows[row_id1].neg();
        }
        if self.rows[row_id1].kind == RelKind::Lt {
            debug_assert!(compute_def);
            let r = &mut self.rows[row_id1];
            r.coeff = &r.coeff - &r.value;
            r.kind = RelKind::Le;
            r.value = BigRational::zero();
        }
        if self.var_is_int[x] && !a.is_one() {
            // the residue class of the remaining term is fixed by the model
            {
                let r = &mut self.rows[row_id1];
                r.coeff = &r.coeff - &r.value;
                r.value = BigRational::zero();
            }
            let coeffs = coeffs_without(&self.rows[row_id1].terms, x);
            let c = floor_mod(&-self.eval_terms(&coeffs), &a);
            self.add_divides(&coeffs, c, a.clone())?;
        }
        let mut visited: FxHashSet<RowId> = FxHashSet::default();
        visited.insert(row_id1);
        for row_id2 in self.var_rows[x].clone() {
            if !visited.insert(row_id2) {
                continue;
            }
            if !self.rows[row_id2].alive {
                continue;
            }
            if self.rows[row_id2].coeff_of(x).is_zero() {
                continue;
            }
            debug_assert!(
                matches!(self.rows[row_id2].kind, RelKind::Eq | RelKind::Lt | RelKind::Le),
                "divisibility rows are dispatched before equality solving"
            );
            self.solve(row_id1, &a, row_id2, x);
        }
        let mut result = None;
        if compute_def {
            let r = self.rows[row_id1].clone();
            let d = self.defs.from_row(&r, x);
            self.var_value[x] = self.eval_def(d);
            result = Some(d);
        }
        self.retire_row(row_id1);
        self.maybe_validate();
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rat::rat;

    fn linear(terms: &[(VarId, i64)]) -> Vec<Term> {
        terms.iter().map(|&(v, c)| Term::new(v, rat(c))).collect()
    }

    #[test]
    fn test_project_unconstrained_gives_model_value() {
        let mut s = MbpSolver::new();
        let x = s.add_var(rat(7), true);
        let d = s.project(x, true).unwrap().unwrap();
        assert_eq!(s.eval_def(d), rat(7));
    }

    #[test]
    fn test_project_one_sided_drops_rows() {
        let mut s = MbpSolver::new();
        let x = s.add_var(rat(0), false);
        s.add_constraint(&linear(&[(x, 1)]), rat(-5), RelKind::Le);
        s.add_constraint(&linear(&[(x, 2)]), rat(-11), RelKind::Le);
        assert_eq!(s.project(x, false).unwrap(), None);
        assert!(s.live_rows().is_empty());
    }

    #[test]
    fn test_project_one_sided_definition_from_bound() {
        let mut s = MbpSolver::new();
        let x = s.add_var(rat(0), false);
        s.add_constraint(&linear(&[(x, 1)]), rat(-5), RelKind::Le);
        let d = s.project(x, true).unwrap().unwrap();
        // the definition sits on the bound
        assert_eq!(s.eval_def(d), rat(5));
        assert_eq!(*s.value(x), rat(5));
        assert!(s.live_rows().is_empty());
    }

    #[test]
    fn test_project_two_sided_resolves_pairs() {
        let mut s = MbpSolver::new();
        let x = s.add_var(rat(1), false);
        let y = s.add_var(rat(0), false);
        // y <= x <= 2
        s.add_constraint(&linear(&[(x, 1)]), rat(-2), RelKind::Le);
        s.add_constraint(&linear(&[(x, -1), (y, 1)]), rat(0), RelKind::Le);
        let d = s.project(x, true).unwrap().unwrap();
        // definition from the single upper bound
        assert_eq!(s.eval_def(d), rat(2));
        let rows = s.live_rows();
        assert_eq!(rows.len(), 1);
        // residue: y - 2 <= 0
        assert_eq!(rows[0].coeff_of(y), rat(1));
        assert_eq!(rows[0].coeff, rat(-2));
        assert!(s.check_invariants().is_ok());
    }

    #[test]
    fn test_project_equality_substitutes() {
        let mut s = MbpSolver::new();
        let x = s.add_var(rat(2), true);
        let y = s.add_var(rat(4), true);
        // x = y - 2, x <= 10
        s.add_constraint(&linear(&[(x, 1), (y, -1)]), rat(2), RelKind::Eq);
        s.add_constraint(&linear(&[(x, 1)]), rat(-10), RelKind::Le);
        let d = s.project(x, true).unwrap().unwrap();
        assert_eq!(s.eval_def(d), rat(2));
        let rows = s.live_rows();
        assert_eq!(rows.len(), 1);
        // y - 12 <= 0
        assert_eq!(rows[0].coeff_of(y), rat(1));
        assert_eq!(rows[0].coeff, rat(-12));
    }

    #[test]
    fn test_project_equality_non_unit_adds_divisibility() {
        let mut s = MbpSolver::new();
        let x = s.add_var(rat(3), true);
        let y = s.add_var(rat(6), true);
        // 2x - y = 0 at x=3, y=6
        s.add_constraint(&linear(&[(x, 2), (y, -1)]), rat(0), RelKind::Eq);
        let d = s.project(x, true).unwrap().unwrap();
        assert_eq!(s.eval_def(d), rat(3));
        let rows = s.live_rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].kind, RelKind::Divides);
        assert_eq!(rows[0].modulus, rat(2));
        assert!(s.check_invariants().is_ok());
    }

    #[test]
    fn test_solve_divides_shifts_basis() {
        let mut s = MbpSolver::new();
        let x = s.add_var(rat(2), true);
        // 3 | (x + 1), no other constraints
        s.add_divides(&linear(&[(x, 1)]), rat(1), rat(3)).unwrap();
        let d = s.project(x, true).unwrap().unwrap();
        // the divisibility atom is absorbed; the definition keeps the
        // residue class of the model value
        assert_eq!(s.eval_def(d), rat(2));
        assert!(s.live_rows().is_empty());
        assert!(s.check_invariants().is_ok());
    }

    #[test]
    fn test_solve_divides_keeps_inequalities_sound() {
        let mut s = MbpSolver::new();
        let x = s.add_var(rat(5), true);
        let y = s.add_var(rat(0), true);
        // 4 | (x + 3), y <= x, x <= 9
        s.add_divides(&linear(&[(x, 1)]), rat(3), rat(4)).unwrap();
        s.add_constraint(&linear(&[(x, -1), (y, 1)]), rat(0), RelKind::Le);
        s.add_constraint(&linear(&[(x, 1)]), rat(-9), RelKind::Le);
        let d = s.project(x, true).unwrap().unwrap();
        let witness = s.eval_def(d);
        // witness stays in the residue class and between the bounds
        assert!((&witness + rat(3)) .to_integer() % 4 == 0.into());
        assert!(witness >= rat(0) && witness <= rat(9));
        assert!(s.check_invariants().is_ok());
    }

    #[test]
    fn test_project_all_substitutes_definitions() {
        let mut s = MbpSolver::new();
        let x = s.add_var(rat(1), false);
        let y = s.add_var(rat(2), false);
        let z = s.add_var(rat(0), false);
        // x = y - 1, y = z + 2
        s.add_constraint(&linear(&[(x, 1), (y, -1)]), rat(1), RelKind::Eq);
        s.add_constraint(&linear(&[(y, 1), (z, -1)]), rat(-2), RelKind::Eq);
        let defs = s.project_all(&[x, y], true).unwrap();
        assert_eq!(defs.len(), 2);
        // both definitions now range over z only
        let dx = defs[0].unwrap();
        let dy = defs[1].unwrap();
        assert_eq!(s.eval_def(dy), rat(2));
        assert_eq!(s.eval_def(dx), rat(1));
        s.update_value(z, rat(10));
        assert_eq!(s.eval_def(dy), rat(12));
        assert_eq!(s.eval_def(dx), rat(11));
    }

    #[test]
    fn test_mod_atom_projection() {
        let mut s = MbpSolver::new();
        let x = s.add_var(rat(7), true);
        let v = s.add_mod(&linear(&[(x, 1)]), rat(0), rat(3)).unwrap();
        assert_eq!(*s.value(v), rat(1));
        // x mod 3 <= 1 expressed on the auxiliary
        s.add_constraint(&linear(&[(v, 1)]), rat(-1), RelKind::Le);
        let d = s.project(x, true).unwrap().unwrap();
        let witness = s.eval_def(d);
        assert_eq!(witness, *s.value(x));
        // the witness keeps the residue constraint satisfiable
        assert!(s.check_invariants().is_ok());
    }

    #[test]
    fn test_div_atom_projection() {
        let mut s = MbpSolver::new();
        let x = s.add_var(rat(7), true);
        let v = s.add_div(&linear(&[(x, 1)]), rat(0), rat(3)).unwrap();
        assert_eq!(*s.value(v), rat(2));
        // x div 3 <= 2
        s.add_constraint(&linear(&[(v, 1)]), rat(-2), RelKind::Le);
        let d = s.project(x, true).unwrap().unwrap();
        assert_eq!(s.eval_def(d), *s.value(x));
        assert!(s.check_invariants().is_ok());
    }
}
