//! Row store and linear algebra for model-based projection.
//!
//! [`MbpSolver`] owns the variable table (values and integrality flags), the
//! growable row store with an explicit free list for retired row ids, and a
//! variable→row index used to find every constraint mentioning a variable.
//! The index may contain stale entries; readers filter by liveness and by a
//! zero coefficient instead of ever rebuilding it wholesale.
//!
//! The caller is required to keep the assignment satisfying every row it
//! adds; the engine maintains that invariant through all of its own
//! rewriting. [`MbpSolver::check_invariants`] verifies the whole store and
//! is available in every build, independent of the production code path.

use crate::def::{DefArena, DefId};
use crate::error::{MbpError, Result};
use crate::rat::{floor_div, floor_mod, rat_gcd};
use crate::row::{RelKind, Row, RowId, Term, VarId, NO_VAR};
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};
use rustc_hash::FxHashSet;
use std::fmt;

/// Row id of the reserved objective row (exempt from the satisfaction
/// invariant, never listed in the variable→row index).
pub const OBJECTIVE_ROW: RowId = 0;

/// Configuration for the projection engine.
#[derive(Debug, Clone, Default)]
pub struct MbpConfig {
    /// Run the full consistency checker after every mutating entry point.
    /// Intended for tests and debugging; off by default.
    pub validate: bool,
}

/// Statistics for the projection engine.
#[derive(Debug, Clone, Default)]
pub struct MbpStats {
    /// Variables created.
    pub vars_created: u64,
    /// Rows allocated fresh.
    pub rows_created: u64,
    /// Rows recycled from the free list.
    pub rows_recycled: u64,
    /// Resolution steps performed.
    pub resolutions: u64,
    /// Finite-disjunction fallbacks taken during integer resolution.
    pub finite_disjunctions: u64,
    /// Variables projected.
    pub projections: u64,
    /// Bound rows folded into the objective during maximization.
    pub maximize_pivots: u64,
}

/// Model-based projection and optimization engine for linear arithmetic.
///
/// Single-threaded; one instance owns its store exclusively. Row ids are
/// stable while a row is alive but may be recycled after retirement, so
/// callers must not retain ids across an elimination call.
#[derive(Debug)]
pub struct MbpSolver {
    pub(crate) rows: Vec<Row>,
    pub(crate) retired: Vec<RowId>,
    pub(crate) var_value: Vec<BigRational>,
    pub(crate) var_is_int: Vec<bool>,
    pub(crate) var_rows: Vec<Vec<RowId>>,
    pub(crate) defs: DefArena,
    pub(crate) results: Vec<Option<DefId>>,
    pub(crate) above: Vec<RowId>,
    pub(crate) below: Vec<RowId>,
    config: MbpConfig,
    pub(crate) stats: MbpStats,
}

impl MbpSolver {
    /// Create an engine with default configuration.
    pub fn new() -> Self {
        Self::with_config(MbpConfig::default())
    }

    /// Create an engine with the given configuration.
    pub fn with_config(config: MbpConfig) -> Self {
        Self {
            rows: vec![Row::new()],
            retired: Vec::new(),
            var_value: Vec::new(),
            var_is_int: Vec::new(),
            var_rows: Vec::new(),
            defs: DefArena::new(),
            results: Vec::new(),
            above: Vec::new(),
            below: Vec::new(),
            config,
            stats: MbpStats::default(),
        }
    }

    /// Get statistics.
    pub fn stats(&self) -> &MbpStats {
        &self.stats
    }

    /// Reset statistics.
    pub fn reset_stats(&mut self) {
        self.stats = MbpStats::default();
    }

    /// The definition arena holding results of projections with definitions.
    pub fn defs(&self) -> &DefArena {
        &self.defs
    }

    // ------------------------------------------------------------------
    // variables

    /// Create a variable with its initial value and integrality flag.
    ///
    /// Ids are stable for the engine's lifetime; a variable may become
    /// unreferenced but is never deleted.
    pub fn add_var(&mut self, value: BigRational, is_int: bool) -> VarId {
        debug_assert!(
            value.is_integer() || !is_int,
            "integral variable initialized with a non-integer value"
        );
        let v = self.var_value.len();
        self.var_value.push(value);
        self.var_is_int.push(is_int);
        self.var_rows.push(Vec::new());
        self.stats.vars_created += 1;
        v
    }

    /// Current value of a variable.
    pub fn value(&self, x: VarId) -> &BigRational {
        &self.var_value[x]
    }

    /// Integrality flag of a variable.
    pub fn is_int(&self, x: VarId) -> bool {
        self.var_is_int[x]
    }

    /// Number of variables created so far.
    pub fn num_vars(&self) -> usize {
        self.var_value.len()
    }

    /// Update a variable's value and the cached value of every row that
    /// mentions it. The new assignment must still satisfy those rows.
    pub fn update_value(&mut self, x: VarId, val: BigRational) {
        debug_assert!(
            val.is_integer() || !self.var_is_int[x],
            "integral variable assigned a non-integer value"
        );
        let old = std::mem::replace(&mut self.var_value[x], val.clone());
        let mut visited: FxHashSet<RowId> = FxHashSet::default();
        for row_id in self.var_rows[x].clone() {
            if !visited.insert(row_id) || !self.rows[row_id].alive {
                continue;
            }
            let coeff = self.rows[row_id].coeff_of(x);
            if coeff.is_zero() {
                continue;
            }
            let delta = &coeff * (&val - &old);
            let r = &mut self.rows[row_id];
            r.value = &r.value + delta;
            debug_assert!(self.row_ok(row_id));
        }
        self.maybe_validate();
    }

    // ------------------------------------------------------------------
    // construction

    /// Add a linear constraint `sum(coeffs) + c (rel) 0`. Integral
    /// variables require integer coefficients. A strict inequality over
    /// integral variables only is promoted to the non-strict form
    /// `t + 1 <= 0`. Returns the id of the new row; the id is invalidated
    /// by later eliminations.
    pub fn add_constraint(&mut self, coeffs: &[Term], c: BigRational, rel: RelKind) -> RowId {
        debug_assert!(matches!(rel, RelKind::Eq | RelKind::Lt | RelKind::Le));
        let row_id = self.add_row(coeffs, c, BigRational::zero(), rel, NO_VAR);
        self.maybe_validate();
        row_id
    }

    /// Add `lo <= x` as `-x + lo <= 0`.
    pub fn add_lower_bound(&mut self, x: VarId, lo: BigRational) {
        self.add_constraint(&[Term::new(x, -BigRational::one())], lo, RelKind::Le);
    }

    /// Add `x <= hi` as `x - hi <= 0`.
    pub fn add_upper_bound(&mut self, x: VarId, hi: BigRational) {
        self.add_constraint(&[Term::new(x, BigRational::one())], -hi, RelKind::Le);
    }

    /// Add a divisibility atom `m | (sum(coeffs) + c)`.
    ///
    /// Tautologies (every coefficient and the constant divisible by `m`)
    /// are dropped. Modulus zero is reported as an error.
    pub fn add_divides(&mut self, coeffs: &[Term], c: BigRational, m: BigRational) -> Result<()> {
        if m.is_zero() {
            return Err(MbpError::ZeroModulus);
        }
        let mut g = c.clone();
        for t in coeffs {
            g = rat_gcd(&t.coeff, &g);
        }
        if (&g / &m).is_integer() {
            return Ok(());
        }
        self.add_row(coeffs, c, m, RelKind::Divides, NO_VAR);
        self.maybe_validate();
        Ok(())
    }

    /// Add a mod atom: creates and returns a fresh integral variable `v`
    /// with `v = (sum(coeffs) + c) mod m`, initialized from the current
    /// assignment. Modulus zero is reported as an error.
    pub fn add_mod(&mut self, coeffs: &[Term], c: BigRational, m: BigRational) -> Result<VarId> {
        if m.is_zero() {
            return Err(MbpError::ZeroModulus);
        }
        let value = self.eval_terms(coeffs) + &c;
        let v = self.add_var(floor_mod(&value, &m), true);
        self.add_row(coeffs, c, m, RelKind::Mod, v);
        self.maybe_validate();
        Ok(v)
    }

    /// Add a div atom: creates and returns a fresh integral variable `v`
    /// with `v = (sum(coeffs) + c) div m`, initialized from the current
    /// assignment. Modulus zero is reported as an error.
    pub fn add_div(&mut self, coeffs: &[Term], c: BigRational, m: BigRational) -> Result<VarId> {
        if m.is_zero() {
            return Err(MbpError::ZeroModulus);
        }
        let value = self.eval_terms(coeffs) + &c;
        let v = self.add_var(floor_div(&value, &m), true);
        self.add_row(coeffs, c, m, RelKind::Div, v);
        self.maybe_validate();
        Ok(v)
    }

    /// Set the objective row to `sum(coeffs) + c`.
    pub fn set_objective(&mut self, coeffs: &[Term], c: BigRational) {
        self.rows[OBJECTIVE_ROW].reset();
        self.set_row(OBJECTIVE_ROW, coeffs, c, BigRational::zero(), RelKind::Le);
    }

    /// The objective row.
    pub fn objective(&self) -> &Row {
        &self.rows[OBJECTIVE_ROW]
    }

    /// Snapshot of the live rows, for hand-off to the caller.
    pub fn live_rows(&self) -> Vec<Row> {
        self.rows.iter().filter(|r| r.alive).cloned().collect()
    }

    // ------------------------------------------------------------------
    // row storage

    pub(crate) fn new_row(&mut self) -> RowId {
        match self.retired.pop() {
            Some(row_id) => {
                debug_assert!(!self.rows[row_id].alive);
                self.rows[row_id].reset();
                self.rows[row_id].alive = true;
                self.stats.rows_recycled += 1;
                row_id
            }
            None => {
                self.rows.push(Row::new());
                self.stats.rows_created += 1;
                self.rows.len() - 1
            }
        }
    }

    /// Mark a row dead and push its id on the free list for reuse.
    pub(crate) fn retire_row(&mut self, row_id: RowId) {
        debug_assert!(!self.retired.contains(&row_id));
        self.rows[row_id].alive = false;
        self.retired.push(row_id);
    }

    /// Fill a (fresh or recycled) row. Terms are sorted here; the cached
    /// value is computed from the current assignment. Strict rows over
    /// integral variables only are promoted to `t + 1 <= 0`.
    pub(crate) fn set_row(
        &mut self,
        row_id: RowId,
        coeffs: &[Term],
        c: BigRational,
        m: BigRational,
        rel: RelKind,
    ) {
        debug_assert!(self.rows[row_id].terms.is_empty());
        let mut terms = coeffs.to_vec();
        terms.sort_by_key(|t| t.var);
        debug_assert!(terms.windows(2).all(|w| w[0].var < w[1].var), "duplicate variable");
        let mut val = c.clone();
        let mut is_int_row = !coeffs.is_empty();
        for t in &terms {
            debug_assert!(!t.coeff.is_zero(), "zero-coefficient term");
            debug_assert!(
                !self.var_is_int[t.var] || t.coeff.is_integer(),
                "non-integer coefficient on an integral variable"
            );
            val = val + &self.var_value[t.var] * &t.coeff;
            is_int_row &= self.var_is_int[t.var];
        }
        let r = &mut self.rows[row_id];
        r.alive = true;
        r.terms = terms;
        r.coeff = c;
        r.value = val;
        r.kind = rel;
        r.modulus = m;
        if is_int_row && rel == RelKind::Lt {
            r.kind = RelKind::Le;
            r.coeff = &r.coeff + BigRational::one();
            r.value = &r.value + BigRational::one();
        }
    }

    /// Internal row construction shared by all constraint kinds.
    pub(crate) fn add_row(
        &mut self,
        coeffs: &[Term],
        c: BigRational,
        m: BigRational,
        rel: RelKind,
        aux: VarId,
    ) -> RowId {
        // identical-to-last-row suppression
        if let Some(last) = self.rows.last() {
            if last.alive
                && last.terms == coeffs
                && last.coeff == c
                && last.modulus == m
                && last.kind == rel
                && last.aux == aux
            {
                return self.rows.len() - 1;
            }
        }
        let row_id = self.new_row();
        self.set_row(row_id, coeffs, c, m, rel);
        self.rows[row_id].aux = aux;
        for t in coeffs {
            self.var_rows[t.var].push(row_id);
        }
        debug_assert!(self.row_ok(row_id));
        self.normalize(row_id);
        row_id
    }

    /// Duplicate a row, used when a row must survive a projection step in
    /// more than one derived copy.
    pub(crate) fn copy_row(&mut self, src: RowId) -> RowId {
        let r = self.rows[src].clone();
        let dst = self.new_row();
        self.set_row(dst, &r.terms, r.coeff, r.modulus, r.kind);
        for t in &r.terms {
            self.var_rows[t.var].push(dst);
        }
        debug_assert!(self.row_ok(dst));
        dst
    }

    // ------------------------------------------------------------------
    // row algebra

    /// Scale a row by `c`; scales the modulus too. The cached value of
    /// mod/div rows tracks their body under the original modulus and is
    /// left alone.
    pub(crate) fn scale_row(&mut self, dst: RowId, c: &BigRational) {
        if c.is_one() {
            return;
        }
        let r = &mut self.rows[dst];
        for t in &mut r.terms {
            t.coeff = &t.coeff * c;
        }
        r.modulus = &r.modulus * c;
        r.coeff = &r.coeff * c;
        if r.kind != RelKind::Div && r.kind != RelKind::Mod {
            r.value = &r.value * c;
        }
    }

    /// Add a constant to a row's linear form.
    pub(crate) fn add_const_row(&mut self, dst: RowId, c: &BigRational) {
        let r = &mut self.rows[dst];
        r.coeff = &r.coeff + c;
        r.value = &r.value + c;
    }

    /// `dst <- dst + c * src` by sorted merge of the term lists; updates
    /// the variable index for variables new to `dst`. The result is strict
    /// iff either contributing row was strict, except that combining two
    /// strict rows with the same bound direction relaxes to non-strict.
    pub(crate) fn mul_add_row(
        &mut self,
        same_sign: bool,
        dst_id: RowId,
        c: &BigRational,
        src_id: RowId,
    ) {
        if c.is_zero() {
            return;
        }
        debug_assert_ne!(dst_id, src_id);
        let src_terms = self.rows[src_id].terms.clone();
        let src_coeff = self.rows[src_id].coeff.clone();
        let src_value = self.rows[src_id].value.clone();
        let src_kind = self.rows[src_id].kind;
        let dst_terms = std::mem::take(&mut self.rows[dst_id].terms);
        let mut new_terms: Vec<Term> = Vec::with_capacity(dst_terms.len() + src_terms.len());
        let mut added: Vec<VarId> = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < dst_terms.len() || j < src_terms.len() {
            if j == src_terms.len() {
                new_terms.extend_from_slice(&dst_terms[i..]);
                break;
            }
            if i == dst_terms.len() {
                for t in &src_terms[j..] {
                    new_terms.push(Term::new(t.var, &t.coeff * c));
                    added.push(t.var);
                }
                break;
            }
            let v1 = dst_terms[i].var;
            let v2 = src_terms[j].var;
            if v1 == v2 {
                let coeff = &dst_terms[i].coeff + &src_terms[j].coeff * c;
                if !coeff.is_zero() {
                    new_terms.push(Term::new(v1, coeff));
                }
                i += 1;
                j += 1;
            } else if v1 < v2 {
                new_terms.push(dst_terms[i].clone());
                i += 1;
            } else {
                new_terms.push(Term::new(v2, &src_terms[j].coeff * c));
                added.push(v2);
                j += 1;
            }
        }
        if dst_id != OBJECTIVE_ROW {
            for v in added {
                self.var_rows[v].push(dst_id);
            }
        }
        let r = &mut self.rows[dst_id];
        r.terms = new_terms;
        r.coeff = &r.coeff + c * &src_coeff;
        r.value = &r.value + c * &src_value;
        if !same_sign && src_kind == RelKind::Lt {
            r.kind = RelKind::Lt;
        } else if same_sign && r.kind == RelKind::Lt && src_kind == RelKind::Lt {
            r.kind = RelKind::Le;
        }
        debug_assert!(self.row_ok(dst_id));
    }

    /// Gcd-reduce an all-integer inequality/equality row; retire rows whose
    /// term list became empty. Divisibility/mod/div rows are left alone.
    pub(crate) fn normalize(&mut self, row_id: RowId) {
        if !self.rows[row_id].alive {
            return;
        }
        if self.rows[row_id].terms.is_empty() {
            self.retire_row(row_id);
            return;
        }
        if matches!(
            self.rows[row_id].kind,
            RelKind::Divides | RelKind::Mod | RelKind::Div
        ) {
            return;
        }
        let r = &self.rows[row_id];
        let mut g = r.terms[0].coeff.abs();
        let mut all_int = g.is_integer();
        for t in r.terms.iter().skip(1) {
            if !all_int || g.is_one() {
                break;
            }
            if t.coeff.is_integer() {
                g = rat_gcd(&g, &t.coeff.abs());
            } else {
                all_int = false;
            }
        }
        if all_int && !r.coeff.is_zero() {
            if r.coeff.is_integer() {
                g = rat_gcd(&g, &r.coeff.abs());
            } else {
                all_int = false;
            }
        }
        if all_int && !g.is_one() {
            debug_assert!(!g.is_zero());
            let inv = g.recip();
            self.scale_row(row_id, &inv);
        }
    }

    /// Rewrite a row with `x := c`. The row must mention `x`.
    pub(crate) fn replace_var_const(&mut self, row_id: RowId, x: VarId, c: &BigRational) {
        debug_assert!(!self.rows[row_id].coeff_of(x).is_zero());
        let x_val = self.var_value[x].clone();
        let r = &mut self.rows[row_id];
        if let Ok(idx) = r.terms.binary_search_by(|t| t.var.cmp(&x)) {
            let coeff = r.terms.remove(idx).coeff;
            r.coeff = &r.coeff + &coeff * c;
            r.value = &r.value + &coeff * (c - &x_val);
        }
    }

    /// Rewrite a live row with `x := a*y + b`; no-op when the row is dead
    /// or does not mention `x`.
    pub(crate) fn replace_var_linear(
        &mut self,
        row_id: RowId,
        x: VarId,
        a: &BigRational,
        y: VarId,
        b: &BigRational,
    ) {
        let coeff = self.rows[row_id].coeff_of(x);
        if coeff.is_zero() || !self.rows[row_id].alive {
            return;
        }
        self.replace_var_const(row_id, x, b);
        let y_val = self.var_value[y].clone();
        let r = &mut self.rows[row_id];
        r.terms.push(Term::new(y, &coeff * a));
        r.value = &r.value + &coeff * a * &y_val;
        let n = r.terms.len();
        if n >= 2 && r.terms[n - 2].var > y {
            r.terms.sort_by_key(|t| t.var);
        }
        self.var_rows[y].push(row_id);
        debug_assert!(self.row_ok(row_id));
    }

    /// Rewrite a live row with `x := a*y + b*z`; no-op when the row is dead
    /// or does not mention `x`.
    pub(crate) fn replace_var_split(
        &mut self,
        row_id: RowId,
        x: VarId,
        a: &BigRational,
        y: VarId,
        b: &BigRational,
        z: VarId,
    ) {
        let coeff = self.rows[row_id].coeff_of(x);
        if coeff.is_zero() || !self.rows[row_id].alive {
            return;
        }
        self.replace_var_const(row_id, x, &BigRational::zero());
        let y_val = self.var_value[y].clone();
        let z_val = self.var_value[z].clone();
        let r = &mut self.rows[row_id];
        if !a.is_zero() {
            r.terms.push(Term::new(y, &coeff * a));
        }
        if !b.is_zero() {
            r.terms.push(Term::new(z, &coeff * b));
        }
        r.value = &r.value + &coeff * a * &y_val + &coeff * b * &z_val;
        r.terms.sort_by_key(|t| t.var);
        if !a.is_zero() {
            self.var_rows[y].push(row_id);
        }
        if !b.is_zero() {
            self.var_rows[z].push(row_id);
        }
        debug_assert!(self.row_ok(row_id));
    }

    // ------------------------------------------------------------------
    // evaluation

    /// Evaluate a row's linear form at the current assignment.
    pub fn eval_row(&self, r: &Row) -> BigRational {
        let mut val = r.coeff.clone();
        for t in &r.terms {
            val = val + &t.coeff * &self.var_value[t.var];
        }
        val
    }

    /// Evaluate a term list (without constant) at the current assignment.
    pub(crate) fn eval_terms(&self, terms: &[Term]) -> BigRational {
        let mut val = BigRational::zero();
        for t in terms {
            val = val + &t.coeff * &self.var_value[t.var];
        }
        val
    }

    /// Evaluate a definition at the current assignment.
    pub fn eval_def(&self, d: DefId) -> BigRational {
        self.defs.eval(d, &self.var_value)
    }

    // ------------------------------------------------------------------
    // invariants

    /// Check every row of the store; see [`MbpSolver::check_row`].
    pub fn check_invariants(&self) -> std::result::Result<(), String> {
        for row_id in 0..self.rows.len() {
            self.check_row(row_id)?;
        }
        Ok(())
    }

    /// Check one live row: terms sorted, unique and nonzero; the variable
    /// index mentions the row; the cached value equals evaluation; equality
    /// rows evaluate to zero; non-objective rows satisfy their relation.
    /// Dead rows are skipped.
    pub fn check_row(&self, row_id: RowId) -> std::result::Result<(), String> {
        let r = &self.rows[row_id];
        if !r.alive {
            return Ok(());
        }
        for (i, t) in r.terms.iter().enumerate() {
            if i + 1 < r.terms.len() && t.var >= r.terms[i + 1].var {
                return Err(format!("row {row_id}: terms out of order"));
            }
            if t.coeff.is_zero() {
                return Err(format!("row {row_id}: zero coefficient for v{}", t.var));
            }
            if row_id != OBJECTIVE_ROW && !self.var_rows[t.var].contains(&row_id) {
                return Err(format!(
                    "row {row_id}: v{} missing from the variable index",
                    t.var
                ));
            }
        }
        let eval = self.eval_row(r);
        if r.value != eval {
            return Err(format!(
                "row {row_id}: cached value {} differs from evaluation {}",
                r.value, eval
            ));
        }
        if r.kind == RelKind::Eq && !r.value.is_zero() {
            return Err(format!("row {row_id}: equality row evaluates to {}", r.value));
        }
        if row_id != OBJECTIVE_ROW {
            match r.kind {
                RelKind::Lt if !r.value.is_negative() => {
                    return Err(format!("row {row_id}: strict row not satisfied"));
                }
                RelKind::Le if r.value.is_positive() => {
                    return Err(format!("row {row_id}: inequality row not satisfied"));
                }
                RelKind::Divides if !(&r.value / &r.modulus).is_integer() => {
                    return Err(format!("row {row_id}: divisibility row not satisfied"));
                }
                RelKind::Mod | RelKind::Div if r.aux >= self.var_value.len() => {
                    return Err(format!("row {row_id}: invalid auxiliary variable"));
                }
                _ => {}
            }
        }
        Ok(())
    }

    pub(crate) fn row_ok(&self, row_id: RowId) -> bool {
        self.check_row(row_id).is_ok()
    }

    pub(crate) fn maybe_validate(&self) {
        if self.config.validate {
            if let Err(e) = self.check_invariants() {
                panic!("consistency check failed: {e}");
            }
        }
    }
}

impl Default for MbpSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MbpSolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for r in &self.rows {
            writeln!(f, "{}", r)?;
        }
        for (v, rows) in self.var_rows.iter().enumerate() {
            write!(f, "{}: ", v)?;
            for row_id in rows {
                write!(f, "{} ", row_id)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Copy a term list leaving out one variable.
pub(crate) fn coeffs_without(terms: &[Term], x: VarId) -> Vec<Term> {
    terms.iter().filter(|t| t.var != x).cloned().collect()
}
