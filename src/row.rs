//! Constraint rows.
//!
//! A row is one linear constraint over the engine's variables: a sorted,
//! duplicate-free list of (variable, nonzero coefficient) terms, a constant
//! offset, a relation kind, and a cached evaluation of the linear form at
//! the current assignment. Divisibility, mod, and div rows additionally
//! carry a modulus, and mod/div rows the variable holding their result.

use num_rational::BigRational;
use num_traits::Zero;
use std::fmt;

/// Variable identifier.
pub type VarId = usize;

/// Row identifier. Stable while the row is alive; recycled after retirement.
pub type RowId = usize;

/// Sentinel for "no variable" (rows without an auxiliary result variable).
pub const NO_VAR: VarId = usize::MAX;

/// A (variable, coefficient) pair inside a row. Coefficients are nonzero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    /// Variable identifier.
    pub var: VarId,
    /// Nonzero rational coefficient.
    pub coeff: BigRational,
}

impl Term {
    /// Create a term.
    pub fn new(var: VarId, coeff: BigRational) -> Self {
        Self { var, coeff }
    }
}

/// Relation kind of a row, all against zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelKind {
    /// Linear form equals zero.
    Eq,
    /// Linear form is strictly negative.
    Lt,
    /// Linear form is nonpositive.
    Le,
    /// Modulus divides the linear form.
    Divides,
    /// Auxiliary variable equals the linear form modulo the modulus.
    Mod,
    /// Auxiliary variable equals the linear form floor-divided by the modulus.
    Div,
}

impl fmt::Display for RelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelKind::Eq => write!(f, "="),
            RelKind::Lt => write!(f, "<"),
            RelKind::Le => write!(f, "<="),
            RelKind::Divides => write!(f, "divides"),
            RelKind::Mod => write!(f, "mod"),
            RelKind::Div => write!(f, "div"),
        }
    }
}

/// A linear constraint row.
#[derive(Debug, Clone)]
pub struct Row {
    /// Relation kind.
    pub kind: RelKind,
    /// Terms, sorted by ascending variable id, coefficients nonzero.
    pub terms: Vec<Term>,
    /// Constant offset of the linear form.
    pub coeff: BigRational,
    /// Cached evaluation of the linear form at the current assignment.
    pub value: BigRational,
    /// Liveness flag; retired rows stay in storage for id reuse.
    pub alive: bool,
    /// Modulus, meaningful for divisibility/mod/div rows only.
    pub modulus: BigRational,
    /// Result variable of mod/div rows; [`NO_VAR`] otherwise.
    pub aux: VarId,
}

impl Row {
    /// Create an empty, dead row.
    pub fn new() -> Self {
        Self {
            kind: RelKind::Le,
            terms: Vec::new(),
            coeff: BigRational::zero(),
            value: BigRational::zero(),
            alive: false,
            modulus: BigRational::zero(),
            aux: NO_VAR,
        }
    }

    /// Clear the row back to its empty state, keeping allocations.
    pub fn reset(&mut self) {
        self.kind = RelKind::Le;
        self.terms.clear();
        self.coeff = BigRational::zero();
        self.value = BigRational::zero();
        self.alive = false;
        self.modulus = BigRational::zero();
        self.aux = NO_VAR;
    }

    /// Coefficient of `x` in this row by binary search; zero when absent.
    pub fn coeff_of(&self, x: VarId) -> BigRational {
        if self.terms.is_empty() {
            return BigRational::zero();
        }
        match self.terms.binary_search_by(|t| t.var.cmp(&x)) {
            Ok(i) => self.terms[i].coeff.clone(),
            Err(_) => BigRational::zero(),
        }
    }

    /// Negate the linear form: all coefficients, the constant, and the
    /// cached value. The relation kind is left untouched; callers that
    /// negate inequality rows are responsible for what that means.
    pub fn neg(&mut self) {
        for t in &mut self.terms {
            t.coeff = -t.coeff.clone();
        }
        self.coeff = -self.coeff.clone();
        self.value = -self.value.clone();
    }
}

impl Default for Row {
    fn default() -> Self {
        Self::new()
    }
}

/// Write a linear form `c1*v1 + c2*v2 + ... + c` the way the row dump does.
pub(crate) fn fmt_linear(
    f: &mut fmt::Formatter<'_>,
    terms: &[Term],
    coeff: &BigRational,
) -> fmt::Result {
    use num_traits::{One, Signed};
    for (i, t) in terms.iter().enumerate() {
        if i > 0 && t.coeff.is_positive() {
            write!(f, "+ ")?;
        }
        if t.coeff.is_one() {
            write!(f, "v{} ", t.var)?;
        } else {
            write!(f, "{}*v{} ", t.coeff, t.var)?;
        }
    }
    if coeff.is_positive() {
        write!(f, "+ {} ", coeff)?;
    } else if coeff.is_negative() {
        write!(f, "{} ", coeff)?;
    }
    Ok(())
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", if self.alive { "a" } else { "d" })?;
        fmt_linear(f, &self.terms, &self.coeff)?;
        match self.kind {
            RelKind::Divides => {
                write!(f, "{} {} = 0; value: {}", self.kind, self.modulus, self.value)
            }
            RelKind::Mod | RelKind::Div => {
                write!(f, "{} {} = v{}; value: {}", self.kind, self.modulus, self.aux, self.value)
            }
            _ => write!(f, "{} 0; value: {}", self.kind, self.value),
        }
    }
}
