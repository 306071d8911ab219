//! Symbolic definition trees.
//!
//! When the caller asks projection for a closed-form substitution of an
//! eliminated variable, the engine hands back a definition: an immutable
//! expression DAG over the remaining variables built from constants, scaled
//! variables, sums, products, and constant quotients.
//!
//! Nodes live in an append-only arena and are addressed by [`DefId`].
//! A node is only ever built from already-finalized children, so the DAG is
//! acyclic by construction and sharing needs no reference counting:
//! [`DefArena::substitute`] returns the original id whenever nothing
//! changed, so unchanged subtrees are shared across substitutions.

use crate::rat::denominator_lcm;
use crate::row::{RelKind, Row, Term, VarId};
use num_rational::BigRational;
use num_traits::{One, Signed, Zero};
use std::fmt;

/// Index of a definition node in its arena.
pub type DefId = usize;

/// A definition node.
#[derive(Debug, Clone, PartialEq)]
pub enum Def {
    /// A rational constant.
    Const(BigRational),
    /// A variable scaled by a coefficient.
    Var(Term),
    /// Sum of two definitions.
    Add(DefId, DefId),
    /// Product of two definitions.
    Mul(DefId, DefId),
    /// A definition divided by a positive rational constant.
    Div(DefId, BigRational),
}

/// Append-only arena of definition nodes.
#[derive(Debug, Default)]
pub struct DefArena {
    nodes: Vec<Def>,
}

impl DefArena {
    /// Create an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a node.
    pub fn get(&self, id: DefId) -> &Def {
        &self.nodes[id]
    }

    /// Number of nodes allocated so far.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when no node has been allocated.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn alloc(&mut self, node: Def) -> DefId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Constant node.
    pub fn constant(&mut self, c: BigRational) -> DefId {
        self.alloc(Def::Const(c))
    }

    /// Scaled-variable node.
    pub fn var(&mut self, t: Term) -> DefId {
        self.alloc(Def::Var(t))
    }

    /// Sum node.
    pub fn add(&mut self, x: DefId, y: DefId) -> DefId {
        self.alloc(Def::Add(x, y))
    }

    /// Product node.
    pub fn mul(&mut self, x: DefId, y: DefId) -> DefId {
        self.alloc(Def::Mul(x, y))
    }

    /// Quotient node; collapses when the divisor is one.
    pub fn div(&mut self, x: DefId, d: BigRational) -> DefId {
        if d.is_one() {
            x
        } else {
            self.alloc(Def::Div(x, d))
        }
    }

    /// Add a constant; collapses when the constant is zero.
    pub fn add_const(&mut self, x: DefId, c: BigRational) -> DefId {
        if c.is_zero() {
            x
        } else {
            let k = self.constant(c);
            self.add(x, k)
        }
    }

    /// Multiply by a constant; collapses when the constant is one.
    pub fn mul_const(&mut self, x: DefId, c: BigRational) -> DefId {
        if c.is_one() {
            x
        } else {
            let k = self.constant(c);
            self.mul(x, k)
        }
    }

    /// Substitute `with` for every occurrence of variable `v` in `id`.
    ///
    /// Returns `id` itself when `v` does not occur, so untouched subtrees
    /// keep their identity and sharing.
    pub fn substitute(&mut self, id: DefId, v: VarId, with: DefId) -> DefId {
        match self.nodes[id].clone() {
            Def::Add(x, y) => {
                let nx = self.substitute(x, v, with);
                let ny = self.substitute(y, v, with);
                if nx == x && ny == y {
                    id
                } else {
                    self.add(nx, ny)
                }
            }
            Def::Mul(x, y) => {
                let nx = self.substitute(x, v, with);
                let ny = self.substitute(y, v, with);
                if nx == x && ny == y {
                    id
                } else {
                    self.mul(nx, ny)
                }
            }
            Def::Div(x, d) => {
                let nx = self.substitute(x, v, with);
                if nx == x {
                    id
                } else {
                    self.div(nx, d)
                }
            }
            Def::Var(t) => {
                if t.var != v {
                    id
                } else if t.coeff.is_one() {
                    with
                } else {
                    self.mul_const(with, t.coeff)
                }
            }
            Def::Const(_) => id,
        }
    }

    /// Evaluate a definition at the given assignment (indexed by variable).
    pub fn eval(&self, id: DefId, values: &[BigRational]) -> BigRational {
        match &self.nodes[id] {
            Def::Const(c) => c.clone(),
            Def::Var(t) => &t.coeff * &values[t.var],
            Def::Add(x, y) => self.eval(*x, values) + self.eval(*y, values),
            Def::Mul(x, y) => self.eval(*x, values) * self.eval(*y, values),
            Def::Div(x, d) => self.eval(*x, values) / d,
        }
    }

    /// Convert a row `a*x + terms + c (rel) 0` into a definition for `x`:
    /// `x = (-terms - c) / a`, rounded so that the witness still satisfies
    /// the relation: strict rows step off the bound, non-strict lower
    /// bounds take the ceiling form `(t + a - 1) div a`.
    ///
    /// The current assignment satisfies the row, so evaluating the result
    /// yields a value for `x` consistent with the row.
    pub fn from_row(&mut self, r: &Row, x: VarId) -> DefId {
        let lc = denominator_lcm(std::iter::once(&r.coeff).chain(r.terms.iter().map(|t| &t.coeff)));
        let a = r.coeff_of(x);
        debug_assert!(!a.is_zero());
        let mut div = -&a * &lc;
        let sign = div.is_negative();
        let mut coeff = &lc * &r.coeff;
        match r.kind {
            RelKind::Lt => coeff += &div,
            RelKind::Le => {
                if !sign {
                    coeff += &div;
                    coeff -= BigRational::one();
                }
            }
            _ => {}
        }
        let mut lc = lc;
        if div.is_negative() {
            div = -div;
            lc = -lc;
            coeff = -coeff;
        }
        let mut result = self.constant(coeff);
        for t in &r.terms {
            if t.var != x {
                let v = self.var(Term::new(t.var, &t.coeff * &lc));
                result = self.add(result, v);
            }
        }
        if div > BigRational::one() {
            result = self.div(result, div);
        }
        result
    }

    /// Render a definition for diagnostics.
    pub fn display(&self, id: DefId) -> DefDisplay<'_> {
        DefDisplay { arena: self, id }
    }
}

/// Display adapter returned by [`DefArena::display`].
pub struct DefDisplay<'a> {
    arena: &'a DefArena,
    id: DefId,
}

impl fmt::Display for DefDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.arena.get(self.id) {
            Def::Const(c) => write!(f, "{}", c),
            Def::Var(t) => write!(f, "{}*v{}", t.coeff, t.var),
            Def::Add(x, y) => write!(
                f,
                "({} + {})",
                self.arena.display(*x),
                self.arena.display(*y)
            ),
            Def::Mul(x, y) => write!(
                f,
                "({} * {})",
                self.arena.display(*x),
                self.arena.display(*y)
            ),
            Def::Div(x, d) => write!(f, "({} / {})", self.arena.display(*x), d),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rat::rat;

    fn values(vals: &[i64]) -> Vec<BigRational> {
        vals.iter().map(|&v| rat(v)).collect()
    }

    #[test]
    fn test_eval_linear() {
        let mut arena = DefArena::new();
        // 2*v0 + 3
        let c = arena.constant(rat(3));
        let v = arena.var(Term::new(0, rat(2)));
        let sum = arena.add(c, v);
        assert_eq!(arena.eval(sum, &values(&[5])), rat(13));
    }

    #[test]
    fn test_collapsing_constructors() {
        let mut arena = DefArena::new();
        let v = arena.var(Term::new(0, rat(1)));
        assert_eq!(arena.div(v, rat(1)), v);
        assert_eq!(arena.add_const(v, rat(0)), v);
        assert_eq!(arena.mul_const(v, rat(1)), v);
        assert_ne!(arena.div(v, rat(2)), v);
    }

    #[test]
    fn test_substitute_identity_preserved() {
        let mut arena = DefArena::new();
        let c = arena.constant(rat(1));
        let v0 = arena.var(Term::new(0, rat(2)));
        let sum = arena.add(c, v0);
        let with = arena.constant(rat(7));
        // v1 does not occur: same id back
        assert_eq!(arena.substitute(sum, 1, with), sum);
        // v0 occurs with coefficient 2: 1 + 2*7 = 15
        let subst = arena.substitute(sum, 0, with);
        assert_ne!(subst, sum);
        assert_eq!(arena.eval(subst, &values(&[])), rat(15));
    }

    #[test]
    fn test_from_row_equality() {
        let mut arena = DefArena::new();
        // 2x + 3y - 8 = 0 with y = 2 gives x = 1
        let mut r = Row::new();
        r.kind = RelKind::Eq;
        r.terms = vec![Term::new(0, rat(2)), Term::new(1, rat(3))];
        r.coeff = rat(-8);
        let d = arena.from_row(&r, 0);
        assert_eq!(arena.eval(d, &values(&[0, 2])), rat(1));
    }

    #[test]
    fn test_from_row_integer_lower_bound() {
        let mut arena = DefArena::new();
        // -2x + 3 <= 0, i.e. x >= 3/2: integer witness rounds up to 2
        let mut r = Row::new();
        r.kind = RelKind::Le;
        r.terms = vec![Term::new(0, rat(-2))];
        r.coeff = rat(3);
        let d = arena.from_row(&r, 0);
        assert_eq!(arena.eval(d, &values(&[0])), rat(2));
    }

    #[test]
    fn test_from_row_upper_bound() {
        let mut arena = DefArena::new();
        // x - 5 <= 0: witness is the bound itself
        let mut r = Row::new();
        r.kind = RelKind::Le;
        r.terms = vec![Term::new(0, rat(1))];
        r.coeff = rat(-5);
        let d = arena.from_row(&r, 0);
        assert_eq!(arena.eval(d, &values(&[0])), rat(5));
    }

    #[test]
    fn test_from_row_strict_lower_bound() {
        let mut arena = DefArena::new();
        // -x + 1 < 0, i.e. x > 1: witness steps up to 2
        let mut r = Row::new();
        r.kind = RelKind::Lt;
        r.terms = vec![Term::new(0, rat(-1))];
        r.coeff = rat(1);
        let d = arena.from_row(&r, 0);
        assert_eq!(arena.eval(d, &values(&[0])), rat(2));
    }
}
