//! Model-based projection and optimization for linear arithmetic.
//!
//! The engine keeps a set of linear constraints (equalities, strict and
//! non-strict inequalities, divisibility, mod and div atoms) over rational
//! and integral variables, together with an assignment that satisfies all
//! of them. Two operations run relative to that assignment:
//!
//! - [`MbpSolver::project`] eliminates a variable from every constraint,
//!   keeping the assignment a model of the result and optionally producing
//!   a definition, a term over the remaining variables that can stand in
//!   for the eliminated one.
//! - [`MbpSolver::maximize`] finds the least upper bound of a linear
//!   objective over the constraints and moves the assignment onto it.
//!
//! Integer variables are handled soundly: opposite bound pairs combine
//! through the strengthened (dark or exact) shadow when possible, and fall
//! back to a divisibility constraint pinned by the assignment otherwise.
//!
//! ```
//! use mbp_arith::{MbpSolver, Optimum, RelKind, Term};
//! use mbp_arith::rat::rat;
//!
//! let mut s = MbpSolver::new();
//! let x = s.add_var(rat(3), false);
//! // 1 <= x <= 5
//! s.add_constraint(&[Term::new(x, rat(1))], rat(-5), RelKind::Le);
//! s.add_constraint(&[Term::new(x, rat(-1))], rat(1), RelKind::Le);
//! s.set_objective(&[Term::new(x, rat(1))], rat(0));
//! let opt = s.maximize()?;
//! assert_eq!(opt, Optimum::Finite { value: rat(5), strict: false });
//! assert_eq!(*s.value(x), rat(5));
//! # Ok::<(), mbp_arith::MbpError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod def;
pub mod error;
pub mod rat;
pub mod row;

mod maximize;
mod project;
mod resolve;
mod solver;

pub use def::{Def, DefArena, DefDisplay, DefId};
pub use error::{MbpError, Result};
pub use maximize::Optimum;
pub use row::{RelKind, Row, RowId, Term, VarId, NO_VAR};
pub use solver::{MbpConfig, MbpSolver, MbpStats, OBJECTIVE_ROW};
