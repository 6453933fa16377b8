#![doc = include_str!("../README.md")]

//! Side-effect-free term library.
//!
//! Everything in this crate is a plain value: expressions and statements are
//! closed enums, valuations are immutable-by-value maps, and every transform
//! (`simplify`, `wp`, `to_cnf`, indexing) returns a new term instead of
//! mutating its input.

pub mod cnf;
pub mod expr;
pub mod indexing;
pub mod simplify;
pub mod stmt;
pub mod types;
pub mod valuation;
pub mod wp;

pub use expr::Expr;
pub use simplify::simplify;
pub use stmt::Stmt;
pub use types::{Lit, Type};
pub use valuation::Valuation;
