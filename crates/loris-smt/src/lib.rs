#![doc = include_str!("../README.md")]

//! The engine only ever talks to a solver through the [`solver::Solver`]
//! trait; which backend sits behind it is a configuration concern.

pub mod backends;
pub mod enumerative;
pub mod scope;
pub mod solver;

pub use enumerative::EnumSolver;
pub use scope::{with_scope, ScopedSolver};
pub use solver::{Interpolant, ItpMarker, ItpPattern, Model, SatResult, Solver, SolverError};
