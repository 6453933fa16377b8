#![doc = include_str!("../README.md")]

//! Loris verification engine.
//!
//! The engine decides whether a transition system can reach an error
//! location by counterexample-guided abstraction refinement: it explores a
//! finite abstraction of the concrete system, concretizes abstract error
//! paths against an SMT solver, and refines the abstraction from the
//! infeasibility proof when a path turns out spurious.

pub mod ars;
pub mod cegar;
pub mod domain;
pub mod error;
pub mod expl;
pub mod pred;
pub mod result;
pub mod system;
pub mod wp;

pub use cegar::config::{CegarConfig, CollectionMethod, ConfigError, DomainKind};
pub use cegar::run::CegarLoop;
pub use error::CegarError;
pub use result::{Outcome, Report, Witness};
