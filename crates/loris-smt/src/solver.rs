use std::collections::HashMap;

use thiserror::Error;

use loris_core::{Expr, Lit, Type};

/// Result of a satisfiability check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SatResult {
    Sat,
    Unsat,
    Unknown(String),
}

impl SatResult {
    pub fn is_sat(&self) -> bool {
        matches!(self, SatResult::Sat)
    }

    pub fn is_unsat(&self) -> bool {
        matches!(self, SatResult::Unsat)
    }
}

/// A model (variable assignments) extracted after a `Sat` result.
#[derive(Debug, Clone, Default)]
pub struct Model {
    pub values: HashMap<String, Lit>,
}

impl Model {
    pub fn get(&self, name: &str) -> Option<Lit> {
        self.values.get(name).copied()
    }

    pub fn get_int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(|l| l.as_int())
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(|l| l.as_bool())
    }
}

/// Opaque handle for one partition of an unsatisfiable formula.
///
/// Markers are created by the solver, attached to assertions via
/// [`Solver::assert_marked`], and consumed by [`Interpolant::eval`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ItpMarker(pub(crate) usize);

/// Shape of an interpolation request.
#[derive(Debug, Clone)]
pub enum ItpPattern {
    /// A binary Craig interpolant between two partitions.
    Binary(ItpMarker, ItpMarker),
    /// A sequence interpolant: one boolean formula per partition boundary,
    /// inductive along the sequence.
    Sequence(Vec<ItpMarker>),
}

/// The interpolants computed for one pattern. Not persisted: consumed
/// immediately after the `Unsat` answer that produced it.
#[derive(Debug, Clone)]
pub struct Interpolant {
    exprs: HashMap<usize, Expr>,
}

impl Interpolant {
    pub(crate) fn new(exprs: HashMap<usize, Expr>) -> Self {
        Self { exprs }
    }

    /// The boolean-typed expression separating the marker's partition from
    /// the rest of the unsatisfiable formula.
    pub fn eval(&self, marker: &ItpMarker) -> Option<&Expr> {
        self.exprs.get(&marker.0)
    }
}

#[derive(Debug, Error)]
pub enum SolverError {
    #[error("solver does not support {0}")]
    Unsupported(&'static str),
    #[error("variable `{0}` is not declared")]
    UndeclaredVariable(String),
    #[error("variable `{0}` redeclared with a different sort")]
    SortMismatch(String),
    #[error("{0} requested without a preceding matching check result")]
    NoCheckResult(&'static str),
    #[error("pop on an empty scope stack")]
    UnbalancedPop,
    #[error("solver backend error: {0}")]
    Backend(String),
    #[error("solver I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Abstract incremental solver interface.
///
/// One solver session is a single shared mutable resource: it is never
/// accessed concurrently, and every domain or refinement operation must
/// leave the assertion-stack depth exactly where it found it (use
/// [`crate::with_scope`]).
pub trait Solver {
    /// Declare a variable. Redeclaring with the same sort is a no-op.
    fn declare(&mut self, name: &str, ty: Type) -> Result<(), SolverError>;

    /// Declare a variable with an advisory integer range. Backends that
    /// enumerate finite domains honor the range; others ignore it.
    fn declare_ranged(
        &mut self,
        name: &str,
        ty: Type,
        range: Option<(i64, i64)>,
    ) -> Result<(), SolverError> {
        let _ = range;
        self.declare(name, ty)
    }

    /// Assert a boolean-typed constraint in the current scope.
    fn assert(&mut self, expr: &Expr) -> Result<(), SolverError>;

    /// Assert a constraint associated with an interpolation marker.
    fn assert_marked(&mut self, marker: ItpMarker, expr: &Expr) -> Result<(), SolverError>;

    /// Create a fresh interpolation marker.
    fn new_marker(&mut self) -> ItpMarker;

    /// Open a new assertion scope.
    fn push(&mut self) -> Result<(), SolverError>;

    /// Discard the innermost assertion scope.
    fn pop(&mut self) -> Result<(), SolverError>;

    /// Current assertion-stack depth (number of open scopes).
    fn depth(&self) -> usize;

    /// Check satisfiability of the asserted constraints.
    fn check(&mut self) -> Result<SatResult, SolverError>;

    /// Model of the last `Sat` answer.
    fn model(&mut self) -> Result<Model, SolverError>;

    /// Whether [`Solver::interpolant`] is usable on this backend.
    fn supports_interpolation(&self) -> bool {
        false
    }

    /// Whether [`Solver::unsat_core`] is usable on this backend.
    fn supports_unsat_core(&self) -> bool {
        false
    }

    /// Interpolants for the last `Unsat` answer.
    fn interpolant(&mut self, pattern: &ItpPattern) -> Result<Interpolant, SolverError> {
        let _ = pattern;
        Err(SolverError::Unsupported("interpolation"))
    }

    /// A small unsatisfiable subset of the marked assertions, for the last
    /// `Unsat` answer.
    fn unsat_core(&mut self) -> Result<Vec<Expr>, SolverError> {
        Err(SolverError::Unsupported("unsat cores"))
    }
}
