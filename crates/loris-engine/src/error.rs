use thiserror::Error;

use loris_smt::{SatResult, SolverError};

use crate::cegar::config::ConfigError;

/// Failures that end a CEGAR run in the `Error` terminal state.
#[derive(Debug, Error)]
pub enum CegarError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("malformed system: {0}")]
    MalformedSystem(String),
    #[error("solver query failed: {0}")]
    SolverQueryFailure(String),
    #[error(transparent)]
    Solver(#[from] SolverError),
    /// A refinement round produced no fact outside the current precision.
    /// Either the domain cannot distinguish the spurious path or the model
    /// itself is defective; retrying would loop forever.
    #[error("refinement stagnation: no new fact for a spurious counterexample")]
    RefinementStagnation,
    #[error("refinement failed: {0}")]
    RefinementFailed(String),
    /// A domain was handed a state or precision shape it does not recognize.
    #[error("abstraction mismatch: {0}")]
    AbstractionMismatch(String),
}

/// Map an `Unknown` verdict to the query-failure error; `Sat`/`Unsat`
/// become a boolean.
pub fn require_decided(result: SatResult) -> Result<bool, CegarError> {
    match result {
        SatResult::Sat => Ok(true),
        SatResult::Unsat => Ok(false),
        SatResult::Unknown(reason) => Err(CegarError::SolverQueryFailure(reason)),
    }
}
