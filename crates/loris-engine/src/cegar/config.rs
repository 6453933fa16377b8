//! Run configuration, validated before any solver work starts.

use thiserror::Error;

use loris_core::Expr;
use loris_smt::Solver;

use crate::system::System;

/// Which abstract domain the run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainKind {
    Explicit,
    Predicate,
}

/// How refinement facts are collected from a spurious path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionMethod {
    /// One binary Craig interpolant per path cut.
    CraigItp,
    /// One inductive interpolant sequence from a single query.
    SeqItp,
    /// Variables of a small unsatisfiable core; explicit domain only.
    UnsatCore,
}

impl std::fmt::Display for CollectionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollectionMethod::CraigItp => write!(f, "craig interpolation"),
            CollectionMethod::SeqItp => write!(f, "sequence interpolation"),
            CollectionMethod::UnsatCore => write!(f, "unsat cores"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} requested but the solver does not support interpolation")]
    InterpolationUnsupported(CollectionMethod),
    #[error("unsat cores requested but the solver does not support them")]
    UnsatCoreUnsupported,
    /// Core fragments span several path steps, so they cannot be read back
    /// as single-state predicates.
    #[error("unsat-core collection cannot refine a predicate precision")]
    UnsatCoreWithPredicates,
    #[error("refinement budget must be at least 1")]
    ZeroRefinementBudget,
    #[error("tracked variable `{0}` is not declared by the system")]
    UnknownTrackedVar(String),
}

/// Configuration of one CEGAR run.
#[derive(Debug, Clone)]
pub struct CegarConfig {
    pub domain: DomainKind,
    pub collection: CollectionMethod,
    /// Rewrite guards and invariants to conjunctive normal form before the
    /// run.
    pub cnf_guards: bool,
    /// Maximum number of refinement rounds before giving up.
    pub max_refinements: usize,
    /// Variables seeding the explicit precision.
    pub tracked_vars: Vec<String>,
    /// Predicates seeding the predicate precision.
    pub initial_preds: Vec<Expr>,
}

impl Default for CegarConfig {
    fn default() -> Self {
        Self {
            domain: DomainKind::Explicit,
            collection: CollectionMethod::CraigItp,
            cnf_guards: false,
            max_refinements: 40,
            tracked_vars: Vec::new(),
            initial_preds: Vec::new(),
        }
    }
}

impl CegarConfig {
    /// Reject combinations that could only fail mid-run.
    pub fn validate(&self, sys: &System, solver: &dyn Solver) -> Result<(), ConfigError> {
        if self.max_refinements == 0 {
            return Err(ConfigError::ZeroRefinementBudget);
        }
        match self.collection {
            CollectionMethod::CraigItp | CollectionMethod::SeqItp => {
                if !solver.supports_interpolation() {
                    return Err(ConfigError::InterpolationUnsupported(self.collection));
                }
            }
            CollectionMethod::UnsatCore => {
                if !solver.supports_unsat_core() {
                    return Err(ConfigError::UnsatCoreUnsupported);
                }
                if self.domain == DomainKind::Predicate {
                    return Err(ConfigError::UnsatCoreWithPredicates);
                }
            }
        }
        for var in &self.tracked_vars {
            if sys.var(var).is_none() {
                return Err(ConfigError::UnknownTrackedVar(var.clone()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loris_smt::EnumSolver;

    fn tiny_system() -> System {
        let mut sys = System::new();
        sys.add_var("x", loris_core::Type::Int);
        let p = sys.add_process("main");
        sys.add_loc(p, "l0");
        sys
    }

    #[test]
    fn default_config_validates_against_a_capable_solver() {
        let sys = tiny_system();
        let solver = EnumSolver::new();
        assert_eq!(CegarConfig::default().validate(&sys, &solver), Ok(()));
    }

    #[test]
    fn unsat_core_with_predicates_is_rejected() {
        let sys = tiny_system();
        let solver = EnumSolver::new();
        let config = CegarConfig {
            domain: DomainKind::Predicate,
            collection: CollectionMethod::UnsatCore,
            ..CegarConfig::default()
        };
        assert_eq!(
            config.validate(&sys, &solver),
            Err(ConfigError::UnsatCoreWithPredicates)
        );
    }

    #[test]
    fn unknown_tracked_variable_is_rejected() {
        let sys = tiny_system();
        let solver = EnumSolver::new();
        let config = CegarConfig {
            tracked_vars: vec!["ghost".into()],
            ..CegarConfig::default()
        };
        assert_eq!(
            config.validate(&sys, &solver),
            Err(ConfigError::UnknownTrackedVar("ghost".into()))
        );
    }

    #[test]
    fn zero_budget_is_rejected() {
        let sys = tiny_system();
        let solver = EnumSolver::new();
        let config = CegarConfig {
            max_refinements: 0,
            ..CegarConfig::default()
        };
        assert_eq!(
            config.validate(&sys, &solver),
            Err(ConfigError::ZeroRefinementBudget)
        );
    }
}
