//! Domain-agnostic state and precision wrappers.
//!
//! The loop, the reachability graph and the refiner are written against
//! these wrappers so a run is configured with a domain instead of being
//! compiled for one. State and precision always travel as a matched pair;
//! a mismatched pair is a wiring bug and surfaces as
//! [`CegarError::AbstractionMismatch`].

use loris_core::Expr;
use loris_smt::Solver;

use crate::error::CegarError;
use crate::expl::{self, ExplPrec, ExplState};
use crate::pred::{self, PredPrec, PredState};
use crate::system::{Action, System};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AbstractState {
    Expl(ExplState),
    Pred(PredState),
}

impl AbstractState {
    pub fn is_bottom(&self) -> bool {
        match self {
            AbstractState::Expl(s) => s.is_bottom(),
            AbstractState::Pred(s) => s.is_bottom(),
        }
    }

    /// The constraint this state denotes over unindexed variables.
    pub fn to_expr(&self) -> Expr {
        match self {
            AbstractState::Expl(s) => s.to_expr(),
            AbstractState::Pred(s) => s.to_expr(),
        }
    }
}

impl std::fmt::Display for AbstractState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AbstractState::Expl(s) => write!(f, "{s}"),
            AbstractState::Pred(s) => write!(f, "{s}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Precision {
    Expl(ExplPrec),
    Pred(PredPrec),
}

impl Precision {
    pub fn len(&self) -> usize {
        match self {
            Precision::Expl(p) => p.len(),
            Precision::Pred(p) => p.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fold refinement facts into the precision. Explicit precisions absorb
    /// the facts' variables, predicate precisions the facts themselves.
    /// Returns the grown precision and the number of genuinely new entries;
    /// existing entries are never removed.
    pub fn extended(&self, facts: &[Expr]) -> (Precision, usize) {
        match self {
            Precision::Expl(p) => {
                let vars: Vec<String> = facts
                    .iter()
                    .flat_map(|f| f.free_vars())
                    .collect();
                let (next, added) = p.extended(vars);
                (Precision::Expl(next), added)
            }
            Precision::Pred(p) => {
                let (next, added) = p.extended(facts.iter().cloned());
                (Precision::Pred(next), added)
            }
        }
    }
}

impl std::fmt::Display for Precision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Precision::Expl(p) => {
                write!(f, "vars {{")?;
                for (i, v) in p.vars().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "}}")
            }
            Precision::Pred(p) => {
                write!(f, "preds {{")?;
                for (i, e) in p.preds().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{e}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// Abstract successors of `state` under `action`. The explicit domain has
/// exactly one successor; the predicate domain can branch.
pub fn post(
    sys: &System,
    solver: &mut dyn Solver,
    state: &AbstractState,
    action: Action,
    prec: &Precision,
) -> Result<Vec<AbstractState>, CegarError> {
    match (state, prec) {
        (AbstractState::Expl(s), Precision::Expl(p)) => {
            Ok(vec![AbstractState::Expl(expl::post(sys, s, action, p))])
        }
        (AbstractState::Pred(s), Precision::Pred(p)) => Ok(pred::post(sys, solver, s, action, p)?
            .into_iter()
            .map(AbstractState::Pred)
            .collect()),
        (state, prec) => Err(CegarError::AbstractionMismatch(format!(
            "state {state} paired with precision {prec}"
        ))),
    }
}

/// Abstract initial states for the precision's domain.
pub fn initial_states(
    sys: &System,
    solver: &mut dyn Solver,
    prec: &Precision,
) -> Result<Vec<AbstractState>, CegarError> {
    match prec {
        Precision::Expl(p) => Ok(vec![AbstractState::Expl(expl::initial_state(sys, p))]),
        Precision::Pred(p) => Ok(pred::initial_states(sys, solver, p)?
            .into_iter()
            .map(AbstractState::Pred)
            .collect()),
    }
}
