//! Verification verdicts and the serializable run report.

use serde::Serialize;

use loris_core::Valuation;

/// One step of a concrete error trace.
#[derive(Debug, Clone, Serialize)]
pub struct WitnessStep {
    /// Rendered action, e.g. `main: l0 -> err`.
    pub action: String,
    /// Concrete variable values after the step.
    pub state: Valuation,
}

/// A concrete, solver-checked error trace.
#[derive(Debug, Clone, Serialize)]
pub struct Witness {
    pub initial: Valuation,
    pub steps: Vec<WitnessStep>,
}

impl Witness {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Terminal verdict of a run.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Outcome {
    /// The abstraction was proved closed with no reachable error location.
    Safe,
    /// A concrete error trace exists.
    Unsafe { witness: Witness },
    /// The refinement budget ran out before a verdict.
    Inconclusive { iterations: usize },
}

impl Outcome {
    pub fn is_safe(&self) -> bool {
        matches!(self, Outcome::Safe)
    }

    pub fn is_unsafe(&self) -> bool {
        matches!(self, Outcome::Unsafe { .. })
    }
}

/// Bookkeeping for one refinement round.
#[derive(Debug, Clone, Serialize)]
pub struct RefinementRound {
    /// Facts newly added to the precision this round.
    pub new_facts: usize,
    /// Precision size after the round.
    pub precision_size: usize,
}

/// Full account of a run: the verdict plus how the loop got there.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub outcome: Outcome,
    /// Check/concretize/refine iterations performed.
    pub iterations: usize,
    pub rounds: Vec<RefinementRound>,
}
