//! The four phase interfaces of the loop and their standard
//! implementations.
//!
//! Each phase is a trait object so a run can mix standard and custom
//! phases; the standard implementations share the system through an `Arc`
//! and keep every solver interaction inside a scope.

use std::sync::Arc;

use loris_core::indexing::{index, indexed_name, unindex};
use loris_core::{Expr, Valuation};
use loris_smt::{with_scope, Solver};

use crate::ars::{AbstractPath, Ars};
use crate::cegar::collect::{Collector, PathFormula};
use crate::domain::{self, Precision};
use crate::error::{require_decided, CegarError};
use crate::expl::ExplPrec;
use crate::pred::PredPrec;
use crate::result::{Witness, WitnessStep};
use crate::system::{init_expr, trans_expr, Action, System};
use crate::wp;

/// Builds the initial precision and seeds a fresh reachability structure.
pub trait Initializer {
    fn initial_precision(&self) -> Result<Precision, CegarError>;

    fn initial_ars(&self, solver: &mut dyn Solver, prec: &Precision)
        -> Result<Ars, CegarError>;
}

pub enum CheckOutcome {
    /// Exploration closed without reaching an error location.
    Safe,
    /// An abstract path to an error location.
    Counterexample(AbstractPath),
}

/// Grows the reachability structure until it closes or reaches an error
/// location.
pub trait Checker {
    fn check(
        &self,
        solver: &mut dyn Solver,
        ars: &mut Ars,
        prec: &Precision,
    ) -> Result<CheckOutcome, CegarError>;
}

pub enum ConcretizeOutcome {
    /// The path is concretely executable; here is the trace.
    Feasible(Witness),
    /// The path is spurious; here is the infeasible path formula, one
    /// group per path position.
    Spurious(Vec<Expr>),
}

/// Decides whether an abstract counterexample corresponds to a concrete
/// execution.
pub trait Concretizer {
    fn concretize(
        &self,
        solver: &mut dyn Solver,
        ars: &Ars,
        path: &AbstractPath,
    ) -> Result<ConcretizeOutcome, CegarError>;
}

pub struct RefinementOutcome {
    pub precision: Precision,
    pub new_facts: usize,
}

/// Turns a spurious path formula into a strictly larger precision.
pub trait Refiner {
    fn refine(
        &mut self,
        solver: &mut dyn Solver,
        groups: &[Expr],
        actions: &[Action],
        prec: &Precision,
    ) -> Result<RefinementOutcome, CegarError>;
}

/// Standard initializer: precision from the configured seeds, roots from
/// the domain's abstract initial states.
pub struct BasicInitializer {
    sys: Arc<System>,
    seed: Precision,
}

impl BasicInitializer {
    pub fn explicit(sys: Arc<System>, tracked: impl IntoIterator<Item = String>) -> Self {
        Self {
            sys,
            seed: Precision::Expl(ExplPrec::of(tracked)),
        }
    }

    pub fn predicate(sys: Arc<System>, preds: impl IntoIterator<Item = Expr>) -> Self {
        Self {
            sys,
            seed: Precision::Pred(PredPrec::of(preds)),
        }
    }
}

impl Initializer for BasicInitializer {
    fn initial_precision(&self) -> Result<Precision, CegarError> {
        Ok(self.seed.clone())
    }

    fn initial_ars(
        &self,
        solver: &mut dyn Solver,
        prec: &Precision,
    ) -> Result<Ars, CegarError> {
        let mut ars = Ars::new();
        let locs = self.sys.init_locs();
        for state in domain::initial_states(&self.sys, solver, prec)? {
            if !state.is_bottom() {
                ars.add_root(locs.clone(), state);
            }
        }
        Ok(ars)
    }
}

/// Standard checker: breadth-first expansion with exact-pair merging.
pub struct ArsChecker {
    sys: Arc<System>,
}

impl ArsChecker {
    pub fn new(sys: Arc<System>) -> Self {
        Self { sys }
    }
}

impl Checker for ArsChecker {
    fn check(
        &self,
        solver: &mut dyn Solver,
        ars: &mut Ars,
        prec: &Precision,
    ) -> Result<CheckOutcome, CegarError> {
        while let Some(id) = ars.pop_unexpanded() {
            let node = ars.node(id).clone();
            if self.sys.is_error(&node.locs) {
                return Ok(CheckOutcome::Counterexample(ars.path_to(id)));
            }
            for action in self.sys.enabled_actions(&node.locs) {
                let targets = self.sys.action_targets(&node.locs, action);
                for succ in domain::post(&self.sys, solver, &node.state, action, prec)? {
                    if succ.is_bottom() {
                        continue;
                    }
                    ars.add_succ(id, action, targets.clone(), succ);
                }
            }
        }
        Ok(CheckOutcome::Safe)
    }
}

/// Standard concretizer: one path formula, one satisfiability query, and a
/// trace read from the model when the query is satisfiable.
pub struct PathConcretizer {
    sys: Arc<System>,
}

impl PathConcretizer {
    pub fn new(sys: Arc<System>) -> Self {
        Self { sys }
    }

    /// The path formula of an abstract counterexample, grouped by
    /// position: the initial-state constraint, then one transition
    /// constraint per action.
    fn path_formula(&self, path: &AbstractPath) -> Vec<Expr> {
        let mut groups = vec![init_expr(&self.sys)];
        for (k, action) in path.actions.iter().enumerate() {
            groups.push(trans_expr(&self.sys, *action, k));
        }
        groups
    }

    fn step_valuation(&self, model: &loris_smt::Model, k: usize) -> Valuation {
        let mut val = Valuation::empty();
        for var in &self.sys.vars {
            if let Some(lit) = model.get(&indexed_name(&var.name, k)) {
                val = val.with(var.name.clone(), lit);
            }
        }
        val
    }
}

impl Concretizer for PathConcretizer {
    fn concretize(
        &self,
        solver: &mut dyn Solver,
        _ars: &Ars,
        path: &AbstractPath,
    ) -> Result<ConcretizeOutcome, CegarError> {
        let groups = self.path_formula(path);
        for k in 0..=path.actions.len() {
            self.sys.declare_step_vars(solver, k)?;
        }
        let model = with_scope(
            solver,
            |solver| -> Result<Option<loris_smt::Model>, CegarError> {
                for group in &groups {
                    solver.assert(group).map_err(CegarError::from)?;
                }
                if require_decided(solver.check()?)? {
                    Ok(Some(solver.model()?))
                } else {
                    Ok(None)
                }
            },
        )?;
        match model {
            Some(model) => {
                let initial = self.step_valuation(&model, 0);
                let steps = path
                    .actions
                    .iter()
                    .enumerate()
                    .map(|(k, action)| WitnessStep {
                        action: self.sys.describe_action(*action),
                        state: self.step_valuation(&model, k + 1),
                    })
                    .collect();
                Ok(ConcretizeOutcome::Feasible(Witness { initial, steps }))
            }
            None => Ok(ConcretizeOutcome::Spurious(groups)),
        }
    }
}

/// Standard refiner: propagate the error-side condition backward through
/// the pre-image, collect step-indexed facts against it, strip their
/// indices, and grow the precision. A round that adds nothing is reported
/// as stagnation rather than retried.
pub struct CollectingRefiner {
    sys: Arc<System>,
    collector: Box<dyn Collector>,
}

impl CollectingRefiner {
    pub fn new(sys: Arc<System>, collector: Box<dyn Collector>) -> Self {
        Self { sys, collector }
    }

    /// `back[k]`: the enabling condition of the path suffix from position
    /// `k`, over the step-`k` variable instances. Folded from the end of
    /// the path through the action pre-image.
    fn backward_conditions(&self, actions: &[Action]) -> Vec<Expr> {
        let mut cond = Expr::Bool(true);
        let mut back = Vec::with_capacity(actions.len());
        for (k, action) in actions.iter().enumerate().rev() {
            cond = wp::pre(&self.sys, &cond, *action);
            back.push(index(&cond, k));
        }
        back.reverse();
        back
    }
}

impl Refiner for CollectingRefiner {
    fn refine(
        &mut self,
        solver: &mut dyn Solver,
        groups: &[Expr],
        actions: &[Action],
        prec: &Precision,
    ) -> Result<RefinementOutcome, CegarError> {
        let formula = PathFormula {
            groups: groups.to_vec(),
            back: self.backward_conditions(actions),
        };
        let raw = self.collector.collect(solver, &formula)?;
        let facts: Vec<Expr> = raw.iter().map(unindex).collect();
        let (precision, new_facts) = prec.extended(&facts);
        if new_facts == 0 {
            return Err(CegarError::RefinementStagnation);
        }
        tracing::debug!(new_facts, precision = %precision, "precision refined");
        Ok(RefinementOutcome {
            precision,
            new_facts,
        })
    }
}
