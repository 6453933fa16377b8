//! The loop driver.

use std::sync::Arc;

use loris_smt::Solver;

use crate::cegar::collect::{Collector, CraigCollector, SeqCollector, UnsatCoreCollector};
use crate::cegar::config::{CegarConfig, CollectionMethod, ConfigError, DomainKind};
use crate::cegar::observe::LoopObserver;
use crate::cegar::phases::{
    ArsChecker, BasicInitializer, CheckOutcome, Checker, CollectingRefiner, ConcretizeOutcome,
    Concretizer, Initializer, PathConcretizer, Refiner,
};
use crate::error::CegarError;
use crate::result::{Outcome, RefinementRound, Report};
use crate::system::System;

/// A configured CEGAR run over one system and one solver session.
///
/// The loop owns its solver; every phase borrows it in turn, so the
/// session's assertion stack is the only shared solver state and each phase
/// returns it at the depth it was received.
pub struct CegarLoop {
    sys: Arc<System>,
    solver: Box<dyn Solver>,
    initializer: Box<dyn Initializer>,
    checker: Box<dyn Checker>,
    concretizer: Box<dyn Concretizer>,
    refiner: Box<dyn Refiner>,
    observer: Option<Box<dyn LoopObserver>>,
    max_refinements: usize,
}

impl CegarLoop {
    /// Wire the standard phases for `config`. Fails fast on configurations
    /// that could only fail mid-run.
    pub fn new(
        sys: System,
        solver: Box<dyn Solver>,
        config: CegarConfig,
    ) -> Result<Self, ConfigError> {
        config.validate(&sys, solver.as_ref())?;
        let sys = if config.cnf_guards {
            Arc::new(sys.with_cnf_guards())
        } else {
            Arc::new(sys)
        };
        let initializer: Box<dyn Initializer> = match config.domain {
            DomainKind::Explicit => Box::new(BasicInitializer::explicit(
                sys.clone(),
                config.tracked_vars.clone(),
            )),
            DomainKind::Predicate => Box::new(BasicInitializer::predicate(
                sys.clone(),
                config.initial_preds.clone(),
            )),
        };
        let collector: Box<dyn Collector> = match config.collection {
            CollectionMethod::CraigItp => Box::new(CraigCollector),
            CollectionMethod::SeqItp => Box::new(SeqCollector),
            CollectionMethod::UnsatCore => Box::new(UnsatCoreCollector),
        };
        Ok(Self {
            sys: sys.clone(),
            solver,
            initializer,
            checker: Box::new(ArsChecker::new(sys.clone())),
            concretizer: Box::new(PathConcretizer::new(sys.clone())),
            refiner: Box::new(CollectingRefiner::new(sys, collector)),
            observer: None,
            max_refinements: config.max_refinements,
        })
    }

    pub fn with_observer(mut self, observer: Box<dyn LoopObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Run to a verdict. `Err` is the loop's own terminal error state;
    /// running out of refinement budget is the `Inconclusive` verdict, not
    /// an error.
    pub fn run(&mut self) -> Result<Report, CegarError> {
        self.sys.validate()?;
        let mut prec = self.initializer.initial_precision()?;
        let mut ars = self
            .initializer
            .initial_ars(self.solver.as_mut(), &prec)?;
        let mut iterations = 0;
        let mut rounds: Vec<RefinementRound> = Vec::new();

        loop {
            iterations += 1;
            tracing::info!(iteration = iterations, precision = %prec, "checking the abstraction");
            let checked = self.checker.check(self.solver.as_mut(), &mut ars, &prec)?;
            if let Some(obs) = &mut self.observer {
                obs.on_ars(&self.sys, &ars);
            }
            let path = match checked {
                CheckOutcome::Safe => {
                    tracing::info!(iterations, "abstraction closed; system is safe");
                    return Ok(Report {
                        outcome: Outcome::Safe,
                        iterations,
                        rounds,
                    });
                }
                CheckOutcome::Counterexample(path) => path,
            };
            if let Some(obs) = &mut self.observer {
                obs.on_counterexample(&self.sys, &ars, &path);
            }

            tracing::info!(len = path.actions.len(), "concretizing an abstract counterexample");
            match self
                .concretizer
                .concretize(self.solver.as_mut(), &ars, &path)?
            {
                ConcretizeOutcome::Feasible(witness) => {
                    tracing::info!(steps = witness.len(), "concrete error trace found");
                    return Ok(Report {
                        outcome: Outcome::Unsafe { witness },
                        iterations,
                        rounds,
                    });
                }
                ConcretizeOutcome::Spurious(groups) => {
                    if rounds.len() >= self.max_refinements {
                        tracing::warn!(
                            budget = self.max_refinements,
                            "refinement budget exhausted before a verdict"
                        );
                        return Ok(Report {
                            outcome: Outcome::Inconclusive { iterations },
                            iterations,
                            rounds,
                        });
                    }
                    tracing::info!("path is spurious; refining the precision");
                    let refined =
                        self.refiner
                            .refine(self.solver.as_mut(), &groups, &path.actions, &prec)?;
                    rounds.push(RefinementRound {
                        new_facts: refined.new_facts,
                        precision_size: refined.precision.len(),
                    });
                    prec = refined.precision;
                    if let Some(obs) = &mut self.observer {
                        obs.on_precision(&prec);
                    }
                    // The old structure was built for the old precision;
                    // rebuild from scratch.
                    ars = self
                        .initializer
                        .initial_ars(self.solver.as_mut(), &prec)?;
                }
            }
        }
    }
}
