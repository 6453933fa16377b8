//! Refinement-fact collectors.
//!
//! A collector turns an infeasible path formula (one group per path
//! position, over step-indexed variables) into facts explaining the
//! infeasibility. The facts are still step-indexed; the refiner strips the
//! indices before folding them into the precision.

use loris_core::Expr;
use loris_smt::{with_scope, ItpPattern, SatResult, Solver};

use crate::error::CegarError;

/// A spurious path prepared for collection.
pub struct PathFormula {
    /// The forward constraints, one group per path position: the
    /// initial-state constraint, then one transition constraint per action.
    pub groups: Vec<Expr>,
    /// `back[k]`: the condition over step-`k` variables under which the
    /// path suffix from position `k` can still complete, obtained by
    /// folding the error-side condition backward through the pre-image.
    /// One entry per cut (`back.len() == groups.len() - 1`).
    pub back: Vec<Expr>,
}

pub trait Collector {
    fn collect(
        &mut self,
        solver: &mut dyn Solver,
        path: &PathFormula,
    ) -> Result<Vec<Expr>, CegarError>;
}

fn expect_unsat(result: SatResult) -> Result<(), CegarError> {
    match result {
        SatResult::Unsat => Ok(()),
        SatResult::Sat => Err(CegarError::RefinementFailed(
            "path formula became satisfiable during collection".into(),
        )),
        SatResult::Unknown(reason) => Err(CegarError::SolverQueryFailure(reason)),
    }
}

/// One binary Craig interpolant per cut of the path: for cut `c`, the
/// prefix groups form the A partition and the backward-propagated suffix
/// condition the B partition, so the interpolant speaks only about the
/// variables of step `c - 1`.
pub struct CraigCollector;

impl Collector for CraigCollector {
    fn collect(
        &mut self,
        solver: &mut dyn Solver,
        path: &PathFormula,
    ) -> Result<Vec<Expr>, CegarError> {
        let mut facts = Vec::new();
        for cut in 1..path.groups.len() {
            let fact = with_scope(&mut *solver, |solver| {
                let a = solver.new_marker();
                let b = solver.new_marker();
                for group in &path.groups[..cut] {
                    solver.assert_marked(a, group).map_err(CegarError::from)?;
                }
                solver
                    .assert_marked(b, &path.back[cut - 1])
                    .map_err(CegarError::from)?;
                expect_unsat(solver.check()?)?;
                let itp = solver.interpolant(&ItpPattern::Binary(a, b))?;
                itp.eval(&a).cloned().ok_or_else(|| {
                    CegarError::RefinementFailed("solver returned no interpolant for a cut".into())
                })
            })?;
            facts.push(fact);
        }
        Ok(facts)
    }
}

/// An inductive interpolant sequence from a single query: one marker per
/// path position, one solver call, one interpolant per cut.
pub struct SeqCollector;

impl Collector for SeqCollector {
    fn collect(
        &mut self,
        solver: &mut dyn Solver,
        path: &PathFormula,
    ) -> Result<Vec<Expr>, CegarError> {
        with_scope(solver, |solver| {
            let markers: Vec<_> = path.groups.iter().map(|_| solver.new_marker()).collect();
            for (marker, group) in markers.iter().zip(&path.groups) {
                solver.assert_marked(*marker, group).map_err(CegarError::from)?;
            }
            expect_unsat(solver.check()?)?;
            let itp = solver.interpolant(&ItpPattern::Sequence(markers.clone()))?;
            // The interpolant after the last position is `false` and
            // carries no refinement information.
            let cuts = markers.len().saturating_sub(1);
            markers[..cuts]
                .iter()
                .map(|m| {
                    itp.eval(m).cloned().ok_or_else(|| {
                        CegarError::RefinementFailed(
                            "solver returned an incomplete interpolant sequence".into(),
                        )
                    })
                })
                .collect()
        })
    }
}

/// A small unsatisfiable subset of the path groups. The fragments span
/// several steps, so they only refine variable-based precisions.
pub struct UnsatCoreCollector;

impl Collector for UnsatCoreCollector {
    fn collect(
        &mut self,
        solver: &mut dyn Solver,
        path: &PathFormula,
    ) -> Result<Vec<Expr>, CegarError> {
        with_scope(solver, |solver| {
            for group in &path.groups {
                let marker = solver.new_marker();
                solver.assert_marked(marker, group).map_err(CegarError::from)?;
            }
            expect_unsat(solver.check()?)?;
            solver.unsat_core().map_err(CegarError::from)
        })
    }
}
