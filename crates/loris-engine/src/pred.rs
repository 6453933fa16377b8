//! Predicate abstract domain.
//!
//! An abstract state is a conjunction of literals over the precision's
//! predicates (each predicate asserted positively or negated). The transfer
//! relation case-splits over every truth combination of the predicates in
//! the successor state and keeps the satisfiable ones, so one abstract
//! state can have up to `2^|precision|` successors.

use indexmap::IndexSet;

use loris_core::indexing::index;
use loris_core::{simplify, Expr, Valuation};
use loris_smt::{with_scope, Solver};

use crate::error::{require_decided, CegarError};
use crate::system::{init_expr, trans_expr, Action, System};

/// A conjunction of predicate literals; `Bottom` is infeasible.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PredState {
    Bottom,
    Of(Vec<Expr>),
}

impl PredState {
    pub fn top() -> Self {
        PredState::Of(Vec::new())
    }

    pub fn is_bottom(&self) -> bool {
        matches!(self, PredState::Bottom)
    }

    pub fn to_expr(&self) -> Expr {
        match self {
            PredState::Bottom => Expr::Bool(false),
            PredState::Of(lits) => Expr::and(lits.clone()),
        }
    }
}

impl std::fmt::Display for PredState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PredState::Bottom => write!(f, "⊥"),
            PredState::Of(lits) => write!(f, "{}", Expr::and(lits.clone())),
        }
    }
}

/// Tracked-predicate precision, insertion ordered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PredPrec {
    preds: IndexSet<Expr>,
}

impl PredPrec {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn of(preds: impl IntoIterator<Item = Expr>) -> Self {
        let mut prec = Self::default();
        for p in preds {
            prec.insert(p);
        }
        prec
    }

    fn insert(&mut self, pred: Expr) -> bool {
        let norm = normalize(&pred);
        // Trivial predicates carry no information.
        if norm.is_true() || norm.is_false() {
            return false;
        }
        self.preds.insert(norm)
    }

    pub fn preds(&self) -> impl Iterator<Item = &Expr> {
        self.preds.iter()
    }

    pub fn len(&self) -> usize {
        self.preds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.preds.is_empty()
    }

    /// Grow the precision by `preds`. Returns the new precision and how
    /// many predicates were actually new; growth is monotonic.
    pub fn extended(&self, preds: impl IntoIterator<Item = Expr>) -> (Self, usize) {
        let mut next = self.clone();
        let mut added = 0;
        for p in preds {
            if next.insert(p) {
                added += 1;
            }
        }
        (next, added)
    }
}

/// Canonical form used for precision membership: fold constants and strip
/// double negations so `x < 5` and `¬¬(x < 5)` count as one predicate.
fn normalize(pred: &Expr) -> Expr {
    simplify(pred, &Valuation::empty())
}

/// The literal vector selected by `mask`: bit `i` set means predicate `i`
/// holds, cleared means its negation holds.
fn mask_literals(prec: &PredPrec, mask: usize) -> Vec<Expr> {
    prec.preds()
        .enumerate()
        .map(|(i, p)| {
            if mask & (1 << i) != 0 {
                p.clone()
            } else {
                p.clone().not()
            }
        })
        .collect()
}

/// Case-split a step-`at` constraint over every truth combination of the
/// precision's predicates. Each combination is decided in its own solver
/// scope; unsatisfiable combinations are excluded. An empty result means
/// `constraint` itself is unsatisfiable.
fn split(
    solver: &mut dyn Solver,
    prec: &PredPrec,
    at: usize,
    mut with_context: impl FnMut(&mut dyn Solver) -> Result<(), CegarError>,
) -> Result<Vec<PredState>, CegarError> {
    with_scope(solver, |solver| {
        with_context(&mut *solver)?;
        let mut states = Vec::new();
        for mask in 0..(1usize << prec.len()) {
            let lits = mask_literals(prec, mask);
            let sat = with_scope(&mut *solver, |solver| {
                for lit in &lits {
                    solver.assert(&index(lit, at)).map_err(CegarError::from)?;
                }
                require_decided(solver.check()?)
            })?;
            if sat {
                states.push(PredState::Of(lits));
            }
        }
        Ok(states)
    })
}

/// Strongest-postcondition transfer: the satisfiable predicate-literal
/// combinations reachable from `state` under `action`. Returns
/// `[Bottom]` when no combination is reachable (or `state` is `Bottom`).
pub fn post(
    sys: &System,
    solver: &mut dyn Solver,
    state: &PredState,
    action: Action,
    prec: &PredPrec,
) -> Result<Vec<PredState>, CegarError> {
    if state.is_bottom() {
        return Ok(vec![PredState::Bottom]);
    }
    sys.declare_step_vars(solver, 0)?;
    sys.declare_step_vars(solver, 1)?;
    let source = index(&state.to_expr(), 0);
    let trans = trans_expr(sys, action, 0);
    let states = split(solver, prec, 1, |solver| {
        solver.assert(&source).map_err(CegarError::from)?;
        solver.assert(&trans).map_err(CegarError::from)
    })?;
    if states.is_empty() {
        return Ok(vec![PredState::Bottom]);
    }
    Ok(states)
}

/// Abstract a single-step constraint (over unindexed variables) into the
/// predicate domain. Used for the initial states.
pub fn abstract_expr(
    sys: &System,
    solver: &mut dyn Solver,
    expr: &Expr,
    prec: &PredPrec,
) -> Result<Vec<PredState>, CegarError> {
    sys.declare_step_vars(solver, 0)?;
    let constraint = index(expr, 0);
    let states = split(solver, prec, 0, |solver| {
        solver.assert(&constraint).map_err(CegarError::from)
    })?;
    if states.is_empty() {
        return Ok(vec![PredState::Bottom]);
    }
    Ok(states)
}

/// The abstract initial states: the initial-value constraint (plus initial
/// location invariants) case-split over the precision.
pub fn initial_states(
    sys: &System,
    solver: &mut dyn Solver,
    prec: &PredPrec,
) -> Result<Vec<PredState>, CegarError> {
    let init = loris_core::indexing::unindex(&init_expr(sys));
    abstract_expr(sys, solver, &init, prec)
}
