//! The transition-system view the engine verifies.
//!
//! A system is a set of processes over shared typed variables. Process
//! edges carry guard expressions, update statements and optionally a
//! synchronization label; a pair of matching emit/recv edges fires jointly
//! as a binary (rendezvous) action. The engine consumes this structure
//! read-only; domains never mutate it.

use loris_core::indexing::{index, indexed_name};
use loris_core::{Expr, Lit, Stmt, Type, Valuation};
use loris_smt::{Solver, SolverError};

use crate::error::CegarError;

pub type LocId = usize;
pub type EdgeId = usize;
pub type ProcId = usize;

/// A declared system variable.
#[derive(Debug, Clone)]
pub struct VarDecl {
    pub name: String,
    pub ty: Type,
    /// Advisory range for finite-domain backends.
    pub range: Option<(i64, i64)>,
}

/// A control location of one process.
#[derive(Debug, Clone)]
pub struct Loc {
    pub name: String,
    pub invariants: Vec<Expr>,
    pub error: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncKind {
    Emit,
    Recv,
}

/// Rendezvous label of an edge: channel, polarity and argument expressions.
/// A binary action requires the paired edges' arguments to be equal.
#[derive(Debug, Clone)]
pub struct Sync {
    pub channel: String,
    pub kind: SyncKind,
    pub args: Vec<Expr>,
}

#[derive(Debug, Clone)]
pub struct Edge {
    pub source: LocId,
    pub target: LocId,
    pub guards: Vec<Expr>,
    pub updates: Vec<Stmt>,
    pub sync: Option<Sync>,
}

impl Edge {
    pub fn new(source: LocId, target: LocId) -> Self {
        Self {
            source,
            target,
            guards: Vec::new(),
            updates: Vec::new(),
            sync: None,
        }
    }

    pub fn guard(mut self, guard: Expr) -> Self {
        self.guards.push(guard);
        self
    }

    pub fn update(mut self, stmt: Stmt) -> Self {
        self.updates.push(stmt);
        self
    }

    pub fn sync(mut self, sync: Sync) -> Self {
        self.sync = Some(sync);
        self
    }
}

#[derive(Debug, Clone)]
pub struct Process {
    pub name: String,
    pub locs: Vec<Loc>,
    pub edges: Vec<Edge>,
    pub init: LocId,
}

/// Reference to one edge of one process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EdgeRef {
    pub proc: ProcId,
    pub edge: EdgeId,
}

/// An edge of the concrete transition system: a single edge, or a
/// synchronized emit/recv pair firing jointly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Basic(EdgeRef),
    Binary { emit: EdgeRef, recv: EdgeRef },
}

#[derive(Debug, Clone, Default)]
pub struct System {
    pub vars: Vec<VarDecl>,
    pub procs: Vec<Process>,
    /// Initial assignments; variables absent here start unconstrained.
    pub init_vals: Valuation,
}

impl System {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_var(&mut self, name: impl Into<String>, ty: Type) {
        self.vars.push(VarDecl {
            name: name.into(),
            ty,
            range: None,
        });
    }

    pub fn add_ranged_var(&mut self, name: impl Into<String>, lo: i64, hi: i64) {
        self.vars.push(VarDecl {
            name: name.into(),
            ty: Type::Int,
            range: Some((lo, hi)),
        });
    }

    pub fn set_init(&mut self, var: &str, lit: Lit) {
        self.init_vals = self.init_vals.with(var, lit);
    }

    pub fn add_process(&mut self, name: impl Into<String>) -> ProcId {
        self.procs.push(Process {
            name: name.into(),
            locs: Vec::new(),
            edges: Vec::new(),
            init: 0,
        });
        self.procs.len() - 1
    }

    pub fn add_loc(&mut self, proc: ProcId, name: impl Into<String>) -> LocId {
        let locs = &mut self.procs[proc].locs;
        locs.push(Loc {
            name: name.into(),
            invariants: Vec::new(),
            error: false,
        });
        locs.len() - 1
    }

    pub fn mark_error(&mut self, proc: ProcId, loc: LocId) {
        self.procs[proc].locs[loc].error = true;
    }

    pub fn add_invariant(&mut self, proc: ProcId, loc: LocId, invariant: Expr) {
        self.procs[proc].locs[loc].invariants.push(invariant);
    }

    pub fn set_init_loc(&mut self, proc: ProcId, loc: LocId) {
        self.procs[proc].init = loc;
    }

    pub fn add_edge(&mut self, proc: ProcId, edge: Edge) -> EdgeRef {
        self.procs[proc].edges.push(edge);
        EdgeRef {
            proc,
            edge: self.procs[proc].edges.len() - 1,
        }
    }

    pub fn edge(&self, r: EdgeRef) -> &Edge {
        &self.procs[r.proc].edges[r.edge]
    }

    pub fn loc(&self, proc: ProcId, loc: LocId) -> &Loc {
        &self.procs[proc].locs[loc]
    }

    pub fn var(&self, name: &str) -> Option<&VarDecl> {
        self.vars.iter().find(|v| v.name == name)
    }

    /// Initial location vector, one entry per process.
    pub fn init_locs(&self) -> Vec<LocId> {
        self.procs.iter().map(|p| p.init).collect()
    }

    /// True when any component of the location vector is an error location.
    pub fn is_error(&self, locs: &[LocId]) -> bool {
        locs.iter()
            .enumerate()
            .any(|(p, l)| self.procs[p].locs[*l].error)
    }

    /// All actions whose source locations match `locs`: basic actions for
    /// unlabeled edges, binary actions for every matching emit/recv pairing
    /// across distinct processes.
    pub fn enabled_actions(&self, locs: &[LocId]) -> Vec<Action> {
        let mut actions = Vec::new();
        for (p, proc) in self.procs.iter().enumerate() {
            for (e, edge) in proc.edges.iter().enumerate() {
                if edge.source != locs[p] {
                    continue;
                }
                let emit_ref = EdgeRef { proc: p, edge: e };
                match &edge.sync {
                    None => actions.push(Action::Basic(emit_ref)),
                    Some(sync) if sync.kind == SyncKind::Emit => {
                        for (q, other) in self.procs.iter().enumerate() {
                            if q == p {
                                continue;
                            }
                            for (f, recv) in other.edges.iter().enumerate() {
                                let matching = recv.source == locs[q]
                                    && matches!(&recv.sync, Some(s)
                                        if s.kind == SyncKind::Recv && s.channel == sync.channel);
                                if matching {
                                    actions.push(Action::Binary {
                                        emit: emit_ref,
                                        recv: EdgeRef { proc: q, edge: f },
                                    });
                                }
                            }
                        }
                    }
                    // Recv edges fire only as the partner of an emit.
                    Some(_) => {}
                }
            }
        }
        actions
    }

    /// Location vector after firing `action` from `locs`.
    pub fn action_targets(&self, locs: &[LocId], action: Action) -> Vec<LocId> {
        let mut next = locs.to_vec();
        match action {
            Action::Basic(r) => next[r.proc] = self.edge(r).target,
            Action::Binary { emit, recv } => {
                next[emit.proc] = self.edge(emit).target;
                next[recv.proc] = self.edge(recv).target;
            }
        }
        next
    }

    /// The locations entered by an action, for invariant checking.
    pub fn target_locs(&self, action: Action) -> Vec<(ProcId, LocId)> {
        match action {
            Action::Basic(r) => vec![(r.proc, self.edge(r).target)],
            Action::Binary { emit, recv } => vec![
                (emit.proc, self.edge(emit).target),
                (recv.proc, self.edge(recv).target),
            ],
        }
    }

    pub fn describe_action(&self, action: Action) -> String {
        let one = |r: EdgeRef| {
            let edge = self.edge(r);
            format!(
                "{}: {} -> {}",
                self.procs[r.proc].name,
                self.procs[r.proc].locs[edge.source].name,
                self.procs[r.proc].locs[edge.target].name
            )
        };
        match action {
            Action::Basic(r) => one(r),
            Action::Binary { emit, recv } => format!("{} || {}", one(emit), one(recv)),
        }
    }

    /// Structural sanity: at least one process, non-empty location sets,
    /// edges within bounds, and guard/update variables all declared.
    pub fn validate(&self) -> Result<(), CegarError> {
        if self.procs.is_empty() {
            return Err(CegarError::MalformedSystem("system has no process".into()));
        }
        let declared = |e: &Expr| -> Result<(), CegarError> {
            for v in e.free_vars() {
                if self.var(&v).is_none() {
                    return Err(CegarError::MalformedSystem(format!(
                        "undeclared variable `{v}`"
                    )));
                }
            }
            Ok(())
        };
        for proc in &self.procs {
            if proc.locs.is_empty() {
                return Err(CegarError::MalformedSystem(format!(
                    "process `{}` has no location",
                    proc.name
                )));
            }
            for loc in &proc.locs {
                for inv in &loc.invariants {
                    declared(inv)?;
                }
            }
            for edge in &proc.edges {
                if edge.source >= proc.locs.len() || edge.target >= proc.locs.len() {
                    return Err(CegarError::MalformedSystem(format!(
                        "edge of `{}` references a missing location",
                        proc.name
                    )));
                }
                for g in &edge.guards {
                    declared(g)?;
                }
                for s in &edge.updates {
                    match s {
                        Stmt::Assign { var, expr } => {
                            declared(&Expr::var(var.clone()))?;
                            declared(expr)?;
                        }
                        Stmt::Assume(g) => declared(g)?,
                    }
                }
            }
        }
        Ok(())
    }

    /// A copy with every guard and invariant put in conjunctive normal
    /// form. Pre-processing only: it never changes which abstract states
    /// the domains produce.
    pub fn with_cnf_guards(&self) -> System {
        let mut sys = self.clone();
        for proc in &mut sys.procs {
            for loc in &mut proc.locs {
                for inv in &mut loc.invariants {
                    *inv = loris_core::cnf::to_cnf(inv);
                }
            }
            for edge in &mut proc.edges {
                for g in &mut edge.guards {
                    *g = loris_core::cnf::to_cnf(g);
                }
            }
        }
        sys
    }

    /// Declare the step-`k` instances of every system variable.
    pub fn declare_step_vars(&self, solver: &mut dyn Solver, k: usize) -> Result<(), SolverError> {
        for var in &self.vars {
            solver.declare_ranged(&indexed_name(&var.name, k), var.ty, var.range)?;
        }
        Ok(())
    }
}

/// Constraint describing the initial concrete states, over step-0 variable
/// instances: the declared initial values plus the initial locations'
/// invariants.
pub fn init_expr(sys: &System) -> Expr {
    let mut conjuncts = vec![index(&sys.init_vals.to_expr(), 0)];
    for (p, l) in sys.init_locs().iter().enumerate() {
        for inv in &sys.procs[p].locs[*l].invariants {
            conjuncts.push(index(inv, 0));
        }
    }
    Expr::and(conjuncts)
}

/// The transition relation of `action` between step `k` and step `k + 1`:
/// guards and sync equalities over the step-`k` instances, one equality per
/// variable relating its step-`k + 1` instance to the composed update
/// right-hand side, and the entered locations' invariants at step `k + 1`.
pub fn trans_expr(sys: &System, action: Action, k: usize) -> Expr {
    let mut conjuncts = Vec::new();
    // var -> composed rhs over step-k state
    let mut composed: Vec<(String, Expr)> = Vec::new();
    let lookup = |composed: &[(String, Expr)], name: &str| {
        composed
            .iter()
            .rev()
            .find(|(v, _)| v == name)
            .map(|(_, e)| e.clone())
            .unwrap_or_else(|| Expr::var(name))
    };

    let apply_edge = |conjuncts: &mut Vec<Expr>, composed: &mut Vec<(String, Expr)>, r: EdgeRef| {
        let edge = sys.edge(r);
        for g in &edge.guards {
            conjuncts.push(index(g, k));
        }
        for stmt in &edge.updates {
            match stmt {
                Stmt::Assign { var, expr } => {
                    let rhs = expr.map_vars(&mut |name| lookup(composed, name));
                    composed.push((var.clone(), rhs));
                }
                Stmt::Assume(g) => {
                    let guard = g.map_vars(&mut |name| lookup(composed, name));
                    conjuncts.push(index(&guard, k));
                }
            }
        }
    };

    match action {
        Action::Basic(r) => apply_edge(&mut conjuncts, &mut composed, r),
        Action::Binary { emit, recv } => {
            let emit_edge = sys.edge(emit);
            let recv_edge = sys.edge(recv);
            if let (Some(es), Some(rs)) = (&emit_edge.sync, &recv_edge.sync) {
                for (ea, ra) in es.args.iter().zip(&rs.args) {
                    conjuncts.push(index(ea, k).eq(index(ra, k)));
                }
            }
            // Forward order: emitter updates first, then receiver.
            apply_edge(&mut conjuncts, &mut composed, emit);
            apply_edge(&mut conjuncts, &mut composed, recv);
        }
    }

    for var in &sys.vars {
        let rhs = index(&lookup(&composed, &var.name), k);
        conjuncts.push(Expr::Var(indexed_name(&var.name, k + 1)).eq(rhs));
    }

    for (p, l) in sys.target_locs(action) {
        for inv in &sys.procs[p].locs[l].invariants {
            conjuncts.push(index(inv, k + 1));
        }
    }

    Expr::and(conjuncts)
}
