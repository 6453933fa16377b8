//! Explicit-value abstract domain.
//!
//! An abstract state is a partial valuation of the tracked variables;
//! `Bottom` is the empty (infeasible) state and absorbs every transfer.
//! Precision is the set of tracked variables. Assigning a non-literal
//! right-hand side widens the target variable to unknown rather than going
//! symbolic, so the domain stays finite.

use indexmap::IndexSet;

use loris_core::{simplify, Expr, Stmt, Valuation};

use crate::system::{Action, Edge, System};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExplState {
    Bottom,
    Of(Valuation),
}

impl ExplState {
    pub fn top() -> Self {
        ExplState::Of(Valuation::empty())
    }

    pub fn is_bottom(&self) -> bool {
        matches!(self, ExplState::Bottom)
    }

    /// The constraint this state denotes; `Bottom` denotes `false`.
    pub fn to_expr(&self) -> Expr {
        match self {
            ExplState::Bottom => Expr::Bool(false),
            ExplState::Of(val) => val.to_expr(),
        }
    }
}

impl std::fmt::Display for ExplState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExplState::Bottom => write!(f, "⊥"),
            ExplState::Of(val) => write!(f, "{val}"),
        }
    }
}

/// Tracked-variable precision, insertion ordered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExplPrec {
    vars: IndexSet<String>,
}

impl ExplPrec {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn of(vars: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            vars: vars.into_iter().map(Into::into).collect(),
        }
    }

    pub fn tracks(&self, var: &str) -> bool {
        self.vars.contains(var)
    }

    pub fn vars(&self) -> impl Iterator<Item = &str> {
        self.vars.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Grow the precision by `vars`. Returns the new precision and how many
    /// of the variables were actually new; existing entries keep their
    /// position, so growth is monotonic.
    pub fn extended(&self, vars: impl IntoIterator<Item = impl Into<String>>) -> (Self, usize) {
        let mut next = self.vars.clone();
        let mut added = 0;
        for v in vars {
            if next.insert(v.into()) {
                added += 1;
            }
        }
        (Self { vars: next }, added)
    }

    /// Restrict a valuation to the tracked variables.
    pub fn abstract_val(&self, val: &Valuation) -> ExplState {
        ExplState::Of(val.filtered(|v| self.vars.contains(v)))
    }
}

/// Evaluate a guard under a partial valuation. `Some(false)` means the
/// guard is definitely violated, `Some(true)` definitely holds, `None`
/// undetermined (the abstraction keeps the transition enabled).
fn eval_guard(guard: &Expr, val: &Valuation) -> Option<bool> {
    match simplify(guard, val) {
        Expr::Bool(b) => Some(b),
        _ => None,
    }
}

/// True unless some guard of `edge` is definitely violated under `val`.
fn guards_hold(edge: &Edge, val: &Valuation) -> bool {
    edge.guards.iter().all(|g| eval_guard(g, val) != Some(false))
}

/// Apply one edge's updates to the valuation. Returns `None` when an
/// assumption along the way is definitely false.
fn apply_updates(edge: &Edge, val: Valuation) -> Option<Valuation> {
    let mut val = val;
    for stmt in &edge.updates {
        match stmt {
            Stmt::Assign { var, expr } => {
                val = match simplify(expr, &val).as_lit() {
                    Some(lit) => val.with(var.clone(), lit),
                    // Unknown right-hand side: widen the target to unknown.
                    None => val.without(var),
                };
            }
            Stmt::Assume(guard) => {
                if eval_guard(guard, &val) == Some(false) {
                    return None;
                }
            }
        }
    }
    Some(val)
}

/// Strongest-postcondition transfer: the (unique) successor of `state`
/// under `action`, restricted to the precision. A definitely-violated
/// guard, sync mismatch or target invariant yields `Bottom`.
pub fn post(sys: &System, state: &ExplState, action: Action, prec: &ExplPrec) -> ExplState {
    let val = match state {
        ExplState::Bottom => return ExplState::Bottom,
        ExplState::Of(val) => val.clone(),
    };

    let val = match action {
        Action::Basic(r) => {
            let edge = sys.edge(r);
            if !guards_hold(edge, &val) {
                return ExplState::Bottom;
            }
            match apply_updates(edge, val) {
                Some(v) => v,
                None => return ExplState::Bottom,
            }
        }
        Action::Binary { emit, recv } => {
            let emit_edge = sys.edge(emit);
            let recv_edge = sys.edge(recv);
            // Both edges' guards read the pre-rendezvous state, before
            // either edge's updates run.
            if !guards_hold(emit_edge, &val) || !guards_hold(recv_edge, &val) {
                return ExplState::Bottom;
            }
            if let (Some(es), Some(rs)) = (&emit_edge.sync, &recv_edge.sync) {
                for (ea, ra) in es.args.iter().zip(&rs.args) {
                    // Only a definite mismatch refutes the rendezvous.
                    if let (Some(a), Some(b)) =
                        (simplify(ea, &val).as_lit(), simplify(ra, &val).as_lit())
                    {
                        if a != b {
                            return ExplState::Bottom;
                        }
                    }
                }
            }
            let val = match apply_updates(emit_edge, val) {
                Some(v) => v,
                None => return ExplState::Bottom,
            };
            match apply_updates(recv_edge, val) {
                Some(v) => v,
                None => return ExplState::Bottom,
            }
        }
    };

    for (p, l) in sys.target_locs(action) {
        for inv in &sys.procs[p].locs[l].invariants {
            if eval_guard(inv, &val) == Some(false) {
                return ExplState::Bottom;
            }
        }
    }

    prec.abstract_val(&val)
}

/// Abstract the system's initial assignments.
pub fn initial_state(sys: &System, prec: &ExplPrec) -> ExplState {
    let mut val = sys.init_vals.clone();
    for (p, l) in sys.init_locs().iter().enumerate() {
        for inv in &sys.procs[p].locs[*l].invariants {
            if eval_guard(inv, &val) == Some(false) {
                return ExplState::Bottom;
            }
        }
    }
    val = val.filtered(|v| prec.tracks(v));
    ExplState::Of(val)
}

/// Greedy locally-minimal interpolant between a valuation and a refuted
/// expression.
///
/// Precondition: `expr_b` simplifies to `false` under `val_a`. The result
/// is a sub-valuation of `val_a` still refuting `expr_b` from which no
/// single binding can be dropped; it is locally minimal, not guaranteed
/// globally smallest.
pub fn interpolate(val_a: &Valuation, expr_b: &Expr) -> Valuation {
    debug_assert!(simplify(expr_b, val_a).is_false());
    let relevant = expr_b.free_vars();
    // Bindings the expression never reads cannot contribute to refuting it.
    let mut kept = val_a.filtered(|v| relevant.contains(v));
    for var in &relevant {
        if !kept.contains(var) {
            continue;
        }
        let candidate = kept.without(var);
        if simplify(expr_b, &candidate).is_false() {
            kept = candidate;
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::{Edge, EdgeRef, Sync, SyncKind};
    use loris_core::{Lit, Type};
    use proptest::prelude::*;

    fn counter() -> (System, EdgeRef) {
        let mut sys = System::new();
        sys.add_var("x", Type::Int);
        sys.add_var("y", Type::Int);
        let p = sys.add_process("main");
        let l0 = sys.add_loc(p, "l0");
        let step = sys.add_edge(
            p,
            Edge::new(l0, l0)
                .guard(Expr::var("x").lt(Expr::int(5)))
                .update(Stmt::assign("x", Expr::var("x").add(Expr::int(1)))),
        );
        (sys, step)
    }

    #[test]
    fn post_applies_literal_updates() {
        let (sys, step) = counter();
        let prec = ExplPrec::of(["x"]);
        let state = ExplState::Of(Valuation::from_pairs([("x", Lit::Int(2))]));
        let got = post(&sys, &state, Action::Basic(step), &prec);
        assert_eq!(got, ExplState::Of(Valuation::from_pairs([("x", Lit::Int(3))])));
    }

    #[test]
    fn violated_guard_yields_bottom() {
        let (sys, step) = counter();
        let prec = ExplPrec::of(["x"]);
        let state = ExplState::Of(Valuation::from_pairs([("x", Lit::Int(7))]));
        assert!(post(&sys, &state, Action::Basic(step), &prec).is_bottom());
    }

    #[test]
    fn unknown_guard_keeps_transition_enabled() {
        let (sys, step) = counter();
        let prec = ExplPrec::of(["x"]);
        // x untracked in the state: guard is undetermined, update widens x.
        let state = ExplState::top();
        let got = post(&sys, &state, Action::Basic(step), &prec);
        assert_eq!(got, ExplState::top());
    }

    #[test]
    fn non_literal_rhs_widens_target_to_unknown() {
        let mut sys = System::new();
        sys.add_var("x", Type::Int);
        sys.add_var("y", Type::Int);
        let p = sys.add_process("main");
        let l0 = sys.add_loc(p, "l0");
        let e = sys.add_edge(p, Edge::new(l0, l0).update(Stmt::assign("x", Expr::var("y"))));
        let prec = ExplPrec::of(["x", "y"]);
        let state = ExplState::Of(Valuation::from_pairs([("x", Lit::Int(1))]));
        let got = post(&sys, &state, Action::Basic(e), &prec);
        assert_eq!(got, ExplState::top());
    }

    #[test]
    fn bottom_absorbs_post() {
        let (sys, step) = counter();
        let prec = ExplPrec::of(["x"]);
        assert!(post(&sys, &ExplState::Bottom, Action::Basic(step), &prec).is_bottom());
    }

    #[test]
    fn post_restricts_to_precision() {
        let (sys, step) = counter();
        let prec = ExplPrec::empty();
        let state = ExplState::Of(Valuation::from_pairs([("x", Lit::Int(0))]));
        // The successor exists but carries no tracked bindings.
        assert_eq!(post(&sys, &state, Action::Basic(step), &prec), ExplState::top());
    }

    #[test]
    fn target_invariant_violation_yields_bottom() {
        let mut sys = System::new();
        sys.add_var("x", Type::Int);
        let p = sys.add_process("main");
        let l0 = sys.add_loc(p, "l0");
        let l1 = sys.add_loc(p, "l1");
        sys.add_invariant(p, l1, Expr::var("x").lt(Expr::int(2)));
        let e = sys.add_edge(p, Edge::new(l0, l1));
        let prec = ExplPrec::of(["x"]);
        let state = ExplState::Of(Valuation::from_pairs([("x", Lit::Int(3))]));
        assert!(post(&sys, &state, Action::Basic(e), &prec).is_bottom());
    }

    #[test]
    fn sync_argument_mismatch_refutes_rendezvous() {
        let mut sys = System::new();
        sys.add_var("x", Type::Int);
        sys.add_var("y", Type::Int);
        let a = sys.add_process("a");
        let a0 = sys.add_loc(a, "a0");
        sys.add_edge(
            a,
            Edge::new(a0, a0).sync(Sync {
                channel: "c".into(),
                kind: SyncKind::Emit,
                args: vec![Expr::var("x")],
            }),
        );
        let b = sys.add_process("b");
        let b0 = sys.add_loc(b, "b0");
        sys.add_edge(
            b,
            Edge::new(b0, b0).sync(Sync {
                channel: "c".into(),
                kind: SyncKind::Recv,
                args: vec![Expr::var("y")],
            }),
        );
        let action = sys.enabled_actions(&[0, 0])[0];
        let prec = ExplPrec::of(["x", "y"]);

        let mismatch = ExplState::Of(Valuation::from_pairs([
            ("x", Lit::Int(1)),
            ("y", Lit::Int(2)),
        ]));
        assert!(post(&sys, &mismatch, action, &prec).is_bottom());

        // One side unknown: the rendezvous stays possible.
        let open = ExplState::Of(Valuation::from_pairs([("x", Lit::Int(1))]));
        assert!(!post(&sys, &open, action, &prec).is_bottom());
    }

    #[test]
    fn recv_guard_reads_the_pre_rendezvous_state() {
        // The emitter writes x := 0, the receiver's guard reads x > 0.
        // The guard refers to the state before the rendezvous, where
        // x = 5, so the action fires and lands on x = 0.
        let mut sys = System::new();
        sys.add_var("x", Type::Int);
        let a = sys.add_process("a");
        let a0 = sys.add_loc(a, "a0");
        sys.add_edge(
            a,
            Edge::new(a0, a0)
                .update(Stmt::assign("x", Expr::int(0)))
                .sync(Sync {
                    channel: "c".into(),
                    kind: SyncKind::Emit,
                    args: vec![],
                }),
        );
        let b = sys.add_process("b");
        let b0 = sys.add_loc(b, "b0");
        sys.add_edge(
            b,
            Edge::new(b0, b0).guard(Expr::var("x").gt(Expr::int(0))).sync(Sync {
                channel: "c".into(),
                kind: SyncKind::Recv,
                args: vec![],
            }),
        );
        let action = sys.enabled_actions(&[0, 0])[0];
        let prec = ExplPrec::of(["x"]);
        let state = ExplState::Of(Valuation::from_pairs([("x", Lit::Int(5))]));
        let got = post(&sys, &state, action, &prec);
        assert_eq!(got, ExplState::Of(Valuation::from_pairs([("x", Lit::Int(0))])));

        // From x = 0 the receiver's guard really is violated.
        let blocked = ExplState::Of(Valuation::from_pairs([("x", Lit::Int(0))]));
        assert!(post(&sys, &blocked, action, &prec).is_bottom());
    }

    #[test]
    fn interpolate_drops_irrelevant_bindings() {
        let val = Valuation::from_pairs([
            ("x", Lit::Int(0)),
            ("y", Lit::Int(9)),
            ("z", Lit::Int(4)),
        ]);
        // Refuted by x alone.
        let refuted = Expr::var("x").gt(Expr::int(5));
        let itp = interpolate(&val, &refuted);
        assert_eq!(itp, Valuation::from_pairs([("x", Lit::Int(0))]));
    }

    #[test]
    fn interpolate_keeps_jointly_necessary_bindings() {
        let val = Valuation::from_pairs([("x", Lit::Int(1)), ("y", Lit::Int(1))]);
        // x + y > 5 needs both bindings to fold to false.
        let refuted = Expr::var("x").add(Expr::var("y")).gt(Expr::int(5));
        let itp = interpolate(&val, &refuted);
        assert_eq!(itp.len(), 2);
        assert!(simplify(&refuted, &itp).is_false());
    }

    #[test]
    fn extended_precision_is_monotonic() {
        let prec = ExplPrec::of(["x"]);
        let (next, added) = prec.extended(["x", "y"]);
        assert_eq!(added, 1);
        assert!(next.tracks("x") && next.tracks("y"));
        let (again, zero) = next.extended(["y"]);
        assert_eq!(zero, 0);
        assert_eq!(again, next);
    }

    proptest! {
        #[test]
        fn post_matches_concrete_arithmetic(v in -8i64..8) {
            let (sys, step) = counter();
            let prec = ExplPrec::of(["x"]);
            let state = ExplState::Of(Valuation::from_pairs([("x", Lit::Int(v))]));
            let got = post(&sys, &state, Action::Basic(step), &prec);
            if v < 5 {
                let next = Valuation::from_pairs([("x", Lit::Int(v + 1))]);
                prop_assert_eq!(got, ExplState::Of(next));
            } else {
                prop_assert!(got.is_bottom());
            }
        }

        #[test]
        fn interpolate_yields_a_refuting_sub_valuation(
            x in -8i64..8,
            y in -8i64..8,
            bound in -3i64..3,
        ) {
            let val = Valuation::from_pairs([("x", Lit::Int(x)), ("y", Lit::Int(y))]);
            let expr = Expr::var("x").add(Expr::var("y")).gt(Expr::int(bound));
            prop_assume!(simplify(&expr, &val).is_false());
            let itp = interpolate(&val, &expr);
            prop_assert!(simplify(&expr, &itp).is_false());
            for (var, lit) in itp.iter() {
                prop_assert_eq!(val.get(var), Some(lit));
            }
        }
    }
}
