//! Action-level pre-image, built on the statement-level weakest
//! precondition.
//!
//! `pre(sys, phi, a)` is the set of states from which firing `a` can reach
//! a `phi`-state: updates are folded backwards through `phi`, then the
//! action's enabling conditions (guards and, for a rendezvous, the argument
//! equalities) are conjoined on top.

use loris_core::wp::wp_seq;
use loris_core::Expr;

use crate::system::{Action, EdgeRef, System};

fn pre_edge(sys: &System, post: &Expr, r: EdgeRef) -> Expr {
    let edge = sys.edge(r);
    let inverted = wp_seq(post, &edge.updates);
    let mut conjuncts = edge.guards.clone();
    conjuncts.push(inverted);
    Expr::and(conjuncts)
}

/// Pre-image of `post` under `action`, as a constraint over unindexed
/// variables. For a binary action both updates are inverted first, the
/// receiver's before the emitter's (it executed last), and only then are
/// both edges' guards and the channel-argument equalities conjoined; the
/// guards read the pre-rendezvous state, so they must stay outside the
/// inversion.
pub fn pre(sys: &System, post: &Expr, action: Action) -> Expr {
    let mut result = post.clone();
    for (p, l) in sys.target_locs(action) {
        let mut with_invs = vec![result];
        with_invs.extend(sys.procs[p].locs[l].invariants.iter().cloned());
        result = Expr::and(with_invs);
    }
    match action {
        Action::Basic(r) => pre_edge(sys, &result, r),
        Action::Binary { emit, recv } => {
            let emit_edge = sys.edge(emit);
            let recv_edge = sys.edge(recv);
            let inverted = wp_seq(&wp_seq(&result, &recv_edge.updates), &emit_edge.updates);
            let mut conjuncts = emit_edge.guards.clone();
            conjuncts.extend(recv_edge.guards.iter().cloned());
            if let (Some(es), Some(rs)) = (&emit_edge.sync, &recv_edge.sync) {
                for (ea, ra) in es.args.iter().zip(&rs.args) {
                    conjuncts.push(ea.clone().eq(ra.clone()));
                }
            }
            conjuncts.push(inverted);
            Expr::and(conjuncts)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::{Edge, Sync, SyncKind};
    use loris_core::{simplify, Lit, Stmt, Type, Valuation};

    #[test]
    fn pre_inverts_updates_and_conjoins_guards() {
        let mut sys = System::new();
        sys.add_var("x", Type::Int);
        let p = sys.add_process("main");
        let l0 = sys.add_loc(p, "l0");
        let e = sys.add_edge(
            p,
            Edge::new(l0, l0)
                .guard(Expr::var("x").lt(Expr::int(5)))
                .update(Stmt::assign("x", Expr::var("x").add(Expr::int(1)))),
        );
        let post = Expr::var("x").gt(Expr::int(3));
        let got = pre(&sys, &post, Action::Basic(e));
        assert_eq!(
            got,
            Expr::and(vec![
                Expr::var("x").lt(Expr::int(5)),
                Expr::var("x").add(Expr::int(1)).gt(Expr::int(3)),
            ])
        );
    }

    #[test]
    fn pre_of_binary_action_inverts_receiver_first() {
        // Forward execution is emitter then receiver: x := x + 1, then
        // y := x reads the updated x. The pre-image of y > 2 must therefore
        // be x + 1 > 2, which only receiver-first inversion produces.
        let mut sys = System::new();
        sys.add_var("x", Type::Int);
        sys.add_var("y", Type::Int);
        let a = sys.add_process("a");
        let a0 = sys.add_loc(a, "a0");
        sys.add_edge(
            a,
            Edge::new(a0, a0)
                .update(Stmt::assign("x", Expr::var("x").add(Expr::int(1))))
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
            Edge::new(b0, b0)
                .update(Stmt::assign("y", Expr::var("x")))
                .sync(Sync {
                    channel: "c".into(),
                    kind: SyncKind::Recv,
                    args: vec![],
                }),
        );
        let action = sys.enabled_actions(&[0, 0])[0];
        let post = Expr::var("y").gt(Expr::int(2));
        let got = pre(&sys, &post, action);
        assert_eq!(got, Expr::var("x").add(Expr::int(1)).gt(Expr::int(2)));
    }

    #[test]
    fn pre_keeps_receiver_guards_out_of_the_inversion() {
        // The emitter writes x := 0 and the receiver is guarded by x > 0.
        // The guard reads the pre-rendezvous state, so the pre-image is
        // x > 0 itself, not the inverted 0 > 0.
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
        let got = pre(&sys, &Expr::Bool(true), action);
        let fires = Valuation::from_pairs([("x", Lit::Int(5))]);
        assert!(simplify(&got, &fires).is_true());
        let blocked = Valuation::from_pairs([("x", Lit::Int(0))]);
        assert!(simplify(&got, &blocked).is_false());
    }

    #[test]
    fn pre_of_binary_action_conjoins_argument_equalities() {
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
        let got = pre(&sys, &Expr::Bool(true), action);
        let val = Valuation::from_pairs([("x", Lit::Int(1)), ("y", Lit::Int(2))]);
        assert!(simplify(&got, &val).is_false());
        let ok = Valuation::from_pairs([("x", Lit::Int(1)), ("y", Lit::Int(1))]);
        assert!(simplify(&got, &ok).is_true());
    }

    #[test]
    fn pre_conjoins_target_invariants() {
        let mut sys = System::new();
        sys.add_var("x", Type::Int);
        let p = sys.add_process("main");
        let l0 = sys.add_loc(p, "l0");
        let l1 = sys.add_loc(p, "l1");
        sys.add_invariant(p, l1, Expr::var("x").lt(Expr::int(10)));
        let e = sys.add_edge(p, Edge::new(l0, l1));
        let got = pre(&sys, &Expr::Bool(true), Action::Basic(e));
        assert_eq!(got, Expr::var("x").lt(Expr::int(10)));
    }
}
