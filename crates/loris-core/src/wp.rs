use crate::expr::Expr;
use crate::stmt::Stmt;

/// Substitution-based weakest precondition of a single statement.
///
/// `wp(phi, x := e)` is `phi[x := e]`; `wp(phi, assume g)` is `g /\ phi`
/// (the guard must hold for the step to happen at all).
pub fn wp(post: &Expr, stmt: &Stmt) -> Expr {
    match stmt {
        Stmt::Assign { var, expr } => post.subst(var, expr),
        Stmt::Assume(guard) => Expr::and(vec![guard.clone(), post.clone()]),
    }
}

/// Weakest precondition of a statement sequence, folded in reverse order.
pub fn wp_seq(post: &Expr, stmts: &[Stmt]) -> Expr {
    stmts.iter().rev().fold(post.clone(), |acc, s| wp(&acc, s))
}
