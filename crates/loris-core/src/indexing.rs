//! Step-indexing of variables for multi-step path formulas.
//!
//! A path formula talks about the value of `x` at every step of a path, so
//! each occurrence is renamed to a per-step instance (`x@0`, `x@1`, ...).
//! The inverse mapping recovers the variable and step from an instance name.

use crate::expr::Expr;

const SEP: char = '@';

/// The step-`k` instance name of a variable.
pub fn indexed_name(var: &str, k: usize) -> String {
    format!("{var}{SEP}{k}")
}

/// Split an instance name back into `(variable, step)`.
pub fn parse_indexed(name: &str) -> Option<(&str, usize)> {
    let (var, idx) = name.rsplit_once(SEP)?;
    let k = idx.parse().ok()?;
    Some((var, k))
}

/// Rename every variable of `expr` to its step-`k` instance.
pub fn index(expr: &Expr, k: usize) -> Expr {
    expr.map_vars(&mut |name| Expr::Var(indexed_name(name, k)))
}

/// Strip step indices from every variable of `expr`.
///
/// Meaningful only when all instances refer to the same step, as is the case
/// for an interpolant at a path cut; instances of different steps of the
/// same variable would collapse.
pub fn unindex(expr: &Expr) -> Expr {
    expr.map_vars(&mut |name| match parse_indexed(name) {
        Some((var, _)) => Expr::var(var),
        None => Expr::var(name),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_then_unindex_round_trips() {
        let e = Expr::var("x").add(Expr::var("y")).lt(Expr::int(5));
        let indexed = index(&e, 3);
        assert_eq!(
            indexed,
            Expr::var("x@3").add(Expr::var("y@3")).lt(Expr::int(5))
        );
        assert_eq!(unindex(&indexed), e);
    }

    #[test]
    fn parse_indexed_rejects_plain_names() {
        assert_eq!(parse_indexed("x@12"), Some(("x", 12)));
        assert_eq!(parse_indexed("x"), None);
        assert_eq!(parse_indexed("x@"), None);
    }
}
