use crate::expr::Expr;
use crate::types::Lit;
use crate::valuation::Valuation;

/// Simplify `expr` under a partial valuation: substitute known literals and
/// fold constants bottom-up.
///
/// The result is logically equivalent to `expr` under the valuation, and the
/// operation is idempotent: `simplify(simplify(e, v), v) == simplify(e, v)`.
pub fn simplify(expr: &Expr, val: &Valuation) -> Expr {
    match expr {
        Expr::Var(name) => match val.get(name) {
            Some(lit) => Expr::lit(lit),
            None => Expr::var(name.clone()),
        },
        Expr::Int(n) => Expr::Int(*n),
        Expr::Bool(b) => Expr::Bool(*b),

        Expr::Add(a, b) => {
            let (a, b) = (simplify(a, val), simplify(b, val));
            match (&a, &b) {
                (Expr::Int(x), Expr::Int(y)) => match x.checked_add(*y) {
                    Some(n) => Expr::Int(n),
                    None => a.add(b),
                },
                (Expr::Int(0), _) => b,
                (_, Expr::Int(0)) => a,
                _ => a.add(b),
            }
        }
        Expr::Sub(a, b) => {
            let (a, b) = (simplify(a, val), simplify(b, val));
            match (&a, &b) {
                (Expr::Int(x), Expr::Int(y)) => match x.checked_sub(*y) {
                    Some(n) => Expr::Int(n),
                    None => a.sub(b),
                },
                (_, Expr::Int(0)) => a,
                _ => a.sub(b),
            }
        }
        Expr::Mul(a, b) => {
            let (a, b) = (simplify(a, val), simplify(b, val));
            match (&a, &b) {
                (Expr::Int(x), Expr::Int(y)) => match x.checked_mul(*y) {
                    Some(n) => Expr::Int(n),
                    None => a.mul(b),
                },
                (Expr::Int(0), _) | (_, Expr::Int(0)) => Expr::Int(0),
                (Expr::Int(1), _) => b,
                (_, Expr::Int(1)) => a,
                _ => a.mul(b),
            }
        }
        Expr::Neg(a) => match simplify(a, val) {
            Expr::Int(n) => match n.checked_neg() {
                Some(m) => Expr::Int(m),
                None => Expr::Int(n).neg(),
            },
            Expr::Neg(inner) => *inner,
            other => other.neg(),
        },

        Expr::Eq(a, b) => fold_cmp(simplify(a, val), simplify(b, val), Expr::eq, |o| {
            o == std::cmp::Ordering::Equal
        }),
        Expr::Neq(a, b) => fold_cmp(simplify(a, val), simplify(b, val), Expr::neq, |o| {
            o != std::cmp::Ordering::Equal
        }),
        Expr::Lt(a, b) => fold_cmp(simplify(a, val), simplify(b, val), Expr::lt, |o| {
            o == std::cmp::Ordering::Less
        }),
        Expr::Le(a, b) => fold_cmp(simplify(a, val), simplify(b, val), Expr::le, |o| {
            o != std::cmp::Ordering::Greater
        }),
        Expr::Gt(a, b) => fold_cmp(simplify(a, val), simplify(b, val), Expr::gt, |o| {
            o == std::cmp::Ordering::Greater
        }),
        Expr::Ge(a, b) => fold_cmp(simplify(a, val), simplify(b, val), Expr::ge, |o| {
            o != std::cmp::Ordering::Less
        }),

        Expr::Not(a) => not(simplify(a, val)),
        Expr::And(es) => Expr::and(es.iter().map(|e| simplify(e, val)).collect()),
        Expr::Or(es) => Expr::or(es.iter().map(|e| simplify(e, val)).collect()),
        Expr::Imply(a, b) => {
            let (a, b) = (simplify(a, val), simplify(b, val));
            match (&a, &b) {
                (Expr::Bool(false), _) | (_, Expr::Bool(true)) => Expr::Bool(true),
                (Expr::Bool(true), _) => b,
                (_, Expr::Bool(false)) => not(a),
                _ => a.imply(b),
            }
        }
        Expr::Ite(c, t, e) => {
            let c = simplify(c, val);
            match c {
                Expr::Bool(true) => simplify(t, val),
                Expr::Bool(false) => simplify(e, val),
                _ => Expr::ite(c, simplify(t, val), simplify(e, val)),
            }
        }
    }
}

fn not(e: Expr) -> Expr {
    match e {
        Expr::Bool(b) => Expr::Bool(!b),
        Expr::Not(inner) => *inner,
        other => other.not(),
    }
}

fn fold_cmp(
    a: Expr,
    b: Expr,
    rebuild: impl FnOnce(Expr, Expr) -> Expr,
    decide: impl FnOnce(std::cmp::Ordering) -> bool,
) -> Expr {
    match (a.as_lit(), b.as_lit()) {
        (Some(Lit::Int(x)), Some(Lit::Int(y))) => Expr::Bool(decide(x.cmp(&y))),
        (Some(Lit::Bool(x)), Some(Lit::Bool(y))) => Expr::Bool(decide(x.cmp(&y))),
        _ => rebuild(a, b),
    }
}
