use crate::expr::Expr;

/// Conjunctive normal form of a boolean-typed expression.
///
/// Pre-processing step for guards and invariants; purely structural, so the
/// result is logically equivalent to the input. Distribution can blow up
/// exponentially, which is acceptable for edge-guard-sized inputs.
pub fn to_cnf(expr: &Expr) -> Expr {
    distribute(&nnf(expr, false))
}

/// Negation normal form. `negate` tracks whether the current subterm is
/// under an odd number of negations; comparisons absorb the negation by
/// flipping to their dual.
fn nnf(expr: &Expr, negate: bool) -> Expr {
    match expr {
        Expr::Not(a) => nnf(a, !negate),
        Expr::And(es) => {
            let es = es.iter().map(|e| nnf(e, negate)).collect();
            if negate {
                Expr::or(es)
            } else {
                Expr::and(es)
            }
        }
        Expr::Or(es) => {
            let es = es.iter().map(|e| nnf(e, negate)).collect();
            if negate {
                Expr::and(es)
            } else {
                Expr::or(es)
            }
        }
        Expr::Imply(a, b) => {
            // a => b  ==  !a \/ b
            let clauses = vec![nnf(a, !negate), nnf(b, negate)];
            if negate {
                Expr::and(clauses)
            } else {
                Expr::or(clauses)
            }
        }
        Expr::Ite(c, t, e) => {
            // Boolean ite: (c /\ t) \/ (!c /\ e)
            let pos = Expr::and(vec![nnf(c, false), nnf(t, negate)]);
            let neg = Expr::and(vec![nnf(c, true), nnf(e, negate)]);
            if negate {
                // De Morgan over the disjunction of the two arms.
                Expr::and(vec![
                    Expr::or(vec![nnf(c, true), nnf(t, negate)]),
                    Expr::or(vec![nnf(c, false), nnf(e, negate)]),
                ])
            } else {
                Expr::or(vec![pos, neg])
            }
        }
        Expr::Bool(b) => Expr::Bool(*b != negate),
        Expr::Eq(a, b) if negate => a.as_ref().clone().neq(b.as_ref().clone()),
        Expr::Neq(a, b) if negate => a.as_ref().clone().eq(b.as_ref().clone()),
        Expr::Lt(a, b) if negate => a.as_ref().clone().ge(b.as_ref().clone()),
        Expr::Le(a, b) if negate => a.as_ref().clone().gt(b.as_ref().clone()),
        Expr::Gt(a, b) if negate => a.as_ref().clone().le(b.as_ref().clone()),
        Expr::Ge(a, b) if negate => a.as_ref().clone().lt(b.as_ref().clone()),
        Expr::Var(name) if negate => Expr::var(name.clone()).not(),
        other => {
            if negate {
                other.clone().not()
            } else {
                other.clone()
            }
        }
    }
}

/// Distribute disjunction over conjunction until the formula is a
/// conjunction of clauses. Input must be in NNF.
fn distribute(expr: &Expr) -> Expr {
    match expr {
        Expr::And(es) => Expr::and(es.iter().map(distribute).collect()),
        Expr::Or(es) => {
            let es: Vec<Expr> = es.iter().map(distribute).collect();
            // Find a conjunctive disjunct and distribute the rest over it.
            if let Some(pos) = es.iter().position(|e| matches!(e, Expr::And(_))) {
                let Expr::And(conjuncts) = es[pos].clone() else {
                    unreachable!()
                };
                let rest: Vec<Expr> = es
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != pos)
                    .map(|(_, e)| e.clone())
                    .collect();
                Expr::and(
                    conjuncts
                        .into_iter()
                        .map(|c| {
                            let mut clause = rest.clone();
                            clause.push(c);
                            distribute(&Expr::or(clause))
                        })
                        .collect(),
                )
            } else {
                Expr::or(es)
            }
        }
        other => other.clone(),
    }
}
