use std::fmt;

use crate::expr::Expr;

/// A statement of the guarded-command language: either an assignment or an
/// assumption (a guard folded into statement form).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Stmt {
    Assign { var: String, expr: Expr },
    Assume(Expr),
}

impl Stmt {
    pub fn assign(var: impl Into<String>, expr: Expr) -> Self {
        Stmt::Assign {
            var: var.into(),
            expr,
        }
    }

    pub fn assume(expr: Expr) -> Self {
        Stmt::Assume(expr)
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stmt::Assign { var, expr } => write!(f, "{var} := {expr}"),
            Stmt::Assume(expr) => write!(f, "assume {expr}"),
        }
    }
}
