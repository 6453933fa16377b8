use indexmap::IndexSet;
use std::fmt;

use crate::types::Lit;

/// Typed expression tree, solver-agnostic.
///
/// The enum is closed on purpose: every consumer matches exhaustively, so a
/// new expression kind is a compile-time event at every match site.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    /// Variable reference by name.
    Var(String),
    /// Integer literal.
    Int(i64),
    /// Boolean literal.
    Bool(bool),

    // Arithmetic
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Neg(Box<Expr>),

    // Comparison
    Eq(Box<Expr>, Box<Expr>),
    Neq(Box<Expr>, Box<Expr>),
    Lt(Box<Expr>, Box<Expr>),
    Le(Box<Expr>, Box<Expr>),
    Gt(Box<Expr>, Box<Expr>),
    Ge(Box<Expr>, Box<Expr>),

    // Boolean logic
    Not(Box<Expr>),
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Imply(Box<Expr>, Box<Expr>),

    // If-then-else
    Ite(Box<Expr>, Box<Expr>, Box<Expr>),
}

#[allow(clippy::should_implement_trait)]
impl Expr {
    pub fn var(name: impl Into<String>) -> Self {
        Expr::Var(name.into())
    }

    pub fn int(n: i64) -> Self {
        Expr::Int(n)
    }

    pub fn bool(b: bool) -> Self {
        Expr::Bool(b)
    }

    pub fn lit(lit: Lit) -> Self {
        match lit {
            Lit::Int(n) => Expr::Int(n),
            Lit::Bool(b) => Expr::Bool(b),
        }
    }

    pub fn add(self, other: Expr) -> Self {
        Expr::Add(Box::new(self), Box::new(other))
    }

    pub fn sub(self, other: Expr) -> Self {
        Expr::Sub(Box::new(self), Box::new(other))
    }

    pub fn mul(self, other: Expr) -> Self {
        Expr::Mul(Box::new(self), Box::new(other))
    }

    pub fn neg(self) -> Self {
        Expr::Neg(Box::new(self))
    }

    pub fn eq(self, other: Expr) -> Self {
        Expr::Eq(Box::new(self), Box::new(other))
    }

    pub fn neq(self, other: Expr) -> Self {
        Expr::Neq(Box::new(self), Box::new(other))
    }

    pub fn lt(self, other: Expr) -> Self {
        Expr::Lt(Box::new(self), Box::new(other))
    }

    pub fn le(self, other: Expr) -> Self {
        Expr::Le(Box::new(self), Box::new(other))
    }

    pub fn gt(self, other: Expr) -> Self {
        Expr::Gt(Box::new(self), Box::new(other))
    }

    pub fn ge(self, other: Expr) -> Self {
        Expr::Ge(Box::new(self), Box::new(other))
    }

    pub fn not(self) -> Self {
        Expr::Not(Box::new(self))
    }

    /// Conjunction. Flattens nested conjunctions and drops `true` conjuncts;
    /// an empty conjunction is `true`, a singleton is the conjunct itself.
    pub fn and(exprs: Vec<Expr>) -> Self {
        let mut flat = Vec::new();
        for e in exprs {
            match e {
                Expr::Bool(true) => {}
                Expr::Bool(false) => return Expr::Bool(false),
                Expr::And(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Expr::Bool(true),
            1 => flat.pop().unwrap(),
            _ => Expr::And(flat),
        }
    }

    /// Disjunction, dual of [`Expr::and`].
    pub fn or(exprs: Vec<Expr>) -> Self {
        let mut flat = Vec::new();
        for e in exprs {
            match e {
                Expr::Bool(false) => {}
                Expr::Bool(true) => return Expr::Bool(true),
                Expr::Or(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Expr::Bool(false),
            1 => flat.pop().unwrap(),
            _ => Expr::Or(flat),
        }
    }

    pub fn imply(self, other: Expr) -> Self {
        Expr::Imply(Box::new(self), Box::new(other))
    }

    pub fn ite(cond: Expr, then: Expr, els: Expr) -> Self {
        Expr::Ite(Box::new(cond), Box::new(then), Box::new(els))
    }

    pub fn as_lit(&self) -> Option<Lit> {
        match self {
            Expr::Int(n) => Some(Lit::Int(*n)),
            Expr::Bool(b) => Some(Lit::Bool(*b)),
            _ => None,
        }
    }

    pub fn is_true(&self) -> bool {
        matches!(self, Expr::Bool(true))
    }

    pub fn is_false(&self) -> bool {
        matches!(self, Expr::Bool(false))
    }

    /// Free variables in first-occurrence order.
    pub fn free_vars(&self) -> IndexSet<String> {
        let mut vars = IndexSet::new();
        self.collect_vars(&mut vars);
        vars
    }

    fn collect_vars(&self, vars: &mut IndexSet<String>) {
        match self {
            Expr::Var(name) => {
                vars.insert(name.clone());
            }
            Expr::Int(_) | Expr::Bool(_) => {}
            Expr::Neg(a) | Expr::Not(a) => a.collect_vars(vars),
            Expr::Add(a, b)
            | Expr::Sub(a, b)
            | Expr::Mul(a, b)
            | Expr::Eq(a, b)
            | Expr::Neq(a, b)
            | Expr::Lt(a, b)
            | Expr::Le(a, b)
            | Expr::Gt(a, b)
            | Expr::Ge(a, b)
            | Expr::Imply(a, b) => {
                a.collect_vars(vars);
                b.collect_vars(vars);
            }
            Expr::And(es) | Expr::Or(es) => {
                for e in es {
                    e.collect_vars(vars);
                }
            }
            Expr::Ite(c, t, e) => {
                c.collect_vars(vars);
                t.collect_vars(vars);
                e.collect_vars(vars);
            }
        }
    }

    /// Rebuild the expression, replacing every variable occurrence by
    /// `f(name)`. The workhorse behind substitution and step-indexing.
    pub fn map_vars(&self, f: &mut impl FnMut(&str) -> Expr) -> Expr {
        match self {
            Expr::Var(name) => f(name),
            Expr::Int(n) => Expr::Int(*n),
            Expr::Bool(b) => Expr::Bool(*b),
            Expr::Add(a, b) => a.map_vars(f).add(b.map_vars(f)),
            Expr::Sub(a, b) => a.map_vars(f).sub(b.map_vars(f)),
            Expr::Mul(a, b) => a.map_vars(f).mul(b.map_vars(f)),
            Expr::Neg(a) => a.map_vars(f).neg(),
            Expr::Eq(a, b) => a.map_vars(f).eq(b.map_vars(f)),
            Expr::Neq(a, b) => a.map_vars(f).neq(b.map_vars(f)),
            Expr::Lt(a, b) => a.map_vars(f).lt(b.map_vars(f)),
            Expr::Le(a, b) => a.map_vars(f).le(b.map_vars(f)),
            Expr::Gt(a, b) => a.map_vars(f).gt(b.map_vars(f)),
            Expr::Ge(a, b) => a.map_vars(f).ge(b.map_vars(f)),
            Expr::Not(a) => a.map_vars(f).not(),
            Expr::And(es) => Expr::And(es.iter().map(|e| e.map_vars(f)).collect()),
            Expr::Or(es) => Expr::Or(es.iter().map(|e| e.map_vars(f)).collect()),
            Expr::Imply(a, b) => a.map_vars(f).imply(b.map_vars(f)),
            Expr::Ite(c, t, e) => Expr::ite(c.map_vars(f), t.map_vars(f), e.map_vars(f)),
        }
    }

    /// Capture-free substitution of a single variable.
    pub fn subst(&self, var: &str, with: &Expr) -> Expr {
        self.map_vars(&mut |name| {
            if name == var {
                with.clone()
            } else {
                Expr::var(name)
            }
        })
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Var(name) => write!(f, "{name}"),
            Expr::Int(n) => write!(f, "{n}"),
            Expr::Bool(b) => write!(f, "{b}"),
            Expr::Add(a, b) => write!(f, "({a} + {b})"),
            Expr::Sub(a, b) => write!(f, "({a} - {b})"),
            Expr::Mul(a, b) => write!(f, "({a} * {b})"),
            Expr::Neg(a) => write!(f, "(-{a})"),
            Expr::Eq(a, b) => write!(f, "({a} = {b})"),
            Expr::Neq(a, b) => write!(f, "({a} /= {b})"),
            Expr::Lt(a, b) => write!(f, "({a} < {b})"),
            Expr::Le(a, b) => write!(f, "({a} <= {b})"),
            Expr::Gt(a, b) => write!(f, "({a} > {b})"),
            Expr::Ge(a, b) => write!(f, "({a} >= {b})"),
            Expr::Not(a) => write!(f, "(not {a})"),
            Expr::And(es) => {
                write!(f, "(and")?;
                for e in es {
                    write!(f, " {e}")?;
                }
                write!(f, ")")
            }
            Expr::Or(es) => {
                write!(f, "(or")?;
                for e in es {
                    write!(f, " {e}")?;
                }
                write!(f, ")")
            }
            Expr::Imply(a, b) => write!(f, "({a} => {b})"),
            Expr::Ite(c, t, e) => write!(f, "(ite {c} {t} {e})"),
        }
    }
}
