use indexmap::IndexMap;
use serde::Serialize;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::expr::Expr;
use crate::types::Lit;

/// A partial assignment of literals to variables, insertion ordered.
///
/// Valuations are values: `with` and `without` return a new valuation, so a
/// valuation handed to a caller can never change underneath it.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Valuation {
    map: IndexMap<String, Lit>,
}

impl Valuation {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_pairs(pairs: impl IntoIterator<Item = (impl Into<String>, Lit)>) -> Self {
        let map = pairs.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Self { map }
    }

    /// A copy with `var` bound to `lit` (replacing any previous binding).
    pub fn with(&self, var: impl Into<String>, lit: Lit) -> Self {
        let mut map = self.map.clone();
        map.insert(var.into(), lit);
        Self { map }
    }

    /// A copy with `var` unbound. Order of the remaining entries is kept.
    pub fn without(&self, var: &str) -> Self {
        let mut map = self.map.clone();
        map.shift_remove(var);
        Self { map }
    }

    pub fn get(&self, var: &str) -> Option<Lit> {
        self.map.get(var).copied()
    }

    pub fn contains(&self, var: &str) -> bool {
        self.map.contains_key(var)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Lit)> {
        self.map.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn vars(&self) -> impl Iterator<Item = &str> {
        self.map.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// A copy keeping only the variables accepted by the filter.
    pub fn filtered(&self, mut keep: impl FnMut(&str) -> bool) -> Self {
        let map = self
            .map
            .iter()
            .filter(|(k, _)| keep(k))
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        Self { map }
    }

    /// The conjunction of equalities this valuation denotes.
    pub fn to_expr(&self) -> Expr {
        Expr::and(
            self.map
                .iter()
                .map(|(var, lit)| Expr::var(var.clone()).eq(Expr::lit(*lit)))
                .collect(),
        )
    }
}

impl PartialEq for Valuation {
    fn eq(&self, other: &Self) -> bool {
        // Binding equality, not insertion-order equality.
        self.map.len() == other.map.len()
            && self.map.iter().all(|(k, v)| other.map.get(k) == Some(v))
    }
}

impl Eq for Valuation {}

impl Hash for Valuation {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // Hash must agree with the order-insensitive equality.
        let mut entries: Vec<_> = self.map.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        for (k, v) in entries {
            k.hash(state);
            v.hash(state);
        }
    }
}

impl fmt::Display for Valuation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (var, lit)) in self.map.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{var}={lit}")?;
        }
        write!(f, "}}")
    }
}
