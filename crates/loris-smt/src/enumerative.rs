//! A hermetic, complete solver for bounded integer domains.
//!
//! Satisfiability is decided by backtracking enumeration over the declared
//! ranges, pruning with partial-valuation simplification after every
//! assignment. Within the declared bounds the backend is a decision
//! procedure, which also makes unsat cores (greedy minimization) and
//! interpolants (exact projection onto the shared vocabulary) available
//! without an external binary.

use indexmap::{IndexMap, IndexSet};
use std::collections::HashMap;

use loris_core::{simplify, Expr, Lit, Type, Valuation};

use crate::solver::{
    Interpolant, ItpMarker, ItpPattern, Model, SatResult, Solver, SolverError,
};

const DEFAULT_BOUNDS: (i64, i64) = (-8, 8);

#[derive(Debug, Clone, Copy)]
struct VarInfo {
    ty: Type,
    lo: i64,
    hi: i64,
}

pub struct EnumSolver {
    decls: IndexMap<String, VarInfo>,
    assertions: Vec<(Option<ItpMarker>, Expr)>,
    frames: Vec<usize>,
    next_marker: usize,
    last_model: Option<Model>,
    last_unsat: bool,
    default_bounds: (i64, i64),
}

impl EnumSolver {
    pub fn new() -> Self {
        Self::with_default_bounds(DEFAULT_BOUNDS.0, DEFAULT_BOUNDS.1)
    }

    /// Bounds used for integer variables declared through [`Solver::declare`].
    pub fn with_default_bounds(lo: i64, hi: i64) -> Self {
        Self {
            decls: IndexMap::new(),
            assertions: Vec::new(),
            frames: Vec::new(),
            next_marker: 0,
            last_model: None,
            last_unsat: false,
            default_bounds: (lo, hi),
        }
    }

    fn check_declared(&self, expr: &Expr) -> Result<(), SolverError> {
        for var in expr.free_vars() {
            if !self.decls.contains_key(&var) {
                return Err(SolverError::UndeclaredVariable(var));
            }
        }
        Ok(())
    }

    /// Variables occurring in `exprs`, in declaration order.
    fn relevant_vars(&self, exprs: &[Expr]) -> Vec<(String, VarInfo)> {
        let mut used = IndexSet::new();
        for e in exprs {
            used.extend(e.free_vars());
        }
        self.decls
            .iter()
            .filter(|(name, _)| used.contains(name.as_str()))
            .map(|(name, info)| (name.clone(), *info))
            .collect()
    }

    /// Enumerate satisfying (possibly partial) valuations of `exprs`.
    /// Returns true when the visitor stopped the enumeration.
    fn for_each_model(
        &self,
        exprs: &[Expr],
        emit: &mut dyn FnMut(&Valuation) -> bool,
    ) -> bool {
        let empty = Valuation::empty();
        let mut residual = Vec::with_capacity(exprs.len());
        for e in exprs {
            let s = simplify(e, &empty);
            if s.is_false() {
                return false;
            }
            if !s.is_true() {
                residual.push(s);
            }
        }
        let vars = self.relevant_vars(&residual);
        search(&vars, &residual, &empty, emit)
    }

    fn first_model(&self, exprs: &[Expr]) -> Option<Valuation> {
        let mut found = None;
        self.for_each_model(exprs, &mut |val| {
            found = Some(val.clone());
            true
        });
        found
    }

    fn asserted_exprs(&self) -> Vec<Expr> {
        self.assertions.iter().map(|(_, e)| e.clone()).collect()
    }

    fn full_model(&self, val: &Valuation) -> Model {
        let mut values = HashMap::new();
        for (name, info) in &self.decls {
            let lit = val.get(name).unwrap_or(match info.ty {
                Type::Int => Lit::Int(info.lo),
                Type::Bool => Lit::Bool(false),
            });
            values.insert(name.clone(), lit);
        }
        Model { values }
    }

    /// Exact projection interpolant: the disjunction of shared-vocabulary
    /// restrictions of the models of `a`. Sound and complete within the
    /// declared bounds: `a` entails the result, and the result is
    /// inconsistent with `b` whenever `a /\ b` is.
    fn project(&self, a: &[Expr], b: &[Expr]) -> Expr {
        let mut a_vars = IndexSet::new();
        for e in a {
            a_vars.extend(e.free_vars());
        }
        let mut b_vars = IndexSet::new();
        for e in b {
            b_vars.extend(e.free_vars());
        }
        let shared: Vec<String> = a_vars.intersection(&b_vars).cloned().collect();

        if self.first_model(a).is_none() {
            return Expr::Bool(false);
        }
        if shared.is_empty() {
            // a is satisfiable and shares nothing with b, so b carries the
            // contradiction alone.
            return Expr::Bool(true);
        }

        let mut disjuncts = IndexSet::new();
        self.for_each_model(a, &mut |val| {
            let eqs: Vec<Expr> = shared
                .iter()
                .filter_map(|v| val.get(v).map(|lit| Expr::var(v.clone()).eq(Expr::lit(lit))))
                .collect();
            disjuncts.insert(Expr::and(eqs));
            false
        });
        simplify(
            &Expr::or(disjuncts.into_iter().collect()),
            &Valuation::empty(),
        )
    }

    fn partition(&self, marker: ItpMarker) -> (Vec<Expr>, Vec<Expr>) {
        let mut own = Vec::new();
        let mut rest = Vec::new();
        for (m, e) in &self.assertions {
            if *m == Some(marker) {
                own.push(e.clone());
            } else {
                rest.push(e.clone());
            }
        }
        (own, rest)
    }
}

impl Default for EnumSolver {
    fn default() -> Self {
        Self::new()
    }
}

fn search(
    vars: &[(String, VarInfo)],
    residual: &[Expr],
    val: &Valuation,
    emit: &mut dyn FnMut(&Valuation) -> bool,
) -> bool {
    if residual.is_empty() {
        // Remaining variables are unconstrained; the partial valuation
        // already describes every completion.
        return emit(val);
    }
    let Some(((name, info), rest)) = vars.split_first() else {
        // All relevant variables assigned but a constraint did not fold to
        // a literal (e.g. arithmetic overflow guard); treat as no model.
        return false;
    };
    let domain: Vec<Lit> = match info.ty {
        Type::Int => (info.lo..=info.hi).map(Lit::Int).collect(),
        Type::Bool => vec![Lit::Bool(false), Lit::Bool(true)],
    };
    for lit in domain {
        let next = val.with(name.clone(), lit);
        let mut remaining = Vec::with_capacity(residual.len());
        let mut pruned = false;
        for e in residual {
            let s = simplify(e, &next);
            if s.is_false() {
                pruned = true;
                break;
            }
            if !s.is_true() {
                remaining.push(s);
            }
        }
        if pruned {
            continue;
        }
        if search(rest, &remaining, &next, emit) {
            return true;
        }
    }
    false
}

impl Solver for EnumSolver {
    fn declare(&mut self, name: &str, ty: Type) -> Result<(), SolverError> {
        match self.decls.get(name) {
            Some(info) if info.ty != ty => Err(SolverError::SortMismatch(name.to_string())),
            Some(_) => Ok(()),
            None => {
                let (lo, hi) = self.default_bounds;
                self.decls.insert(name.to_string(), VarInfo { ty, lo, hi });
                Ok(())
            }
        }
    }

    fn declare_ranged(
        &mut self,
        name: &str,
        ty: Type,
        range: Option<(i64, i64)>,
    ) -> Result<(), SolverError> {
        match self.decls.get(name) {
            Some(info) if info.ty != ty => return Err(SolverError::SortMismatch(name.to_string())),
            Some(_) => return Ok(()),
            None => {}
        }
        let (lo, hi) = match (ty, range) {
            (Type::Int, Some(range)) => range,
            _ => self.default_bounds,
        };
        self.decls.insert(name.to_string(), VarInfo { ty, lo, hi });
        Ok(())
    }

    fn assert(&mut self, expr: &Expr) -> Result<(), SolverError> {
        self.check_declared(expr)?;
        self.assertions.push((None, expr.clone()));
        Ok(())
    }

    fn assert_marked(&mut self, marker: ItpMarker, expr: &Expr) -> Result<(), SolverError> {
        self.check_declared(expr)?;
        self.assertions.push((Some(marker), expr.clone()));
        Ok(())
    }

    fn new_marker(&mut self) -> ItpMarker {
        let marker = ItpMarker(self.next_marker);
        self.next_marker += 1;
        marker
    }

    fn push(&mut self) -> Result<(), SolverError> {
        self.frames.push(self.assertions.len());
        Ok(())
    }

    fn pop(&mut self) -> Result<(), SolverError> {
        let mark = self.frames.pop().ok_or(SolverError::UnbalancedPop)?;
        self.assertions.truncate(mark);
        Ok(())
    }

    fn depth(&self) -> usize {
        self.frames.len()
    }

    fn check(&mut self) -> Result<SatResult, SolverError> {
        let exprs = self.asserted_exprs();
        match self.first_model(&exprs) {
            Some(val) => {
                self.last_model = Some(self.full_model(&val));
                self.last_unsat = false;
                Ok(SatResult::Sat)
            }
            None => {
                self.last_model = None;
                self.last_unsat = true;
                Ok(SatResult::Unsat)
            }
        }
    }

    fn model(&mut self) -> Result<Model, SolverError> {
        self.last_model
            .clone()
            .ok_or(SolverError::NoCheckResult("model"))
    }

    fn supports_interpolation(&self) -> bool {
        true
    }

    fn supports_unsat_core(&self) -> bool {
        true
    }

    fn interpolant(&mut self, pattern: &ItpPattern) -> Result<Interpolant, SolverError> {
        if !self.last_unsat {
            return Err(SolverError::NoCheckResult("interpolant"));
        }
        let mut exprs = HashMap::new();
        match pattern {
            ItpPattern::Binary(a, b) => {
                let (own_a, rest_a) = self.partition(*a);
                exprs.insert(a.0, self.project(&own_a, &rest_a));
                let (own_b, rest_b) = self.partition(*b);
                exprs.insert(b.0, self.project(&own_b, &rest_b));
            }
            ItpPattern::Sequence(markers) => {
                // Unmarked assertions are global: they join both sides of
                // every cut, which keeps the projection sound.
                let global: Vec<Expr> = self
                    .assertions
                    .iter()
                    .filter(|(m, _)| !matches!(m, Some(m) if markers.contains(m)))
                    .map(|(_, e)| e.clone())
                    .collect();
                for (i, marker) in markers.iter().enumerate() {
                    if i + 1 == markers.len() {
                        exprs.insert(marker.0, Expr::Bool(false));
                        continue;
                    }
                    let mut prefix = global.clone();
                    let mut suffix = global.clone();
                    for (m, e) in &self.assertions {
                        if let Some(m) = m {
                            if let Some(pos) = markers.iter().position(|k| k == m) {
                                if pos <= i {
                                    prefix.push(e.clone());
                                } else {
                                    suffix.push(e.clone());
                                }
                            }
                        }
                    }
                    exprs.insert(marker.0, self.project(&prefix, &suffix));
                }
            }
        }
        Ok(Interpolant::new(exprs))
    }

    fn unsat_core(&mut self) -> Result<Vec<Expr>, SolverError> {
        if !self.last_unsat {
            return Err(SolverError::NoCheckResult("unsat core"));
        }
        let mut kept = self.asserted_exprs();
        let mut i = 0;
        while i < kept.len() {
            let mut trial = kept.clone();
            trial.remove(i);
            if self.first_model(&trial).is_none() {
                kept = trial;
            } else {
                i += 1;
            }
        }
        Ok(kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn int_solver(vars: &[&str]) -> EnumSolver {
        let mut s = EnumSolver::new();
        for v in vars {
            s.declare(v, Type::Int).unwrap();
        }
        s
    }

    #[test]
    fn simple_sat_and_unsat() {
        let mut s = int_solver(&["x"]);
        s.assert(&Expr::var("x").gt(Expr::int(0))).unwrap();
        s.assert(&Expr::var("x").lt(Expr::int(5))).unwrap();
        assert!(s.check().unwrap().is_sat());
        let m = s.model().unwrap();
        let x = m.get_int("x").unwrap();
        assert!(x > 0 && x < 5);

        s.assert(&Expr::var("x").gt(Expr::int(7))).unwrap();
        assert!(s.check().unwrap().is_unsat());
    }

    #[test]
    fn pop_discards_assertions() {
        let mut s = int_solver(&["x"]);
        s.assert(&Expr::var("x").gt(Expr::int(0))).unwrap();
        s.push().unwrap();
        s.assert(&Expr::var("x").lt(Expr::int(0))).unwrap();
        assert!(s.check().unwrap().is_unsat());
        s.pop().unwrap();
        assert!(s.check().unwrap().is_sat());
    }

    #[test]
    fn undeclared_variable_is_rejected() {
        let mut s = EnumSolver::new();
        let err = s.assert(&Expr::var("ghost").gt(Expr::int(0)));
        assert!(matches!(err, Err(SolverError::UndeclaredVariable(v)) if v == "ghost"));
    }

    #[test]
    fn unsat_core_is_a_minimal_subset() {
        let mut s = int_solver(&["x", "y"]);
        s.assert(&Expr::var("y").gt(Expr::int(0))).unwrap();
        s.assert(&Expr::var("x").gt(Expr::int(3))).unwrap();
        s.assert(&Expr::var("x").lt(Expr::int(2))).unwrap();
        assert!(s.check().unwrap().is_unsat());
        let core = s.unsat_core().unwrap();
        assert_eq!(core.len(), 2);
        assert!(core.contains(&Expr::var("x").gt(Expr::int(3))));
        assert!(core.contains(&Expr::var("x").lt(Expr::int(2))));
    }

    #[test]
    fn binary_interpolant_separates_partitions() {
        let mut s = int_solver(&["x", "y"]);
        let a = s.new_marker();
        let b = s.new_marker();
        // A: x = 0 /\ y = x + 1       B: y < 0
        s.assert_marked(a, &Expr::var("x").eq(Expr::int(0))).unwrap();
        s.assert_marked(a, &Expr::var("y").eq(Expr::var("x").add(Expr::int(1))))
            .unwrap();
        s.assert_marked(b, &Expr::var("y").lt(Expr::int(0))).unwrap();
        assert!(s.check().unwrap().is_unsat());
        let itp = s.interpolant(&ItpPattern::Binary(a, b)).unwrap();
        let ia = itp.eval(&a).unwrap().clone();
        // The interpolant talks about the shared variable only.
        let vars: Vec<_> = ia.free_vars().into_iter().collect();
        assert_eq!(vars, vec!["y"]);

        // A entails ia: A /\ !ia is unsat.
        let mut checker = int_solver(&["x", "y"]);
        checker.assert(&Expr::var("x").eq(Expr::int(0))).unwrap();
        checker
            .assert(&Expr::var("y").eq(Expr::var("x").add(Expr::int(1))))
            .unwrap();
        checker.assert(&ia.clone().not()).unwrap();
        assert!(checker.check().unwrap().is_unsat());

        // ia /\ B is unsat.
        let mut checker = int_solver(&["y"]);
        checker.assert(&ia).unwrap();
        checker.assert(&Expr::var("y").lt(Expr::int(0))).unwrap();
        assert!(checker.check().unwrap().is_unsat());
    }

    #[test]
    fn sequence_interpolants_are_inductive() {
        let mut s = int_solver(&["x0", "x1", "x2"]);
        let markers: Vec<_> = (0..3).map(|_| s.new_marker()).collect();
        // x0 = 0; x1 = x0 + 1; x1 > 5 (with x2 unused frame x2 = x1)
        s.assert_marked(markers[0], &Expr::var("x0").eq(Expr::int(0)))
            .unwrap();
        s.assert_marked(
            markers[1],
            &Expr::var("x1").eq(Expr::var("x0").add(Expr::int(1))),
        )
        .unwrap();
        s.assert_marked(markers[2], &Expr::var("x1").gt(Expr::int(5)))
            .unwrap();
        assert!(s.check().unwrap().is_unsat());
        let itp = s
            .interpolant(&ItpPattern::Sequence(markers.clone()))
            .unwrap();

        let i0 = itp.eval(&markers[0]).unwrap().clone();
        let i1 = itp.eval(&markers[1]).unwrap().clone();
        assert_eq!(i0, Expr::var("x0").eq(Expr::int(0)));
        assert_eq!(i1, Expr::var("x1").eq(Expr::int(1)));

        // i0 /\ step entails i1.
        let mut checker = int_solver(&["x0", "x1"]);
        checker.assert(&i0).unwrap();
        checker
            .assert(&Expr::var("x1").eq(Expr::var("x0").add(Expr::int(1))))
            .unwrap();
        checker.assert(&i1.not()).unwrap();
        assert!(checker.check().unwrap().is_unsat());
    }

    #[test]
    fn depth_tracks_open_scopes() {
        let mut s = EnumSolver::new();
        assert_eq!(s.depth(), 0);
        s.push().unwrap();
        s.push().unwrap();
        assert_eq!(s.depth(), 2);
        s.pop().unwrap();
        assert_eq!(s.depth(), 1);
        s.pop().unwrap();
        assert!(matches!(s.pop(), Err(SolverError::UnbalancedPop)));
    }

    proptest! {
        #[test]
        fn models_respect_declared_ranges(lo in -6i64..0, hi in 0i64..6, c in -8i64..8) {
            let mut s = EnumSolver::new();
            s.declare_ranged("x", Type::Int, Some((lo, hi))).unwrap();
            s.assert(&Expr::var("x").ge(Expr::int(c))).unwrap();
            let sat = s.check().unwrap().is_sat();
            prop_assert_eq!(sat, c <= hi);
            if sat {
                let x = s.model().unwrap().get_int("x").unwrap();
                prop_assert!(x >= c && x >= lo && x <= hi);
            }
        }
    }
}
