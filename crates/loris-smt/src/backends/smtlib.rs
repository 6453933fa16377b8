//! External-process SMT-LIB 2 backend.
//!
//! Talks plain SMT-LIB 2 text over stdin/stdout to any conforming solver
//! binary (z3, cvc5, mathsat). Marked assertions are guarded by activation
//! literals and checked with `check-sat-assuming`, so unsat cores come back
//! as `get-unsat-assumptions` responses. Interpolation is not offered by
//! this backend: recovering a term from solver output would need a full
//! SMT-LIB parser, and the unsat-core refinement path exists precisely for
//! interpolation-free solvers.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use loris_core::{Expr, Lit, Type};

use crate::solver::{ItpMarker, Model, SatResult, Solver, SolverError};

pub struct SmtLibSolver {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    vars: HashMap<String, Type>,
    /// Activation literal name and guarded expression, per open scope.
    tracked: Vec<Vec<(String, Expr)>>,
    next_activation: usize,
    next_marker: usize,
}

impl SmtLibSolver {
    /// Spawn `z3` in incremental SMT-LIB mode.
    pub fn z3() -> Result<Self, SolverError> {
        Self::with_command("z3", &["-smt2", "-in"])
    }

    /// Spawn `cvc5` in incremental SMT-LIB mode.
    pub fn cvc5() -> Result<Self, SolverError> {
        Self::with_command(
            "cvc5",
            &["--lang", "smt2", "--incremental", "--produce-models"],
        )
    }

    pub fn with_command(cmd: &str, args: &[&str]) -> Result<Self, SolverError> {
        let mut child = Command::new(cmd)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| SolverError::Backend(format!("failed to spawn {cmd}: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| SolverError::Backend("failed to capture solver stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SolverError::Backend("failed to capture solver stdout".into()))?;

        let mut solver = Self {
            child,
            stdin,
            stdout: BufReader::new(stdout),
            vars: HashMap::new(),
            tracked: vec![Vec::new()],
            next_activation: 0,
            next_marker: 0,
        };
        solver.send("(set-option :produce-unsat-assumptions true)")?;
        solver.send("(set-logic QF_LIA)")?;
        Ok(solver)
    }

    fn send(&mut self, cmd: &str) -> Result<(), SolverError> {
        writeln!(self.stdin, "{cmd}")?;
        self.stdin.flush()?;
        Ok(())
    }

    fn query(&mut self, cmd: &str) -> Result<String, SolverError> {
        self.send(cmd)?;
        let mut response = String::new();
        self.stdout.read_line(&mut response)?;
        if response.is_empty() {
            return Err(SolverError::Backend(format!(
                "no response from solver for `{cmd}`"
            )));
        }
        Ok(response.trim_end().to_string())
    }

    fn active_names(&self) -> Vec<String> {
        self.tracked
            .iter()
            .flatten()
            .map(|(name, _)| name.clone())
            .collect()
    }

    fn tracked_expr(&self, name: &str) -> Option<&Expr> {
        self.tracked
            .iter()
            .flatten()
            .find(|(n, _)| n == name)
            .map(|(_, e)| e)
    }
}

impl Drop for SmtLibSolver {
    fn drop(&mut self) {
        let _ = writeln!(self.stdin, "(exit)");
        let _ = self.stdin.flush();
        let _ = self.child.wait();
    }
}

impl Solver for SmtLibSolver {
    fn declare(&mut self, name: &str, ty: Type) -> Result<(), SolverError> {
        match self.vars.get(name) {
            Some(existing) if *existing != ty => {
                return Err(SolverError::SortMismatch(name.to_string()))
            }
            Some(_) => return Ok(()),
            None => {}
        }
        let sort = sort_to_smtlib(ty);
        let sym = quote(name);
        self.send(&format!("(declare-const {sym} {sort})"))?;
        self.vars.insert(name.to_string(), ty);
        Ok(())
    }

    fn assert(&mut self, expr: &Expr) -> Result<(), SolverError> {
        let text = to_smtlib(expr);
        self.send(&format!("(assert {text})"))
    }

    fn assert_marked(&mut self, _marker: ItpMarker, expr: &Expr) -> Result<(), SolverError> {
        // Guard with an activation literal so the assertion can show up in
        // unsat-assumption responses.
        let name = format!("_act{}", self.next_activation);
        self.next_activation += 1;
        self.send(&format!("(declare-const {name} Bool)"))?;
        self.send(&format!("(assert (=> {name} {}))", to_smtlib(expr)))?;
        self.tracked
            .last_mut()
            .ok_or(SolverError::UnbalancedPop)?
            .push((name, expr.clone()));
        Ok(())
    }

    fn new_marker(&mut self) -> ItpMarker {
        let marker = ItpMarker(self.next_marker);
        self.next_marker += 1;
        marker
    }

    fn push(&mut self) -> Result<(), SolverError> {
        self.send("(push 1)")?;
        self.tracked.push(Vec::new());
        Ok(())
    }

    fn pop(&mut self) -> Result<(), SolverError> {
        if self.tracked.len() <= 1 {
            return Err(SolverError::UnbalancedPop);
        }
        self.send("(pop 1)")?;
        self.tracked.pop();
        Ok(())
    }

    fn depth(&self) -> usize {
        self.tracked.len() - 1
    }

    fn check(&mut self) -> Result<SatResult, SolverError> {
        let active = self.active_names();
        let response = if active.is_empty() {
            self.query("(check-sat)")?
        } else {
            self.query(&format!("(check-sat-assuming ({}))", active.join(" ")))?
        };
        match response.as_str() {
            "sat" => Ok(SatResult::Sat),
            "unsat" => Ok(SatResult::Unsat),
            "unknown" => Ok(SatResult::Unknown("solver returned unknown".into())),
            other => Err(SolverError::Backend(other.to_string())),
        }
    }

    fn model(&mut self) -> Result<Model, SolverError> {
        let names: Vec<(String, Type)> = self
            .vars
            .iter()
            .map(|(n, t)| (n.clone(), *t))
            .collect();
        let mut values = HashMap::new();
        for (name, ty) in names {
            let response = self.query(&format!("(get-value ({}))", quote(&name)))?;
            if let Some(lit) = parse_value(&response, ty) {
                values.insert(name, lit);
            }
        }
        Ok(Model { values })
    }

    fn supports_unsat_core(&self) -> bool {
        true
    }

    fn unsat_core(&mut self) -> Result<Vec<Expr>, SolverError> {
        let response = self.query("(get-unsat-assumptions)")?;
        let names = parse_symbols(&response);
        Ok(names
            .iter()
            .filter_map(|n| self.tracked_expr(n).cloned())
            .collect())
    }
}

fn sort_to_smtlib(ty: Type) -> &'static str {
    match ty {
        Type::Int => "Int",
        Type::Bool => "Bool",
    }
}

/// Quote symbols that are not plain SMT-LIB simple symbols (step-indexed
/// variable instances contain `@`).
fn quote(name: &str) -> String {
    let simple = name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "~!$^&*_-+=<>.?/".contains(c));
    if simple && !name.is_empty() {
        name.to_string()
    } else {
        format!("|{name}|")
    }
}

fn int_to_smtlib(n: i64) -> String {
    if n < 0 {
        format!("(- {})", n.unsigned_abs())
    } else {
        n.to_string()
    }
}

pub fn to_smtlib(expr: &Expr) -> String {
    match expr {
        Expr::Var(name) => quote(name),
        Expr::Int(n) => int_to_smtlib(*n),
        Expr::Bool(b) => b.to_string(),
        Expr::Add(a, b) => format!("(+ {} {})", to_smtlib(a), to_smtlib(b)),
        Expr::Sub(a, b) => format!("(- {} {})", to_smtlib(a), to_smtlib(b)),
        Expr::Mul(a, b) => format!("(* {} {})", to_smtlib(a), to_smtlib(b)),
        Expr::Neg(a) => format!("(- {})", to_smtlib(a)),
        Expr::Eq(a, b) => format!("(= {} {})", to_smtlib(a), to_smtlib(b)),
        Expr::Neq(a, b) => format!("(not (= {} {}))", to_smtlib(a), to_smtlib(b)),
        Expr::Lt(a, b) => format!("(< {} {})", to_smtlib(a), to_smtlib(b)),
        Expr::Le(a, b) => format!("(<= {} {})", to_smtlib(a), to_smtlib(b)),
        Expr::Gt(a, b) => format!("(> {} {})", to_smtlib(a), to_smtlib(b)),
        Expr::Ge(a, b) => format!("(>= {} {})", to_smtlib(a), to_smtlib(b)),
        Expr::Not(a) => format!("(not {})", to_smtlib(a)),
        Expr::And(es) => nary("and", es),
        Expr::Or(es) => nary("or", es),
        Expr::Imply(a, b) => format!("(=> {} {})", to_smtlib(a), to_smtlib(b)),
        Expr::Ite(c, t, e) => format!(
            "(ite {} {} {})",
            to_smtlib(c),
            to_smtlib(t),
            to_smtlib(e)
        ),
    }
}

fn nary(op: &str, es: &[Expr]) -> String {
    if es.is_empty() {
        return match op {
            "and" => "true".to_string(),
            _ => "false".to_string(),
        };
    }
    let mut out = format!("({op}");
    for e in es {
        out.push(' ');
        out.push_str(&to_smtlib(e));
    }
    out.push(')');
    out
}

/// Parse a `((name value))` get-value response.
fn parse_value(response: &str, ty: Type) -> Option<Lit> {
    let inner = response
        .trim()
        .trim_start_matches('(')
        .trim_end_matches(')');
    let (_, val_str) = inner.split_once(' ')?;
    let val_str = val_str.trim().trim_end_matches(')').trim();
    match ty {
        Type::Int => {
            if let Some(num) = val_str.strip_prefix("(- ") {
                let num = num.trim_end_matches(')').trim();
                num.parse::<i64>().ok().map(|n| Lit::Int(-n))
            } else {
                val_str.parse::<i64>().ok().map(Lit::Int)
            }
        }
        Type::Bool => match val_str {
            "true" => Some(Lit::Bool(true)),
            "false" => Some(Lit::Bool(false)),
            _ => None,
        },
    }
}

/// Tokenize the symbols of a `(get-unsat-assumptions)` response.
fn parse_symbols(response: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut buf = String::new();
    let mut quoted = false;
    for ch in response.trim().chars() {
        match ch {
            '(' | ')' if !quoted => flush(&mut buf, &mut out),
            '|' => {
                quoted = !quoted;
                flush(&mut buf, &mut out);
            }
            c if c.is_whitespace() && !quoted => flush(&mut buf, &mut out),
            other => buf.push(other),
        }
    }
    flush(&mut buf, &mut out);
    out
}

fn flush(buf: &mut String, out: &mut Vec<String>) {
    if !buf.is_empty() {
        out.push(std::mem::take(buf));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prints_indexed_variables_quoted() {
        let e = Expr::var("x@0").add(Expr::int(1)).le(Expr::var("x@1"));
        assert_eq!(to_smtlib(&e), "(<= (+ |x@0| 1) |x@1|)");
    }

    #[test]
    fn prints_negative_literals_in_prefix_form() {
        let e = Expr::var("x").gt(Expr::int(-3));
        assert_eq!(to_smtlib(&e), "(> x (- 3))");
    }

    #[test]
    fn parses_get_value_responses() {
        assert_eq!(parse_value("((x 42))", Type::Int), Some(Lit::Int(42)));
        assert_eq!(parse_value("((x (- 7)))", Type::Int), Some(Lit::Int(-7)));
        assert_eq!(parse_value("((b true))", Type::Bool), Some(Lit::Bool(true)));
    }

    #[test]
    fn parses_unsat_assumption_symbols() {
        assert_eq!(
            parse_symbols("(_act0 _act2)"),
            vec!["_act0".to_string(), "_act2".to_string()]
        );
    }
}
