//! Scoped acquisition of a solver assertion scope.
//!
//! Every batch of assertions made by a domain or refinement operation runs
//! inside a scope that is guaranteed to be released on every exit path,
//! including early `?` returns, so the shared session's assertion stack
//! always returns to its pre-call depth.

use std::ops::{Deref, DerefMut};

use crate::solver::{Solver, SolverError};

/// Run `body` inside a fresh solver scope. The scope is popped whether the
/// body succeeds or fails; a pop failure surfaces only if the body itself
/// succeeded.
pub fn with_scope<S, T, E>(
    solver: &mut S,
    body: impl FnOnce(&mut S) -> Result<T, E>,
) -> Result<T, E>
where
    S: Solver + ?Sized,
    E: From<SolverError>,
{
    solver.push()?;
    let result = body(solver);
    let popped = solver.pop();
    match result {
        Ok(value) => popped.map(|()| value).map_err(E::from),
        Err(err) => {
            if let Err(pop_err) = popped {
                tracing::warn!("pop failed while unwinding a solver scope: {pop_err}");
            }
            Err(err)
        }
    }
}

/// Drop-guard form of [`with_scope`] for callers that need to hold a scope
/// across non-closure-shaped control flow.
pub struct ScopedSolver<'a, S: Solver + ?Sized> {
    solver: &'a mut S,
}

impl<'a, S: Solver + ?Sized> ScopedSolver<'a, S> {
    pub fn new(solver: &'a mut S) -> Result<Self, SolverError> {
        solver.push()?;
        Ok(Self { solver })
    }
}

impl<S: Solver + ?Sized> Deref for ScopedSolver<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.solver
    }
}

impl<S: Solver + ?Sized> DerefMut for ScopedSolver<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.solver
    }
}

impl<S: Solver + ?Sized> Drop for ScopedSolver<'_, S> {
    fn drop(&mut self) {
        if let Err(err) = self.solver.pop() {
            tracing::warn!("pop failed while dropping a solver scope: {err}");
        }
    }
}
