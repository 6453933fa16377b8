//! The counterexample-guided abstraction refinement loop and its pluggable
//! parts: configuration, refinement-fact collectors, the four phase
//! interfaces and the driver.

pub mod collect;
pub mod config;
pub mod observe;
pub mod phases;
pub mod run;
