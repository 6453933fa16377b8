//! External solver backends.

pub mod smtlib;
