//! Command implementations

pub mod bootstrap;
pub mod check;
