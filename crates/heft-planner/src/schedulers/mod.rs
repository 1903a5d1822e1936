//! Planner implementations.

pub mod common;
pub mod heft;
pub mod random;
