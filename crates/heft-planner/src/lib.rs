#![doc = include_str!("../README.md")]

pub mod cluster;
pub mod config;
pub mod context;
pub mod cost;
pub mod data_item;
pub mod error;
pub mod log;
pub mod lower_bound;
pub mod network;
pub mod parsers;
pub mod planner;
pub mod report;
pub mod run_stats;
pub mod schedule;
pub mod schedulers;
pub mod simulation;
pub mod simulator;
pub mod task;
pub mod trace_log;
pub mod workflow;

pub use colored;
pub use context::SimulationContext;
pub use simulation::{RunResult, WorkflowSimulation};
