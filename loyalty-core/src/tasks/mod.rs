// loyalty-core/src/tasks/mod.rs

pub mod status_sweep;

pub use status_sweep::{SweepReport, run_status_sweep, spawn_status_sweep};
