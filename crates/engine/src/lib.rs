//! Orchestration engine.
//!
//! Ties the leaf crates together: benchmark execution (two-phase state
//! machine with per-drive exclusion), disk discovery, the diagnostic poll
//! cycle, and cron-schedule reconciliation.

pub mod benchmark;
pub mod discovery;
pub mod guard;
pub mod monitor;
pub mod profiles;
pub mod schedule;

pub use benchmark::BenchmarkEngine;
pub use discovery::Discovery;
pub use monitor::SmartMonitor;
pub use schedule::ScheduleManager;
