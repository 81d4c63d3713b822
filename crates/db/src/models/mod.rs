//! Row structs and DTOs.
//!
//! Each submodule contains a `FromRow` + `Serialize` entity struct matching
//! the database row, plus any typed helpers for columns stored as TEXT.

pub mod benchmark_run;
pub mod drive;
pub mod notification;
pub mod schedule;
pub mod smart_cache;
