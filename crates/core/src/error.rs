//! Domain error taxonomy.
//!
//! Every orchestration operation surfaces one of these variants. Layer
//! crates (db, tsdb, probes, notify) define their own `thiserror` enums and
//! convert into [`CoreError`] at the engine boundary.

use thiserror::Error;

/// Domain-level error shared across the workspace.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A referenced entity does not exist. The operation aborts early with
    /// no partial mutation.
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: String },

    /// Input rejected before any persistence (malformed cron expression,
    /// malformed channel config, out-of-range parameter).
    #[error("Validation error: {0}")]
    Validation(String),

    /// The operation conflicts with current state (e.g. deleting a run that
    /// is still active). Nothing is mutated.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// An external utility failed to start, exited without a parseable
    /// payload, or produced garbage.
    #[error("Process error: {0}")]
    Process(String),

    /// An outbound notification could not be delivered. Isolated to the
    /// affected channel, never propagated to sibling deliveries.
    #[error("Delivery error: {0}")]
    Delivery(String),

    /// Unexpected infrastructure failure (database, time-series store).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Shorthand for a [`CoreError::NotFound`] with a displayable id.
    pub fn not_found(entity: &'static str, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}
