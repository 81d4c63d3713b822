/// Database row identifier.
pub type DbId = i64;

/// UTC timestamp used across the domain.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
