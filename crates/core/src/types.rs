/// Surrogate primary keys are BIGSERIAL.
pub type DbId = i64;

/// Job identifiers are minted from a shared BIGINT sequence.
pub type JobId = i64;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
