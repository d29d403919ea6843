/// Row ids (`BIGSERIAL` in every table).
pub type DbId = i64;

/// Instants are stored and exchanged in UTC; local time only exists
/// inside the availability engine.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
