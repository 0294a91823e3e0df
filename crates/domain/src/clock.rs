use chrono::{DateTime, SubsecRound, Utc};

/// Returns the current UTC time truncated to the microsecond precision kept by storage.
#[must_use]
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}
