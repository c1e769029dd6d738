//! Freshness decision for oracle data.

use crate::oracle::UpdateMetadata;

/// Whether the oracle's data is due for a refresh at `now` (unix seconds).
///
/// A zero recommended duration means the oracle has no refresh policy and is
/// never stale. The boundary is inclusive. A `now` earlier than the last update
/// (clock skew) is treated as fresh.
pub fn is_stale(metadata: &UpdateMetadata, now: u64) -> bool {
    if metadata.recommended_update_duration == 0 {
        return false;
    }
    match now.checked_sub(metadata.last_update_timestamp) {
        Some(elapsed) => elapsed >= metadata.recommended_update_duration,
        None => false,
    }
}

/// Current unix time in seconds.
pub fn unix_now() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0)
}
