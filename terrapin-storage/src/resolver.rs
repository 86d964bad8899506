//! Version resolution for the check flow

use chrono::{DateTime, Utc};

use crate::driver::StorageObjectVersion;

/// Decide which versions to report, given the caller's last-known baseline
/// and the backend's latest version.
///
/// With no baseline, the comparison point is the Unix epoch, so any
/// existing object counts as new. An empty backend yields nothing.
/// Otherwise the single latest version is reported iff its modification
/// time is strictly after the baseline.
///
/// Pure decision logic: the caller supplies both sides, nothing is fetched
/// or written here.
pub fn new_versions(
    baseline: Option<DateTime<Utc>>,
    latest: Option<StorageObjectVersion>,
) -> Vec<StorageObjectVersion> {
    let Some(latest) = latest else {
        return Vec::new();
    };

    let baseline = baseline.unwrap_or(DateTime::UNIX_EPOCH);
    if latest.last_modified > baseline {
        vec![latest]
    } else {
        Vec::new()
    }
}
