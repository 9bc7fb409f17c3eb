use std::cmp::Ordering;

use common::models::StreamStatus;

/// Live channels first, then by viewer count, highest first.
pub fn compare(a: &StreamStatus, b: &StreamStatus) -> Ordering {
    b.is_live
        .cmp(&a.is_live)
        .then(b.viewer_count.cmp(&a.viewer_count))
}

/// Stable, so ties keep the order they were emitted in.
pub fn sort_statuses(statuses: &mut [StreamStatus]) {
    statuses.sort_by(compare);
}
