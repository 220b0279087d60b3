use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Last issued id, shared by every client in the process.
static LAST_EVENT_ID: AtomicU64 = AtomicU64::new(0);

fn now_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX))
}

/// `evt_<n>`, where `n` follows the wall clock in nanoseconds but never repeats
/// or goes backwards, even under concurrent callers.
pub(crate) fn next_event_id() -> String {
    let now = now_nanos();
    let next = |last: u64| now.max(last.saturating_add(1));
    let previous = match LAST_EVENT_ID.fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
        Some(next(last))
    }) {
        Ok(previous) | Err(previous) => previous,
    };
    format!("evt_{}", next(previous))
}
