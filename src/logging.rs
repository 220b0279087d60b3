//! Diagnostics plumbing.
//!
//! The client never installs a global subscriber. A [`tracing::Dispatch`] passed
//! through [`Config::dispatch`](crate::Config::dispatch) scopes its background
//! tasks to that subscriber; otherwise they log to the global default.

use std::borrow::Cow;

use tracing::Dispatch;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the filter directives read by [`dispatch_from_env`].
pub const LOG_FILTER_ENV: &str = "AZREALTIME_LOG";

const DEFAULT_FILTER: &str = "info";
pub(crate) const TRACE_LOG_MAX_BYTES: usize = 1024;
const TRACE_TRUNCATE_SUFFIX: &str = "... (truncated)";

/// A formatting subscriber filtered by [`LOG_FILTER_ENV`], defaulting to `info`.
#[must_use]
pub fn dispatch_from_env() -> Dispatch {
    let filter =
        EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    fmt_dispatch(filter)
}

/// A formatting subscriber using explicit filter directives such as
/// `"azure_rt_rs=debug"`.
#[must_use]
pub fn dispatch_with_filter(directives: &str) -> Dispatch {
    fmt_dispatch(EnvFilter::new(directives))
}

fn fmt_dispatch(filter: EnvFilter) -> Dispatch {
    Dispatch::new(
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .finish(),
    )
}

pub(crate) fn safe_truncate(s: &str, max_bytes: usize) -> Cow<'_, str> {
    if s.len() <= max_bytes {
        return Cow::Borrowed(s);
    }

    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    Cow::Owned(format!(
        "{}{TRACE_TRUNCATE_SUFFIX} {} bytes",
        &s[..end],
        s.len() - end
    ))
}
