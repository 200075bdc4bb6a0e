use tracing::debug;
use tracing::warn;

const HANDLER_ERROR_LIMIT: u32 = 3;

pub(in super::super) fn should_restart_handler(consecutive_errors: u32) -> bool {
    consecutive_errors >= HANDLER_ERROR_LIMIT
}

fn should_ignore_handler_error(message_lower: &str) -> bool {
    // Dropped in-flight CDP requests surface as oneshot cancellations.
    if message_lower.contains("oneshot") {
        return true;
    }

    // Per-target failures while the connection itself is healthy, e.g. the
    // watch page navigating or its tab being closed.
    const TRANSIENT_SUBSTRINGS: &[&str] = &[
        "no such session",
        "session closed",
        "target closed",
        "context destroyed",
        "execution context was destroyed",
        "cannot find context",
    ];

    TRANSIENT_SUBSTRINGS
        .iter()
        .any(|needle| message_lower.contains(needle))
}

/// Folds one handler event into the error streak; true means the connection
/// should be dropped.
pub(in super::super) fn should_stop_handler<E: std::fmt::Display>(
    result: std::result::Result<(), E>,
    consecutive_errors: &mut u32,
) -> bool {
    let Err(err) = result else {
        *consecutive_errors = 0;
        return false;
    };
    let message = err.to_string();
    if should_ignore_handler_error(&message.to_ascii_lowercase()) {
        *consecutive_errors = 0;
        debug!("CDP handler error ignored: {message}");
        return false;
    }
    *consecutive_errors = consecutive_errors.saturating_add(1);
    let count = *consecutive_errors;
    debug!("CDP handler error: {message} (count: {count})");
    if should_restart_handler(count) {
        warn!("CDP handler errors exceeded limit; dropping browser connection");
        return true;
    }
    false
}
