//! Opt-in wire trace, enabled with `FRAME_RELAY_TRACE=1`.

use once_cell::sync::Lazy;
use std::sync::atomic::{AtomicBool, Ordering};

static TRACE_ENABLED: Lazy<AtomicBool> = Lazy::new(|| {
    let on = std::env::var("FRAME_RELAY_TRACE")
        .map(|v| matches!(v.as_str(), "1" | "true" | "TRUE"))
        .unwrap_or(false);
    AtomicBool::new(on)
});

#[inline]
pub fn enabled() -> bool {
    TRACE_ENABLED.load(Ordering::Relaxed)
}

#[inline]
pub fn set_enabled(on: bool) {
    TRACE_ENABLED.store(on, Ordering::Relaxed)
}

#[inline]
pub fn out_msg(peer: &str, what: &str) {
    if enabled() {
        tracing::info!(target: "protocol_trace", "OUT {} {}", peer, what);
    }
}

#[inline]
pub fn in_msg(peer: &str, what: &str) {
    if enabled() {
        tracing::info!(target: "protocol_trace", "IN  {} {}", peer, what);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggles() {
        let before = enabled();
        set_enabled(true);
        assert!(enabled());
        out_msg("origin", "marc 0");
        set_enabled(before);
    }
}
