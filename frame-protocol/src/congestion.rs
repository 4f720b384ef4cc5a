//! AIMD congestion controllers.
//!
//! Two links are controlled, each with its own policy:
//!
//! - [`ViewerCongestion`] - integer window kept by the viewer against the
//!   relay. Doubles in slow start, reacts to checksum failures.
//! - [`OriginCongestion`] - floating window kept by the relay against the
//!   origin. Grows by a fixed step in slow start, tracks a smoothed RTT.
//!
//! The two policies differ on purpose and are kept as separate types.
//! Neither controller blocks or performs I/O; callers sharing one instance
//! across tasks must serialize calls (the relay wraps its controller in a
//! mutex).

use std::time::Duration;

/// Initial window of the viewer-side controller.
pub const VIEWER_INITIAL_WINDOW: u32 = 1;
/// Initial slow-start threshold of the viewer-side controller.
pub const VIEWER_INITIAL_THRESHOLD: u32 = 10;
/// Upper bound of the viewer-side window.
pub const VIEWER_MAX_WINDOW: u32 = 50;

/// Integer AIMD controller used by the viewer.
///
/// - success: `window *= 2` below threshold, else `window += 1`; capped at 50
/// - loss (checksum mismatch): `threshold = max(window / 2, 1)`, `window = 1`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerCongestion {
    window: u32,
    threshold: u32,
    max_window: u32,
}

impl Default for ViewerCongestion {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewerCongestion {
    /// Create a controller with window 1, threshold 10 and max window 50.
    pub fn new() -> Self {
        Self {
            window: VIEWER_INITIAL_WINDOW,
            threshold: VIEWER_INITIAL_THRESHOLD,
            max_window: VIEWER_MAX_WINDOW,
        }
    }

    /// Current congestion window.
    pub fn window(&self) -> u32 {
        self.window
    }

    /// Current slow-start threshold.
    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Returns true while the window is below the threshold.
    pub fn in_slow_start(&self) -> bool {
        self.window < self.threshold
    }

    /// Apply a successful, verified frame.
    pub fn on_success(&mut self) {
        if self.in_slow_start() {
            self.window = self.window.saturating_mul(2);
        } else {
            self.window = self.window.saturating_add(1);
        }
        self.window = self.window.min(self.max_window);
        tracing::debug!(window = self.window, threshold = self.threshold, "viewer window grew");
    }

    /// Apply a checksum failure.
    pub fn on_loss(&mut self) {
        self.threshold = (self.window / 2).max(1);
        self.window = 1;
        tracing::debug!(window = self.window, threshold = self.threshold, "viewer window reset");
    }
}

/// Tunables for [`OriginCongestion`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OriginCongestionParams {
    /// Starting window.
    pub initial_window: f64,
    /// Starting slow-start threshold.
    pub initial_threshold: f64,
    /// Window step per success during slow start.
    pub additive_increase: f64,
    /// Factor applied to the window on loss.
    pub multiplicative_decrease: f64,
    /// Lowest threshold a loss can set.
    pub floor_threshold: f64,
    /// Upper bound of the window.
    pub max_window: f64,
    /// Smoothed RTT before the first sample.
    pub initial_rtt: Duration,
}

impl Default for OriginCongestionParams {
    fn default() -> Self {
        Self {
            initial_window: 1.0,
            initial_threshold: 16.0,
            additive_increase: 1.0,
            multiplicative_decrease: 0.5,
            floor_threshold: 2.0,
            max_window: 64.0,
            initial_rtt: Duration::from_millis(50),
        }
    }
}

impl OriginCongestionParams {
    /// Check the parameters describe a usable controller.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid parameter.
    pub fn validate(&self) -> Result<(), String> {
        if !(self.initial_window >= 1.0) {
            return Err("initial window must be at least 1".to_string());
        }
        if !(self.initial_threshold >= 1.0) {
            return Err("initial threshold must be at least 1".to_string());
        }
        if !(self.floor_threshold >= 1.0) {
            return Err("floor threshold must be at least 1".to_string());
        }
        if !(self.additive_increase > 0.0) {
            return Err("additive increase must be positive".to_string());
        }
        if !(self.multiplicative_decrease > 0.0 && self.multiplicative_decrease < 1.0) {
            return Err("multiplicative decrease must be in (0, 1)".to_string());
        }
        if !(self.max_window >= self.initial_window) {
            return Err("max window must be at least the initial window".to_string());
        }
        Ok(())
    }
}

/// Point-in-time view of an [`OriginCongestion`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CongestionSnapshot {
    pub window: f64,
    pub threshold: f64,
    pub smoothed_rtt: Duration,
}

/// Floating-point AIMD controller used by the relay on its origin link.
///
/// - success(rtt): `srtt = 0.875 srtt + 0.125 rtt`; `window += step` below
///   threshold, else `window += 1 / window`; capped at `max_window`
/// - loss: `threshold = max(floor(window / 2), floor_threshold)`,
///   `window = max(1, window * decrease)`
#[derive(Debug, Clone)]
pub struct OriginCongestion {
    window: f64,
    threshold: f64,
    smoothed_rtt: Duration,
    params: OriginCongestionParams,
}

impl Default for OriginCongestion {
    fn default() -> Self {
        Self::new(OriginCongestionParams::default())
    }
}

impl OriginCongestion {
    /// Create a controller from validated parameters.
    pub fn new(params: OriginCongestionParams) -> Self {
        Self {
            window: params.initial_window,
            threshold: params.initial_threshold,
            smoothed_rtt: params.initial_rtt,
            params,
        }
    }

    /// Current congestion window.
    pub fn window(&self) -> f64 {
        self.window
    }

    /// Current slow-start threshold.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Current smoothed round-trip time.
    pub fn smoothed_rtt(&self) -> Duration {
        self.smoothed_rtt
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> CongestionSnapshot {
        CongestionSnapshot {
            window: self.window,
            threshold: self.threshold,
            smoothed_rtt: self.smoothed_rtt,
        }
    }

    /// Apply a completed origin round trip that took `rtt`.
    pub fn on_success(&mut self, rtt: Duration) {
        self.smoothed_rtt = self.smoothed_rtt.mul_f64(0.875) + rtt.mul_f64(0.125);
        if self.window < self.threshold {
            self.window += self.params.additive_increase;
        } else {
            self.window += 1.0 / self.window;
        }
        self.window = self.window.min(self.params.max_window);
        tracing::debug!(
            window = self.window,
            threshold = self.threshold,
            srtt_ms = self.smoothed_rtt.as_secs_f64() * 1000.0,
            "origin round trip succeeded"
        );
    }

    /// Apply a transmission failure on the origin link.
    pub fn on_loss(&mut self) {
        self.threshold = (self.window / 2.0).floor().max(self.params.floor_threshold);
        self.window = (self.window * self.params.multiplicative_decrease).max(1.0);
        tracing::debug!(
            window = self.window,
            threshold = self.threshold,
            "origin transmission failure"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn debug_log_of(f: impl FnOnce()) -> String {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        let bytes = buffer.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn viewer_transitions_logged_at_debug() {
        let log = debug_log_of(|| {
            let mut cc = ViewerCongestion::new();
            cc.on_success();
            cc.on_loss();
        });
        assert!(log.contains("viewer window grew"), "{log}");
        assert!(log.contains("viewer window reset"), "{log}");
    }

    #[test]
    fn origin_transitions_logged_at_debug() {
        let log = debug_log_of(|| {
            let mut cc = OriginCongestion::default();
            cc.on_success(Duration::from_millis(10));
            cc.on_loss();
        });
        assert!(log.contains("origin round trip succeeded"), "{log}");
        assert!(log.contains("origin transmission failure"), "{log}");
    }

    #[test]
    fn viewer_window_doubles_then_increments() {
        let mut cc = ViewerCongestion::new();
        let mut seen = Vec::new();
        for _ in 0..8 {
            cc.on_success();
            seen.push(cc.window());
        }
        assert_eq!(seen, vec![2, 4, 8, 16, 17, 18, 19, 20]);
    }

    #[test]
    fn viewer_window_capped_at_50() {
        let mut cc = ViewerCongestion::new();
        for _ in 0..200 {
            cc.on_success();
            assert!(cc.window() <= VIEWER_MAX_WINDOW);
        }
        assert_eq!(cc.window(), 50);
    }

    #[test]
    fn viewer_loss_resets_window() {
        let mut cc = ViewerCongestion::new();
        for _ in 0..5 {
            cc.on_success();
        }
        assert_eq!(cc.window(), 17);

        cc.on_loss();
        assert_eq!(cc.window(), 1);
        assert_eq!(cc.threshold(), 8);

        cc.on_loss();
        assert_eq!(cc.window(), 1);
        assert_eq!(cc.threshold(), 1);
    }

    #[test]
    fn origin_slow_start_is_additive() {
        let mut cc = OriginCongestion::default();
        for expected in 2..=16 {
            cc.on_success(Duration::from_millis(50));
            assert!((cc.window() - f64::from(expected)).abs() < 1e-9);
        }

        // At threshold: congestion avoidance adds 1/window.
        cc.on_success(Duration::from_millis(50));
        assert!((cc.window() - (16.0 + 1.0 / 16.0)).abs() < 1e-9);
    }

    #[test]
    fn origin_window_capped() {
        let params = OriginCongestionParams {
            max_window: 4.0,
            ..OriginCongestionParams::default()
        };
        let mut cc = OriginCongestion::new(params);
        for _ in 0..50 {
            cc.on_success(Duration::from_millis(1));
        }
        assert!((cc.window() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn origin_rtt_is_smoothed() {
        let mut cc = OriginCongestion::default();
        cc.on_success(Duration::from_millis(130));
        // 0.875 * 50 + 0.125 * 130 = 60
        assert_eq!(cc.smoothed_rtt().as_millis(), 60);
    }

    #[test]
    fn origin_loss_halves_window() {
        let mut cc = OriginCongestion::default();
        for _ in 0..9 {
            cc.on_success(Duration::from_millis(10));
        }
        assert!((cc.window() - 10.0).abs() < 1e-9);

        cc.on_loss();
        assert!((cc.window() - 5.0).abs() < 1e-9);
        assert!((cc.threshold() - 5.0).abs() < 1e-9);

        cc.on_loss();
        assert!((cc.window() - 2.5).abs() < 1e-9);
        assert!((cc.threshold() - 2.0).abs() < 1e-9);

        for _ in 0..5 {
            cc.on_loss();
        }
        assert!((cc.window() - 1.0).abs() < 1e-9);
        assert!((cc.threshold() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn origin_params_validation() {
        assert!(OriginCongestionParams::default().validate().is_ok());

        let bad = OriginCongestionParams {
            multiplicative_decrease: 1.5,
            ..OriginCongestionParams::default()
        };
        assert!(bad.validate().is_err());

        let bad = OriginCongestionParams {
            initial_window: f64::NAN,
            ..OriginCongestionParams::default()
        };
        assert!(bad.validate().is_err());
    }
}
