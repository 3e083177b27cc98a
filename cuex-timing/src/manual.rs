use crate::timer::{push_bounded, CalibrationStats, Timer};
use chrono::{DateTime, Local};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Clock that only moves when told to. `sleep` advances it, so a session loop driven by
/// this timer runs as fast as the CPU allows while seeing exact, reproducible timestamps.
#[derive(Debug, Clone)]
pub struct ManualTimer {
    now_ns: Arc<AtomicU64>,
    origin_wall: DateTime<Local>,
    frame_times: VecDeque<Duration>,
    max_samples: usize,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::with_origin(Local::now())
    }

    pub fn with_origin(origin_wall: DateTime<Local>) -> Self {
        Self {
            now_ns: Arc::new(AtomicU64::new(0)),
            origin_wall,
            frame_times: VecDeque::new(),
            max_samples: 10_000,
        }
    }

    pub fn advance(&self, d: Duration) {
        self.now_ns.fetch_add(d.as_nanos() as u64, Ordering::SeqCst);
    }

    /// Moves the clock forward to `at_ns`; never moves it backwards
    pub fn advance_to(&self, at_ns: u64) {
        self.now_ns.fetch_max(at_ns, Ordering::SeqCst);
    }
}

impl Default for ManualTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer for ManualTimer {
    fn now(&self) -> u64 {
        self.now_ns.load(Ordering::SeqCst)
    }
    fn sleep(&self, d: Duration) {
        self.advance(d);
    }
    fn record_frame(&mut self, d: Duration) {
        push_bounded(&mut self.frame_times, self.max_samples, d);
    }
    fn reset_frames(&mut self) {
        self.frame_times.clear();
    }
    fn calibration_stats(&self) -> CalibrationStats {
        CalibrationStats::from_frames(&self.frame_times)
    }
    fn origin_wall(&self) -> DateTime<Local> {
        self.origin_wall
    }
}
