//! Time utilities for runs and ledger timestamps

use std::time::Instant;

use chrono::Utc;

/// Current Unix timestamp in seconds (used for `last_played`)
pub fn unix_secs() -> i64 {
    Utc::now().timestamp()
}

/// Default animation frame rate
pub const DEFAULT_FPS: u32 = 30;

/// Duration of one simulation step in seconds at the given frame rate
pub fn step_seconds(fps: u32) -> f32 {
    1.0 / fps.max(1) as f32
}

/// Length in seconds of a frame sequence played back at `fps`
pub fn playback_seconds(frames: usize, fps: u32) -> f32 {
    frames as f32 * step_seconds(fps)
}

/// A simple timer for measuring how long a run takes
#[derive(Debug, Clone)]
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
