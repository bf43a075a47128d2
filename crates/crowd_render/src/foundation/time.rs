//! Frame timing utilities

use std::time::Instant;

/// High-precision timer for per-frame delta times
///
/// Owned by the animation driver, not this crate's renderer; the renderer
/// only ever sees the delta value passed into `tick`.
pub struct FrameTimer {
    last_frame: Instant,
    delta_time: f32,
    total_time: f32,
    frame_count: u64,
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameTimer {
    /// Create a new timer
    #[must_use]
    pub fn new() -> Self {
        Self {
            last_frame: Instant::now(),
            delta_time: 0.0,
            total_time: 0.0,
            frame_count: 0,
        }
    }

    /// Update the timer; call once per frame
    pub fn update(&mut self) {
        let now = Instant::now();
        self.delta_time = now.duration_since(self.last_frame).as_secs_f32();
        self.total_time += self.delta_time;
        self.last_frame = now;
        self.frame_count += 1;
    }

    /// Time since the last frame in seconds
    #[must_use]
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    /// Total elapsed time since timer creation
    #[must_use]
    pub fn total_time(&self) -> f32 {
        self.total_time
    }

    /// Number of frames observed so far
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}
