//! Time management utilities

use std::time::Instant;

/// Monotonic clock for frame timestamps
///
/// Timestamps are milliseconds since the clock was created, mirroring a
/// high-resolution page clock.
#[derive(Debug)]
pub struct FrameClock {
    epoch: Instant,
    last_frame: Option<f64>,
    delta_ms: f64,
    frame_count: u64,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock {
    /// Create a new clock starting at zero
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
            last_frame: None,
            delta_ms: 0.0,
            frame_count: 0,
        }
    }

    /// Milliseconds elapsed since the clock was created
    pub fn now_ms(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64() * 1000.0
    }

    /// Mark the start of a frame and return its timestamp
    pub fn begin_frame(&mut self) -> f64 {
        let now = self.now_ms();
        self.delta_ms = self.last_frame.map_or(0.0, |last| now - last);
        self.last_frame = Some(now);
        self.frame_count += 1;
        now
    }

    /// Time between the two most recent frames in milliseconds
    pub fn delta_ms(&self) -> f64 {
        self.delta_ms
    }

    /// Number of frames started so far
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Current FPS based on the last frame delta
    pub fn current_fps(&self) -> f64 {
        if self.delta_ms > 0.0 {
            1000.0 / self.delta_ms
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_are_monotonic() {
        let mut clock = FrameClock::new();
        let first = clock.begin_frame();
        let second = clock.begin_frame();

        assert!(second >= first);
        assert!(clock.delta_ms() >= 0.0);
        assert_eq!(clock.frame_count(), 2);
    }

    #[test]
    fn test_first_frame_has_no_delta() {
        let mut clock = FrameClock::new();
        clock.begin_frame();
        assert_eq!(clock.delta_ms(), 0.0);
        assert_eq!(clock.current_fps(), 0.0);
    }
}
