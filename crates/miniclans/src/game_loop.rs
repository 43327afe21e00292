//! # Frame Clock
//!
//! Paces the simulation thread at a target frame rate.
//!
//! ```text
//! ┌── frame N ─────────────────────────────────────────┐
//! │ begin_frame()  -> dt since frame N-1 (max 0.1 s)   │
//! │ tick match, apply inbound actions                  │
//! │ wait_for_next_frame()  -> sleep the rest of budget │
//! └────────────────────────────────────────────────────┘
//! ```
//!
//! The clamp keeps a stalled process (debugger, suspended laptop) from
//! teleporting troops across the grid on the next frame. Resource accrual
//! is unaffected because it reads the wall clock directly.

use std::time::{Duration, Instant};

/// Longest simulated step in seconds.
pub const MAX_FRAME_DELTA: f32 = 0.1;

/// Frame timing statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameStats {
    /// Frames started.
    pub frames: u64,
    /// Frames whose raw delta exceeded the clamp.
    pub clamped: u64,
}

/// Frame pacing for the simulation thread.
#[derive(Debug)]
pub struct FrameClock {
    frame_time: Duration,
    last_frame: Instant,
    stats: FrameStats,
}

impl FrameClock {
    /// Creates a clock targeting `fps` frames per second.
    #[must_use]
    pub fn new(fps: u32) -> Self {
        let fps = u64::from(fps.max(1));
        Self {
            frame_time: Duration::from_micros(1_000_000 / fps),
            last_frame: Instant::now(),
            stats: FrameStats::default(),
        }
    }

    /// Target duration of one frame.
    #[must_use]
    pub const fn frame_time(&self) -> Duration {
        self.frame_time
    }

    /// Starts a frame and returns the clamped delta in seconds.
    pub fn begin_frame(&mut self) -> f32 {
        self.begin_frame_at(Instant::now())
    }

    /// Starts a frame at `now`.
    pub fn begin_frame_at(&mut self, now: Instant) -> f32 {
        let raw = now.saturating_duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;
        self.stats.frames += 1;
        if raw > MAX_FRAME_DELTA {
            self.stats.clamped += 1;
        }
        clamp_delta(raw)
    }

    /// Sleeps until the current frame's budget is used up.
    pub fn wait_for_next_frame(&self) {
        let elapsed = self.last_frame.elapsed();
        if elapsed < self.frame_time {
            std::thread::sleep(self.frame_time - elapsed);
        }
    }

    /// Frames started so far.
    #[must_use]
    pub const fn frame_count(&self) -> u64 {
        self.stats.frames
    }

    /// Timing statistics.
    #[must_use]
    pub const fn stats(&self) -> FrameStats {
        self.stats
    }
}

/// Clamps a raw frame delta into `[0, MAX_FRAME_DELTA]`.
#[inline]
#[must_use]
pub fn clamp_delta(raw: f32) -> f32 {
    if raw.is_finite() {
        raw.clamp(0.0, MAX_FRAME_DELTA)
    } else {
        0.0
    }
}
