//! Frame timing for the render loop.
//!
//! [`FrameClock`] turns wall-clock frames into the `(elapsed, delta)` pair
//! the engine consumes. Deltas are clamped so a stalled frame (window drag,
//! breakpoint) does not fling every particle across the screen.
//!
//! ```ignore
//! let mut clock = FrameClock::new();
//!
//! // every frame
//! let frame = clock.frame_input(pointer);
//! engine.update(&frame, Some(&source));
//! ```

use std::time::{Duration, Instant};

use glam::Vec3;

use crate::simulation::FrameInput;

/// Longest delta a single frame may report, in seconds.
pub const DEFAULT_MAX_DELTA: f32 = 0.1;

/// Elapsed and delta time for the render loop.
#[derive(Debug)]
pub struct FrameClock {
    last_frame: Instant,
    elapsed_secs: f32,
    delta_secs: f32,
    frame_count: u64,
    fps: f32,
    fps_frame_count: u64,
    fps_update_time: Instant,
    fps_update_interval: Duration,
    paused: bool,
    /// Fixed delta time for deterministic updates (optional).
    fixed_delta: Option<f32>,
    time_scale: f32,
    max_delta: f32,
}

impl FrameClock {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            last_frame: now,
            elapsed_secs: 0.0,
            delta_secs: 0.0,
            frame_count: 0,
            fps: 0.0,
            fps_frame_count: 0,
            fps_update_time: now,
            fps_update_interval: Duration::from_millis(500),
            paused: false,
            fixed_delta: None,
            time_scale: 1.0,
            max_delta: DEFAULT_MAX_DELTA,
        }
    }

    /// Measure the wall-clock frame and advance. Returns `(elapsed, delta)`.
    pub fn tick(&mut self) -> (f32, f32) {
        let now = Instant::now();
        let raw_delta = now.duration_since(self.last_frame).as_secs_f32();
        self.last_frame = now;

        let out = self.advance(raw_delta);

        let fps_elapsed = now.duration_since(self.fps_update_time);
        if fps_elapsed >= self.fps_update_interval {
            let frames_since = self.frame_count - self.fps_frame_count;
            self.fps = frames_since as f32 / fps_elapsed.as_secs_f32();
            self.fps_frame_count = self.frame_count;
            self.fps_update_time = now;
        }
        out
    }

    /// Advance by a measured delta of `raw_delta` seconds.
    ///
    /// The fixed delta (if set) replaces the measurement, the result is
    /// clamped to `max_delta` and then scaled. Paused clocks report 0.
    pub fn advance(&mut self, raw_delta: f32) -> (f32, f32) {
        if self.paused {
            self.delta_secs = 0.0;
            return (self.elapsed_secs, self.delta_secs);
        }

        let delta = self.fixed_delta.unwrap_or(raw_delta).clamp(0.0, self.max_delta);
        self.delta_secs = delta * self.time_scale;
        self.elapsed_secs += self.delta_secs;
        self.frame_count += 1;

        (self.elapsed_secs, self.delta_secs)
    }

    /// Tick and package the result with the pointer for the engine.
    pub fn frame_input(&mut self, pointer: Vec3) -> FrameInput {
        let (elapsed, delta) = self.tick();
        FrameInput::new(delta, elapsed, pointer)
    }

    #[inline]
    pub fn elapsed(&self) -> f32 {
        self.elapsed_secs
    }

    #[inline]
    pub fn delta(&self) -> f32 {
        self.delta_secs
    }

    #[inline]
    pub fn frame(&self) -> u64 {
        self.frame_count
    }

    /// Frames per second, refreshed twice a second.
    #[inline]
    pub fn fps(&self) -> f32 {
        self.fps
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    #[inline]
    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    pub fn max_delta(&self) -> f32 {
        self.max_delta
    }

    /// While paused, `delta()` is 0 and `elapsed()` stops increasing.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        if self.paused {
            self.last_frame = Instant::now();
            self.paused = false;
        }
    }

    pub fn toggle_pause(&mut self) {
        if self.paused {
            self.resume();
        } else {
            self.pause();
        }
    }

    /// Pass `None` to use real frame timing.
    pub fn set_fixed_delta(&mut self, delta: Option<f32>) {
        self.fixed_delta = delta;
    }

    /// `1.0` is normal speed. Negative values clamp to 0.
    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = scale.max(0.0);
    }

    pub fn set_max_delta(&mut self, max_delta: f32) {
        self.max_delta = max_delta.max(0.0);
    }

    pub fn reset(&mut self) {
        let now = Instant::now();
        self.last_frame = now;
        self.elapsed_secs = 0.0;
        self.delta_secs = 0.0;
        self.frame_count = 0;
        self.fps = 0.0;
        self.fps_frame_count = 0;
        self.fps_update_time = now;
        self.paused = false;
    }
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_clock_new() {
        let clock = FrameClock::new();
        assert_eq!(clock.frame(), 0);
        assert!(!clock.is_paused());
        assert_eq!(clock.time_scale(), 1.0);
        assert_eq!(clock.max_delta(), DEFAULT_MAX_DELTA);
    }

    #[test]
    fn test_tick() {
        let mut clock = FrameClock::new();
        thread::sleep(Duration::from_millis(10));
        let (elapsed, delta) = clock.tick();

        assert!(elapsed > 0.0);
        assert!(delta > 0.0);
        assert_eq!(clock.frame(), 1);
    }

    #[test]
    fn test_fps_refreshes_after_interval() {
        let mut clock = FrameClock::new();
        clock.tick();
        assert_eq!(clock.fps(), 0.0);

        thread::sleep(Duration::from_millis(550));
        clock.tick();
        assert!(clock.fps() > 0.0);

        clock.reset();
        assert_eq!(clock.fps(), 0.0);
        assert_eq!(clock.frame(), 0);
    }

    #[test]
    fn test_long_frame_clamped() {
        let mut clock = FrameClock::new();
        let (elapsed, delta) = clock.advance(2.5);
        assert_eq!(delta, DEFAULT_MAX_DELTA);
        assert_eq!(elapsed, DEFAULT_MAX_DELTA);
    }

    #[test]
    fn test_pause() {
        let mut clock = FrameClock::new();
        clock.advance(0.016);

        clock.pause();
        let elapsed_before = clock.elapsed();
        clock.advance(0.016);

        assert_eq!(clock.elapsed(), elapsed_before);
        assert_eq!(clock.delta(), 0.0);

        clock.toggle_pause();
        assert!(!clock.is_paused());
    }

    #[test]
    fn test_time_scale() {
        let mut clock = FrameClock::new();
        clock.set_time_scale(2.0);
        let (_, delta) = clock.advance(0.01);
        assert!((delta - 0.02).abs() < 1e-6);

        clock.set_time_scale(-1.0);
        assert_eq!(clock.time_scale(), 0.0);
    }

    #[test]
    fn test_fixed_delta() {
        let mut clock = FrameClock::new();
        clock.set_fixed_delta(Some(1.0 / 60.0));

        thread::sleep(Duration::from_millis(30));
        let frame = clock.frame_input(Vec3::ZERO);

        assert!((frame.delta_time - 1.0 / 60.0).abs() < 1e-6);
        assert_eq!(frame.elapsed_time, clock.elapsed());
    }

    #[test]
    fn test_reset() {
        let mut clock = FrameClock::new();
        clock.advance(0.05);
        clock.reset();
        assert_eq!(clock.elapsed(), 0.0);
        assert_eq!(clock.frame(), 0);
    }
}
