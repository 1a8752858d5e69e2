//! Scroll motion rendering.
//!
//! Converts discrete, irregularly-timed position targets into continuous
//! frame-accurate motion. The renderer is a pure state transition over
//! elapsed time: the embedding application calls [`MotionRenderer::tick`]
//! at its own render cadence (nominally 16 ms), and the renderer chases the
//! latest target with a bounded-duration cubic ease. It never self-drives
//! and never moves backward except through an explicit reset.

use serde::Serialize;
use std::time::Duration;

/// Renderer lifecycle: `Idle -> Scrolling -> Paused -> Scrolling -> Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrollState {
    Idle,
    Scrolling,
    Paused,
}

#[derive(Debug, Clone, Copy)]
struct Animation {
    from: f64,
    to: f64,
    duration: Duration,
    elapsed: Duration,
}

/// Chases a pixel target with bounded-duration easing.
pub struct MotionRenderer {
    state: ScrollState,
    /// Currently displayed pixel position
    position: f64,
    /// Latest committed target (snapshot read by the render path)
    target: f64,
    /// Maximum scrollable extent; reaching it halts automatic ticking
    max_extent: f64,
    animation: Option<Animation>,
    min_duration: Duration,
    max_duration: Duration,
}

impl MotionRenderer {
    pub fn new(max_extent: f64, min_duration_ms: u64, max_duration_ms: u64) -> Self {
        Self {
            state: ScrollState::Idle,
            position: 0.0,
            target: 0.0,
            max_extent: max_extent.max(0.0),
            animation: None,
            min_duration: Duration::from_millis(min_duration_ms),
            max_duration: Duration::from_millis(max_duration_ms.max(min_duration_ms)),
        }
    }

    pub fn state(&self) -> ScrollState {
        self.state
    }

    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    pub fn max_extent(&self) -> f64 {
        self.max_extent
    }

    /// Store a new target and begin easing toward it from the current
    /// position. Does not jump.
    ///
    /// `px_per_sec` is the expected reading speed in pixels; faster speech
    /// yields a snappier catch-up. The resulting duration is clamped to the
    /// configured range so catch-up is neither a visible jump nor a sluggish
    /// lag. Targets behind the current position are held rather than causing
    /// backward motion.
    pub fn set_target(&mut self, target: f64, px_per_sec: f64) {
        let target = target.clamp(0.0, self.max_extent);
        self.target = target;

        // Backward targets never produce backward motion; only reset does.
        if target <= self.position {
            self.animation = None;
            return;
        }

        let distance = target - self.position;
        let duration = if px_per_sec > f64::EPSILON {
            let secs = distance / px_per_sec;
            Duration::from_secs_f64(secs).clamp(self.min_duration, self.max_duration)
        } else {
            self.max_duration
        };

        self.animation = Some(Animation {
            from: self.position,
            to: target,
            duration,
            elapsed: Duration::ZERO,
        });

        if self.state == ScrollState::Idle {
            self.state = ScrollState::Scrolling;
        }
    }

    /// Advance displayed position by one frame interval.
    ///
    /// Returns the position after the tick. No-op while paused or idle.
    pub fn tick(&mut self, dt: Duration) -> f64 {
        if self.state != ScrollState::Scrolling {
            return self.position;
        }

        if let Some(anim) = self.animation.as_mut() {
            anim.elapsed += dt;
            if anim.elapsed >= anim.duration {
                // Land exactly on the target, never past it
                self.position = anim.to;
                self.animation = None;
            } else {
                let t = anim.elapsed.as_secs_f64() / anim.duration.as_secs_f64();
                let eased = ease_in_out_cubic(t);
                let next = anim.from + (anim.to - anim.from) * eased;
                // Monotonic by construction; clamp guards accumulated error
                self.position = next.max(self.position);
            }
        }

        if self.animation.is_none() && self.position >= self.max_extent {
            self.state = ScrollState::Idle;
        }

        self.position
    }

    /// Whether no animation is in flight (the display sits on its target).
    pub fn is_settled(&self) -> bool {
        self.animation.is_none()
    }

    /// Suspend ticking without losing the target or current position.
    pub fn pause(&mut self) {
        if self.state == ScrollState::Scrolling {
            self.state = ScrollState::Paused;
        }
    }

    pub fn resume(&mut self) {
        if self.state == ScrollState::Paused {
            self.state = ScrollState::Scrolling;
        }
    }

    /// Cancel any in-flight animation and jump back to the top.
    pub fn reset(&mut self) {
        self.jump_to(0.0);
    }

    /// Cancel any in-flight animation and place the display at `position`.
    /// The only path that may move the display backward.
    pub fn jump_to(&mut self, position: f64) {
        self.animation = None;
        self.position = position.clamp(0.0, self.max_extent);
        self.target = self.position;
        self.state = ScrollState::Idle;
    }
}

/// Cubic ease-in-out over normalized time `t` in [0, 1].
fn ease_in_out_cubic(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        let u = -2.0 * t + 2.0;
        1.0 - u * u * u / 2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRAME: Duration = Duration::from_millis(16);

    fn renderer() -> MotionRenderer {
        MotionRenderer::new(10_000.0, 150, 1200)
    }

    fn tick_for(r: &mut MotionRenderer, total_ms: u64) {
        let mut elapsed = 0;
        while elapsed < total_ms {
            r.tick(FRAME);
            elapsed += 16;
        }
    }

    #[test]
    fn test_ease_endpoints() {
        assert_eq!(ease_in_out_cubic(0.0), 0.0);
        assert_eq!(ease_in_out_cubic(1.0), 1.0);
        assert!((ease_in_out_cubic(0.5) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_ease_monotonic() {
        let mut prev = 0.0;
        for i in 0..=100 {
            let v = ease_in_out_cubic(i as f64 / 100.0);
            assert!(v >= prev);
            prev = v;
        }
    }

    #[test]
    fn test_set_target_does_not_jump() {
        let mut r = renderer();
        r.set_target(500.0, 300.0);
        assert_eq!(r.position(), 0.0);
        assert_eq!(r.state(), ScrollState::Scrolling);
    }

    #[test]
    fn test_reaches_target_exactly_without_overshoot() {
        let mut r = renderer();
        r.set_target(1000.0, 300.0);

        // 1000px at 300px/s wants ~3.3s, clamped to the 1200ms max
        tick_for(&mut r, 1300);
        assert_eq!(r.position(), 1000.0);

        // Further ticks hold position
        r.tick(FRAME);
        assert_eq!(r.position(), 1000.0);
    }

    #[test]
    fn test_position_never_decreases_for_nondecreasing_targets() {
        let mut r = renderer();
        let targets = [100.0, 250.0, 250.0, 600.0, 610.0, 2000.0];
        let mut prev = 0.0;

        for &target in &targets {
            r.set_target(target, 500.0);
            for _ in 0..10 {
                let pos = r.tick(FRAME);
                assert!(pos >= prev, "position went backward: {pos} < {prev}");
                prev = pos;
            }
        }
    }

    #[test]
    fn test_backward_target_holds_position() {
        let mut r = renderer();
        r.set_target(800.0, 400.0);
        tick_for(&mut r, 2000);
        assert_eq!(r.position(), 800.0);

        r.set_target(300.0, 400.0);
        let pos = r.tick(FRAME);
        assert_eq!(pos, 800.0);
    }

    #[test]
    fn test_pause_and_resume() {
        let mut r = renderer();
        r.set_target(1000.0, 300.0);
        tick_for(&mut r, 160);
        let at_pause = r.position();
        assert!(at_pause > 0.0);

        r.pause();
        assert_eq!(r.state(), ScrollState::Paused);
        r.tick(FRAME);
        assert_eq!(r.position(), at_pause);

        r.resume();
        assert_eq!(r.state(), ScrollState::Scrolling);
        tick_for(&mut r, 1300);
        assert_eq!(r.position(), 1000.0);
    }

    #[test]
    fn test_reset_jumps_to_zero_and_idles() {
        let mut r = renderer();
        r.set_target(1000.0, 300.0);
        tick_for(&mut r, 400);
        assert!(r.position() > 0.0);

        r.reset();
        assert_eq!(r.position(), 0.0);
        assert_eq!(r.target(), 0.0);
        assert_eq!(r.state(), ScrollState::Idle);
    }

    #[test]
    fn test_idle_at_max_extent() {
        let mut r = MotionRenderer::new(500.0, 150, 1200);
        r.set_target(2000.0, 1000.0); // clamped to extent
        assert_eq!(r.target(), 500.0);

        tick_for(&mut r, 1300);
        assert_eq!(r.position(), 500.0);
        assert_eq!(r.state(), ScrollState::Idle);
    }

    #[test]
    fn test_duration_clamped_to_minimum() {
        // A tiny hop at high speed still animates for at least min duration
        let mut r = renderer();
        r.set_target(10.0, 100_000.0);

        r.tick(Duration::from_millis(50));
        assert!(r.position() < 10.0);
        tick_for(&mut r, 200);
        assert_eq!(r.position(), 10.0);
    }

    #[test]
    fn test_retarget_mid_flight_continues_from_current() {
        let mut r = renderer();
        r.set_target(400.0, 400.0);
        tick_for(&mut r, 320);
        let mid = r.position();
        assert!(mid > 0.0 && mid < 400.0);

        r.set_target(900.0, 400.0);
        assert_eq!(r.position(), mid);
        tick_for(&mut r, 1300);
        assert_eq!(r.position(), 900.0);
    }
}
