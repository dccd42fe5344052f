//! Time to progress mapping shared by live preview and frame-indexed export.
//!
//! Both drivers reduce their notion of "now" to an elapsed millisecond value against an origin
//! and call [`progress_at`]; nothing else in the engine converts time.

use crate::{
    animation::ease::Ease,
    foundation::error::{GlideError, GlideResult},
};

/// Rate at which stored `start_frame` values are expressed, independent of preview or export fps.
pub const REFERENCE_FPS: f64 = 60.0;

/// Per-item timing.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timing {
    /// Start offset in frames at [`REFERENCE_FPS`].
    #[serde(default)]
    pub start_frame: u32,
    /// Duration of one pass along the path, in seconds (> 0).
    pub duration_secs: f64,
    #[serde(default)]
    pub ease: Ease,
    /// Repeat forever in the live preview. Export always plays once.
    #[serde(default, rename = "loop")]
    pub looping: bool,
}

impl Timing {
    pub fn new(start_frame: u32, duration_secs: f64, ease: Ease, looping: bool) -> GlideResult<Self> {
        let t = Self {
            start_frame,
            duration_secs,
            ease,
            looping,
        };
        t.validate()?;
        Ok(t)
    }

    pub fn validate(&self) -> GlideResult<()> {
        if !(self.duration_secs.is_finite() && self.duration_secs > 0.0) {
            return Err(GlideError::validation(format!(
                "duration must be a positive number of seconds, got {}",
                self.duration_secs
            )));
        }
        Ok(())
    }

    pub fn start_delay_ms(&self) -> f64 {
        f64::from(self.start_frame) * 1000.0 / REFERENCE_FPS
    }

    pub fn duration_ms(&self) -> f64 {
        self.duration_secs * 1000.0
    }

    /// Elapsed time at which a one-shot pass reaches its final position.
    pub fn end_ms(&self) -> f64 {
        self.start_delay_ms() + self.duration_ms()
    }
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            start_frame: 0,
            duration_secs: 5.0,
            ease: Ease::Linear,
            looping: false,
        }
    }
}

/// Progress before easing, or `None` while the item is still waiting for its start delay.
pub fn raw_progress_at(timing: &Timing, now_ms: f64, origin_ms: f64, looping: bool) -> Option<f64> {
    let elapsed = now_ms - origin_ms;
    let delay = timing.start_delay_ms();
    if elapsed.is_nan() || elapsed < delay {
        return None;
    }

    let local = elapsed - delay;
    let duration = timing.duration_ms();
    // Zero-length passes complete immediately.
    if duration.is_nan() || duration <= 0.0 {
        return Some(1.0);
    }

    let progress = if looping {
        local.rem_euclid(duration) / duration
    } else {
        (local / duration).clamp(0.0, 1.0)
    };
    Some(progress)
}

/// Eased progress in `[0, 1]`, or `None` before the item starts.
pub fn progress_at(timing: &Timing, now_ms: f64, origin_ms: f64, looping: bool) -> Option<f64> {
    raw_progress_at(timing, now_ms, origin_ms, looping).map(|p| timing.ease.apply(p))
}
