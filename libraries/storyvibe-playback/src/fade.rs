//! Fade-in ramp for autoplay
//!
//! The ramp raises the session volume from 0 to a target in fixed steps on a
//! fixed cadence. The number of steps is `ceil(target / step)`; the level at
//! each step follows the configured curve, and the last step lands exactly on
//! the target.

use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use std::time::Duration;

/// Fade curve type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FadeCurve {
    /// Constant increment per step
    #[default]
    Linear,

    /// S-Curve fade: slow start, fast middle, slow end
    SCurve,

    /// Equal power fade: fast rise, gentle landing
    EqualPower,
}

impl FadeCurve {
    /// Calculate the fade gain at a given position
    ///
    /// # Arguments
    /// * `position` - Normalized position in the fade (0.0 to 1.0)
    ///
    /// # Returns
    /// Gain multiplier (0.0 to 1.0), strictly increasing in `position`
    #[inline]
    pub fn gain(&self, position: f32) -> f32 {
        let t = position.clamp(0.0, 1.0);

        match self {
            FadeCurve::Linear => t,
            FadeCurve::SCurve => (1.0 - (PI * t).cos()) * 0.5,
            FadeCurve::EqualPower => (t * PI * 0.5).sin(),
        }
    }

    /// Get a human-readable name for the curve
    pub fn display_name(&self) -> &'static str {
        match self {
            FadeCurve::Linear => "Linear",
            FadeCurve::SCurve => "S-Curve",
            FadeCurve::EqualPower => "Equal Power",
        }
    }
}

/// Stepwise volume ramp from 0 to a target level
#[derive(Debug, Clone)]
pub struct FadeRamp {
    target: f32,
    steps: u32,
    taken: u32,
    curve: FadeCurve,
}

impl FadeRamp {
    /// Create a ramp to `target` advancing by roughly `step` per tick
    pub fn new(target: f32, step: f32, curve: FadeCurve) -> Self {
        let target = target.clamp(0.0, 1.0);
        let steps = if target <= 0.0 || step <= 0.0 {
            0
        } else {
            // Tolerance keeps 0.7 / 0.01 at 70 steps despite f32 rounding
            (f64::from(target) / f64::from(step) - 1e-6).ceil().max(1.0) as u32
        };

        Self {
            target,
            steps,
            taken: 0,
            curve,
        }
    }

    /// Level for the next tick, or `None` once the target has been reached
    pub fn next_level(&mut self) -> Option<f32> {
        if self.taken >= self.steps {
            return None;
        }

        self.taken += 1;
        if self.taken == self.steps {
            return Some(self.target);
        }

        let t = self.taken as f32 / self.steps as f32;
        Some((self.target * self.curve.gain(t)).min(self.target))
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    /// Total number of ticks the ramp takes
    pub fn steps(&self) -> u32 {
        self.steps
    }

    /// Progress from 0.0 (not started) to 1.0 (target reached)
    pub fn progress(&self) -> f32 {
        if self.steps == 0 {
            1.0
        } else {
            self.taken as f32 / self.steps as f32
        }
    }

    pub fn is_complete(&self) -> bool {
        self.taken >= self.steps
    }

    /// Wall time from the first tick to the last at the given cadence
    pub fn duration(&self, interval: Duration) -> Duration {
        interval * self.steps.saturating_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(mut ramp: FadeRamp) -> Vec<f32> {
        std::iter::from_fn(|| ramp.next_level()).collect()
    }

    #[test]
    fn default_ramp_takes_seventy_steps() {
        let ramp = FadeRamp::new(0.7, 0.01, FadeCurve::Linear);
        assert_eq!(ramp.steps(), 70);
        assert_eq!(
            ramp.duration(Duration::from_millis(50)),
            Duration::from_millis(3450)
        );
    }

    #[test]
    fn linear_ramp_rises_strictly_and_lands_on_target() {
        let levels = collect(FadeRamp::new(0.7, 0.01, FadeCurve::Linear));

        assert_eq!(levels.len(), 70);
        assert!((levels[0] - 0.01).abs() < 1e-6);
        assert_eq!(*levels.last().unwrap(), 0.7);
        assert!(levels.windows(2).all(|w| w[0] < w[1]));
        assert!(levels.iter().all(|&v| v <= 0.7));
    }

    #[test]
    fn curved_ramps_never_overshoot() {
        for curve in [FadeCurve::SCurve, FadeCurve::EqualPower] {
            let levels = collect(FadeRamp::new(0.7, 0.01, curve));
            assert!(levels.windows(2).all(|w| w[0] < w[1]), "{curve:?}");
            assert!(levels.iter().all(|&v| v > 0.0 && v <= 0.7), "{curve:?}");
            assert_eq!(*levels.last().unwrap(), 0.7);
        }
    }

    #[test]
    fn uneven_step_still_lands_on_target() {
        let levels = collect(FadeRamp::new(0.5, 0.3, FadeCurve::Linear));
        assert_eq!(levels.len(), 2);
        assert_eq!(levels[1], 0.5);
    }

    #[test]
    fn zero_target_is_already_complete() {
        let mut ramp = FadeRamp::new(0.0, 0.01, FadeCurve::Linear);
        assert!(ramp.is_complete());
        assert_eq!(ramp.progress(), 1.0);
        assert_eq!(ramp.next_level(), None);
    }

    #[test]
    fn progress_tracks_steps() {
        let mut ramp = FadeRamp::new(0.4, 0.1, FadeCurve::Linear);
        assert_eq!(ramp.progress(), 0.0);
        ramp.next_level();
        ramp.next_level();
        assert_eq!(ramp.progress(), 0.5);
    }

    #[test]
    fn curve_endpoints() {
        for curve in [FadeCurve::Linear, FadeCurve::SCurve, FadeCurve::EqualPower] {
            assert!(curve.gain(0.0).abs() < 1e-6);
            assert!((curve.gain(1.0) - 1.0).abs() < 1e-6);
        }
        assert_eq!(FadeCurve::SCurve.display_name(), "S-Curve");
    }
}
