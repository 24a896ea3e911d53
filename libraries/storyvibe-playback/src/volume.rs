//! Volume and mute state
//!
//! Volume is a linear level in [0, 1] handed straight to the media engine.
//! Mute is a separate flag: muting never touches the level, and a zero level
//! never sets the flag.

use crate::types::DEFAULT_VOLUME;

/// Volume controller for one session
#[derive(Debug, Clone)]
pub struct Volume {
    /// User level (0.0-1.0)
    level: f32,

    /// Mute state (preserves level)
    muted: bool,

    /// Level restored when unmuting from zero
    fallback: f32,
}

impl Volume {
    /// Create new volume controller
    ///
    /// # Arguments
    /// * `level` - Initial level, clamped to [0, 1]
    pub fn new(level: f32) -> Self {
        Self {
            level: clamp_level(level),
            muted: false,
            fallback: DEFAULT_VOLUME,
        }
    }

    /// Set the level restored by `toggle_mute` when the level is zero
    pub fn with_fallback(mut self, fallback: f32) -> Self {
        self.fallback = clamp_level(fallback);
        self
    }

    /// Set the user level
    ///
    /// A positive level clears the mute flag; zero leaves it alone.
    pub fn set_level(&mut self, level: f32) {
        self.level = clamp_level(level);
        if self.level > 0.0 {
            self.muted = false;
        }
    }

    /// Set the level without touching the mute flag (fade steps)
    pub(crate) fn ramp_to(&mut self, level: f32) {
        self.level = clamp_level(level);
    }

    /// Get current level (0.0-1.0)
    pub fn level(&self) -> f32 {
        self.level
    }

    /// Toggle mute state
    ///
    /// Unmuting from a zero level restores the fallback level so the
    /// track becomes audible again.
    pub fn toggle_mute(&mut self) {
        if self.muted {
            self.muted = false;
            if self.level == 0.0 {
                self.level = self.fallback;
            }
        } else {
            self.muted = true;
        }
    }

    /// Check if muted
    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Level the engine should output
    ///
    /// Returns 0.0 if muted, otherwise the user level
    pub fn effective(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.level
        }
    }
}

impl Default for Volume {
    fn default() -> Self {
        Self::new(DEFAULT_VOLUME)
    }
}

fn clamp_level(level: f32) -> f32 {
    if level.is_nan() {
        0.0
    } else {
        level.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_volume() {
        let vol = Volume::new(0.7);
        assert_eq!(vol.level(), 0.7);
        assert!(!vol.is_muted());
        assert_eq!(vol.effective(), 0.7);
    }

    #[test]
    fn set_level_clamps() {
        let mut vol = Volume::new(0.5);

        vol.set_level(1.5);
        assert_eq!(vol.level(), 1.0);

        vol.set_level(-0.2);
        assert_eq!(vol.level(), 0.0);

        vol.set_level(f32::NAN);
        assert_eq!(vol.level(), 0.0);
    }

    #[test]
    fn mute_round_trip_restores_level_exactly() {
        let mut vol = Volume::new(0.5);

        vol.toggle_mute();
        assert!(vol.is_muted());
        assert_eq!(vol.effective(), 0.0);
        assert_eq!(vol.level(), 0.5); // Level preserved

        vol.toggle_mute();
        assert!(!vol.is_muted());
        assert_eq!(vol.level(), 0.5);
        assert_eq!(vol.effective(), 0.5);
    }

    #[test]
    fn zero_level_does_not_mute() {
        let mut vol = Volume::new(0.5);

        vol.set_level(0.0);
        assert!(!vol.is_muted());
        assert_eq!(vol.effective(), 0.0);

        vol.set_level(0.3);
        assert!(!vol.is_muted());
        assert_eq!(vol.effective(), 0.3);
    }

    #[test]
    fn positive_level_unmutes() {
        let mut vol = Volume::new(0.5);
        vol.toggle_mute();

        vol.set_level(0.4);
        assert!(!vol.is_muted());
        assert_eq!(vol.effective(), 0.4);
    }

    #[test]
    fn zero_level_while_muted_stays_muted() {
        let mut vol = Volume::new(0.5);
        vol.toggle_mute();

        vol.set_level(0.0);
        assert!(vol.is_muted());
    }

    #[test]
    fn unmute_from_zero_uses_fallback() {
        let mut vol = Volume::new(0.0);
        vol.toggle_mute();
        vol.toggle_mute();
        assert_eq!(vol.level(), DEFAULT_VOLUME);

        let mut vol = Volume::new(0.0).with_fallback(0.4);
        vol.toggle_mute();
        vol.toggle_mute();
        assert_eq!(vol.level(), 0.4);
    }

    #[test]
    fn ramp_keeps_mute_flag() {
        let mut vol = Volume::new(0.0);
        vol.toggle_mute();

        vol.ramp_to(0.2);
        assert!(vol.is_muted());
        assert_eq!(vol.level(), 0.2);
        assert_eq!(vol.effective(), 0.0);
    }
}
