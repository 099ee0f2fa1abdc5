// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Proximity analysis configuration.
//!
//! This module defines the [`ProximityConfig`] struct, which controls the
//! distance thresholds used to flag violations and the keypoint confidence
//! threshold applied by pose detectors.

use crate::error::{Result, SocialDistanceError};

/// Default absolute distance threshold in pixels.
pub const DEFAULT_ABS_THRESHOLD: f32 = 150.0;

/// Default relative threshold (distance / average person height).
pub const DEFAULT_REL_THRESHOLD: f32 = 0.7;

/// Default minimum keypoint confidence.
pub const DEFAULT_KEYPOINT_THRESHOLD: f32 = 0.15;

/// Configuration for proximity analysis.
///
/// Uses a builder pattern for convenient construction.
///
/// # Example
///
/// ```rust
/// use social_distance::ProximityConfig;
///
/// let config = ProximityConfig::new()
///     .with_abs_threshold(120.0)
///     .with_rel_threshold(0.5)
///     .with_keypoint_threshold(0.3);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProximityConfig {
    /// Absolute distance threshold in pixels.
    /// A pair whose centers are strictly closer than this is a violation.
    pub abs_threshold: f32,
    /// Relative threshold on distance divided by the pair's average height.
    /// Makes the verdict roughly independent of how far people are from the camera.
    pub rel_threshold: f32,
    /// Minimum keypoint confidence (0.0 to 1.0) kept by detectors.
    pub keypoint_threshold: f32,
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self {
            abs_threshold: DEFAULT_ABS_THRESHOLD,
            rel_threshold: DEFAULT_REL_THRESHOLD,
            keypoint_threshold: DEFAULT_KEYPOINT_THRESHOLD,
        }
    }
}

impl ProximityConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the absolute distance threshold.
    ///
    /// # Arguments
    ///
    /// * `threshold` - Distance in pixels below which a pair is flagged.
    #[must_use]
    pub const fn with_abs_threshold(mut self, threshold: f32) -> Self {
        self.abs_threshold = threshold;
        self
    }

    /// Set the relative (height-normalized) threshold.
    ///
    /// # Arguments
    ///
    /// * `threshold` - Ratio of distance to average height below which a pair is flagged.
    #[must_use]
    pub const fn with_rel_threshold(mut self, threshold: f32) -> Self {
        self.rel_threshold = threshold;
        self
    }

    /// Set the minimum keypoint confidence.
    #[must_use]
    pub const fn with_keypoint_threshold(mut self, threshold: f32) -> Self {
        self.keypoint_threshold = threshold;
        self
    }

    /// Check that every threshold is usable.
    ///
    /// # Errors
    ///
    /// Returns [`SocialDistanceError::ConfigError`] if a threshold is negative
    /// or not finite, or if the keypoint threshold is above 1.
    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("distance", self.abs_threshold),
            ("rel_threshold", self.rel_threshold),
            ("threshold", self.keypoint_threshold),
        ];
        for (name, value) in checks {
            if !value.is_finite() || value < 0.0 {
                return Err(SocialDistanceError::ConfigError(format!(
                    "'{name}' must be a finite non-negative number, got {value}"
                )));
            }
        }
        if self.keypoint_threshold > 1.0 {
            return Err(SocialDistanceError::ConfigError(format!(
                "'threshold' must be within 0.0..=1.0, got {}",
                self.keypoint_threshold
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = ProximityConfig::default();
        assert!((config.abs_threshold - 150.0).abs() < f32::EPSILON);
        assert!((config.rel_threshold - 0.7).abs() < f32::EPSILON);
        assert!((config.keypoint_threshold - 0.15).abs() < f32::EPSILON);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = ProximityConfig::new()
            .with_abs_threshold(80.0)
            .with_rel_threshold(1.2)
            .with_keypoint_threshold(0.5);

        assert!((config.abs_threshold - 80.0).abs() < f32::EPSILON);
        assert!((config.rel_threshold - 1.2).abs() < f32::EPSILON);
        assert!((config.keypoint_threshold - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn test_config_rejects_bad_thresholds() {
        assert!(
            ProximityConfig::new()
                .with_abs_threshold(-1.0)
                .validate()
                .is_err()
        );
        assert!(
            ProximityConfig::new()
                .with_rel_threshold(f32::NAN)
                .validate()
                .is_err()
        );
        assert!(
            ProximityConfig::new()
                .with_keypoint_threshold(1.5)
                .validate()
                .is_err()
        );
        // Zero disables a rule rather than being invalid.
        assert!(
            ProximityConfig::new()
                .with_abs_threshold(0.0)
                .validate()
                .is_ok()
        );
    }
}
