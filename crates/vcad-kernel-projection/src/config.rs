//! Solver configuration.
//!
//! Every setting has a default, so a config file only needs to name what it
//! changes. Values are checked by [`ProjectionConfig::validate`] when a
//! solver is built; the tolerance is checked as soon as it is constructed
//! or deserialized.

use serde::{Deserialize, Serialize};

use crate::error::{ProjectionError, Result};

/// A strictly positive, finite model-space distance.
///
/// Used both as the convergence threshold for refinement and as the floor
/// on sample spacing.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Tolerance(f64);

impl Tolerance {
    /// Default tolerance, `1e-6`.
    pub const DEFAULT: Tolerance = Tolerance(1e-6);

    /// Validate and wrap a tolerance.
    pub fn new(value: f64) -> Result<Self> {
        if value.is_finite() && value > 0.0 {
            Ok(Self(value))
        } else {
            Err(ProjectionError::invalid_configuration(format!(
                "tolerance must be positive and finite, got {value}"
            )))
        }
    }

    /// The wrapped value.
    pub fn get(self) -> f64 {
        self.0
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<f64> for Tolerance {
    type Error = ProjectionError;

    fn try_from(value: f64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Tolerance> for f64 {
    fn from(t: Tolerance) -> f64 {
        t.0
    }
}

/// How densely faces are sampled to seed refinement.
///
/// Each parameter direction of a face gets
/// `clamp(max(ceil(arc_len / spacing), ceil(turning / max_turn_angle)) + 1, min, max)`
/// samples, where `arc_len` and `turning` are the largest model-space
/// length and tangent turning found along that direction, and `spacing`
/// is never smaller than the tolerance. Both domain endpoints are always
/// sampled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingParams {
    /// Fewest samples along any parameter direction. At least 2.
    pub min_per_direction: usize,
    /// Most samples along any parameter direction.
    pub max_per_direction: usize,
    /// Target model-space distance between neighbouring samples. `None`
    /// samples by curvature alone.
    pub spacing: Option<f64>,
    /// Largest tangent turn, in radians, between neighbouring samples.
    pub max_turn_angle: f64,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            min_per_direction: 4,
            max_per_direction: 64,
            spacing: None,
            max_turn_angle: std::f64::consts::PI / 8.0,
        }
    }
}

impl SamplingParams {
    /// Exactly `n` samples along every parameter direction.
    pub fn grid(n: usize) -> Self {
        Self {
            min_per_direction: n,
            max_per_direction: n,
            ..Default::default()
        }
    }

    /// Set the sample count bounds.
    pub fn with_counts(mut self, min: usize, max: usize) -> Self {
        self.min_per_direction = min;
        self.max_per_direction = max;
        self
    }

    /// Set the target spacing.
    pub fn with_spacing(mut self, spacing: f64) -> Self {
        self.spacing = Some(spacing);
        self
    }

    /// Set the largest tangent turn between neighbouring samples.
    pub fn with_max_turn_angle(mut self, angle: f64) -> Self {
        self.max_turn_angle = angle;
        self
    }

    /// Check that the settings describe a usable sampling.
    pub fn validate(&self) -> Result<()> {
        if self.min_per_direction < 2 {
            return Err(ProjectionError::invalid_configuration(
                "sampling needs at least 2 samples per direction",
            ));
        }
        if self.max_per_direction < self.min_per_direction {
            return Err(ProjectionError::invalid_configuration(format!(
                "max_per_direction ({}) is below min_per_direction ({})",
                self.max_per_direction, self.min_per_direction
            )));
        }
        if let Some(spacing) = self.spacing {
            if !(spacing.is_finite() && spacing > 0.0) {
                return Err(ProjectionError::invalid_configuration(format!(
                    "sample spacing must be positive and finite, got {spacing}"
                )));
            }
        }
        if !(self.max_turn_angle.is_finite() && self.max_turn_angle > 0.0) {
            return Err(ProjectionError::invalid_configuration(format!(
                "max_turn_angle must be positive and finite, got {}",
                self.max_turn_angle
            )));
        }
        Ok(())
    }
}

/// Settings for [`crate::ProjectionSolver`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    /// Convergence threshold on the model-space update, and the spacing floor.
    pub tolerance: Tolerance,
    /// Newton iteration cap per candidate face.
    pub max_iterations: usize,
    /// Samples within `ratio * nearest + tolerance` of the query seed candidates.
    pub candidate_ratio: f64,
    /// Most faces refined per query.
    pub max_candidate_faces: usize,
    /// Sampling density.
    pub sampling: SamplingParams,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            tolerance: Tolerance::DEFAULT,
            max_iterations: 50,
            candidate_ratio: 1.5,
            max_candidate_faces: 8,
            sampling: SamplingParams::default(),
        }
    }
}

impl ProjectionConfig {
    /// Default settings with the given tolerance.
    pub fn with_tolerance(tolerance: f64) -> Result<Self> {
        Ok(Self {
            tolerance: Tolerance::new(tolerance)?,
            ..Default::default()
        })
    }

    /// Set the iteration cap.
    pub fn max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = n;
        self
    }

    /// Set the candidate radius ratio.
    pub fn candidate_ratio(mut self, ratio: f64) -> Self {
        self.candidate_ratio = ratio;
        self
    }

    /// Set the candidate face cap.
    pub fn max_candidate_faces(mut self, n: usize) -> Self {
        self.max_candidate_faces = n;
        self
    }

    /// Set the sampling density.
    pub fn sampling(mut self, sampling: SamplingParams) -> Self {
        self.sampling = sampling;
        self
    }

    /// Check every setting.
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(ProjectionError::invalid_configuration(
                "max_iterations must be at least 1",
            ));
        }
        if !(self.candidate_ratio.is_finite() && self.candidate_ratio >= 1.0) {
            return Err(ProjectionError::invalid_configuration(format!(
                "candidate_ratio must be finite and at least 1, got {}",
                self.candidate_ratio
            )));
        }
        if self.max_candidate_faces == 0 {
            return Err(ProjectionError::invalid_configuration(
                "max_candidate_faces must be at least 1",
            ));
        }
        self.sampling.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tolerance_rejects_non_positive() {
        assert!(Tolerance::new(1e-9).is_ok());
        assert!(matches!(
            Tolerance::new(0.0),
            Err(ProjectionError::InvalidConfiguration(_))
        ));
        assert!(Tolerance::new(-1.0).is_err());
        assert!(Tolerance::new(f64::NAN).is_err());
        assert!(Tolerance::new(f64::INFINITY).is_err());
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = ProjectionConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.tolerance.get() - 1e-6).abs() < 1e-18);
        assert_eq!(config.max_iterations, 50);
    }

    #[test]
    fn test_validate_catches_bad_settings() {
        let base = ProjectionConfig::default();
        assert!(base.clone().max_iterations(0).validate().is_err());
        assert!(base.clone().candidate_ratio(0.5).validate().is_err());
        assert!(base.clone().candidate_ratio(f64::NAN).validate().is_err());
        assert!(base.clone().max_candidate_faces(0).validate().is_err());
        assert!(base.clone().sampling(SamplingParams::grid(1)).validate().is_err());
        assert!(base
            .clone()
            .sampling(SamplingParams::default().with_counts(8, 4))
            .validate()
            .is_err());
        assert!(base
            .clone()
            .sampling(SamplingParams::default().with_spacing(-0.1))
            .validate()
            .is_err());
        assert!(base
            .sampling(SamplingParams::default().with_max_turn_angle(0.0))
            .validate()
            .is_err());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: ProjectionConfig = toml::from_str(
            r#"
            tolerance = 1e-4
            max_candidate_faces = 3

            [sampling]
            spacing = 0.25
            "#,
        )
        .unwrap();
        assert!((config.tolerance.get() - 1e-4).abs() < 1e-18);
        assert_eq!(config.max_candidate_faces, 3);
        assert_eq!(config.max_iterations, 50);
        assert_eq!(config.sampling.spacing, Some(0.25));
        assert_eq!(config.sampling.min_per_direction, 4);
    }

    #[test]
    fn test_toml_rejects_bad_tolerance() {
        let parsed: std::result::Result<ProjectionConfig, _> = toml::from_str("tolerance = -1.0");
        assert!(parsed.is_err());
    }
}
