//! Construction parameters of the field processor.
//!
//! Usually deserialized from the coupled run's parameter file; every field
//! has a default so partial files work.

use serde::{Deserialize, Serialize};

use crate::coupler_error::CouplerError;

/// How angular transforms are distributed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransformMode {
    /// Every process holds all modes and transforms its own lines.
    #[default]
    Sequential,
    /// Modes are split over the `y` processes; lines are transposed so each
    /// process transforms whole lines.
    Decomposed,
}

/// Analytic input seeding for verification runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestCase {
    /// Use the data received from the other code.
    #[default]
    Off,
    /// `cos(n θ) (1 + 0.5 sin z)` in both directions.
    CosineMode,
    /// The field-line coordinate itself on every line.
    ZRamp,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CouplerConfig {
    /// Interpolate along `z`. When off, both codes must share the `z` grid.
    pub preprocess: bool,
    pub transform_mode: TransformMode,
    pub test_case: TestCase,
    /// Angular mode seeded by [`TestCase::CosineMode`].
    pub mode_number: usize,
    /// Halo slots on each side of a local `z` segment.
    pub halo_width: usize,
}

impl Default for CouplerConfig {
    fn default() -> Self {
        Self {
            preprocess: true,
            transform_mode: TransformMode::Sequential,
            test_case: TestCase::Off,
            mode_number: 1,
            halo_width: 2,
        }
    }
}

impl CouplerConfig {
    /// Checks that need no mesh information.
    pub fn validate(&self) -> Result<(), CouplerError> {
        if self.halo_width < 2 {
            return Err(CouplerError::Config(format!(
                "halo width {} cannot centre a four-point stencil",
                self.halo_width
            )));
        }
        if self.test_case == TestCase::CosineMode && self.mode_number == 0 {
            return Err(CouplerError::Config(
                "cosine test case needs a non-zero mode number".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = CouplerConfig::default();
        assert!(c.preprocess);
        assert_eq!(c.halo_width, 2);
        assert_eq!(c.transform_mode, TransformMode::Sequential);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn serde_roundtrip_and_partial() {
        let c = CouplerConfig {
            transform_mode: TransformMode::Decomposed,
            test_case: TestCase::CosineMode,
            mode_number: 3,
            ..CouplerConfig::default()
        };
        let ser = serde_json::to_string(&c).expect("serialize");
        let de: CouplerConfig = serde_json::from_str(&ser).expect("deserialize");
        assert_eq!(de, c);

        let partial: CouplerConfig = serde_json::from_str(r#"{"preprocess": false}"#).unwrap();
        assert!(!partial.preprocess);
        assert_eq!(partial.mode_number, 1);
    }

    #[test]
    fn narrow_halo_rejected() {
        let c = CouplerConfig {
            halo_width: 1,
            ..CouplerConfig::default()
        };
        assert!(matches!(c.validate(), Err(CouplerError::Config(_))));
    }
}
