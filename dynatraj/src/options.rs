use std::path::PathBuf;

use crate::Error;
use crate::arrangement::{DEFAULT_ARRANGEMENT_SAMPLES, DEFAULT_ARRANGEMENT_THRESHOLD};
use crate::supercell::DEFAULT_SUPERCELL_TOLERANCE;

/// Options controlling how a [`crate::Dynamics`] container stores and
/// analyzes its data.
#[derive(Debug, Clone, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct DynamicsOptions {
    /// Store the large derived arrays (relative trajectory, velocities) in
    /// memory-mapped scratch files instead of memory
    #[serde(default)]
    pub memmap: bool,
    /// Directory in which scratch files are created. If missing, the
    /// `DYNATRAJ_TMPDIR` environment variable is used, and then the current
    /// working directory.
    #[serde(default)]
    pub scratch_directory: Option<PathBuf>,
    /// Maximal relative deviation from an integer ratio between the
    /// simulation cell and the structure cell
    #[serde(default = "serde_default_supercell_tolerance")]
    pub supercell_tolerance: f64,
    /// Residual error of the atoms order resolution above which a warning is
    /// emitted
    #[serde(default = "serde_default_arrangement_threshold")]
    pub arrangement_threshold: f64,
    /// Number of frames averaged to get the reference positions used to
    /// resolve the atoms order
    #[serde(default = "serde_default_arrangement_samples")]
    pub arrangement_samples: usize,
}

fn serde_default_supercell_tolerance() -> f64 {
    return DEFAULT_SUPERCELL_TOLERANCE;
}

fn serde_default_arrangement_threshold() -> f64 {
    return DEFAULT_ARRANGEMENT_THRESHOLD;
}

fn serde_default_arrangement_samples() -> usize {
    return DEFAULT_ARRANGEMENT_SAMPLES;
}

impl Default for DynamicsOptions {
    fn default() -> DynamicsOptions {
        DynamicsOptions {
            memmap: false,
            scratch_directory: None,
            supercell_tolerance: DEFAULT_SUPERCELL_TOLERANCE,
            arrangement_threshold: DEFAULT_ARRANGEMENT_THRESHOLD,
            arrangement_samples: DEFAULT_ARRANGEMENT_SAMPLES,
        }
    }
}

impl DynamicsOptions {
    /// Parse options from a JSON string, using the default value for missing
    /// fields.
    pub fn from_json(json: &str) -> Result<DynamicsOptions, Error> {
        let options = serde_json::from_str::<DynamicsOptions>(json)?;
        options.validate()?;
        return Ok(options);
    }

    /// Check that these options make sense
    pub fn validate(&self) -> Result<(), Error> {
        if !(self.supercell_tolerance >= 0.0) {
            return Err(Error::InvalidParameter(format!(
                "supercell_tolerance must be positive, got {}", self.supercell_tolerance
            )));
        }

        if !(self.arrangement_threshold >= 0.0) {
            return Err(Error::InvalidParameter(format!(
                "arrangement_threshold must be positive, got {}", self.arrangement_threshold
            )));
        }

        if self.arrangement_samples == 0 {
            return Err(Error::InvalidParameter(
                "arrangement_samples must be at least 1".into()
            ));
        }

        Ok(())
    }
}
