use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use serde::Deserialize;

use crate::error::{PipelineError, Result};

/// Threshold multiplier used when none is configured.
pub const DEFAULT_MULTIPLIER: f64 = 1.0;
/// Cross-validation folds used when none is configured.
pub const DEFAULT_FOLDS: usize = 5;
/// Shuffle seed for the fold partitioner.
pub const DEFAULT_SEED: u64 = 42;

// ---------------------------------------------------------------------------
// Run parameters
// ---------------------------------------------------------------------------

/// Parameters shared by every pair in a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunParams {
    /// Scales the cross-validated RMSE into the acceptance threshold.
    pub multiplier: f64,
    /// Number of cross-validation folds.
    pub folds: usize,
    /// Seed for the fold shuffle; fixed so runs are reproducible.
    pub seed: u64,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            multiplier: DEFAULT_MULTIPLIER,
            folds: DEFAULT_FOLDS,
            seed: DEFAULT_SEED,
        }
    }
}

impl RunParams {
    pub fn new(multiplier: f64, folds: usize) -> Result<Self> {
        let params = Self {
            multiplier,
            folds,
            ..Self::default()
        };
        params.validate()?;
        Ok(params)
    }

    /// Reject parameters the threshold estimator cannot work with.
    pub fn validate(&self) -> Result<()> {
        if !self.multiplier.is_finite() || self.multiplier < 0.0 {
            return Err(PipelineError::InvalidParameter(format!(
                "multiplier must be a finite number >= 0, got {}",
                self.multiplier
            )));
        }
        if self.folds < 2 {
            return Err(PipelineError::InvalidParameter(format!(
                "folds must be at least 2, got {}",
                self.folds
            )));
        }
        Ok(())
    }
}

// -- Pure validators for user-typed input --

/// Parse a multiplier typed by a user.
pub fn parse_multiplier(input: &str) -> Result<f64> {
    let value: f64 = input.trim().parse().map_err(|_| {
        PipelineError::InvalidParameter(format!("'{}' is not a decimal number", input.trim()))
    })?;
    RunParams {
        multiplier: value,
        ..RunParams::default()
    }
    .validate()?;
    Ok(value)
}

/// Parse a fold count typed by a user.
pub fn parse_folds(input: &str) -> Result<usize> {
    let value: usize = input.trim().parse().map_err(|_| {
        PipelineError::InvalidParameter(format!("'{}' is not a whole number", input.trim()))
    })?;
    RunParams {
        folds: value,
        ..RunParams::default()
    }
    .validate()?;
    Ok(value)
}

/// Parse a `y`/`n` answer.
pub fn parse_yes_no(input: &str) -> Result<bool> {
    match input.trim() {
        "y" | "Y" | "yes" => Ok(true),
        "n" | "N" | "no" => Ok(false),
        other => Err(PipelineError::InvalidParameter(format!(
            "expected 'y' or 'n', got '{other}'"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Batch manifest
// ---------------------------------------------------------------------------

/// One comparison: a control/experimental pair and where to write anomalies.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Job {
    pub control: PathBuf,
    pub experimental: PathBuf,
    pub output: PathBuf,
}

impl Job {
    pub fn new(
        control: impl Into<PathBuf>,
        experimental: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
    ) -> Self {
        Job {
            control: control.into(),
            experimental: experimental.into(),
            output: output.into(),
        }
    }

    fn resolve_against(self, base: &Path) -> Self {
        Job {
            control: base.join(self.control),
            experimental: base.join(self.experimental),
            output: base.join(self.output),
        }
    }
}

/// A batch description, read from JSON or TOML.
///
/// ```toml
/// multiplier = 1.5
/// folds = 5
///
/// [[jobs]]
/// control = "control_1.csv"
/// experimental = "experimental_1.csv"
/// output = "anomalies_1.csv"
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    pub multiplier: Option<f64>,
    pub folds: Option<usize>,
    pub seed: Option<u64>,
    #[serde(default)]
    pub fail_fast: bool,
    pub jobs: Vec<Job>,
}

impl Manifest {
    /// Load a manifest, resolving relative job paths against its directory.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading manifest {}", path.display()))?;

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        let manifest: Manifest = match ext.as_str() {
            "json" => serde_json::from_str(&text).context("parsing JSON manifest")?,
            "toml" => toml::from_str(&text).context("parsing TOML manifest")?,
            other => bail!("Unsupported manifest extension: .{other}"),
        };

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Ok(Manifest {
            jobs: manifest
                .jobs
                .into_iter()
                .map(|job| job.resolve_against(base))
                .collect(),
            ..manifest
        })
    }

    /// Manifest values layered over the defaults.
    pub fn params(&self) -> RunParams {
        let defaults = RunParams::default();
        RunParams {
            multiplier: self.multiplier.unwrap_or(defaults.multiplier),
            folds: self.folds.unwrap_or(defaults.folds),
            seed: self.seed.unwrap_or(defaults.seed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_are_valid() {
        let params = RunParams::default();
        assert_eq!(params.multiplier, 1.0);
        assert_eq!(params.folds, 5);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(RunParams::new(-0.5, 5).is_err());
        assert!(RunParams::new(f64::NAN, 5).is_err());
        assert!(RunParams::new(1.0, 1).is_err());
        assert!(RunParams::new(0.0, 2).is_ok());
    }

    #[test]
    fn test_parse_multiplier() {
        assert_eq!(parse_multiplier(" 2.5 ").unwrap(), 2.5);
        assert_eq!(parse_multiplier("0").unwrap(), 0.0);
        assert!(matches!(
            parse_multiplier("abc"),
            Err(PipelineError::InvalidParameter(_))
        ));
        assert!(parse_multiplier("-1").is_err());
        assert!(parse_multiplier("inf").is_err());
    }

    #[test]
    fn test_parse_folds() {
        assert_eq!(parse_folds("10").unwrap(), 10);
        assert!(parse_folds("1").is_err());
        assert!(parse_folds("2.5").is_err());
        assert!(parse_folds("-3").is_err());
    }

    #[test]
    fn test_parse_yes_no() {
        assert!(parse_yes_no("y").unwrap());
        assert!(!parse_yes_no("n\n").unwrap());
        assert!(parse_yes_no("maybe").is_err());
    }

    #[test]
    fn test_manifest_json_resolves_relative_paths() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("batch.json");
        let mut file = std::fs::File::create(&path)?;
        write!(
            file,
            r#"{{"folds": 3, "jobs": [
                {{"control": "c1.csv", "experimental": "e1.csv", "output": "out1.csv"}},
                {{"control": "/abs/c2.csv", "experimental": "e2.csv", "output": "out2.csv"}}
            ]}}"#
        )?;

        let manifest = Manifest::load(&path)?;
        assert_eq!(manifest.jobs.len(), 2);
        assert_eq!(manifest.jobs[0].control, dir.path().join("c1.csv"));
        assert_eq!(manifest.jobs[1].control, PathBuf::from("/abs/c2.csv"));

        let params = manifest.params();
        assert_eq!(params.folds, 3);
        assert_eq!(params.multiplier, DEFAULT_MULTIPLIER);
        assert!(!manifest.fail_fast);
        Ok(())
    }

    #[test]
    fn test_manifest_toml() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("batch.toml");
        std::fs::write(
            &path,
            r#"
multiplier = 1.5
fail_fast = true

[[jobs]]
control = "a.csv"
experimental = "b.csv"
output = "c.csv"
"#,
        )?;

        let manifest = Manifest::load(&path)?;
        assert!(manifest.fail_fast);
        assert_eq!(manifest.params().multiplier, 1.5);
        assert_eq!(manifest.jobs[0].output, dir.path().join("c.csv"));
        Ok(())
    }

    #[test]
    fn test_manifest_rejects_unknown_extension() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("batch.yaml");
        std::fs::write(&path, "jobs: []")?;
        assert!(Manifest::load(&path).is_err());
        Ok(())
    }
}
