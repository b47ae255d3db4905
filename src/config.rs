//! Experiment configuration: a JSON file whose missing fields take defaults,
//! overridden by command-line flags in the binary.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::data::split::{SplitKind, SplitPolicy, DEFAULT_SEED, DEFAULT_TRAIN_RATIO};
use crate::dim::DEFAULT_COMPONENTS;
use crate::error::{Error, Result};
use crate::model::ModelConfig;
use crate::pre::Pipeline;

// ---------------------------------------------------------------------------
// Experiment configuration
// ---------------------------------------------------------------------------

/// Everything one evaluation run needs, independent of where it came from.
///
/// Missing fields in a JSON file take their defaults, so a config can be as
/// small as `{ "data_dir": "data" }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Directory tree of CSV spectra, or a single `.parquet`/`.json` file.
    pub data_dir: PathBuf,

    /// Directory levels folded into each label.
    pub labels_depth: usize,

    /// Model name, one of `ALL_MODELS`.
    pub model: String,

    /// Preprocessing step names, applied in order.
    pub preprocessing: Vec<String>,

    pub split: SplitKind,

    /// Stratified split only.
    pub train_ratio: f64,

    /// Stratified split only.
    pub seed: u64,

    pub abs_correlation: bool,

    /// Output size of the `pca` and `lda` reducers.
    pub components: usize,

    /// Fan predictions out over all cores.
    pub parallel: bool,

    /// Also score at the granularity of label heads.
    pub headonly: bool,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            labels_depth: 1,
            model: "correlation".to_string(),
            preprocessing: Vec::new(),
            split: SplitKind::default(),
            train_ratio: DEFAULT_TRAIN_RATIO,
            seed: DEFAULT_SEED,
            abs_correlation: false,
            components: DEFAULT_COMPONENTS,
            parallel: false,
            headonly: true,
        }
    }
}

impl ExperimentConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        Ok(config)
    }

    /// Reject settings no run can succeed with. Names of models and steps
    /// are checked when the pipeline and model are built.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.train_ratio) {
            return Err(Error::InvalidParameter {
                name: "train ratio",
                reason: format!("{} is outside [0, 1]", self.train_ratio),
            });
        }
        if self.labels_depth == 0 {
            return Err(Error::InvalidParameter {
                name: "labels depth",
                reason: "must be at least 1".into(),
            });
        }
        if self.components == 0 {
            return Err(Error::InvalidParameter {
                name: "components",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    pub fn split_policy(&self) -> SplitPolicy {
        match self.split {
            SplitKind::LeaveOneOut => SplitPolicy::LeaveOneOut,
            SplitKind::Stratified => SplitPolicy::Stratified {
                train_ratio: self.train_ratio,
                seed: self.seed,
            },
        }
    }

    pub fn pipeline(&self) -> Result<Pipeline> {
        Ok(Pipeline::from_names(&self.preprocessing)?.with_components(self.components))
    }

    pub fn model_config(&self) -> ModelConfig {
        ModelConfig {
            abs_correlation: self.abs_correlation,
        }
    }
}
