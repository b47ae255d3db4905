//! Classifiers: built from a training dataset, they predict a label code for
//! a single spectrum.

mod chance;
mod correlation;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::data::model::{Dataset, Spectrum};
use crate::error::{Error, Result};
use crate::label::Num;

pub use chance::RandomChance;
pub use correlation::{correlation, Correlation};

/// Every model name understood by [`ModelKind::from_str`].
pub const ALL_MODELS: [&str; 2] = ["chance", "correlation"];

/// A trained classifier. Read-only after construction, so one instance can
/// serve predictions from many threads.
pub trait Model: Send + Sync {
    fn name(&self) -> &'static str;

    /// Number of classes seen in training.
    fn num_classes(&self) -> usize;

    /// Predict the label code of `spectrum`.
    ///
    /// Fails with `Untrained` when the model was built from an empty
    /// training set.
    fn predict(&self, spectrum: &Spectrum) -> Result<Num>;
}

/// Knobs that only some models read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Rank training spectra by |r| instead of r in the correlation model.
    pub abs_correlation: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    RandomChance,
    Correlation,
}

impl ModelKind {
    pub const ALL: [ModelKind; 2] = [ModelKind::RandomChance, ModelKind::Correlation];

    pub fn name(self) -> &'static str {
        match self {
            ModelKind::RandomChance => "chance",
            ModelKind::Correlation => "correlation",
        }
    }

    /// Train a model of this kind. An empty training set is accepted; the
    /// resulting model refuses to predict.
    pub fn train(self, train: &Dataset, config: &ModelConfig) -> Result<Box<dyn Model>> {
        if train.is_empty() {
            log::warn!("Training {} on an empty dataset", self.name());
        }
        Ok(match self {
            ModelKind::RandomChance => Box::new(RandomChance::new(train)),
            ModelKind::Correlation => {
                Box::new(Correlation::new(train.clone(), config.abs_correlation)?)
            }
        })
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ModelKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ModelKind::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| Error::UnknownAlgorithm {
                kind: "model",
                name: s.to_string(),
                known: ALL_MODELS.iter().map(|s| s.to_string()).collect(),
            })
    }
}

/// Look a model up by name and train it.
pub fn build(name: &str, train: &Dataset, config: &ModelConfig) -> Result<Box<dyn Model>> {
    name.parse::<ModelKind>()?.train(train, config)
}
