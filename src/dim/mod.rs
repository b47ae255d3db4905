//! Dimensionality reduction: map a spectrum to a short feature vector.
//!
//! Reducers are fitted once on a training dataset and then applied, without
//! refitting, to every spectrum of both splits.

mod lda;
mod pca;

use std::fmt;
use std::str::FromStr;

use crate::data::model::{Dataset, Spectrum};
use crate::error::{Error, Result};

pub use lda::Lda;
pub use pca::Pca;

/// Default number of output features for PCA and LDA.
pub const DEFAULT_COMPONENTS: usize = 20;

/// A fitted reduction. Immutable after fitting and shared across threads.
pub trait Reducer: fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// Length of the produced feature vectors, `None` for an identity.
    fn output_dim(&self) -> Option<usize>;

    fn reduce(&self, spectrum: &Spectrum) -> Result<Spectrum>;

    fn reduce_dataset(&self, dataset: Dataset) -> Result<Dataset> {
        dataset.map(|s| self.reduce(&s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReducerKind {
    Simple,
    Pca,
    Lda,
}

impl ReducerKind {
    pub const ALL: [ReducerKind; 3] = [ReducerKind::Simple, ReducerKind::Pca, ReducerKind::Lda];

    pub fn name(self) -> &'static str {
        match self {
            ReducerKind::Simple => "simple",
            ReducerKind::Pca => "pca",
            ReducerKind::Lda => "lda",
        }
    }

    /// Fit a reducer of this kind on `train`.
    ///
    /// An empty training set yields an identity reduction rather than an
    /// error.
    pub fn fit(self, train: &Dataset, components: usize) -> Result<Box<dyn Reducer>> {
        if components == 0 {
            return Err(Error::InvalidParameter {
                name: "components",
                reason: "must be at least 1".into(),
            });
        }
        Ok(match self {
            ReducerKind::Simple => Box::new(Simple),
            ReducerKind::Pca => Box::new(Pca::fit(train, components)?),
            ReducerKind::Lda => Box::new(Lda::fit(train, components)?),
        })
    }
}

impl FromStr for ReducerKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ReducerKind::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| Error::UnknownAlgorithm {
                kind: "reducer",
                name: s.to_string(),
                known: ReducerKind::ALL.iter().map(|k| k.name().to_string()).collect(),
            })
    }
}

// ---------------------------------------------------------------------------
// Simple – mean and variance, needs no fitting
// ---------------------------------------------------------------------------

/// Placeholder reduction reporting `[mean, variance]` of each spectrum.
#[derive(Debug, Clone, Copy, Default)]
pub struct Simple;

impl Reducer for Simple {
    fn name(&self) -> &'static str {
        "simple"
    }

    fn output_dim(&self) -> Option<usize> {
        Some(2)
    }

    fn reduce(&self, spectrum: &Spectrum) -> Result<Spectrum> {
        Ok(Spectrum::new(vec![spectrum.mean(), spectrum.variance()]))
    }
}

// ---------------------------------------------------------------------------
// Projection – shared by PCA and LDA
// ---------------------------------------------------------------------------

/// Linear map `x ↦ A (x - mean)`. With no mean it is the identity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Projection {
    mean: Vec<f64>,
    /// One row per output feature, each as long as `mean`.
    axes: Vec<Vec<f64>>,
}

impl Projection {
    pub fn identity() -> Self {
        Self::default()
    }

    pub fn new(mean: Vec<f64>, axes: Vec<Vec<f64>>) -> Self {
        debug_assert!(axes.iter().all(|a| a.len() == mean.len()));
        Self { mean, axes }
    }

    pub fn is_identity(&self) -> bool {
        self.mean.is_empty()
    }

    pub fn input_dim(&self) -> usize {
        self.mean.len()
    }

    pub fn output_dim(&self) -> Option<usize> {
        (!self.is_identity()).then_some(self.axes.len())
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn axes(&self) -> &[Vec<f64>] {
        &self.axes
    }

    pub fn project(&self, spectrum: &Spectrum) -> Result<Spectrum> {
        if self.is_identity() {
            return Ok(spectrum.clone());
        }
        self.project_slice(&spectrum.y).map(Spectrum::new)
    }

    pub fn project_slice(&self, x: &[f64]) -> Result<Vec<f64>> {
        if x.len() != self.mean.len() {
            return Err(Error::DimensionMismatch {
                expected: self.mean.len(),
                found: x.len(),
            });
        }
        Ok(self
            .axes
            .iter()
            .map(|axis| {
                axis.iter()
                    .zip(x)
                    .zip(&self.mean)
                    .map(|((a, v), m)| a * (v - m))
                    .sum()
            })
            .collect())
    }
}

/// Training vectors as rows, with the walk-order labels alongside.
pub(crate) fn training_rows(train: &Dataset) -> Result<(Vec<usize>, Vec<&[f64]>)> {
    train.dim()?;
    let (labels, spectra) = train.flatten();
    Ok((labels, spectra.into_iter().map(|s| s.y.as_slice()).collect()))
}
