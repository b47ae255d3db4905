//! Preprocessing of encoded datasets before they reach a model.
//!
//! A [`Pipeline`] is an ordered list of named steps, each fed the output of
//! the previous one. It runs on the train/test pair:
//!
//! * `log` and `norm` compute their statistics over both splits together,
//!   which gives the same result as transforming the unsplit dataset;
//! * reducers (`simple`, `pca`, `lda`) are fitted on train only and then
//!   project both splits with the same fitted state.

pub mod scale;

use std::fmt;
use std::str::FromStr;

use crate::data::model::Dataset;
use crate::dim::{ReducerKind, DEFAULT_COMPONENTS};
use crate::error::{Error, Result};

pub use scale::{log, normalize};

/// Every preprocessing step name understood by [`Step::from_str`].
pub const ALL_PRE: [&str; 5] = ["log", "norm", "simple", "pca", "lda"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Log,
    Norm,
    Reduce(ReducerKind),
}

impl Step {
    pub fn name(self) -> &'static str {
        match self {
            Step::Log => "log",
            Step::Norm => "norm",
            Step::Reduce(kind) => kind.name(),
        }
    }

    fn run(self, mut train: Dataset, mut test: Dataset, components: usize) -> Result<(Dataset, Dataset)> {
        match self {
            Step::Log => scale::log_all(&mut [&mut train, &mut test]),
            Step::Norm => scale::normalize_all(&mut [&mut train, &mut test])?,
            Step::Reduce(kind) => {
                let reducer = kind.fit(&train, components)?;
                train = reducer.reduce_dataset(train)?;
                test = reducer.reduce_dataset(test)?;
            }
        }
        Ok((train, test))
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Step {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "log" => Ok(Step::Log),
            "norm" => Ok(Step::Norm),
            other => other.parse().map(Step::Reduce).map_err(|_| Error::UnknownAlgorithm {
                kind: "preprocessing step",
                name: other.to_string(),
                known: ALL_PRE.iter().map(|s| s.to_string()).collect(),
            }),
        }
    }
}

/// Ordered preprocessing steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    steps: Vec<Step>,
    components: usize,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self {
            steps: Vec::new(),
            components: DEFAULT_COMPONENTS,
        }
    }
}

impl Pipeline {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps,
            ..Self::default()
        }
    }

    /// Resolve step names in order. Fails on the first unknown name.
    pub fn from_names<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let steps = names
            .into_iter()
            .map(|n| n.as_ref().parse())
            .collect::<Result<Vec<Step>>>()?;
        Ok(Self::new(steps))
    }

    /// Number of features reducers keep.
    pub fn with_components(mut self, components: usize) -> Self {
        self.components = components;
        self
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run every step in order on the train/test pair.
    pub fn run(&self, mut train: Dataset, mut test: Dataset) -> Result<(Dataset, Dataset)> {
        for step in &self.steps {
            (train, test) = step.run(train, test, self.components)?;
            log::info!(
                "Applied {step}: {} train / {} test spectra, {} features",
                train.count(),
                test.count(),
                train
                    .dim()?
                    .or(test.dim()?)
                    .map_or_else(|| "no".to_string(), |d| d.to_string())
            );
        }
        Ok((train, test))
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.steps.is_empty() {
            return f.write_str("none");
        }
        let names: Vec<_> = self.steps.iter().map(|s| s.name()).collect();
        f.write_str(&names.join(" → "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{encode, DataRaw, Spectrum};
    use crate::label::Codec;

    fn pair() -> (Dataset, Dataset) {
        let mut raw = DataRaw::new();
        raw.insert(
            "/a".into(),
            vec![Spectrum::new(vec![1.0, 2.0, 3.0]), Spectrum::new(vec![2.0, 2.0, 5.0])],
        );
        raw.insert("/b".into(), vec![Spectrum::new(vec![9.0, 2.0, 1.0])]);
        let train = encode(raw);
        let mut test = Dataset::with_codec(train.codec().clone());
        test.push(1, Spectrum::new(vec![0.0, 2.0, 4.0])).unwrap();
        (train, test)
    }

    #[test]
    fn every_registered_name_resolves() {
        for name in ALL_PRE {
            let step: Step = name.parse().unwrap();
            assert_eq!(step.name(), name);
        }
    }

    #[test]
    fn unknown_step_is_rejected() {
        let err = Pipeline::from_names(["log", "fft"]).unwrap_err();
        assert!(matches!(err, Error::UnknownAlgorithm { name, .. } if name == "fft"));
    }

    #[test]
    fn order_is_preserved() {
        let p = Pipeline::from_names(["norm", "log", "pca"]).unwrap();
        assert_eq!(
            p.steps(),
            &[Step::Norm, Step::Log, Step::Reduce(ReducerKind::Pca)]
        );
        assert_eq!(p.to_string(), "norm → log → pca");
    }

    #[test]
    fn empty_pipeline_is_a_no_op() {
        let (train, test) = pair();
        let (t2, s2) = Pipeline::default().run(train.clone(), test.clone()).unwrap();
        assert_eq!(t2, train);
        assert_eq!(s2, test);
    }

    #[test]
    fn reducer_shrinks_both_splits() {
        let (train, test) = pair();
        let (train, test) = Pipeline::from_names(["log", "simple"])
            .unwrap()
            .run(train, test)
            .unwrap();
        assert_eq!(train.dim().unwrap(), Some(2));
        assert_eq!(test.dim().unwrap(), Some(2));
        assert_eq!(train.codec(), &Codec::from_labels(["/a", "/b"]));
    }

    #[test]
    fn log_uses_minimum_of_both_splits() {
        let (train, test) = pair();
        let (_, test) = Pipeline::new(vec![Step::Log]).run(train, test).unwrap();
        let (_, spectra) = test.flatten();
        // 0.0 is the global minimum and lives in the test split.
        assert_eq!(spectra[0].y[0], 0.0);
    }

    #[test]
    fn pca_keeps_at_most_the_training_rank() {
        let (train, test) = pair();
        let (train, test) = Pipeline::from_names(["pca"])
            .unwrap()
            .with_components(5)
            .run(train, test)
            .unwrap();
        // Three training samples span at most two centred directions.
        assert_eq!(train.dim().unwrap(), Some(2));
        assert_eq!(test.dim().unwrap(), Some(2));
    }
}
