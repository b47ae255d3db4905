//! One evaluation run from configuration to report.
//!
//! ```text
//!  load ─► split ─► codec ─► encode ─► preprocess ─► train ─► evaluate ─► score
//! ```
//!
//! The codec is built once from the union of the train and test labels and
//! then shared read-only by both encodings, so the two splits agree on every
//! label code. Each stage attaches its name to any error it returns.

use std::fmt;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::config::ExperimentConfig;
use crate::data::loader;
use crate::data::model::{count_raw, encode_with, DataRaw};
use crate::data::split::split;
use crate::error::Error;
use crate::eval::predict_all;
use crate::label::{Codec, Raw};
use crate::model::ModelKind;
use crate::score::{self, confusion, headonly_recode, Confusion};

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// A confusion matrix in codec order with its raw label names.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreCard {
    pub labels: Vec<Raw>,
    pub matrix: Vec<Vec<u64>>,
    /// NaN (`null` in JSON) when nothing was evaluated.
    pub accuracy: f64,
}

impl ScoreCard {
    fn new(confusion: &Confusion, codec: &Codec) -> Result<Self> {
        let sorted = confusion.sorted();
        let labels = sorted
            .labels
            .iter()
            .map(|&l| codec.decode(l).map(str::to_string))
            .collect::<crate::error::Result<Vec<_>>>()?;
        Ok(Self {
            labels,
            accuracy: sorted.accuracy(),
            matrix: sorted.matrix,
        })
    }
}

impl fmt::Display for ScoreCard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        score::write_matrix(f, &self.labels, &self.matrix)?;
        writeln!(f, "accuracy: {:.4}", self.accuracy)
    }
}

/// Outcome of one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub model: String,
    pub split: String,
    pub preprocessing: Vec<String>,
    pub train_count: usize,
    pub test_count: usize,
    /// Length of the vectors the model saw, after preprocessing.
    pub features: Option<usize>,
    pub fine: ScoreCard,
    /// The same predictions scored on label heads.
    pub headonly: Option<ScoreCard>,
    /// Files the loader could not read, with the reason.
    pub skipped: Vec<String>,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let steps = if self.preprocessing.is_empty() {
            "none".to_string()
        } else {
            self.preprocessing.join(" → ")
        };
        writeln!(f, "model:         {}", self.model)?;
        writeln!(f, "split:         {}", self.split)?;
        writeln!(f, "preprocessing: {steps}")?;
        writeln!(f, "train / test:  {} / {}", self.train_count, self.test_count)?;
        if let Some(d) = self.features {
            writeln!(f, "features:      {d}")?;
        }
        if !self.skipped.is_empty() {
            writeln!(f, "skipped files: {}", self.skipped.len())?;
        }
        writeln!(f)?;
        write!(f, "{}", self.fine)?;
        if let Some(h) = &self.headonly {
            writeln!(f)?;
            writeln!(f, "head only:")?;
            write!(f, "{h}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

/// Load the configured dataset and evaluate it.
pub fn run(config: &ExperimentConfig) -> Result<Report> {
    config.validate().context("config")?;

    let load_stage = || format!("load: {}", config.data_dir.display());
    let scan = loader::load(&config.data_dir, config.labels_depth).with_context(load_stage)?;
    if scan.data.is_empty() {
        return Err(Error::EmptyDataset {
            operation: "evaluate",
        })
        .with_context(load_stage);
    }
    log::info!(
        "Loaded {} spectra in {} labels",
        count_raw(&scan.data),
        scan.data.len()
    );

    let mut report = evaluate(scan.data, config)?;
    report.skipped = scan
        .skipped
        .iter()
        .map(|s| format!("{}: {}", s.path.display(), s.error))
        .collect();
    Ok(report)
}

/// Evaluate an in-memory raw dataset.
pub fn evaluate(raw: DataRaw, config: &ExperimentConfig) -> Result<Report> {
    // Resolve names before doing any work.
    let pipeline = config.pipeline().context("preprocess")?;
    let kind: ModelKind = config.model.parse().context("train")?;
    let policy = config.split_policy();

    if raw.is_empty() {
        log::warn!("Evaluating an empty dataset");
    }

    let (train_raw, test_raw) = split(raw, policy).context("split")?;
    log::info!(
        "Split ({policy}): {} train / {} test spectra",
        count_raw(&train_raw),
        count_raw(&test_raw)
    );

    let unseen = test_only_labels(&train_raw, &test_raw);
    if !unseen.is_empty() {
        log::warn!(
            "{} test label(s) have no training spectra and cannot be predicted: {}",
            unseen.len(),
            unseen.join(", ")
        );
    }

    let codec = Codec::from_labels(train_raw.keys().chain(test_raw.keys()));
    log::debug!("Codec: {codec}");
    let train = encode_with(train_raw, &codec).context("encode: train")?;
    let test = encode_with(test_raw, &codec).context("encode: test")?;

    let (train, test) = pipeline.run(train, test).context("preprocess")?;
    let features = match train.dim().context("preprocess")? {
        Some(d) => Some(d),
        None => test.dim().context("preprocess")?,
    };

    let model = kind
        .train(&train, &config.model_config())
        .context("train")?;
    log::info!(
        "Trained {} on {} spectra, {} classes",
        model.name(),
        train.count(),
        model.num_classes()
    );

    let predictions = predict_all(model.as_ref(), &test, config.parallel).context("evaluate")?;

    let fine = confusion(&predictions.truth, &predictions.predicted).context("score")?;
    let fine_card = ScoreCard::new(&fine, &codec).context("score")?;
    log::info!("Accuracy: {:.4}", fine_card.accuracy);

    let headonly = if config.headonly {
        let heads = codec.headonly().context("score")?;
        let truth = headonly_recode(&predictions.truth, &codec, &heads).context("score")?;
        let predicted =
            headonly_recode(&predictions.predicted, &codec, &heads).context("score")?;
        let coarse = confusion(&truth, &predicted).context("score")?;
        Some(ScoreCard::new(&coarse, &heads).context("score")?)
    } else {
        None
    };

    Ok(Report {
        model: model.name().to_string(),
        split: policy.to_string(),
        preprocessing: pipeline.steps().iter().map(|s| s.name().to_string()).collect(),
        train_count: train.count(),
        test_count: test.count(),
        features,
        fine: fine_card,
        headonly,
        skipped: Vec::new(),
    })
}

/// Test labels with no spectra on the training side.
fn test_only_labels<'a>(train: &DataRaw, test: &'a DataRaw) -> Vec<&'a str> {
    test.iter()
        .filter(|(label, spectra)| {
            !spectra.is_empty() && train.get(*label).map_or(true, Vec::is_empty)
        })
        .map(|(label, _)| label.as_str())
        .collect()
}
