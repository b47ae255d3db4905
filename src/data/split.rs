//! Train/test split policies over a raw, string-labelled dataset.
//!
//! Both policies are deterministic: leave-one-out by label order, the
//! stratified holdout by its seed.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::model::{DataRaw, Spectrum};
use crate::error::{Error, Result};
use crate::label::{self, Raw};

/// Fraction of spectra that go to training in a stratified holdout.
pub const DEFAULT_TRAIN_RATIO: f64 = 0.66;

/// Seed of the stratified holdout generator.
pub const DEFAULT_SEED: u64 = 0;

// ---------------------------------------------------------------------------
// Policy selection
// ---------------------------------------------------------------------------

/// Name of a split policy, as given on the command line or in a config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SplitKind {
    /// Per head group, the first full label is the test set.
    LeaveOneOut,
    /// Per label, each spectrum goes to train with a fixed probability.
    #[default]
    Stratified,
}

impl SplitKind {
    pub const ALL: [SplitKind; 2] = [SplitKind::LeaveOneOut, SplitKind::Stratified];

    pub fn name(self) -> &'static str {
        match self {
            SplitKind::LeaveOneOut => "leave-one-out",
            SplitKind::Stratified => "stratified",
        }
    }
}

impl fmt::Display for SplitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SplitKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        SplitKind::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| Error::UnknownAlgorithm {
                kind: "split policy",
                name: s.to_string(),
                known: SplitKind::ALL.iter().map(|k| k.name().to_string()).collect(),
            })
    }
}

/// A fully parameterised split policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SplitPolicy {
    /// Group labels by head; the first full label of every group (in label
    /// order) is reserved for test, all others go to train. Output labels are
    /// the heads, so "spot00 is test, spot01.. are train" designs share one
    /// class per mineral.
    LeaveOneOut,
    /// Independently send every spectrum of every label to train with
    /// probability `train_ratio`, from a generator seeded with `seed`.
    /// Output labels are the full labels. Reproducible for a fixed seed.
    Stratified { train_ratio: f64, seed: u64 },
}

impl SplitPolicy {
    pub fn stratified(train_ratio: f64) -> Self {
        SplitPolicy::Stratified {
            train_ratio,
            seed: DEFAULT_SEED,
        }
    }

    pub fn kind(&self) -> SplitKind {
        match self {
            SplitPolicy::LeaveOneOut => SplitKind::LeaveOneOut,
            SplitPolicy::Stratified { .. } => SplitKind::Stratified,
        }
    }
}

impl Default for SplitPolicy {
    fn default() -> Self {
        SplitPolicy::stratified(DEFAULT_TRAIN_RATIO)
    }
}

impl fmt::Display for SplitPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SplitPolicy::LeaveOneOut => write!(f, "leave-one-out"),
            SplitPolicy::Stratified { train_ratio, seed } => {
                write!(f, "stratified (train ratio {train_ratio}, seed {seed})")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Splitting
// ---------------------------------------------------------------------------

/// Split a raw dataset into `(train, test)` following `policy`.
pub fn split(raw: DataRaw, policy: SplitPolicy) -> Result<(DataRaw, DataRaw)> {
    match policy {
        SplitPolicy::LeaveOneOut => leave_one_out(raw),
        SplitPolicy::Stratified { train_ratio, seed } => stratified(raw, train_ratio, seed),
    }
}

fn leave_one_out(raw: DataRaw) -> Result<(DataRaw, DataRaw)> {
    // Full labels iterate in sorted order, so the first label seen for a head
    // is the smallest one of its group.
    let mut test_label_of: BTreeMap<Raw, Raw> = BTreeMap::new();
    for full in raw.keys() {
        let head = label::head(full)?;
        test_label_of
            .entry(head.to_string())
            .or_insert_with(|| full.clone());
    }

    let mut train = DataRaw::new();
    let mut test = DataRaw::new();
    for (full, spectra) in raw {
        let head = label::head(&full)?.to_string();
        let target = if test_label_of.get(&head) == Some(&full) {
            &mut test
        } else {
            &mut train
        };
        target.entry(head).or_default().extend(spectra);
    }

    for head in test.keys().filter(|h| !train.contains_key(*h)) {
        log::warn!("{head} has a single subgroup; it appears in test only");
    }
    Ok((train, test))
}

fn stratified(raw: DataRaw, train_ratio: f64, seed: u64) -> Result<(DataRaw, DataRaw)> {
    if !(0.0..=1.0).contains(&train_ratio) {
        return Err(Error::InvalidParameter {
            name: "train ratio",
            reason: format!("{train_ratio} is outside [0, 1]"),
        });
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = DataRaw::new();
    let mut test = DataRaw::new();
    for (label, spectra) in raw {
        let (to_train, to_test): (Vec<Spectrum>, Vec<Spectrum>) = spectra
            .into_iter()
            .partition(|_| rng.gen::<f64>() < train_ratio);
        if !to_train.is_empty() {
            train.insert(label.clone(), to_train);
        }
        if !to_test.is_empty() {
            test.insert(label, to_test);
        }
    }
    Ok((train, test))
}
