use super::Model;
use crate::data::model::{Dataset, Spectrum};
use crate::error::{Error, Result};
use crate::label::Num;

/// Spread, relative to the vector's norm, under which it counts as constant.
/// A few thousand ulps above rounding noise: a small signal riding on a large
/// baseline stays on the Pearson path.
const FLAT: f64 = 1e-12;

/// One-nearest-neighbour classifier under the Pearson correlation.
///
/// A test spectrum is correlated with every training spectrum and receives
/// the label of the best match; the first one in training walk order wins a
/// tie. There is no index: the cost is `|train| × |test| × dim`.
#[derive(Debug, Clone)]
pub struct Correlation {
    train: Dataset,
    /// Labels in the walk order of `train`, one per row of a correlation row.
    labels: Vec<Num>,
    profiles: Vec<Profile>,
    dim: Option<usize>,
    abs: bool,
}

impl Correlation {
    /// Store the training set. With `abs` set, rows are ranked by |r| so a
    /// strong anti-correlation also counts as a match.
    pub fn new(train: Dataset, abs: bool) -> Result<Self> {
        let dim = train.dim()?;
        let mut labels = Vec::with_capacity(train.count());
        let mut profiles = Vec::with_capacity(train.count());
        train.apply(|l, s| {
            labels.push(l);
            profiles.push(Profile::of(&s.y));
        });
        Ok(Self {
            train,
            labels,
            profiles,
            dim,
            abs,
        })
    }

    /// Correlation of `spectrum` with every training spectrum, in walk order.
    pub fn correlation_row(&self, spectrum: &Spectrum) -> Result<Vec<f64>> {
        let Some(dim) = self.dim else {
            return Err(Error::Untrained {
                model: "correlation",
            });
        };
        if spectrum.len() != dim {
            return Err(Error::DimensionMismatch {
                expected: dim,
                found: spectrum.len(),
            });
        }

        let test = Profile::of(&spectrum.y);
        let mut row = Vec::with_capacity(self.labels.len());
        let mut i = 0;
        self.train.apply(|_, s| {
            row.push(coefficient(&s.y, &self.profiles[i], &spectrum.y, &test));
            i += 1;
        });
        Ok(row)
    }
}

impl Model for Correlation {
    fn name(&self) -> &'static str {
        "correlation"
    }

    fn num_classes(&self) -> usize {
        self.train.num_classes()
    }

    fn predict(&self, spectrum: &Spectrum) -> Result<Num> {
        let row = self.correlation_row(spectrum)?;

        let mut best: Option<(usize, f64)> = None;
        for (i, &r) in row.iter().enumerate() {
            let score = if self.abs { r.abs() } else { r };
            // NaN never wins; ties keep the earlier row.
            if best.map_or(!score.is_nan(), |(_, b)| score > b) {
                best = Some((i, score));
            }
        }

        best.map(|(i, _)| self.labels[i])
            .ok_or_else(|| Error::Numeric("no finite correlation with the training set".into()))
    }
}

/// Pearson correlation coefficient of two equally long vectors.
///
/// Pearson is undefined when a vector is constant; such pairs fall back to
/// the uncentred coefficient (cosine similarity), and to 0 when a vector is
/// all zeros.
pub fn correlation(a: &[f64], b: &[f64]) -> f64 {
    coefficient(a, &Profile::of(a), b, &Profile::of(b))
}

#[derive(Debug, Clone, Copy)]
struct Profile {
    mean: f64,
    norm: f64,
    centred_norm: f64,
}

impl Profile {
    fn of(y: &[f64]) -> Self {
        let n = y.len().max(1) as f64;
        let mean = y.iter().sum::<f64>() / n;
        let norm = y.iter().map(|v| v * v).sum::<f64>().sqrt();
        let centred_norm = y.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>().sqrt();
        Self {
            mean,
            norm,
            centred_norm,
        }
    }

    fn is_flat(&self) -> bool {
        self.centred_norm <= FLAT * self.norm
    }
}

fn coefficient(a: &[f64], pa: &Profile, b: &[f64], pb: &Profile) -> f64 {
    if pa.is_flat() || pb.is_flat() {
        if pa.norm == 0.0 || pb.norm == 0.0 {
            return 0.0;
        }
        let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        return (dot / (pa.norm * pb.norm)).clamp(-1.0, 1.0);
    }

    let cov: f64 = a
        .iter()
        .zip(b)
        .map(|(x, y)| (x - pa.mean) * (y - pb.mean))
        .sum();
    (cov / (pa.centred_norm * pb.centred_norm)).clamp(-1.0, 1.0)
}
