//! Stateless intensity transforms. Statistics are computed over everything
//! being transformed and applied in the same call; nothing is carried over
//! to new data.

use crate::data::model::Dataset;
use crate::error::{Error, Result};

/// Standard deviations below this count as a constant feature.
pub const MIN_STDDEV: f64 = 1e-12;

/// Replace every value `v` with `ln(v - min + 1)`, `min` being the global
/// minimum of the dataset. The minimum itself maps to `ln(1) = 0`.
pub fn log(mut dataset: Dataset) -> Dataset {
    log_all(&mut [&mut dataset]);
    dataset
}

/// Standardize every feature index to zero mean and unit sample standard
/// deviation. Near-constant features are replaced by their mean.
pub fn normalize(mut dataset: Dataset) -> Result<Dataset> {
    normalize_all(&mut [&mut dataset])?;
    Ok(dataset)
}

/// [`log`] over several datasets at once, sharing one global minimum.
pub(crate) fn log_all(sets: &mut [&mut Dataset]) {
    let mut min = f64::INFINITY;
    for d in sets.iter() {
        d.apply(|_, s| {
            for &v in &s.y {
                if v < min {
                    min = v;
                }
            }
        });
    }
    if !min.is_finite() {
        return;
    }

    for d in sets.iter_mut() {
        d.mutate(|_, s| {
            for v in &mut s.y {
                *v = (*v - min + 1.0).ln();
            }
        });
    }
}

/// [`normalize`] over several datasets at once, sharing one set of
/// per-feature statistics.
pub(crate) fn normalize_all(sets: &mut [&mut Dataset]) -> Result<()> {
    let mut dim = None;
    for d in sets.iter() {
        match (dim, d.dim()?) {
            (None, found) => dim = found,
            (Some(expected), Some(found)) if expected != found => {
                return Err(Error::DimensionMismatch { expected, found })
            }
            _ => {}
        }
    }
    let Some(dim) = dim else {
        return Ok(());
    };

    let count: usize = sets.iter().map(|d| d.count()).sum();

    let mut mean = vec![0.0; dim];
    for d in sets.iter() {
        d.apply(|_, s| {
            for (m, v) in mean.iter_mut().zip(&s.y) {
                *m += v;
            }
        });
    }
    for m in &mut mean {
        *m /= count as f64;
    }

    let mut stddev = vec![0.0; dim];
    if count > 1 {
        for d in sets.iter() {
            d.apply(|_, s| {
                for ((acc, v), m) in stddev.iter_mut().zip(&s.y).zip(&mean) {
                    *acc += (v - m) * (v - m);
                }
            });
        }
        for sd in &mut stddev {
            *sd = (*sd / (count - 1) as f64).sqrt();
        }
    }

    for d in sets.iter_mut() {
        d.mutate(|_, s| {
            for ((v, m), sd) in s.y.iter_mut().zip(&mean).zip(&stddev) {
                *v = if *sd < MIN_STDDEV { *m } else { (*v - m) / sd };
            }
        });
    }
    Ok(())
}
