//! Principal component analysis.

use nalgebra::{DMatrix, SymmetricEigen};
use rayon::prelude::*;

use super::{training_rows, Projection, Reducer};
use crate::data::model::{Dataset, Spectrum};
use crate::error::Result;

/// Eigenvalues below this fraction of the largest one are treated as zero.
const RANK_TOLERANCE: f64 = 1e-10;

/// Principal component analysis fitted on a training set.
///
/// Spectra have far more points than a dataset has samples, so the basis is
/// taken from the eigendecomposition of the `n × n` Gram matrix of the
/// centred training rows. The `d × d` covariance is never formed.
#[derive(Debug, Clone, PartialEq)]
pub struct Pca {
    projection: Projection,
    explained_variance_ratio: Vec<f64>,
}

impl Pca {
    /// Keep up to `components` axes; fewer when the training data has lower
    /// rank. An empty or rank-zero training set gives the identity.
    pub fn fit(train: &Dataset, components: usize) -> Result<Self> {
        let (_, rows) = training_rows(train)?;
        Ok(Self::fit_rows(&rows, components))
    }

    pub(crate) fn fit_rows(rows: &[&[f64]], components: usize) -> Self {
        let identity = Self {
            projection: Projection::identity(),
            explained_variance_ratio: Vec::new(),
        };
        let n = rows.len();
        if n == 0 {
            log::warn!("PCA fitted on an empty training set; using the identity");
            return identity;
        }
        let d = rows[0].len();

        let mut mean = vec![0.0; d];
        for row in rows {
            for (m, v) in mean.iter_mut().zip(row.iter()) {
                *m += v;
            }
        }
        for m in &mut mean {
            *m /= n as f64;
        }

        let centred: Vec<Vec<f64>> = rows
            .par_iter()
            .map(|row| row.iter().zip(&mean).map(|(v, m)| v - m).collect())
            .collect();

        let gram_rows: Vec<Vec<f64>> = (0..n)
            .into_par_iter()
            .map(|i| (0..=i).map(|j| dot(&centred[i], &centred[j])).collect())
            .collect();
        let mut gram = DMatrix::<f64>::zeros(n, n);
        for (i, row) in gram_rows.iter().enumerate() {
            for (j, &g) in row.iter().enumerate() {
                gram[(i, j)] = g;
                gram[(j, i)] = g;
            }
        }

        let eigen = SymmetricEigen::new(gram);
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));

        let largest = eigen.eigenvalues[order[0]];
        if largest <= f64::EPSILON {
            log::warn!("PCA training set has no variance; using the identity");
            return identity;
        }
        let total: f64 = eigen.eigenvalues.iter().filter(|&&l| l > 0.0).sum();

        let mut axes = Vec::new();
        let mut ratios = Vec::new();
        for &k in order.iter().take(components) {
            let lambda = eigen.eigenvalues[k];
            if lambda <= largest * RANK_TOLERANCE {
                break;
            }
            // v = Xᵀ u / √λ is a unit eigenvector of XᵀX.
            let scale = lambda.sqrt();
            let mut axis = vec![0.0; d];
            for (i, row) in centred.iter().enumerate() {
                let weight = eigen.eigenvectors[(i, k)] / scale;
                for (a, v) in axis.iter_mut().zip(row) {
                    *a += weight * v;
                }
            }
            axes.push(axis);
            ratios.push(lambda / total);
        }

        log::debug!(
            "PCA kept {} of {components} requested axes, explaining {:.2}% of variance",
            axes.len(),
            100.0 * ratios.iter().sum::<f64>()
        );
        Self {
            projection: Projection::new(mean, axes),
            explained_variance_ratio: ratios,
        }
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    /// Share of the training variance captured by each kept axis.
    pub fn explained_variance_ratio(&self) -> &[f64] {
        &self.explained_variance_ratio
    }
}

impl Reducer for Pca {
    fn name(&self) -> &'static str {
        "pca"
    }

    fn output_dim(&self) -> Option<usize> {
        self.projection.output_dim()
    }

    fn reduce(&self, spectrum: &Spectrum) -> Result<Spectrum> {
        self.projection.project(spectrum)
    }
}

pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
