//! Fisher linear discriminant analysis on top of a PCA reduction.

use std::collections::BTreeMap;

use nalgebra::{Cholesky, DMatrix, DVector, SymmetricEigen};

use super::pca::Pca;
use super::{training_rows, Projection, Reducer};
use crate::data::model::{Dataset, Spectrum};
use crate::error::{Error, Result};
use crate::label::Num;

/// Upper bound on the PCA space LDA works in.
pub const PCA_LIMIT: usize = 200;

/// Linear discriminant analysis fitted on a labelled training set.
///
/// The spectra are first reduced with PCA to at most `n - k` axes (`n`
/// samples, `k` classes), which keeps the within-class scatter invertible,
/// then Fisher's criterion is solved in that space. At most `k - 1`
/// discriminant axes exist.
#[derive(Debug, Clone, PartialEq)]
pub struct Lda {
    projection: Projection,
}

impl Lda {
    pub fn fit(train: &Dataset, components: usize) -> Result<Self> {
        let (labels, rows) = training_rows(train)?;
        if rows.is_empty() {
            log::warn!("LDA fitted on an empty training set; using the identity");
            return Ok(Self {
                projection: Projection::identity(),
            });
        }

        let mut classes: BTreeMap<Num, Vec<usize>> = BTreeMap::new();
        for (i, &l) in labels.iter().enumerate() {
            classes.entry(l).or_default().push(i);
        }
        let k = classes.len();

        let pca_dims = rows.len().saturating_sub(k).clamp(1, PCA_LIMIT);
        let pca = Pca::fit_rows(&rows, pca_dims);
        let basis = pca.projection();
        if basis.is_identity() {
            return Ok(Self {
                projection: Projection::identity(),
            });
        }
        if k < 2 {
            log::warn!("LDA needs two classes, found {k}; falling back to PCA");
            let axes = basis.axes().iter().take(components).cloned().collect();
            return Ok(Self {
                projection: Projection::new(basis.mean().to_vec(), axes),
            });
        }

        let z = rows
            .iter()
            .map(|r| basis.project_slice(r))
            .collect::<Result<Vec<_>>>()?;
        let m = z[0].len();

        let overall = mean_of(z.iter().map(Vec::as_slice), m);
        let mut sw = DMatrix::<f64>::zeros(m, m);
        let mut sb = DMatrix::<f64>::zeros(m, m);
        for members in classes.values() {
            let centre = mean_of(members.iter().map(|&i| z[i].as_slice()), m);
            for &i in members {
                let diff: Vec<f64> = z[i].iter().zip(&centre).map(|(a, b)| a - b).collect();
                add_outer(&mut sw, &diff, 1.0);
            }
            let shift: Vec<f64> = centre.iter().zip(&overall).map(|(a, b)| a - b).collect();
            add_outer(&mut sb, &shift, members.len() as f64);
        }

        // Ridge keeps the Cholesky factorisation defined for degenerate classes.
        let trace = sw.trace();
        let ridge = if trace > 0.0 { 1e-6 * trace / m as f64 } else { 1.0 };
        sw += DMatrix::<f64>::identity(m, m) * ridge;

        let l = Cholesky::new(sw)
            .ok_or_else(|| Error::Numeric("within-class scatter is not positive definite".into()))?
            .l();
        let solve_failed = || Error::Numeric("triangular solve failed".into());

        // M = L⁻¹ Sb L⁻ᵀ, symmetric, shares its eigenvalues with Sw⁻¹ Sb.
        let a = l.solve_lower_triangular(&sb).ok_or_else(solve_failed)?;
        let whitened = l
            .solve_lower_triangular(&a.transpose())
            .ok_or_else(solve_failed)?;
        let whitened = (&whitened + whitened.transpose()) * 0.5;

        let eigen = SymmetricEigen::new(whitened);
        let mut order: Vec<usize> = (0..m).collect();
        order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));

        let keep = components.min(k - 1).min(m);
        let mut axes = Vec::with_capacity(keep);
        for &idx in order.iter().take(keep) {
            if eigen.eigenvalues[idx] <= f64::EPSILON {
                break;
            }
            let v: DVector<f64> = eigen.eigenvectors.column(idx).into_owned();
            let mut w = l.tr_solve_lower_triangular(&v).ok_or_else(solve_failed)?;
            let norm = w.norm();
            if norm > 0.0 {
                w /= norm;
            }

            // Fold the PCA basis in so the axis acts on raw spectra.
            let mut axis = vec![0.0; basis.input_dim()];
            for (weight, pc) in w.iter().zip(basis.axes()) {
                for (a, p) in axis.iter_mut().zip(pc) {
                    *a += weight * p;
                }
            }
            axes.push(axis);
        }

        log::debug!(
            "LDA kept {} discriminant axes over a {m}-dimensional PCA space",
            axes.len()
        );
        Ok(Self {
            projection: Projection::new(basis.mean().to_vec(), axes),
        })
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }
}

impl Reducer for Lda {
    fn name(&self) -> &'static str {
        "lda"
    }

    fn output_dim(&self) -> Option<usize> {
        self.projection.output_dim()
    }

    fn reduce(&self, spectrum: &Spectrum) -> Result<Spectrum> {
        self.projection.project(spectrum)
    }
}

fn mean_of<'a>(rows: impl Iterator<Item = &'a [f64]>, dim: usize) -> Vec<f64> {
    let mut mean = vec![0.0; dim];
    let mut n = 0usize;
    for row in rows {
        for (m, v) in mean.iter_mut().zip(row) {
            *m += v;
        }
        n += 1;
    }
    if n > 0 {
        for m in &mut mean {
            *m /= n as f64;
        }
    }
    mean
}

fn add_outer(target: &mut DMatrix<f64>, v: &[f64], weight: f64) {
    for (i, a) in v.iter().enumerate() {
        for (j, b) in v.iter().enumerate() {
            target[(i, j)] += weight * a * b;
        }
    }
}
