//! Confusion matrices and accuracy.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::label::{head, Codec, Num};

/// Counts of true class (rows) against predicted class (columns).
///
/// `labels[i]` is the label code behind row and column `i`. The order is
/// the first-seen order over the ground truth followed by the predictions,
/// so a class that was only ever predicted still gets a row and a column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Confusion {
    pub labels: Vec<Num>,
    pub matrix: Vec<Vec<u64>>,
}

impl Confusion {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Number of evaluated instances.
    pub fn total(&self) -> u64 {
        self.matrix.iter().flatten().sum()
    }

    /// Number of correct predictions.
    pub fn trace(&self) -> u64 {
        (0..self.len()).map(|i| self.matrix[i][i]).sum()
    }

    /// Fraction of correct predictions. NaN when nothing was evaluated.
    pub fn accuracy(&self) -> f64 {
        accuracy(self)
    }

    /// The same counts with rows and columns ordered by label code, which is
    /// codec order.
    pub fn sorted(&self) -> Confusion {
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.sort_by_key(|&i| self.labels[i]);
        Confusion {
            labels: order.iter().map(|&i| self.labels[i]).collect(),
            matrix: order
                .iter()
                .map(|&i| order.iter().map(|&j| self.matrix[i][j]).collect())
                .collect(),
        }
    }

    /// Render with raw label names taken from `codec`.
    pub fn display<'a>(&'a self, codec: &'a Codec) -> Labelled<'a> {
        Labelled {
            confusion: self,
            codec,
        }
    }
}

/// Build the confusion matrix of two index-aligned label sequences.
pub fn confusion(truth: &[Num], predicted: &[Num]) -> Result<Confusion> {
    if truth.len() != predicted.len() {
        return Err(Error::DimensionMismatch {
            expected: truth.len(),
            found: predicted.len(),
        });
    }

    let mut index: HashMap<Num, usize> = HashMap::new();
    let mut labels = Vec::new();
    for &l in truth.iter().chain(predicted) {
        index.entry(l).or_insert_with(|| {
            labels.push(l);
            labels.len() - 1
        });
    }

    let n = labels.len();
    let mut matrix = vec![vec![0u64; n]; n];
    for (t, p) in truth.iter().zip(predicted) {
        matrix[index[t]][index[p]] += 1;
    }
    Ok(Confusion { labels, matrix })
}

/// trace / sum. NaN for an empty matrix.
pub fn accuracy(confusion: &Confusion) -> f64 {
    let total = confusion.total();
    if total == 0 {
        return f64::NAN;
    }
    confusion.trace() as f64 / total as f64
}

/// Map fine label codes to the codes of their heads.
///
/// Each code is decoded with `full`, cut to its head and looked up in
/// `headonly`, which must already know every head.
pub fn headonly_recode(nums: &[Num], full: &Codec, headonly: &Codec) -> Result<Vec<Num>> {
    nums.iter()
        .map(|&n| headonly.encode_existing(head(full.decode(n)?)?))
        .collect()
}

/// [`Confusion`] paired with the codec that names its labels.
pub struct Labelled<'a> {
    confusion: &'a Confusion,
    codec: &'a Codec,
}

impl fmt::Display for Labelled<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self
            .confusion
            .labels
            .iter()
            .map(|&l| match self.codec.decode(l) {
                Ok(name) => name.to_string(),
                Err(_) => format!("#{l}"),
            })
            .collect();
        write_matrix(f, &names, &self.confusion.matrix)
    }
}

/// One row per true class: its name, its index, then the counts.
pub(crate) fn write_matrix(
    f: &mut fmt::Formatter<'_>,
    names: &[String],
    matrix: &[Vec<u64>],
) -> fmt::Result {
    let width = names.iter().map(String::len).max().unwrap_or(0);
    let cell = matrix
        .iter()
        .flatten()
        .map(|c| c.to_string().len())
        .max()
        .unwrap_or(1)
        .max(3);

    for (i, (name, row)) in names.iter().zip(matrix).enumerate() {
        write!(f, "{name:>width$} [{i:>2}]")?;
        for c in row {
            write!(f, " {c:>cell$}")?;
        }
        writeln!(f)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_class_example() {
        let c = confusion(&[0, 0, 1, 1], &[0, 1, 1, 1]).unwrap();
        assert_eq!(c.labels, vec![0, 1]);
        assert_eq!(c.matrix, vec![vec![1, 1], vec![0, 2]]);
        assert_eq!(accuracy(&c), 0.75);
    }

    #[test]
    fn predicted_only_labels_get_a_row() {
        let c = confusion(&[3, 3], &[3, 7]).unwrap();
        assert_eq!(c.labels, vec![3, 7]);
        assert_eq!(c.matrix, vec![vec![1, 1], vec![0, 0]]);
        assert_eq!(c.accuracy(), 0.5);
    }

    #[test]
    fn index_order_is_first_seen_not_numeric() {
        let c = confusion(&[5, 2, 5], &[5, 2, 9]).unwrap();
        assert_eq!(c.labels, vec![5, 2, 9]);
        assert_eq!(c.total(), 3);
        assert_eq!(c.trace(), 2);
    }

    #[test]
    fn sorted_follows_codec_order() {
        let c = confusion(&[1, 0, 1], &[1, 0, 0]).unwrap();
        assert_eq!(c.labels, vec![1, 0]);
        let s = c.sorted();
        assert_eq!(s.labels, vec![0, 1]);
        assert_eq!(s.matrix, vec![vec![1, 0], vec![1, 1]]);
        assert_eq!(s.accuracy(), c.accuracy());
    }

    #[test]
    fn empty_input_has_nan_accuracy() {
        let c = confusion(&[], &[]).unwrap();
        assert!(c.is_empty());
        assert!(accuracy(&c).is_nan());
    }

    #[test]
    fn unequal_lengths_are_rejected() {
        assert!(matches!(
            confusion(&[0, 1], &[0]),
            Err(Error::DimensionMismatch {
                expected: 2,
                found: 1
            })
        ));
    }

    #[test]
    fn headonly_recode_example() {
        let full = Codec::from_labels(["/azurite/spot00", "/azurite/spot01", "/brochantite/x"]);
        let heads = full.headonly().unwrap();
        assert_eq!(heads.encode_existing("/azurite").unwrap(), 0);
        assert_eq!(heads.encode_existing("/brochantite").unwrap(), 1);
        assert_eq!(headonly_recode(&[0, 1, 2], &full, &heads).unwrap(), vec![0, 0, 1]);
    }

    #[test]
    fn headonly_recode_rejects_unknown_codes() {
        let full = Codec::from_labels(["/a/x"]);
        let heads = full.headonly().unwrap();
        assert!(headonly_recode(&[4], &full, &heads).is_err());
    }

    #[test]
    fn display_uses_raw_labels() {
        let codec = Codec::from_labels(["/azurite", "/brochantite"]);
        let c = confusion(&[0, 1], &[0, 0]).unwrap();
        let text = c.display(&codec).to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("/azurite"));
        assert!(lines[1].trim_end().ends_with("1   0"));
    }
}
