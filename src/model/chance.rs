use rand::Rng;

use super::Model;
use crate::data::model::{Dataset, Spectrum};
use crate::error::{Error, Result};
use crate::label::Num;

/// Baseline that ignores its input and draws a label from the class
/// frequencies of the training set.
///
/// Every prediction uses the thread-local generator, unseeded, so results
/// differ between runs.
#[derive(Debug, Clone)]
pub struct RandomChance {
    /// Class codes with their relative frequency, summing to one.
    probs: Vec<(Num, f64)>,
}

impl RandomChance {
    pub fn new(train: &Dataset) -> Self {
        let total = train.count();
        let probs = train
            .classes()
            .filter(|(_, spectra)| !spectra.is_empty())
            .map(|(label, spectra)| (label, spectra.len() as f64 / total as f64))
            .collect();
        Self { probs }
    }

    pub fn probabilities(&self) -> &[(Num, f64)] {
        &self.probs
    }

    fn draw(&self, r: f64) -> Option<Num> {
        // Walk the cumulative distribution.
        let mut total = 0.0;
        for &(label, p) in &self.probs {
            total += p;
            if r < total {
                return Some(label);
            }
        }
        // Rounding can leave the sum a hair below one.
        self.probs.last().map(|&(label, _)| label)
    }
}

impl Model for RandomChance {
    fn name(&self) -> &'static str {
        "chance"
    }

    fn num_classes(&self) -> usize {
        self.probs.len()
    }

    fn predict(&self, _spectrum: &Spectrum) -> Result<Num> {
        let r = rand::thread_rng().gen::<f64>();
        self.draw(r).ok_or(Error::Untrained { model: "chance" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{encode, DataRaw};
    use approx::assert_abs_diff_eq;

    fn imbalanced() -> Dataset {
        let mut raw = DataRaw::new();
        raw.insert("/a".into(), vec![Spectrum::new(vec![0.0]); 3]);
        raw.insert("/b".into(), vec![Spectrum::new(vec![0.0]); 1]);
        encode(raw)
    }

    #[test]
    fn probabilities_follow_class_frequencies() {
        let m = RandomChance::new(&imbalanced());
        let probs = m.probabilities();
        assert_eq!(probs.len(), 2);
        assert_abs_diff_eq!(probs[0].1, 0.75);
        assert_abs_diff_eq!(probs[1].1, 0.25);
    }

    #[test]
    fn cumulative_walk_picks_the_right_bucket() {
        let m = RandomChance::new(&imbalanced());
        assert_eq!(m.draw(0.0), Some(0));
        assert_eq!(m.draw(0.74), Some(0));
        assert_eq!(m.draw(0.75), Some(1));
        assert_eq!(m.draw(0.9999), Some(1));
        assert_eq!(m.draw(1.0), Some(1));
    }

    #[test]
    fn predictions_are_training_labels() {
        let m = RandomChance::new(&imbalanced());
        for _ in 0..100 {
            let l = m.predict(&Spectrum::new(vec![5.0])).unwrap();
            assert!(l == 0 || l == 1);
        }
    }
}
