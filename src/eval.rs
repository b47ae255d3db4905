//! Running a trained model over a test set.

use rayon::prelude::*;

use crate::data::model::Dataset;
use crate::error::Result;
use crate::label::Num;
use crate::model::Model;

/// Ground truth and predictions, index-aligned in the walk order of the
/// test set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Predictions {
    pub truth: Vec<Num>,
    pub predicted: Vec<Num>,
}

impl Predictions {
    pub fn len(&self) -> usize {
        self.truth.len()
    }

    pub fn is_empty(&self) -> bool {
        self.truth.is_empty()
    }
}

/// Predict every spectrum of `test`.
///
/// With `parallel` set, predictions fan out over the rayon pool; the
/// collected results keep the input order, so both paths return the same
/// alignment.
pub fn predict_all(model: &dyn Model, test: &Dataset, parallel: bool) -> Result<Predictions> {
    let (truth, spectra) = test.flatten();
    let predicted = if parallel {
        spectra
            .par_iter()
            .map(|s| model.predict(s))
            .collect::<Result<Vec<_>>>()?
    } else {
        spectra
            .iter()
            .map(|s| model.predict(s))
            .collect::<Result<Vec<_>>>()?
    };
    log::debug!(
        "{} predicted {} spectra ({})",
        model.name(),
        predicted.len(),
        if parallel { "parallel" } else { "sequential" }
    );
    Ok(Predictions { truth, predicted })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{encode, DataRaw, Spectrum};
    use crate::model::Correlation;

    fn data() -> Dataset {
        let mut raw = DataRaw::new();
        raw.insert(
            "/a".into(),
            vec![Spectrum::new(vec![0.0, 1.0, 2.0, 3.0]), Spectrum::new(vec![0.0, 1.0, 2.5, 3.0])],
        );
        raw.insert(
            "/b".into(),
            vec![Spectrum::new(vec![3.0, 2.0, 1.0, 0.0]), Spectrum::new(vec![3.0, 2.5, 1.0, 0.0])],
        );
        raw.insert("/c".into(), vec![Spectrum::new(vec![0.0, 3.0, 0.0, 3.0])]);
        encode(raw)
    }

    #[test]
    fn sequential_and_parallel_agree() {
        let train = data();
        let model = Correlation::new(train.clone(), false).unwrap();
        let seq = predict_all(&model, &train, false).unwrap();
        let par = predict_all(&model, &train, true).unwrap();
        assert_eq!(seq, par);
        assert_eq!(seq.len(), train.count());
    }

    #[test]
    fn training_set_predicts_itself() {
        let train = data();
        let model = Correlation::new(train.clone(), false).unwrap();
        let p = predict_all(&model, &train, true).unwrap();
        assert_eq!(p.truth, p.predicted);
    }

    #[test]
    fn empty_test_set_gives_no_predictions() {
        let model = Correlation::new(data(), false).unwrap();
        let p = predict_all(&model, &Dataset::default(), false).unwrap();
        assert!(p.is_empty());
    }

    #[test]
    fn untrained_model_fails_loudly() {
        let model = Correlation::new(Dataset::default(), false).unwrap();
        assert!(predict_all(&model, &data(), true).is_err());
    }
}
