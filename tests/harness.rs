use std::fs;
use std::path::Path;

use spectral_rocks::config::ExperimentConfig;
use spectral_rocks::data::loader::write_spectrum_csv;
use spectral_rocks::data::model::{wavelength, Spectrum, NUM_POINTS};
use spectral_rocks::data::split::SplitKind;
use spectral_rocks::harness;

const LINES: [(&str, f64); 3] = [("azurite", 324.7), ("hematite", 371.9), ("malachite", 656.3)];

/// One emission line on a flat background; spots differ in gain and in a
/// small deterministic ripple.
fn emission(centre: f64, spot: usize, shot: usize) -> Spectrum {
    let gain = 1.0 + 0.2 * spot as f64;
    Spectrum::new(
        (0..NUM_POINTS)
            .map(|i| {
                let d = wavelength(i) - centre;
                let ripple = 0.002 * (((i + 3 * shot) * (spot + 2)) % 11) as f64;
                0.05 + gain * (-d * d / 2.0).exp() + ripple
            })
            .collect(),
    )
}

fn dataset(root: &Path) {
    for (mineral, centre) in LINES {
        for spot in 0..3 {
            let dir = root.join(mineral).join(format!("spot{spot:02}"));
            fs::create_dir_all(&dir).unwrap();
            for shot in 0..3 {
                write_spectrum_csv(&dir.join(format!("{shot}.csv")), &emission(centre, spot, shot))
                    .unwrap();
            }
        }
    }
    // A file the scan has to step over.
    fs::write(root.join("azurite/spot00/corrupt.csv"), "wavelength;intensity\n").unwrap();
}

#[test]
fn leave_one_spot_out_classifies_every_mineral() {
    let dir = tempfile::tempdir().unwrap();
    dataset(dir.path());

    let config = ExperimentConfig {
        data_dir: dir.path().to_path_buf(),
        labels_depth: 2,
        split: SplitKind::LeaveOneOut,
        ..Default::default()
    };
    let report = harness::run(&config).unwrap();

    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.train_count, 18);
    assert_eq!(report.test_count, 9);
    assert_eq!(report.fine.labels, ["/azurite", "/hematite", "/malachite"]);
    assert_eq!(
        report.fine.matrix,
        vec![vec![3, 0, 0], vec![0, 3, 0], vec![0, 0, 3]]
    );
    assert_eq!(report.fine.accuracy, 1.0);
    assert_eq!(report.features, Some(NUM_POINTS));
}

#[test]
fn stratified_split_is_reproducible() {
    let dir = tempfile::tempdir().unwrap();
    dataset(dir.path());

    let config = ExperimentConfig {
        data_dir: dir.path().to_path_buf(),
        labels_depth: 2,
        parallel: true,
        ..Default::default()
    };
    let first = harness::run(&config).unwrap();
    let second = harness::run(&config).unwrap();
    assert_eq!(first.train_count, second.train_count);
    assert_eq!(first.fine, second.fine);
    assert_eq!(first.train_count + first.test_count, 27);

    let heads = first.headonly.unwrap();
    assert!(heads.labels.iter().all(|l| LINES.iter().any(|(m, _)| l == &format!("/{m}"))));
    assert_eq!(heads.accuracy, 1.0);
}

#[test]
fn reducers_feed_the_model() {
    let dir = tempfile::tempdir().unwrap();
    dataset(dir.path());

    for (steps, features) in [
        (vec!["simple"], 2),
        (vec!["log", "pca"], 3),
        (vec!["norm", "lda"], 2),
    ] {
        let config = ExperimentConfig {
            data_dir: dir.path().to_path_buf(),
            labels_depth: 1,
            preprocessing: steps.iter().map(|s| s.to_string()).collect(),
            components: 3,
            ..Default::default()
        };
        let report = harness::run(&config).unwrap();
        assert_eq!(report.features, Some(features), "{steps:?}");
        let total: u64 = report.fine.matrix.iter().flatten().sum();
        assert_eq!(total as usize, report.test_count, "{steps:?}");
    }
}

#[test]
fn chance_model_runs() {
    let dir = tempfile::tempdir().unwrap();
    dataset(dir.path());

    let config = ExperimentConfig {
        data_dir: dir.path().to_path_buf(),
        model: "chance".into(),
        headonly: false,
        ..Default::default()
    };
    let report = harness::run(&config).unwrap();
    assert_eq!(report.model, "chance");
    assert!(report.headonly.is_none());
    assert!((0.0..=1.0).contains(&report.fine.accuracy));
}

#[test]
fn errors_name_their_stage() {
    let dir = tempfile::tempdir().unwrap();
    dataset(dir.path());

    let bad_step = ExperimentConfig {
        data_dir: dir.path().to_path_buf(),
        preprocessing: vec!["fft".into()],
        ..Default::default()
    };
    let err = harness::run(&bad_step).unwrap_err();
    assert!(format!("{err:#}").starts_with("preprocess:"), "{err:#}");

    let missing = ExperimentConfig {
        data_dir: dir.path().join("nowhere"),
        ..Default::default()
    };
    let err = harness::run(&missing).unwrap_err();
    assert!(format!("{err:#}").starts_with("load:"), "{err:#}");

    let empty = tempfile::tempdir().unwrap();
    let nothing = ExperimentConfig {
        data_dir: empty.path().to_path_buf(),
        ..Default::default()
    };
    let err = harness::run(&nothing).unwrap_err();
    assert!(format!("{err:#}").contains("empty dataset"), "{err:#}");

    let bad_ratio = ExperimentConfig {
        data_dir: dir.path().to_path_buf(),
        train_ratio: -0.1,
        ..Default::default()
    };
    let err = harness::run(&bad_ratio).unwrap_err();
    assert!(format!("{err:#}").starts_with("config:"), "{err:#}");
}
