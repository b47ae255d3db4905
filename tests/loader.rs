use std::fs;
use std::path::Path;

use spectral_rocks::data::loader::{
    load, load_file, read_dir, read_spectrum_csv, write_parquet, write_spectrum_csv,
};
use spectral_rocks::data::model::{count_raw, DataRaw, Spectrum, NUM_POINTS};
use spectral_rocks::Error;

fn spectrum(tag: f64) -> Spectrum {
    Spectrum::new((0..NUM_POINTS).map(|i| tag + (i % 7) as f64 * 0.25).collect())
}

fn write(root: &Path, rel: &str, s: &Spectrum) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    write_spectrum_csv(&path, s).unwrap();
}

fn mineral_tree(root: &Path) {
    write(root, "azurite/spot00/1.csv", &spectrum(1.0));
    write(root, "azurite/spot00/2.csv", &spectrum(2.0));
    write(root, "azurite/spot01/1.csv", &spectrum(3.0));
    write(root, "brochantite/spot00/1.csv", &spectrum(4.0));
}

#[test]
fn csv_round_trip_is_exact() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("one.csv");
    let s = Spectrum::new((0..NUM_POINTS).map(|i| (i as f64).sqrt() / 3.0).collect());
    write_spectrum_csv(&path, &s).unwrap();
    assert_eq!(read_spectrum_csv(&path).unwrap(), s);
}

#[test]
fn header_must_match() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.csv");
    fs::write(&path, "x,y\n180.0,1.0\n").unwrap();
    let err = read_spectrum_csv(&path).unwrap_err();
    assert!(matches!(err, Error::Format { .. }), "{err}");
}

#[test]
fn row_count_must_match() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("short.csv");
    let mut text = String::from("wavelength,intensity\n");
    for i in 0..100 {
        text.push_str(&format!("{:.1},0.5\n", 180.0 + 0.1 * i as f64));
    }
    fs::write(&path, text).unwrap();
    let err = read_spectrum_csv(&path).unwrap_err();
    assert!(err.to_string().contains("7810"), "{err}");
}

#[test]
fn wavelength_axis_is_checked() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shifted.csv");
    let mut text = String::from("wavelength,intensity\n");
    for i in 0..NUM_POINTS {
        text.push_str(&format!("{:.1},0.5\n", 200.0 + 0.1 * i as f64));
    }
    fs::write(&path, text).unwrap();
    assert!(matches!(
        read_spectrum_csv(&path),
        Err(Error::Format { .. })
    ));
}

fn axis_file(path: &Path, offset: f64) {
    let mut text = String::from("wavelength,intensity\n");
    for i in 0..NUM_POINTS {
        text.push_str(&format!("{:.4},0.5\n", 180.0 + offset + 0.1 * i as f64));
    }
    fs::write(path, text).unwrap();
}

#[test]
fn sub_step_axis_shift_is_rejected() {
    let dir = tempfile::tempdir().unwrap();

    let shifted = dir.path().join("shifted.csv");
    axis_file(&shifted, 0.04);
    assert!(matches!(
        read_spectrum_csv(&shifted),
        Err(Error::Format { .. })
    ));

    let close = dir.path().join("close.csv");
    axis_file(&close, 0.0004);
    assert_eq!(read_spectrum_csv(&close).unwrap().len(), NUM_POINTS);
}

#[test]
fn labels_follow_depth() {
    let dir = tempfile::tempdir().unwrap();
    mineral_tree(dir.path());

    let coarse = read_dir(dir.path(), 1).unwrap();
    assert!(coarse.skipped.is_empty());
    assert_eq!(coarse.data.keys().collect::<Vec<_>>(), ["/azurite", "/brochantite"]);
    assert_eq!(coarse.data["/azurite"].len(), 3);

    let fine = read_dir(dir.path(), 2).unwrap();
    assert_eq!(
        fine.data.keys().collect::<Vec<_>>(),
        ["/azurite/spot00", "/azurite/spot01", "/brochantite/spot00"]
    );
    assert_eq!(count_raw(&fine.data), 4);
}

#[test]
fn scan_order_is_sorted() {
    let dir = tempfile::tempdir().unwrap();
    mineral_tree(dir.path());
    let scan = read_dir(dir.path(), 2).unwrap();
    let firsts: Vec<f64> = scan.data["/azurite/spot00"].iter().map(|s| s.y[0]).collect();
    assert_eq!(firsts, vec![1.0, 2.0]);
}

#[test]
fn bad_files_are_skipped_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    mineral_tree(dir.path());
    fs::write(dir.path().join("azurite/spot01/broken.csv"), "wavelength,intensity\n1,2\n").unwrap();
    fs::write(dir.path().join("azurite/spot01/notes.txt"), "not a spectrum").unwrap();
    write(dir.path(), "stray.csv", &spectrum(9.0));

    let scan = read_dir(dir.path(), 1).unwrap();
    assert_eq!(count_raw(&scan.data), 4);
    assert_eq!(scan.skipped.len(), 2);
    assert!(scan.skipped.iter().all(|s| s.error.is_recoverable()));
    assert!(scan
        .skipped
        .iter()
        .any(|s| matches!(s.error, Error::LabelDepth { depth: 1, .. })));
}

#[test]
fn zero_depth_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        read_dir(dir.path(), 0),
        Err(Error::InvalidParameter { .. })
    ));
}

#[test]
fn parquet_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rocks.parquet");
    let mut data = DataRaw::new();
    data.insert("/azurite/spot00".into(), vec![spectrum(1.0), spectrum(2.0)]);
    data.insert("/hematite/spot03".into(), vec![spectrum(-1.0)]);

    write_parquet(&path, &data).unwrap();
    assert_eq!(load_file(&path).unwrap(), data);

    // Directory depth does not apply to single files.
    assert_eq!(load(&path, 5).unwrap().data, data);
}

#[test]
fn json_records_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rocks.json");
    let y: Vec<String> = spectrum(0.5).y.iter().map(|v| v.to_string()).collect();
    let y = y.join(",");
    fs::write(
        &path,
        format!(r#"[{{"label":"/malachite/a","y":[{y}]}},{{"label":"/malachite/a","y":[{y}]}}]"#),
    )
    .unwrap();

    let data = load_file(&path).unwrap();
    assert_eq!(data["/malachite/a"].len(), 2);
    assert_eq!(data["/malachite/a"][0], spectrum(0.5));
}

#[test]
fn json_records_need_full_spectra_and_rooted_labels() {
    let dir = tempfile::tempdir().unwrap();

    let short = dir.path().join("short.json");
    fs::write(&short, r#"[{"label":"/a","y":[1.0,2.0]}]"#).unwrap();
    assert!(matches!(load_file(&short), Err(Error::Format { .. })));

    let unrooted = dir.path().join("unrooted.json");
    let y = vec!["0"; NUM_POINTS].join(",");
    fs::write(&unrooted, format!(r#"[{{"label":"a","y":[{y}]}}]"#)).unwrap();
    assert!(matches!(load_file(&unrooted), Err(Error::Format { .. })));
}
