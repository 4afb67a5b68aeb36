//! End-to-end prediction cycles with a stand-in classifier.
//!
//! The stand-in runs the real image preprocessing, so missing and corrupt
//! images fail the same way they would with a loaded ONNX model, then returns
//! a fixed score table.

use ring_predict_lib::config::Settings;
use ring_predict_lib::error::{AppError, Result};
use ring_predict_lib::models::predict_types::{ClassificationResult, Prediction, SelectMode};
use ring_predict_lib::services::cancel::CancelToken;
use ring_predict_lib::services::classifier::inference::preprocess_image;
use ring_predict_lib::services::classifier::model_manager::ModelConfig;
use ring_predict_lib::services::classifier::Classifier;
use ring_predict_lib::services::image_selector::ImageSelector;
use ring_predict_lib::services::output_writer::read_output;
use ring_predict_lib::services::predict_loop::PredictLoop;
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

struct TableClassifier {
    config: ModelConfig,
    table: ClassificationResult,
}

impl TableClassifier {
    fn new() -> Self {
        let config = serde_json::from_str(r#"{"labeller": "custom_labeller", "image_size": 16}"#)
            .unwrap();
        let table = vec![
            Prediction::new("0", 0.01),
            Prediction::new("7", 0.20),
            Prediction::new("8", 0.28),
            Prediction::new("78", 0.06),
            Prediction::new("86", 0.10),
            Prediction::new("87", 0.25),
            Prediction::new("97", 0.04),
            Prediction::new("99", 0.06),
        ];
        Self { config, table }
    }
}

impl Classifier for TableClassifier {
    fn classify(&mut self, image_path: &Path) -> Result<ClassificationResult> {
        preprocess_image(image_path, &self.config)?;
        Ok(self.table.clone())
    }
}

fn write_image(path: &Path) {
    image::RgbImage::from_pixel(24, 24, image::Rgb([200, 180, 40]))
        .save(path)
        .unwrap();
}

fn test_settings(root: &Path, mode: SelectMode) -> Settings {
    let mut s = Settings::with_root(root);
    s.mode = mode;
    s.poll_interval = Duration::from_millis(1);
    s.look_retry = Duration::from_millis(5);
    s.settle = Duration::ZERO;
    s.max_cycles = Some(1);
    fs::create_dir_all(s.flag_file.parent().unwrap()).unwrap();
    fs::create_dir_all(&s.scan_dir).unwrap();
    fs::create_dir_all(&s.look_dir).unwrap();
    s
}

#[test]
fn test_random_mode_single_image_end_to_end() {
    let root = tempfile::tempdir().unwrap();
    let settings = test_settings(root.path(), SelectMode::Random);
    let image = settings.scan_dir.join("ring_1987_1.png");
    write_image(&image);
    fs::write(&settings.flag_file, "GO\n").unwrap();

    let output_path = settings.output.clone();
    let mut predict_loop = PredictLoop::new(settings, TableClassifier::new(), CancelToken::new());
    predict_loop.run().unwrap();
    assert_eq!(predict_loop.cycles(), 1);

    let output = read_output(&output_path).unwrap();
    assert_eq!(output.img_path, image.to_string_lossy());
    assert_eq!(output.class, "87");
    assert_eq!(output.top_all_classes.labels(), vec!["8", "87", "7", "86", "78"]);
    assert_eq!(output.top_2_digit_classes.labels(), vec!["87", "86", "78"]);
}

#[test]
fn test_undecodable_only_file_is_selected_not_confused() {
    let root = tempfile::tempdir().unwrap();
    let settings = test_settings(root.path(), SelectMode::Random);
    let heic = settings.scan_dir.join("ring_1987_1.heic");
    fs::write(&heic, b"ftypheic not decodable here").unwrap();
    fs::write(&settings.flag_file, "GO").unwrap();

    let output_path = settings.output.clone();
    let mut predict_loop = PredictLoop::new(settings, TableClassifier::new(), CancelToken::new());
    match predict_loop.run() {
        Err(AppError::Image { path, .. }) => assert_eq!(path, heic),
        other => panic!("expected an image decode failure, got {:?}", other),
    }
    assert_eq!(predict_loop.cycles(), 1);
    assert!(!output_path.exists());
}

#[test]
fn test_extensionless_scan_is_predicted() {
    let root = tempfile::tempdir().unwrap();
    let settings = test_settings(root.path(), SelectMode::Random);
    let png = settings.scan_dir.join("ring_1987_1.png");
    write_image(&png);
    let scan = settings.scan_dir.join("scan_0001");
    fs::rename(&png, &scan).unwrap();
    fs::write(&settings.flag_file, "GO").unwrap();

    let output_path = settings.output.clone();
    let mut predict_loop = PredictLoop::new(settings, TableClassifier::new(), CancelToken::new());
    predict_loop.run().unwrap();

    let output = read_output(&output_path).unwrap();
    assert_eq!(output.img_path, scan.to_string_lossy());
    assert_eq!(output.class, "87");
}

#[test]
fn test_idle_flag_never_writes_output() {
    let root = tempfile::tempdir().unwrap();
    let settings = test_settings(root.path(), SelectMode::Random);
    write_image(&settings.scan_dir.join("ring_1987_1.png"));
    fs::write(&settings.flag_file, "WAIT").unwrap();

    let output_path = settings.output.clone();
    let cancel = CancelToken::new();
    let stopper = {
        let cancel = cancel.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            cancel.cancel();
        })
    };

    let mut predict_loop = PredictLoop::new(settings, TableClassifier::new(), cancel);
    predict_loop.run().unwrap();
    stopper.join().unwrap();

    assert_eq!(predict_loop.cycles(), 0);
    assert!(!output_path.exists());
}

#[test]
fn test_look_mode_waits_for_file() {
    let root = tempfile::tempdir().unwrap();
    let settings = test_settings(root.path(), SelectMode::Look);
    let late_image = settings.look_dir.join("ring_2004_1.png");

    let writer = {
        let late_image = late_image.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            let created = Instant::now();
            write_image(&late_image);
            created
        })
    };

    let started = Instant::now();
    let mut selector = ImageSelector::new(&settings, CancelToken::new());
    let request = selector.select_image().unwrap().unwrap();
    let selected_at = Instant::now();
    let created_at = writer.join().unwrap();

    assert_eq!(request.image_path, late_image);
    assert_eq!(request.mode, SelectMode::Look);
    assert!(selected_at >= created_at);
    assert!(selected_at.duration_since(started) >= Duration::from_millis(100));
}

#[test]
fn test_look_mode_end_to_end() {
    let root = tempfile::tempdir().unwrap();
    let settings = test_settings(root.path(), SelectMode::Look);
    let image = settings.look_dir.join("ring_1986_1.png");
    write_image(&image);
    fs::write(&settings.flag_file, "GO").unwrap();

    let output_path = settings.output.clone();
    let mut predict_loop = PredictLoop::new(settings, TableClassifier::new(), CancelToken::new());
    predict_loop.run().unwrap();

    let output = read_output(&output_path).unwrap();
    assert_eq!(PathBuf::from(output.img_path), image);
}

#[test]
fn test_explicit_missing_file_is_not_found() {
    let root = tempfile::tempdir().unwrap();
    let mut settings = test_settings(root.path(), SelectMode::Explicit);
    let missing = root.path().join("nowhere").join("ring.png");
    settings.img_path = Some(missing.clone());
    fs::write(&settings.flag_file, "GO").unwrap();

    let output_path = settings.output.clone();
    let mut predict_loop = PredictLoop::new(settings, TableClassifier::new(), CancelToken::new());
    match predict_loop.run_cycle() {
        Err(AppError::ImageNotFound(p)) => assert_eq!(p, missing),
        other => panic!("expected ImageNotFound, got {:?}", other),
    }
    assert!(!output_path.exists());
}

#[test]
fn test_explicit_mode_uses_given_path() {
    let root = tempfile::tempdir().unwrap();
    let mut settings = test_settings(root.path(), SelectMode::Explicit);
    let image = root.path().join("chosen.png");
    write_image(&image);
    settings.img_path = Some(image.clone());

    let output_path = settings.output.clone();
    let mut predict_loop = PredictLoop::new(settings, TableClassifier::new(), CancelToken::new());
    let output = predict_loop.run_cycle().unwrap();

    assert_eq!(output.img_path, image.to_string_lossy());
    assert_eq!(read_output(&output_path).unwrap(), output);
}

#[test]
fn test_corrupt_image_skips_cycle_then_recovers() {
    let root = tempfile::tempdir().unwrap();
    let mut settings = test_settings(root.path(), SelectMode::Random);
    settings.max_cycles = None;
    let broken = settings.scan_dir.join("broken.png");
    fs::write(&broken, b"half a png").unwrap();
    fs::write(&settings.flag_file, "GO").unwrap();

    let output_path = settings.output.clone();
    let scan_dir = settings.scan_dir.clone();
    let mut predict_loop = PredictLoop::new(settings, TableClassifier::new(), CancelToken::new());

    assert!(matches!(predict_loop.run_cycle(), Err(AppError::Image { .. })));
    assert!(!output_path.exists());

    fs::remove_file(&broken).unwrap();
    write_image(&scan_dir.join("ring_1999_2.png"));
    let output = predict_loop.run_cycle().unwrap();
    assert_eq!(output.class, "87");
    assert!(output_path.exists());
}
