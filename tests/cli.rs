//! Command line behavior of the shipped binaries

mod common;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

#[test]
fn test_only_validates_config() {
    Command::cargo_bin("voicegender")
        .unwrap()
        .arg("--test-only")
        .assert()
        .success()
        .stdout(predicate::str::contains("Config OK"));
}

#[test]
fn missing_model_is_fatal() {
    let dir = TempDir::new().unwrap();
    let clip = dir.path().join("clip.wav");
    common::write_voice(&clip, 22050, 1.0, 180.0);

    Command::cargo_bin("voicegender")
        .unwrap()
        .arg("-i").arg(&clip)
        .arg("-m").arg(dir.path().join("missing_model.json"))
        .arg("-s").arg(dir.path().join("missing_scaler.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Model load error"));
}

#[test]
fn prints_prediction_with_confidence() {
    let dir = TempDir::new().unwrap();
    let clip = dir.path().join("clip.wav");
    common::write_voice(&clip, 16000, 4.0, 120.0);
    let (model, scaler) = common::write_artifacts(dir.path());

    Command::cargo_bin("voicegender")
        .unwrap()
        .arg("-i").arg(&clip)
        .arg("-m").arg(&model)
        .arg("-s").arg(&scaler)
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"Result: (female|male) \(confidence: \d+\.\d{2}%\)").unwrap());
}

#[test]
fn exports_visualization_json() {
    let dir = TempDir::new().unwrap();
    let clip = dir.path().join("clip.wav");
    common::write_voice(&clip, 22050, 1.5, 200.0);
    let (model, scaler) = common::write_artifacts(dir.path());
    let export = dir.path().join("viz").join("clip.json");

    Command::cargo_bin("voicegender")
        .unwrap()
        .arg("-i").arg(&clip)
        .arg("-m").arg(&model)
        .arg("-s").arg(&scaler)
        .arg("--export-visualization").arg(&export)
        .assert()
        .success()
        .stdout(predicate::str::contains("Spectrogram: 1025 bins"))
        .stdout(predicate::str::is_match(r"Result: (female|male) \(confidence: \d+\.\d{2}%\)").unwrap());

    let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&export).unwrap()).unwrap();
    assert_eq!(value["waveform"]["sample_rate"], 22050);
}

#[test]
fn corrupt_input_reports_error() {
    let dir = TempDir::new().unwrap();
    let clip = dir.path().join("clip.mp3");
    std::fs::write(&clip, b"not really audio").unwrap();
    let (model, scaler) = common::write_artifacts(dir.path());

    Command::cargo_bin("voicegender")
        .unwrap()
        .arg("-i").arg(&clip)
        .arg("-m").arg(&model)
        .arg("-s").arg(&scaler)
        .assert()
        .failure()
        .stderr(predicate::str::contains("IO error"));
}

#[test]
fn extract_features_writes_dataset_and_scaler() {
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("data");
    std::fs::create_dir_all(data.join("female")).unwrap();
    std::fs::create_dir_all(data.join("male")).unwrap();
    common::write_voice(&data.join("female").join("a.wav"), 22050, 1.0, 220.0);
    common::write_voice(&data.join("male").join("b.wav"), 22050, 1.0, 110.0);
    let output = dir.path().join("models").join("features.json");
    let scaler = dir.path().join("models").join("scaler.json");

    Command::cargo_bin("extract_features")
        .unwrap()
        .arg("--data-dir").arg(&data)
        .arg("--output").arg(&output)
        .arg("--fit-scaler").arg(&scaler)
        .arg("--threads").arg("1")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 female, 1 male"));

    let dataset: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(dataset["labels"], serde_json::json!([0, 1]));
    assert_eq!(dataset["features"][0].as_array().unwrap().len(), 40);
    assert!(scaler.exists());
}

#[test]
fn extract_features_needs_both_classes() {
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("data");
    std::fs::create_dir_all(data.join("female")).unwrap();
    common::write_voice(&data.join("female").join("a.wav"), 22050, 1.0, 220.0);

    Command::cargo_bin("extract_features")
        .unwrap()
        .arg("--data-dir").arg(&data)
        .arg("--output").arg(dir.path().join("features.json"))
        .arg("--threads").arg("1")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not enough audio files"));
}
