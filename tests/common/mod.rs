#![allow(dead_code)]

use ndarray::Array1;
use std::path::{Path, PathBuf};
use voicegender::audio::{AudioFormat, WavAudio};

/// Harmonic tone with a little deterministic noise, loosely voice-like.
pub fn write_voice(path: &Path, sample_rate: u32, secs: f32, f0: f32) {
    let n = (sample_rate as f32 * secs) as usize;
    let mut state = 0x2545_f491u32;
    let data = Array1::from_shape_fn(n, |i| {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        let noise = (state as f32 / u32::MAX as f32 - 0.5) * 0.02;
        let t = i as f32 / sample_rate as f32;
        let tone: f32 = (1..=4)
            .map(|h| (2.0 * std::f32::consts::PI * f0 * h as f32 * t).sin() * 0.3 / h as f32)
            .sum();
        tone + noise
    });
    WavAudio::new_mono(sample_rate, data, AudioFormat::Int16)
        .save_to_file(path)
        .unwrap();
}

pub fn write_silence(path: &Path, sample_rate: u32, secs: f32) {
    let n = (sample_rate as f32 * secs) as usize;
    WavAudio::new_mono(sample_rate, Array1::zeros(n), AudioFormat::Int16)
        .save_to_file(path)
        .unwrap();
}

/// Small two-layer network and identity-ish scaler over 40 features.
pub fn write_artifacts(dir: &Path) -> (PathBuf, PathBuf) {
    let hidden = 8;
    let coefs_in: Vec<Vec<f32>> = (0..40)
        .map(|i| (0..hidden).map(|j| (((i * 7 + j * 3) % 11) as f32 - 5.0) / 50.0).collect())
        .collect();
    let coefs_out: Vec<Vec<f32>> = (0..hidden).map(|j| vec![(j as f32 - 3.5) / 10.0]).collect();

    let model = serde_json::json!({
        "hidden_activation": "relu",
        "output_activation": "logistic",
        "coefs": [coefs_in, coefs_out],
        "intercepts": [vec![0.01f32; hidden], vec![0.0f32]],
    });
    let scaler = serde_json::json!({
        "mean": vec![0.0f32; 40],
        "scale": vec![20.0f32; 40],
    });

    let model_path = dir.join("gender_model.json");
    let scaler_path = dir.join("scaler.json");
    std::fs::write(&model_path, model.to_string()).unwrap();
    std::fs::write(&scaler_path, scaler.to_string()).unwrap();
    (model_path, scaler_path)
}
