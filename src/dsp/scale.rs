//! Decibel conversions

use ndarray::Array2;

/// `10 * log10(max(amin, S) / max(amin, reference))`, optionally clipped to
/// `max - top_db`.
pub fn power_to_db(power: &Array2<f32>, reference: f32, amin: f32, top_db: Option<f32>) -> Array2<f32> {
    let ref_db = 10.0 * reference.abs().max(amin).log10();
    let mut db = power.mapv(|p| 10.0 * p.max(amin).log10() - ref_db);

    if let Some(top_db) = top_db {
        let max = db.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let floor = max - top_db;
        db.mapv_inplace(|v| v.max(floor));
    }

    db
}

/// Amplitude spectrogram to dB relative to its own peak magnitude.
///
/// The loudest bin maps to 0 dB; a silent input maps to 0 dB everywhere.
pub fn amplitude_to_db(magnitude: &Array2<f32>, amin: f32, top_db: Option<f32>) -> Array2<f32> {
    let peak = magnitude.iter().fold(0.0f32, |p, &m| p.max(m.abs()));
    let power = magnitude.mapv(|m| m * m);
    power_to_db(&power, peak * peak, amin * amin, top_db)
}
