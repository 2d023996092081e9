//! Spectral primitives shared by feature extraction and visualization

pub mod dct;
pub mod mel;
pub mod scale;
pub mod stft;

pub use dct::dct_ortho_basis;
pub use mel::MelFilterbank;
pub use scale::{amplitude_to_db, power_to_db};
pub use stft::Stft;
