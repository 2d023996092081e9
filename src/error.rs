//! Error types

use thiserror::Error;

/// Main error type
#[derive(Debug, Clone, Error)]
pub enum GenderError {
    /// File missing, unreadable or undecodable
    #[error("IO error: {message}")]
    Io { message: String },
    /// Decoded signal is unusable (e.g. empty after truncation)
    #[error("Processing error: {message}")]
    Processing { message: String },
    /// Classifier or scaler artifact missing or malformed
    #[error("Model load error: {message}")]
    ModelLoad { message: String },
    #[error("Dimension mismatch: expected {expected} features, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("Config error: {message}")]
    Config { message: String },
}

impl GenderError {
    pub fn io<S: Into<String>>(msg: S) -> Self { Self::Io { message: msg.into() } }
    pub fn processing<S: Into<String>>(msg: S) -> Self { Self::Processing { message: msg.into() } }
    pub fn model_load<S: Into<String>>(msg: S) -> Self { Self::ModelLoad { message: msg.into() } }
    pub fn config<S: Into<String>>(msg: S) -> Self { Self::Config { message: msg.into() } }

    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch { expected, actual }
    }
}

pub type Result<T> = std::result::Result<T, GenderError>;

impl From<std::io::Error> for GenderError {
    fn from(err: std::io::Error) -> Self { Self::io(err.to_string()) }
}

impl From<hound::Error> for GenderError {
    fn from(err: hound::Error) -> Self { Self::io(format!("WAV: {}", err)) }
}

impl From<symphonia::core::errors::Error> for GenderError {
    fn from(err: symphonia::core::errors::Error) -> Self { Self::io(format!("Decoder: {}", err)) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = GenderError::io("test");
        assert!(e.to_string().contains("IO"));

        let e = GenderError::dimension_mismatch(40, 13);
        assert_eq!(e.to_string(), "Dimension mismatch: expected 40 features, got 13");
    }

    #[test]
    fn test_io_conversion() {
        let err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let e: GenderError = err.into();
        assert!(matches!(e, GenderError::Io { .. }));
    }
}
