//! Error types for classifier sessions, encoders and the solver boundary

use std::path::PathBuf;
use thiserror::Error;

/// Broad origin of an [`SVMError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad parameters, detected before any sample is processed
    Configuration,
    /// Operations called out of order on a session
    Usage,
    /// Problems with samples, label files or other external input
    Data,
    /// Missing/corrupt models or solver and session out of sync
    Solver,
    /// Filesystem, database and serialization failures
    Io,
}

#[derive(Error, Debug)]
pub enum SVMError {
    #[error("Unknown data type: {0} (expected vector, string or tokens)")]
    UnknownDataType(String),

    #[error("Unknown kernel: {0}")]
    UnknownKernel(String),

    #[error("Kernel {kernel} cannot be used with {data_type} data")]
    IncompatibleKernel { kernel: String, data_type: String },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Must call finalize() before train()")]
    NotFinalized,

    #[error("Session is already finalized")]
    AlreadyFinalized,

    #[error("Session already has a model")]
    AlreadyTrained,

    #[error("Model not trained")]
    NotTrained,

    #[error("No training data")]
    NoData,

    #[error("Empty dataset")]
    EmptyDataset,

    #[error("Malformed label file at line {line}: {reason}")]
    MalformedLabelFile { line: usize, reason: String },

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Token {token} exceeds the corpus maximum {max_token}")]
    TokenOutOfRange { token: u32, max_token: u32 },

    #[error("Invalid label: {0:?}")]
    InvalidLabel(String),

    #[error("Invalid dataset: {0}")]
    InvalidDataset(String),

    #[error("Data type mismatch: expected {expected}, got {actual}")]
    DataTypeMismatch { expected: String, actual: String },

    #[error("No model found at {0}")]
    ModelNotFound(PathBuf),

    #[error("Corrupt model: {0}")]
    CorruptModel(String),

    #[error("Solver returned unknown numeric label {0}")]
    UnknownNumericLabel(f64),

    #[error("Optimization failed: {0}")]
    OptimizationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl SVMError {
    /// Classify the error by where it originated
    pub fn kind(&self) -> ErrorKind {
        match self {
            SVMError::UnknownDataType(_)
            | SVMError::UnknownKernel(_)
            | SVMError::IncompatibleKernel { .. }
            | SVMError::InvalidParameter(_) => ErrorKind::Configuration,
            SVMError::NotFinalized
            | SVMError::AlreadyFinalized
            | SVMError::AlreadyTrained
            | SVMError::NotTrained => ErrorKind::Usage,
            SVMError::NoData
            | SVMError::EmptyDataset
            | SVMError::MalformedLabelFile { .. }
            | SVMError::ParseError(_)
            | SVMError::TokenOutOfRange { .. }
            | SVMError::InvalidLabel(_)
            | SVMError::InvalidDataset(_)
            | SVMError::DataTypeMismatch { .. } => ErrorKind::Data,
            SVMError::ModelNotFound(_)
            | SVMError::CorruptModel(_)
            | SVMError::UnknownNumericLabel(_)
            | SVMError::OptimizationError(_) => ErrorKind::Solver,
            SVMError::IoError(_) | SVMError::Database(_) | SVMError::SerializationError(_) => {
                ErrorKind::Io
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, SVMError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            SVMError::UnknownDataType("matrix".into()).kind(),
            ErrorKind::Configuration
        );
        assert_eq!(SVMError::AlreadyTrained.kind(), ErrorKind::Usage);
        assert_eq!(SVMError::NoData.kind(), ErrorKind::Data);
        assert_eq!(SVMError::UnknownNumericLabel(7.0).kind(), ErrorKind::Solver);
        assert_eq!(
            SVMError::ModelNotFound(PathBuf::from("m.model")).kind(),
            ErrorKind::Solver
        );

        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk");
        assert_eq!(SVMError::from(io).kind(), ErrorKind::Io);
    }

    #[test]
    fn test_error_messages() {
        let err = SVMError::IncompatibleKernel {
            kernel: "edit".into(),
            data_type: "vector".into(),
        };
        assert_eq!(err.to_string(), "Kernel edit cannot be used with vector data");
        assert_eq!(
            SVMError::TokenOutOfRange {
                token: 9,
                max_token: 5
            }
            .to_string(),
            "Token 9 exceeds the corpus maximum 5"
        );
    }
}
