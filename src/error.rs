//! Error types for medeval.

use thiserror::Error;

/// Result type for medeval operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for medeval operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Input record is missing a required field or column.
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// A field failed to parse (e.g. non-integer span offset).
    #[error("Parse error: {0}")]
    Parse(String),

    /// Reference and prediction sets are not usable together.
    #[error("Evaluation error: {0}")]
    Evaluation(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create an invalid record error.
    pub fn invalid_record(msg: impl Into<String>) -> Self {
        Error::InvalidRecord(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Error::Parse(msg.into())
    }

    /// Create an evaluation error.
    pub fn evaluation(msg: impl Into<String>) -> Self {
        Error::Evaluation(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::invalid_record("missing column 'label'");
        assert_eq!(err.to_string(), "Invalid record: missing column 'label'");

        let err = Error::parse("start_span 'abc' is not an integer");
        assert!(err.to_string().starts_with("Parse error:"));
    }
}
