//! Error types for trajectory I/O.

use thiserror::Error;

use super::Format;

/// Errors that can occur while reading or writing trajectory data.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O operation failed.
    #[error("I/O operation failed: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// The XML stream itself is malformed.
    #[error("failed to read XML: {source}")]
    Xml {
        /// The underlying XML error.
        #[from]
        source: quick_xml::Error,
    },

    /// Line-oriented input does not match the expected format.
    #[error("failed to parse {format} data: {details} (at line ~{line})")]
    Parse {
        /// The format being parsed.
        format: Format,
        /// Approximate 1-based line number.
        line: usize,
        /// Description of the problem.
        details: String,
    },

    /// A value inside otherwise well-formed input cannot be interpreted.
    #[error("invalid value in {format} input: {details}")]
    InvalidValue {
        /// The format being parsed.
        format: Format,
        /// Description of the offending value.
        details: String,
    },

    /// A quantity the trajectory record requires never appeared.
    #[error("missing data in {format} input: {details}")]
    MissingData {
        /// The format being parsed.
        format: Format,
        /// Description of what is missing.
        details: String,
    },
}

impl Error {
    /// Creates a [`Parse`](Error::Parse) error.
    ///
    /// # Arguments
    ///
    /// * `format` — The format being parsed
    /// * `line` — Approximate 1-based line number
    /// * `details` — Description of the problem
    pub(crate) fn parse(format: Format, line: usize, details: impl Into<String>) -> Self {
        Self::Parse {
            format,
            line,
            details: details.into(),
        }
    }

    /// Creates an [`InvalidValue`](Error::InvalidValue) error.
    pub(crate) fn invalid(format: Format, details: impl Into<String>) -> Self {
        Self::InvalidValue {
            format,
            details: details.into(),
        }
    }

    /// Creates a [`MissingData`](Error::MissingData) error.
    pub(crate) fn missing(format: Format, details: impl Into<String>) -> Self {
        Self::MissingData {
            format,
            details: details.into(),
        }
    }
}
