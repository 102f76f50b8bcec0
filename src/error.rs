//! Errors raised while writing a column chunk.

/// List of features whose non-activation may cause a runtime error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    /// The snappy compression codec
    Snappy,
    /// The gzip compression codec
    Gzip,
    /// The zstd compression codec
    Zstd,
    /// The lz4 compression codec
    Lz4,
}

/// Errors generated by this crate.
///
/// All errors are fatal to the writer that raised them: no error is recovered
/// locally and callers must drop the writer after observing one.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParquetError {
    /// When the writer would emit data that violates the parquet specification
    /// (e.g. a page larger than `i32::MAX` bytes).
    OutOfSpec(String),
    /// Error presented when trying to use a code branch that requires
    /// activating a feature.
    FeatureNotActive(Feature, String),
    /// Error presented when a valid parquet capability is not implemented
    /// by this crate.
    FeatureNotSupported(String),
    /// When the writer is configured with an invalid parameter, such as an
    /// encoding that cannot apply to the column's physical type.
    InvalidParameter(String),
    /// When an invariant of the column writer is violated, such as writing
    /// more rows into a chunk than the enclosing row group declared.
    ViolatedInvariant(String),
    /// An error originating from the page sink.
    Transport(String),
}

impl ParquetError {
    /// Create an out-of-spec error from anything that can be turned into a `String`.
    pub(crate) fn oos<I: Into<String>>(message: I) -> Self {
        Self::OutOfSpec(message.into())
    }
}

impl std::error::Error for ParquetError {}

impl std::fmt::Display for ParquetError {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ParquetError::OutOfSpec(message) => {
                write!(fmt, "File out of specification: {message}")
            },
            ParquetError::FeatureNotActive(feature, reason) => {
                write!(
                    fmt,
                    "The feature \"{feature:?}\" needs to be active to {reason}"
                )
            },
            ParquetError::FeatureNotSupported(reason) => {
                write!(fmt, "Not yet supported: {reason}")
            },
            ParquetError::InvalidParameter(message) => {
                write!(fmt, "Invalid parameter: {message}")
            },
            ParquetError::ViolatedInvariant(message) => {
                write!(fmt, "Writer invariant violated: {message}")
            },
            ParquetError::Transport(message) => {
                write!(fmt, "Transport error: {message}")
            },
        }
    }
}

impl From<std::io::Error> for ParquetError {
    fn from(e: std::io::Error) -> ParquetError {
        ParquetError::Transport(e.to_string())
    }
}

impl From<parquet_format_safe::thrift::Error> for ParquetError {
    fn from(e: parquet_format_safe::thrift::Error) -> ParquetError {
        ParquetError::Transport(e.to_string())
    }
}

impl From<std::num::TryFromIntError> for ParquetError {
    fn from(e: std::num::TryFromIntError) -> ParquetError {
        ParquetError::oos(format!("Number must be zero or positive: {e}"))
    }
}

#[cfg(feature = "snappy")]
impl From<snap::Error> for ParquetError {
    fn from(e: snap::Error) -> ParquetError {
        ParquetError::Transport(format!("underlying snap error: {e}"))
    }
}

/// A specialized `Result` for errors of this crate.
pub type ParquetResult<T> = std::result::Result<T, ParquetError>;
