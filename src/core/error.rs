use thiserror::Error as ThisError;

use crate::core::types::DocId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    Serialization,
    Configuration,
    InvalidArgument,
    UnknownIndex,
    UnboundName,
    Unsupported,
    Parse,
    Query,
    NoResults,
    MultipleResults,
    InvalidState,
    Corruption,
}

#[derive(Debug, ThisError)]
#[error("{kind:?}: {context}")]
pub struct Error {
    pub kind: ErrorKind,
    pub context: String,
    results: Option<Vec<DocId>>,
}

impl Error {
    pub fn new(kind: ErrorKind, context: impl Into<String>) -> Self {
        Error { kind, context: context.into(), results: None }
    }

    /// Result-shape error carrying the offending result ids.
    pub fn with_results(kind: ErrorKind, context: impl Into<String>, results: Vec<DocId>) -> Self {
        Error { kind, context: context.into(), results: Some(results) }
    }

    pub fn invalid_argument(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::InvalidArgument, context)
    }

    pub fn parse(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::Parse, context)
    }

    pub fn unsupported(operation: &str, index_kind: &str) -> Self {
        Error::new(
            ErrorKind::Unsupported,
            format!("{} is not supported for {}", operation, index_kind),
        )
    }

    pub fn results(&self) -> Option<&[DocId]> {
        self.results.as_deref()
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::new(ErrorKind::Io, err.to_string())
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        Error::new(ErrorKind::Serialization, err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::new(ErrorKind::Configuration, format!("invalid config: {}", err))
    }
}

impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Self {
        Error::new(ErrorKind::Query, format!("bad pattern: {}", err))
    }
}

impl From<tempfile::PersistError> for Error {
    fn from(err: tempfile::PersistError) -> Self {
        Error::new(ErrorKind::Io, err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
