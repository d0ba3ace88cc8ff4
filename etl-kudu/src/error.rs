//! Error types and result definitions for the Kudu sink.
//!
//! [`EtlError`] carries an [`ErrorKind`] for classification, a static description, optional
//! dynamic detail, an optional source error and the callsite where it was created. The kind
//! decides how the write path reacts: connectivity kinds force a reconnect, everything else is
//! reported as is.

use std::backtrace::Backtrace;
use std::borrow::Cow;
use std::error;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

/// Result type for sink operations.
pub type EtlResult<T> = Result<T, EtlError>;

/// Main error type for sink operations.
#[derive(Debug, Clone)]
pub struct EtlError {
    kind: ErrorKind,
    description: Cow<'static, str>,
    detail: Option<Cow<'static, str>>,
    source: Option<Arc<dyn error::Error + Send + Sync>>,
    location: &'static Location<'static>,
    backtrace: Arc<Backtrace>,
}

/// Categories of errors raised by the sink.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // Connection Errors
    DestinationConnectionFailed,
    DestinationTimeout,

    // Schema & Table Errors
    DestinationTableMissing,
    DestinationTableAlreadyExists,
    DestinationSchemaError,

    // Write Errors
    DestinationWriteFailed,
    DestinationBufferFull,

    // Data & Transformation Errors
    ConversionError,
    InvalidData,
    ValidationError,

    // Configuration Errors
    ConfigError,

    // IO & Serialization Errors
    IoError,
    DestinationIoError,
    SerializationError,
    DeserializationError,

    // State Errors
    InvalidState,

    // Unknown / Uncategorized
    Unknown,
}

impl ErrorKind {
    /// Returns `true` for kinds that indicate the connection to the cluster is unusable.
    ///
    /// The write path rebuilds the shared client before the next attempt when it sees one.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            ErrorKind::DestinationConnectionFailed
                | ErrorKind::DestinationIoError
                | ErrorKind::DestinationTimeout
        )
    }
}

impl EtlError {
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    pub fn backtrace(&self) -> &Backtrace {
        self.backtrace.as_ref()
    }

    /// Returns the callsite where this error was created.
    pub fn location(&self) -> &'static Location<'static> {
        self.location
    }

    /// Shorthand for `self.kind().is_connectivity()`.
    pub fn is_connectivity(&self) -> bool {
        self.kind.is_connectivity()
    }

    /// Attaches an originating error, exposed via [`error::Error::source`].
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: error::Error + Send + Sync + 'static,
    {
        self.source = Some(Arc::new(source));
        self
    }

    #[track_caller]
    fn from_components(
        kind: ErrorKind,
        description: Cow<'static, str>,
        detail: Option<Cow<'static, str>>,
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    ) -> Self {
        EtlError {
            kind,
            description,
            detail,
            source,
            location: Location::caller(),
            backtrace: Arc::new(Backtrace::capture()),
        }
    }
}

impl PartialEq for EtlError {
    fn eq(&self, other: &EtlError) -> bool {
        self.kind == other.kind
    }
}

impl fmt::Display for EtlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:?}] {} @ {}:{}:{}",
            self.kind,
            self.description,
            self.location.file(),
            self.location.line(),
            self.location.column()
        )?;

        if let Some(detail) = self.detail.as_deref() {
            if detail.trim().is_empty() {
                write!(f, "\n  Detail: <empty>")?;
            } else {
                write!(f, "\n  Detail:")?;
                for line in detail.lines() {
                    write!(f, "\n    {line}")?;
                }
            }
        }

        let rendered_backtrace = self.backtrace.to_string();
        if !rendered_backtrace.trim().is_empty() {
            write!(f, "\n  Backtrace:")?;
            for line in rendered_backtrace.lines() {
                write!(f, "\n    {line}")?;
            }
        }

        Ok(())
    }
}

impl error::Error for EtlError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn error::Error + 'static))
    }
}

/// Creates an [`EtlError`] from an error kind and static description.
impl From<(ErrorKind, &'static str)> for EtlError {
    #[track_caller]
    fn from((kind, desc): (ErrorKind, &'static str)) -> EtlError {
        EtlError::from_components(kind, Cow::Borrowed(desc), None, None)
    }
}

/// Creates an [`EtlError`] from an error kind, static description, and dynamic detail.
impl<D> From<(ErrorKind, &'static str, D)> for EtlError
where
    D: Into<Cow<'static, str>>,
{
    #[track_caller]
    fn from((kind, desc, detail): (ErrorKind, &'static str, D)) -> EtlError {
        EtlError::from_components(kind, Cow::Borrowed(desc), Some(detail.into()), None)
    }
}

/// Converts [`std::io::Error`] to [`EtlError`] with [`ErrorKind::IoError`].
impl From<std::io::Error> for EtlError {
    #[track_caller]
    fn from(err: std::io::Error) -> EtlError {
        let detail = err.to_string();
        EtlError::from_components(
            ErrorKind::IoError,
            Cow::Borrowed("I/O operation failed"),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

/// Converts [`serde_json::Error`] to [`EtlError`].
///
/// Syntax, data and EOF failures map to [`ErrorKind::DeserializationError`]; I/O failures to
/// [`ErrorKind::IoError`].
impl From<serde_json::Error> for EtlError {
    #[track_caller]
    fn from(err: serde_json::Error) -> EtlError {
        let (kind, description) = match err.classify() {
            serde_json::error::Category::Io => (ErrorKind::IoError, "JSON I/O operation failed"),
            serde_json::error::Category::Syntax
            | serde_json::error::Category::Data
            | serde_json::error::Category::Eof => (
                ErrorKind::DeserializationError,
                "JSON deserialization failed",
            ),
        };

        let detail = err.to_string();
        EtlError::from_components(
            kind,
            Cow::Borrowed(description),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

/// Converts [`etl_config::shared::ValidationError`] to [`EtlError`] with [`ErrorKind::ConfigError`].
impl From<etl_config::shared::ValidationError> for EtlError {
    #[track_caller]
    fn from(err: etl_config::shared::ValidationError) -> EtlError {
        let detail = err.to_string();
        EtlError::from_components(
            ErrorKind::ConfigError,
            Cow::Borrowed("Invalid sink configuration"),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}
