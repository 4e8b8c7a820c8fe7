//! Error taxonomy for conversion pipelines
//!
//! - [`Skip`]: record is well-formed but unusable, excluded with a reason
//! - [`RecordError`]: record violates an adapter's structural assumption
//! - [`StreamError`]: byte stream or document structure is unreadable
//!
//! Skips and record errors are recovered at the record boundary and folded
//! into run counters. Stream errors abort the run.

use std::borrow::Cow;

/// Error types for stream operations
#[derive(Debug)]
pub enum StreamError {
    /// HTTP error with optional status code
    Http {
        status: Option<u16>,
        message: String,
    },
    /// I/O error
    Io(std::io::Error),
    /// XML syntax error at a byte offset
    Xml { position: u64, message: String },
    /// Element is well-formed XML but does not match the record shape
    Element {
        name: String,
        position: u64,
        message: String,
    },
    /// Zip archive could not be read
    Zip(String),
}

impl std::fmt::Display for StreamError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http {
                status: Some(s),
                message,
            } => write!(f, "HTTP {s}: {message}"),
            Self::Http {
                status: None,
                message,
            } => write!(f, "HTTP error: {message}"),
            Self::Io(e) => write!(f, "IO error: {e}"),
            Self::Xml { position, message } => {
                write!(f, "XML error at byte {position}: {message}")
            }
            Self::Element {
                name,
                position,
                message,
            } => write!(f, "malformed <{name}> at byte {position}: {message}"),
            Self::Zip(message) => write!(f, "zip error: {message}"),
        }
    }
}

impl std::error::Error for StreamError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl StreamError {
    /// Create HTTP error from reqwest error
    pub fn from_reqwest(e: &reqwest::Error) -> Self {
        Self::Http {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }

    /// Whether fetching the source again may succeed.
    ///
    /// Only transport failures qualify; a corrupt document stays corrupt.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http { status, .. } => {
                // 4xx other than 408/429 will not change on retry
                !matches!(status, Some(s) if (400..500).contains(s) && *s != 408 && *s != 429)
            }
            Self::Io(e) => e.kind() != std::io::ErrorKind::StorageFull,
            Self::Xml { .. } | Self::Element { .. } | Self::Zip(_) => false,
        }
    }
}

impl From<std::io::Error> for StreamError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// A record that is structurally fine but cannot be used.
///
/// `reason` is a short, stable category (it keys the skip histogram);
/// `detail` holds the record-specific part, e.g. the offending value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skip {
    reason: Cow<'static, str>,
    detail: Option<String>,
}

impl Skip {
    pub fn new(reason: impl Into<Cow<'static, str>>) -> Self {
        Self {
            reason: reason.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }
}

impl std::fmt::Display for Skip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{}: {detail}", self.reason),
            None => write!(f, "{}", self.reason),
        }
    }
}

/// A record that breaks an adapter's structural contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordError {
    message: String,
}

impl RecordError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for RecordError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for RecordError {}

/// Why a record did not convert, together with whatever was salvaged.
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection<T> {
    Skip { skip: Skip, partial: Box<T> },
    Error { error: RecordError, partial: Box<T> },
}

impl<T> Rejection<T> {
    pub fn skip(partial: T, skip: Skip) -> Self {
        Self::Skip {
            skip,
            partial: Box::new(partial),
        }
    }

    pub fn error(partial: T, error: RecordError) -> Self {
        Self::Error {
            error,
            partial: Box::new(partial),
        }
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Skip { .. })
    }

    /// Partially converted record, for diagnostics.
    pub fn partial(&self) -> &T {
        match self {
            Self::Skip { partial, .. } | Self::Error { partial, .. } => partial,
        }
    }

    pub fn into_partial(self) -> T {
        match self {
            Self::Skip { partial, .. } | Self::Error { partial, .. } => *partial,
        }
    }
}

impl<T> std::fmt::Display for Rejection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Skip { skip, .. } => write!(f, "skipped: {skip}"),
            Self::Error { error, .. } => write!(f, "record error: {error}"),
        }
    }
}

/// Result of converting one raw record.
pub type Outcome<T> = Result<T, Rejection<T>>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::ErrorKind;

    fn http_err(status: u16) -> StreamError {
        StreamError::Http {
            status: Some(status),
            message: "test".to_string(),
        }
    }

    #[test]
    fn http_404_not_retryable() {
        assert!(!http_err(404).is_retryable());
    }

    #[test]
    fn http_429_retryable() {
        assert!(http_err(429).is_retryable());
    }

    #[test]
    fn http_500_retryable() {
        assert!(http_err(500).is_retryable());
    }

    #[test]
    fn xml_error_not_retryable() {
        let err = StreamError::Xml {
            position: 12,
            message: "unexpected EOF".to_string(),
        };
        assert!(!err.is_retryable());
        assert_eq!(format!("{err}"), "XML error at byte 12: unexpected EOF");
    }

    #[test]
    fn io_storage_full_not_retryable() {
        let err = StreamError::Io(std::io::Error::new(ErrorKind::StorageFull, "disk full"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn display_http_without_status() {
        let err = StreamError::Http {
            status: None,
            message: "timeout".to_string(),
        };
        assert_eq!(format!("{err}"), "HTTP error: timeout");
    }

    #[test]
    fn skip_display_with_detail() {
        let skip = Skip::new("id too long").with_detail("ai-48-abc");
        assert_eq!(skip.reason(), "id too long");
        assert_eq!(skip.detail(), Some("ai-48-abc"));
        assert_eq!(format!("{skip}"), "id too long: ai-48-abc");
    }

    #[test]
    fn skip_display_without_detail() {
        assert_eq!(format!("{}", Skip::new("empty date")), "empty date");
    }

    #[test]
    fn rejection_keeps_partial() {
        let rejection = Rejection::skip(vec![1, 2], Skip::new("short date"));
        assert!(rejection.is_skip());
        assert_eq!(rejection.partial(), &vec![1, 2]);
        assert_eq!(rejection.into_partial(), vec![1, 2]);
    }

    #[test]
    fn rejection_error_display() {
        let rejection: Rejection<()> = Rejection::error((), RecordError::new("URL is missing"));
        assert!(!rejection.is_skip());
        assert_eq!(format!("{rejection}"), "record error: URL is missing");
    }
}
