//! Error types shared across clipexport crates.

/// Error domain reported by [`ExportError::domain`].
pub const EXPORT_ERROR_DOMAIN: &str = "clipexport.export";

/// Error reported by a media collaborator (reader, writer, buffer pool).
///
/// Collaborators live outside this workspace, so the error only carries
/// what they choose to expose: a domain, a numeric code, and a message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} ({domain} {code})")]
pub struct MediaError {
    pub domain: String,
    pub code: i64,
    pub message: String,
}

impl MediaError {
    pub fn new(domain: impl Into<String>, code: i64, message: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            code,
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for MediaError {
    fn from(err: std::io::Error) -> Self {
        Self {
            domain: "std::io".to_string(),
            code: err.raw_os_error().map(i64::from).unwrap_or(-1),
            message: err.to_string(),
        }
    }
}

/// Top-level error type for export operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExportError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Failed to open {component}: {source}")]
    Initialization {
        component: &'static str,
        source: MediaError,
    },

    #[error("Read failure: {0}")]
    ReadFailure(MediaError),

    #[error("Write failure: {0}")]
    WriteFailure(MediaError),

    #[error("Frame hook failure: {message}")]
    HookFailure { message: String },

    #[error("Invalid session state: {message}")]
    InvalidState { message: String },
}

/// Result type alias using ExportError.
pub type ExportResult<T> = Result<T, ExportError>;

impl ExportError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration {
            message: msg.into(),
        }
    }

    pub fn initialization(component: &'static str, source: MediaError) -> Self {
        Self::Initialization { component, source }
    }

    pub fn hook(msg: impl Into<String>) -> Self {
        Self::HookFailure {
            message: msg.into(),
        }
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState {
            message: msg.into(),
        }
    }

    /// Write failure for a collaborator that reported no error of its own.
    pub fn write_unspecified(msg: impl Into<String>) -> Self {
        Self::WriteFailure(MediaError::new(EXPORT_ERROR_DOMAIN, 0, msg))
    }

    /// Read failure for a collaborator that reported no error of its own.
    pub fn read_unspecified(msg: impl Into<String>) -> Self {
        Self::ReadFailure(MediaError::new(EXPORT_ERROR_DOMAIN, 0, msg))
    }

    /// Error domain, stable across releases.
    pub fn domain(&self) -> &'static str {
        EXPORT_ERROR_DOMAIN
    }

    /// Numeric code, one per variant.
    pub fn code(&self) -> i32 {
        match self {
            Self::Configuration { .. } => 1001,
            Self::Initialization { .. } => 1002,
            Self::ReadFailure(_) => 1003,
            Self::WriteFailure(_) => 1004,
            Self::HookFailure { .. } => 1005,
            Self::InvalidState { .. } => 1006,
        }
    }

    /// Human-readable description.
    pub fn description(&self) -> String {
        self.to_string()
    }

    /// The collaborator error behind this one, if any.
    pub fn media_error(&self) -> Option<&MediaError> {
        match self {
            Self::Initialization { source, .. } => Some(source),
            Self::ReadFailure(e) | Self::WriteFailure(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_distinct() {
        let media = MediaError::new("test", 7, "boom");
        let errors = [
            ExportError::configuration("missing"),
            ExportError::initialization("source", media.clone()),
            ExportError::ReadFailure(media.clone()),
            ExportError::WriteFailure(media),
            ExportError::hook("bad frame"),
            ExportError::invalid_state("busy"),
        ];
        let mut codes: Vec<i32> = errors.iter().map(|e| e.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
        assert!(errors.iter().all(|e| e.domain() == EXPORT_ERROR_DOMAIN));
    }

    #[test]
    fn test_initialization_wraps_cause() {
        let err = ExportError::initialization("sink", MediaError::new("writer", -11, "disk full"));
        assert!(err.description().contains("sink"));
        assert!(err.description().contains("disk full"));
        assert_eq!(err.media_error().map(|e| e.code), Some(-11));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        let media: MediaError = io.into();
        assert_eq!(media.domain, "std::io");
        assert!(media.message.contains("nope"));
    }
}
