//! Boxed error payloads that keep `McpError` small.

use std::error::Error;
use std::fmt;

use super::transport::TransportErrorKind;

/// A boxed, thread-safe underlying error.
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

fn as_source(source: Option<&BoxError>) -> Option<&(dyn Error + 'static)> {
    source.map(|e| &**e as &(dyn Error + 'static))
}

/// Why a method's parameters were rejected.
#[derive(Debug)]
pub struct InvalidParamsDetails {
    /// Method (or definition) whose parameters were rejected.
    pub method: String,
    /// What was wrong.
    pub message: String,
    /// Dotted path of the offending field, e.g. `arguments.query`.
    pub param_path: Option<String>,
    /// Decode error, if one caused this.
    pub source: Option<BoxError>,
}

impl fmt::Display for InvalidParamsDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.param_path {
            Some(path) => write!(
                f,
                "invalid params for '{}' at {path}: {}",
                self.method, self.message
            ),
            None => write!(f, "invalid params for '{}': {}", self.method, self.message),
        }
    }
}

impl Error for InvalidParamsDetails {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        as_source(self.source.as_ref())
    }
}

/// A failure below the message layer.
#[derive(Debug)]
pub struct TransportDetails {
    /// What kind of failure.
    pub kind: TransportErrorKind,
    /// Rendered description.
    pub message: String,
    /// I/O or codec error, if one caused this.
    pub source: Option<BoxError>,
}

impl fmt::Display for TransportDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl Error for TransportDetails {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        as_source(self.source.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_param_path_is_rendered() {
        let details = InvalidParamsDetails {
            method: "tools/call".into(),
            message: "expected a string".into(),
            param_path: Some("arguments.query".into()),
            source: None,
        };
        assert_eq!(
            details.to_string(),
            "invalid params for 'tools/call' at arguments.query: expected a string"
        );
    }

    #[test]
    fn test_transport_source_is_exposed() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe");
        let details = TransportDetails {
            kind: TransportErrorKind::WriteFailed,
            message: "flush".into(),
            source: Some(Box::new(io)),
        };
        assert_eq!(details.to_string(), "write failed: flush");
        assert!(details.source().is_some());
    }
}
