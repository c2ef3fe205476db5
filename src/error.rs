//! Error taxonomy for fetching and writing generated code

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Failure returned by a [`GeneratorSource`](crate::client::GeneratorSource)
#[derive(Debug, Error)]
pub enum FetchError {
    /// The generator/version combination does not exist on the server.
    /// Recoverable: the planner reports it and moves on to the next target.
    #[error("generator not found: {org}/{app}/{version}/{generator}")]
    NotFound {
        org: String,
        app: String,
        version: String,
        generator: String,
    },

    /// The server answered with an unexpected status
    #[error("server returned {status} for {url}: {body}")]
    Status {
        status: u16,
        url: String,
        body: String,
    },

    /// Transport or response decoding failure
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
}

impl FetchError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::NotFound { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOperation {
    CreateDir,
    Write,
}

impl fmt::Display for FileOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileOperation::CreateDir => write!(f, "creating a directory"),
            FileOperation::Write => write!(f, "writing a file"),
        }
    }
}

/// Local I/O failure while applying an update
#[derive(Debug, Error)]
#[error("I/O error: {operation} on path '{}'", .path.display())]
pub struct WriteError {
    pub operation: FileOperation,
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

impl WriteError {
    pub fn new(operation: FileOperation, path: PathBuf, source: std::io::Error) -> Self {
        Self {
            operation,
            path,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_is_recoverable() {
        let err = FetchError::NotFound {
            org: "acme".to_string(),
            app: "billing".to_string(),
            version: "latest".to_string(),
            generator: "scala_models".to_string(),
        };
        assert!(err.is_not_found());
        assert_eq!(
            err.to_string(),
            "generator not found: acme/billing/latest/scala_models"
        );

        let err = FetchError::Status {
            status: 500,
            url: "http://localhost/acme".to_string(),
            body: "boom".to_string(),
        };
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_write_error_message() {
        let err = WriteError::new(
            FileOperation::CreateDir,
            PathBuf::from("api/app/generated"),
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(
            err.to_string(),
            "I/O error: creating a directory on path 'api/app/generated'"
        );
    }
}
