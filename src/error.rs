//! Error handling

use std::fmt;
use std::io;

/// Freezer operation that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreezerOp {
    Open,
    Freeze,
    Thaw,
}

impl fmt::Display for FreezerOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FreezerOp::Open => write!(f, "open"),
            FreezerOp::Freeze => write!(f, "freeze"),
            FreezerOp::Thaw => write!(f, "thaw"),
        }
    }
}

/// Custom error type
#[derive(Debug, Clone)]
pub enum Error {
    /// IO error with message
    Io(String),
    /// Rejected configuration or engine parameters
    InvalidConfig(String),
    /// Core list is empty, too long or malformed
    CoreSet(String),
    /// Cgroup freezer could not be opened or written
    Freezer { op: FreezerOp, reason: String },
    /// Termination handler could not be installed
    Signal(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(msg) => write!(f, "IO error: {}", msg),
            Error::InvalidConfig(msg) => write!(f, "Invalid config: {}", msg),
            Error::CoreSet(msg) => write!(f, "Invalid core set: {}", msg),
            Error::Freezer { op, reason } => write!(f, "Cgroup {} failed: {}", op, reason),
            Error::Signal(msg) => write!(f, "Signal error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

impl From<nix::Error> for Error {
    fn from(err: nix::Error) -> Self {
        Error::Signal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_io() {
        let err = Error::Io("test error".to_string());
        assert_eq!(err.to_string(), "IO error: test error");
    }

    #[test]
    fn test_error_display_invalid_config() {
        let err = Error::InvalidConfig("ratio out of range".to_string());
        assert_eq!(err.to_string(), "Invalid config: ratio out of range");
    }

    #[test]
    fn test_error_display_freezer_names_operation() {
        let err = Error::Freezer {
            op: FreezerOp::Thaw,
            reason: "short write".to_string(),
        };
        assert_eq!(err.to_string(), "Cgroup thaw failed: short write");

        let err = Error::Freezer {
            op: FreezerOp::Freeze,
            reason: "EBADF".to_string(),
        };
        assert!(err.to_string().contains("freeze"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "missing");
        let err = Error::from(io_err);
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_error_from_nix() {
        let err = Error::from(nix::Error::EINVAL);
        assert!(matches!(err, Error::Signal(_)));
    }

    #[test]
    fn test_error_debug() {
        let err = Error::CoreSet("empty".to_string());
        let debug_str = format!("{:?}", err);
        assert!(debug_str.contains("CoreSet"));
    }
}
