//! Atom error types

use thiserror::Error;

/// Boxed error produced by a failing asynchronous derivation.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised by the atom engine.
#[derive(Error, Debug)]
pub enum AtomError {
    /// A pending derivation resolved to an error
    #[error("derivation failed: {0}")]
    Derivation(#[source] BoxError),

    /// A pending derivation was produced outside a tokio runtime
    #[error("no tokio runtime available to resolve a pending derivation")]
    NoRuntime,

    /// Configuration could not be parsed
    #[error("invalid atom configuration: {0}")]
    Config(String),
}

impl AtomError {
    /// Wrap any error as a derivation failure.
    pub fn derivation<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::Derivation(err.into())
    }
}

/// Result type for atom operations
pub type Result<T> = std::result::Result<T, AtomError>;

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn derivation_error_keeps_source() {
        let err = AtomError::derivation(std::io::Error::new(std::io::ErrorKind::Other, "boom"));

        assert_eq!(err.to_string(), "derivation failed: boom");
        assert!(err.source().is_some());
    }

    #[test]
    fn derivation_error_from_string() {
        let err = AtomError::derivation("upstream offline");
        assert_eq!(err.to_string(), "derivation failed: upstream offline");
    }
}
