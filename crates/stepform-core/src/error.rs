//! Core error types for stepform.
//!
//! This module provides the error enum [`StepformError`] covering transport
//! failures, validation failures, widget initialization failures, and
//! configuration errors. Recoverable failures are rendered as in-place
//! messages by the form; configuration errors indicate a client/server
//! contract mismatch and are classified as fatal by [`StepformError::is_fatal`].

use std::collections::BTreeMap;

use thiserror::Error;

/// The primary error type for stepform.
#[derive(Error, Debug)]
pub enum StepformError {
    // ── Recoverable ──────────────────────────────────────────────────

    /// A network or HTTP error reported by the transport.
    #[error("Transport error ({status}): {message}")]
    Transport {
        /// The HTTP status code, or 0 when the request never completed.
        status: u16,
        /// The server-provided error text, or the transport's status text.
        message: String,
    },

    /// The validation endpoint answered with `status = false`.
    #[error("Validation failed on step {step}")]
    ValidationFailed {
        /// The step that was validated.
        step: usize,
        /// Messages keyed by widget UID (or an unrecognized key).
        fields: BTreeMap<String, Vec<String>>,
    },

    /// The server answered with a payload that could not be decoded.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// A widget failed to load its assets or run its initializer.
    #[error("Widget '{uid}' failed to initialize: {message}")]
    AssetLoad {
        /// The UID of the failing widget.
        uid: String,
        /// A description of the failure.
        message: String,
    },

    // ── Configuration ────────────────────────────────────────────────

    /// A widget declares a parent UID that the form does not own.
    #[error("Parent widget '{parent}' of widget '{uid}' is not found")]
    ParentNotFound {
        /// The child widget UID.
        uid: String,
        /// The missing parent UID.
        parent: String,
    },

    /// A widget declares a layout area that the form does not define.
    #[error("Form area '{area}' required by widget '{uid}' is not found")]
    UnknownArea {
        /// The widget UID.
        uid: String,
        /// The missing area name.
        area: String,
    },

    /// A form with the given ID is not registered.
    #[error("Form '{0}' is not found")]
    FormNotFound(String),

    /// A widget with the given UID does not exist.
    #[error("Widget '{0}' does not exist")]
    WidgetNotFound(String),

    /// A configuration value is missing or invalid.
    #[error("Improperly configured: {0}")]
    ImproperlyConfigured(String),

    // ── State machine ────────────────────────────────────────────────

    /// The requested step transition is not allowed from the current state.
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// A response arrived for a step that is no longer current.
    #[error("Stale response for step {issued} (current step is {current})")]
    StaleResponse {
        /// The step the request was issued for.
        issued: usize,
        /// The step the form is on now.
        current: usize,
    },

    // ── IO ───────────────────────────────────────────────────────────

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl StepformError {
    /// Returns `true` for errors that indicate a configuration defect.
    ///
    /// Fatal errors are never turned into user-facing messages; they are
    /// logged and propagated to the caller.
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ParentNotFound { .. }
                | Self::UnknownArea { .. }
                | Self::FormNotFound(_)
                | Self::WidgetNotFound(_)
                | Self::ImproperlyConfigured(_)
        )
    }

    /// Returns `true` if the failure was already rendered as a message and
    /// the form can simply stay on the current step for retry.
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. }
                | Self::ValidationFailed { .. }
                | Self::MalformedResponse(_)
                | Self::AssetLoad { .. }
                | Self::StaleResponse { .. }
        )
    }
}

/// A convenience type alias for `Result<T, StepformError>`.
pub type StepformResult<T> = Result<T, StepformError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(StepformError::ParentNotFound {
            uid: "child".into(),
            parent: "parent".into()
        }
        .is_fatal());
        assert!(StepformError::FormNotFound("f".into()).is_fatal());
        assert!(StepformError::UnknownArea {
            uid: "w".into(),
            area: "side".into()
        }
        .is_fatal());
        assert!(!StepformError::Transport {
            status: 500,
            message: "x".into()
        }
        .is_fatal());
        assert!(!StepformError::InvalidTransition("x".into()).is_fatal());
    }

    #[test]
    fn test_recoverable_classification() {
        assert!(StepformError::MalformedResponse("x".into()).is_recoverable());
        assert!(StepformError::ValidationFailed {
            step: 1,
            fields: BTreeMap::new()
        }
        .is_recoverable());
        assert!(!StepformError::WidgetNotFound("w".into()).is_recoverable());
    }

    #[test]
    fn test_error_display() {
        let err = StepformError::ParentNotFound {
            uid: "city".into(),
            parent: "address".into(),
        };
        assert_eq!(
            err.to_string(),
            "Parent widget 'address' of widget 'city' is not found"
        );
        let err = StepformError::Transport {
            status: 404,
            message: "Not Found".into(),
        };
        assert_eq!(err.to_string(), "Transport error (404): Not Found");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err: StepformError = io_err.into();
        assert!(err.to_string().contains("file missing"));
        assert!(!err.is_fatal());
    }
}
