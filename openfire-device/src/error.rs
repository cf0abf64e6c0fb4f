//! Device session error types

use openfire_transport::TransportError;
use thiserror::Error;

/// Errors from device operations
///
/// None of these are fatal: the session is always left in a state from which
/// the caller can retry or reconnect.
#[derive(Error, Debug)]
pub enum DeviceError {
    /// Transport layer error (port missing, open failure, cable pulled)
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// No reply within the step's bound
    #[error("Timed out waiting for {step}")]
    Timeout { step: &'static str },

    /// Reply arrived but isn't what the step expects
    #[error("Unexpected reply to {step}: {reply:?}")]
    MalformedReply { step: &'static str, reply: String },

    /// Record has the wrong number of fields for the negotiated protocol
    #[error("Unexpected reply to {step}: expected {expected} fields, got {actual}")]
    FieldCount {
        step: &'static str,
        expected: usize,
        actual: usize,
    },

    /// A write in the middle of a commit was rejected; earlier writes stay on
    /// the device
    #[error("Commit failed at {command:?} ({acknowledged}/{total} writes acknowledged): {reply}")]
    PartialCommit {
        acknowledged: usize,
        total: usize,
        command: String,
        reply: String,
    },

    /// Operation needs an open session
    #[error("Not connected")]
    NotConnected,

    /// Operation isn't allowed in the session's current state
    #[error("Cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },

    /// Invalid parameter value
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Feature not available on this board or configuration
    #[error("Feature not supported: {0}")]
    NotSupported(String),
}

impl DeviceError {
    /// Malformed replies and field-count mismatches are the same failure
    /// class to a caller
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::MalformedReply { .. } | Self::FieldCount { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::Transport(TransportError::Timeout)
        )
    }

    pub(crate) fn malformed(step: &'static str, reply: impl Into<String>) -> Self {
        Self::MalformedReply {
            step,
            reply: reply.into(),
        }
    }
}
