//! Error types for the call audio core

use thiserror::Error;

use crate::call::CallId;

/// Result type for call audio operations
pub type CallAudioResult<T> = Result<T, CallAudioError>;

/// Errors that can occur in the call audio core
///
/// Every fallible operation returns one of these instead of panicking;
/// "already in state" conditions are expected and logged at a low severity
/// by callers that treat them as no-ops.
#[derive(Debug, Clone, Error)]
pub enum CallAudioError {
    /// A call handle was supplied for a call the core is not tracking
    #[error("call not found: {call_id}")]
    CallNotFound { call_id: CallId },

    /// An operation that requires at least one call was invoked with none
    #[error("no call exists")]
    NoCallExists,

    /// Double-start / double-stop of a player or switch
    #[error("already in state: {what}")]
    AlreadyInState { what: String },

    /// A renderer handle was expected but has not been created
    #[error("renderer missing: {what}")]
    RendererMissing { what: String },

    /// The underlying renderer failed to play or stop
    #[error("renderer failure in {operation}: {message}")]
    RendererFailed { operation: String, message: String },

    /// A device switch was rejected by policy (e.g. earpiece during a
    /// satellite call); the caller is expected to have been prompted
    #[error("device switch rejected: {reason}")]
    PolicyRejected { reason: String },

    /// The device manager could not activate the requested device
    #[error("device switch failed: {device}")]
    SwitchFailed { device: String },

    /// Platform audio facade failure (mute, vibrator, scene, SCO channel)
    #[error("platform audio failure: {message}")]
    Platform { message: String },

    /// Distributed call proxy failure
    #[error("distributed call failure: {message}")]
    Distributed { message: String },

    /// Malformed argument (bad address payload, unknown slot, ...)
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },
}

impl CallAudioError {
    /// Create an already-in-state error
    pub fn already_in_state(what: impl Into<String>) -> Self {
        Self::AlreadyInState { what: what.into() }
    }

    /// Create a renderer failure error
    pub fn renderer(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RendererFailed {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a policy rejection error
    pub fn policy_rejected(reason: impl Into<String>) -> Self {
        Self::PolicyRejected { reason: reason.into() }
    }

    /// Create a platform failure error
    pub fn platform(message: impl Into<String>) -> Self {
        Self::Platform { message: message.into() }
    }

    /// Create a distributed failure error
    pub fn distributed(message: impl Into<String>) -> Self {
        Self::Distributed { message: message.into() }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument { message: message.into() }
    }

    /// True for conditions a caller normally treats as a benign no-op
    pub fn is_benign(&self) -> bool {
        matches!(self, Self::AlreadyInState { .. })
    }
}
