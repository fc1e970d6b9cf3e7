//! Error types for interaction-core
//!
//! Errors fall into four groups:
//!
//! - **Validation** (`InvalidState`, `Unsupported`, `Configuration`) - returned
//!   synchronously, the interaction is left untouched.
//! - **Transient** (`TransportUnavailable`) - never surfaced to the application;
//!   the quality sampler just skips the tick.
//! - **Fatal** (`SignalingFailure`) - forces the interaction into `Failed` and is
//!   reported exactly once through `interactionFailed`.
//! - **Async outcomes** (`Timeout`, `Cancelled`) - delivered through the
//!   completion of the pending operation that produced them.

use thiserror::Error;

use crate::types::InteractionState;

/// Result type for interaction operations
pub type InteractionResult<T> = Result<T, InteractionError>;

/// Errors that can occur while driving an interaction
#[derive(Debug, Clone, Error, PartialEq)]
pub enum InteractionError {
    /// Operation is not valid in the current interaction state
    #[error("Invalid state for {operation}: interaction is {state}")]
    InvalidState {
        operation: &'static str,
        state: InteractionState,
    },

    /// Operation is not supported by this kind of interaction
    #[error("Operation {operation} is not supported by this interaction")]
    Unsupported { operation: &'static str },

    /// Transport metrics are temporarily unavailable
    #[error("Transport unavailable: {reason}")]
    TransportUnavailable { reason: String },

    /// Unrecoverable signaling failure
    #[error("Signaling failure: {reason}")]
    SignalingFailure { reason: String },

    /// No response arrived before the operation timeout
    #[error("Operation {operation} timed out after {timeout_ms}ms")]
    Timeout {
        operation: &'static str,
        timeout_ms: u64,
    },

    /// Interaction was torn down while the operation was pending
    #[error("Operation {operation} cancelled: interaction is shutting down")]
    Cancelled { operation: &'static str },

    /// Invalid configuration
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Internal error
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl InteractionError {
    /// Create an invalid state error
    pub fn invalid_state(operation: &'static str, state: InteractionState) -> Self {
        Self::InvalidState { operation, state }
    }

    /// Create a transport unavailable error
    pub fn transport_unavailable(reason: impl Into<String>) -> Self {
        Self::TransportUnavailable {
            reason: reason.into(),
        }
    }

    /// Create a signaling failure
    pub fn signaling(reason: impl Into<String>) -> Self {
        Self::SignalingFailure {
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether this error forces the interaction into `Failed`
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::SignalingFailure { .. })
    }

    /// Whether the caller can retry or carry on after this error
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::InvalidState { .. }
            | Self::TransportUnavailable { .. }
            | Self::Timeout { .. } => true,

            Self::Unsupported { .. }
            | Self::SignalingFailure { .. }
            | Self::Cancelled { .. }
            | Self::Configuration { .. }
            | Self::Internal { .. } => false,
        }
    }
}
