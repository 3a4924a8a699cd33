//! Error handling for the G.722 decoder and concealment engine
//!
//! Concealment never fails once a call has been accepted: degraded analysis
//! results fall back to previous values internally. Errors are limited to
//! malformed parameters at the entry points.

#![allow(missing_docs)]

use std::fmt;
use thiserror::Error;

/// Result type alias for decoder operations
pub type Result<T> = std::result::Result<T, CodecError>;

/// Error type for decoder and concealment entry points
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Invalid configuration
    #[error("Invalid codec configuration: {details}")]
    InvalidConfig { details: String },

    /// Frame length is not a non-zero multiple of the 10 ms frame
    #[error("Invalid frame size: expected {expected}, got {actual}")]
    InvalidFrameSize { expected: usize, actual: usize },

    /// Caller-provided buffer is too small
    #[error("Buffer too small: need {needed} samples, got {actual}")]
    BufferTooSmall { needed: usize, actual: usize },

    /// Codeword payload does not match the frame
    #[error("Invalid payload data: {details}")]
    InvalidPayload { details: String },
}

impl CodecError {
    /// Create a new invalid configuration error
    pub fn invalid_config(details: impl Into<String>) -> Self {
        Self::InvalidConfig {
            details: details.into(),
        }
    }

    /// Create a new invalid payload error
    pub fn invalid_payload(details: impl Into<String>) -> Self {
        Self::InvalidPayload {
            details: details.into(),
        }
    }

    /// Check if this error is recoverable by retrying with corrected input
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::InvalidConfig { .. } => false,
            Self::InvalidFrameSize { .. }
            | Self::BufferTooSmall { .. }
            | Self::InvalidPayload { .. } => true,
        }
    }

    /// Get the error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidConfig { .. } => ErrorCategory::Configuration,
            Self::InvalidFrameSize { .. } | Self::InvalidPayload { .. } => {
                ErrorCategory::Processing
            }
            Self::BufferTooSmall { .. } => ErrorCategory::Memory,
        }
    }
}

/// Error category for grouping related errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Configuration and parameter errors
    Configuration,
    /// Frame processing errors
    Processing,
    /// Buffer sizing errors
    Memory,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "Configuration"),
            Self::Processing => write!(f, "Processing"),
            Self::Memory => write!(f, "Memory"),
        }
    }
}
