// SPDX-FileCopyrightText: © 2025 SlimStreamer Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Structured error types for the SlimStreamer CORE.
//!
//! This module categorizes errors into the kinds named in the error handling
//! design: which session or pipeline is torn down on each kind is decided by
//! the caller, never unwound across the Scheduler boundary.

use thiserror::Error;

/// Main error type for CORE operations.
#[derive(Debug, Error)]
pub enum SlimStreamerError {
    /// Malformed SlimProto frame: wrong opcode, short payload, bad length prefix.
    /// Terminates the offending `SlimProtoSession`.
    #[error("protocol error: {0}")]
    ProtocolError(String),

    /// Socket read/write failure. Terminates the offending session.
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    /// Capture device failure. Terminates only the affected Pipeline.
    #[error("device error on {device}: {reason}")]
    DeviceError { device: String, reason: String },

    /// A chunk's sampling rate no longer matches a session's negotiated rate.
    /// Drain-and-close the data session; renegotiate via control.
    #[error("rate mismatch: session negotiated {negotiated} Hz, chunk is {observed} Hz")]
    RateMismatch { negotiated: u32, observed: u32 },

    /// Pool or writer queue is full; the chunk is dropped. Never fatal.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),
}

/// Convenience type alias for Results using `SlimStreamerError`.
pub type Result<T> = std::result::Result<T, SlimStreamerError>;

impl From<SlimStreamerError> for String {
    fn from(err: SlimStreamerError) -> Self {
        err.to_string()
    }
}
