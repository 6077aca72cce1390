// SPDX-FileCopyrightText: © 2025 SlimStreamer Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! The `Encoder` contract: Idle → Running → Stopping → Idle, driven by
//! `start`/`encode`/`stop`, emitting bytes through a sink closure rather than
//! returning an owned buffer so a caller can push straight to a writer
//! without an extra copy.

/// Lifecycle state of an `Encoder`. `encode` calls made while `Stopping`
/// are rejected silently rather than erroring, matching the design's state
/// machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderState {
    Idle,
    Running,
    Stopping,
}

/// Converts raw PCM chunks into a wire format, emitting bytes via a sink
/// callback supplied at each call site rather than stored on the encoder,
/// since the sink (the session's writer) outlives no single `encode` call.
pub trait Encoder: Send {
    /// The MIME type advertised in the HTTP response header block.
    fn mime(&self) -> &'static str;

    fn sampling_rate(&self) -> u32;

    fn is_running(&self) -> bool;

    /// Emits any header bytes (e.g. a WAV RIFF header) and transitions to `Running`.
    fn start(&mut self, sink: &mut dyn FnMut(&[u8]));

    /// Appends PCM and emits encoded bytes. A no-op while `Stopping` or `Idle`.
    fn encode(&mut self, pcm: &[u8], sink: &mut dyn FnMut(&[u8]));

    /// Flushes any pending bytes and transitions back to `Idle`. Idempotent:
    /// calling `stop` on an already-`Idle` encoder emits nothing.
    fn stop(&mut self, sink: &mut dyn FnMut(&[u8]));
}
