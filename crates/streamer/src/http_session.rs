// SPDX-FileCopyrightText: © 2025 SlimStreamer Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! `HTTPStreamingSession`: one per client audio data connection (§4.4).

use std::time::Duration;

use slimstreamer_codec::Encoder;
use slimstreamer_core::chunk::Chunk;
use slimstreamer_core::error::SlimStreamerError;
use tokio::sync::oneshot;

use crate::buffered_writer::BufferedAsyncWriter;

/// The HTTP/1.1 response header block written once, synchronously, before
/// any encoded bytes (§4.4 step 2).
#[must_use]
pub fn response_header_block(mime: &str, server_version: &str) -> Vec<u8> {
    format!(
        "HTTP/1.1 200 OK\r\nServer: SlimStreamer ({server_version})\r\nConnection: close\r\nContent-Type: {mime}\r\n\r\n"
    )
    .into_bytes()
}

/// Extracts the client ID from a query string of the form `<key>=<value>`:
/// first `=` wins, value is everything after it (§4.4 step 1, §8 property 8).
#[must_use]
pub fn parse_client_id(query: &str) -> Option<&str> {
    let (_, value) = query.split_once('=')?;
    Some(value)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Idle,
    Running,
}

/// One client's audio data connection: owns an `Encoder` and a
/// `BufferedAsyncWriter`, and consumes chunks at its negotiated rate.
pub struct HttpStreamingSession {
    client_id: String,
    encoder: Box<dyn Encoder>,
    writer: BufferedAsyncWriter,
    state: RunState,
    frames_provided: u64,
    negotiated_rate: u32,
}

impl HttpStreamingSession {
    #[must_use]
    pub fn new(client_id: String, encoder: Box<dyn Encoder>, writer: BufferedAsyncWriter) -> Self {
        let negotiated_rate = encoder.sampling_rate();
        Self { client_id, encoder, writer, state: RunState::Idle, frames_provided: 0, negotiated_rate }
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    #[must_use]
    pub const fn negotiated_rate(&self) -> u32 {
        self.negotiated_rate
    }

    #[must_use]
    pub const fn frames_provided(&self) -> u64 {
        self.frames_provided
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state == RunState::Running
    }

    /// Writes the response header block, starts the encoder (emitting any
    /// header bytes, e.g. a WAV RIFF header), and transitions to `Running`.
    pub fn start(&mut self) {
        if self.state == RunState::Running {
            return;
        }
        let header = response_header_block(self.encoder.mime(), env!("CARGO_PKG_VERSION"));
        self.writer.write_async(header, Box::new(|_, _| {}));
        let writer = &self.writer;
        self.encoder.start(&mut |bytes| {
            writer.write_async(bytes.to_vec(), Box::new(|_, _| {}));
        });
        self.state = RunState::Running;
    }

    /// Feeds one chunk through the encoder to the writer (§4.4 steps 3-6).
    ///
    /// # Errors
    ///
    /// Returns `SlimStreamerError::RateMismatch` if `chunk`'s rate differs
    /// from this session's negotiated rate; the caller (the Streamer) must
    /// then drain-and-close this session and renegotiate via control.
    pub fn stream_chunk(&mut self, chunk: &Chunk) -> Result<(), SlimStreamerError> {
        if self.state != RunState::Running {
            return Ok(());
        }
        if chunk.sampling_rate() != self.negotiated_rate {
            return Err(SlimStreamerError::RateMismatch {
                negotiated: self.negotiated_rate,
                observed: chunk.sampling_rate(),
            });
        }

        let writer = &self.writer;
        let client_id = self.client_id.clone();
        self.encoder.encode(chunk.bytes(), &mut |bytes| {
            if writer.is_buffer_available() {
                writer.write_async(bytes.to_vec(), Box::new(|_, _| {}));
            } else {
                tracing::warn!(
                    client_id = %client_id,
                    dropped_bytes = bytes.len(),
                    "writer queue full; dropping encoded bytes"
                );
            }
        });
        self.frames_provided += chunk.frames() as u64;

        Ok(())
    }

    /// Drains the encoder and writer, then returns once the socket has
    /// seen every queued byte (§4.4 step 7). The caller is responsible for
    /// dropping the session afterwards to close the socket.
    pub async fn flush(&mut self) {
        loop {
            if self.encoder.is_running() {
                let writer = &self.writer;
                self.encoder.stop(&mut |bytes| {
                    if writer.is_buffer_available() {
                        writer.write_async(bytes.to_vec(), Box::new(|_, _| {}));
                    }
                });
                continue;
            }

            if self.writer.is_buffer_available() {
                let (done_tx, done_rx) = oneshot::channel();
                self.writer.write_async(
                    Vec::new(),
                    Box::new(move |_, _| {
                        let _ = done_tx.send(());
                    }),
                );
                let _ = done_rx.await;
                break;
            }

            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        self.state = RunState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_client_id_takes_substring_after_first_equals() {
        assert_eq!(parse_client_id("player=C1"), Some("C1"));
        assert_eq!(parse_client_id("p=a=b"), Some("a=b"));
        assert_eq!(parse_client_id("noequals"), None);
    }

    #[test]
    fn response_header_block_carries_encoder_mime() {
        let header = response_header_block("audio/x-wave", "0.1.0");
        let text = String::from_utf8(header).expect("ascii header");
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("Content-Type: audio/x-wave"));
        assert!(text.ends_with("\r\n\r\n"));
    }

    #[tokio::test]
    async fn frame_accounting_matches_sum_of_matching_rate_chunks() {
        use slimstreamer_codec::WavEncoderBuilder;
        use slimstreamer_core::buffer_pool::BufferPool;

        let (sink, _collected) = tokio::io::duplex(65536);
        let writer = BufferedAsyncWriter::spawn(sink, 128);
        let encoder = Box::new(WavEncoderBuilder::new(2, 44_100, 16).build());
        let mut session = HttpStreamingSession::new("C1".to_string(), encoder, writer);
        session.start();

        let pool = BufferPool::new(4, 441 * 2 * 2);
        for _ in 0..2 {
            let buf = pool.allocate().expect("buffer available");
            let chunk = Chunk::new(buf, 441, 44_100, 2, 16, false);
            session.stream_chunk(&chunk).expect("matching rate");
        }

        assert_eq!(session.frames_provided(), 882);
    }

    #[tokio::test]
    async fn stream_chunk_rejects_rate_mismatch() {
        use slimstreamer_codec::WavEncoderBuilder;
        use slimstreamer_core::buffer_pool::BufferPool;

        let (sink, _collected) = tokio::io::duplex(4096);
        let writer = BufferedAsyncWriter::spawn(sink, 128);
        let encoder = Box::new(WavEncoderBuilder::new(2, 44_100, 16).build());
        let mut session = HttpStreamingSession::new("C1".to_string(), encoder, writer);
        session.start();

        let pool = BufferPool::new(1, 8);
        let buf = pool.allocate().expect("buffer");
        let chunk = Chunk::new(buf, 1, 48_000, 2, 16, false);

        let err = session.stream_chunk(&chunk).unwrap_err();
        assert!(matches!(err, SlimStreamerError::RateMismatch { .. }));
    }
}
