// SPDX-FileCopyrightText: © 2025 SlimStreamer Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! The `Chunk` type: a fixed-duration block of interleaved PCM frames tagged
//! with its sampling rate, as produced by a `Pipeline` and consumed by
//! `HTTPStreamingSession`s (§3 of the design).

use std::sync::Arc;

use crate::buffer_pool::ProxyBuffer;

/// A block of interleaved PCM samples produced by one `Pipeline`.
///
/// `samples` is reference-counted so the same chunk can be handed to every
/// subscribed session without copying; a session only ever reads it.
#[derive(Clone)]
pub struct Chunk {
    samples: Arc<ProxyBuffer>,
    frames: usize,
    sampling_rate: u32,
    channels: u16,
    bits_per_sample: u16,
    end_of_stream: bool,
}

impl Chunk {
    /// Builds a chunk from a pool-backed buffer.
    ///
    /// `frames` must equal `buffer.len() / (channels as usize * bytes_per_sample)`;
    /// this is an internal invariant enforced by the only caller, `Pipeline::pump`,
    /// rather than validated here on the hot path.
    #[must_use]
    pub fn new(
        buffer: ProxyBuffer,
        frames: usize,
        sampling_rate: u32,
        channels: u16,
        bits_per_sample: u16,
        end_of_stream: bool,
    ) -> Self {
        Self {
            samples: Arc::new(buffer),
            frames,
            sampling_rate,
            channels,
            bits_per_sample,
            end_of_stream,
        }
    }

    /// Builds the terminal end-of-stream marker chunk for a pipeline shutting down.
    #[must_use]
    pub fn end_of_stream(sampling_rate: u32, channels: u16, bits_per_sample: u16) -> Self {
        Self {
            samples: Arc::new(ProxyBuffer::empty()),
            frames: 0,
            sampling_rate,
            channels,
            bits_per_sample,
            end_of_stream: true,
        }
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.samples
    }

    #[must_use]
    pub const fn frames(&self) -> usize {
        self.frames
    }

    #[must_use]
    pub const fn sampling_rate(&self) -> u32 {
        self.sampling_rate
    }

    #[must_use]
    pub const fn channels(&self) -> u16 {
        self.channels
    }

    #[must_use]
    pub const fn bits_per_sample(&self) -> u16 {
        self.bits_per_sample
    }

    #[must_use]
    pub const fn end_of_stream(&self) -> bool {
        self.end_of_stream
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer_pool::BufferPool;

    #[test]
    fn frame_count_matches_byte_layout() {
        let pool = BufferPool::new(1, 16);
        let buf = pool.allocate().expect("pool should have a free slot");
        let chunk = Chunk::new(buf, 2, 44_100, 2, 16, false);
        assert_eq!(chunk.frames(), 2);
        assert_eq!(chunk.bytes().len(), 16);
    }

    #[test]
    fn end_of_stream_chunk_carries_no_frames() {
        let chunk = Chunk::end_of_stream(44_100, 2, 16);
        assert!(chunk.end_of_stream());
        assert_eq!(chunk.frames(), 0);
    }
}
