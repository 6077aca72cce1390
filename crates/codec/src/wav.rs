// SPDX-FileCopyrightText: © 2025 SlimStreamer Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! A streaming WAV (RIFF/PCM) encoder.
//!
//! The total length of a live stream is unknown up front, so the RIFF and
//! `data` chunk sizes are written as `0xFFFFFFFF` placeholders, the same
//! convention long-lived PCM/Icecast-style streams use since the header is
//! written exactly once and can never be seeked back to patch in a real size.

use crate::encoder::{Encoder, EncoderState};

const RIFF_HEADER_LEN: usize = 44;

/// Builds a [`WavEncoder`] from the format parameters negotiated for a
/// pipeline: `(channels, sampling_rate, bits_per_sample, mime)`.
#[derive(Debug, Clone)]
pub struct WavEncoderBuilder {
    channels: u16,
    sampling_rate: u32,
    bits_per_sample: u16,
    mime: &'static str,
}

impl WavEncoderBuilder {
    #[must_use]
    pub const fn new(channels: u16, sampling_rate: u32, bits_per_sample: u16) -> Self {
        Self { channels, sampling_rate, bits_per_sample, mime: "audio/x-wave" }
    }

    #[must_use]
    pub const fn with_mime(mut self, mime: &'static str) -> Self {
        self.mime = mime;
        self
    }

    #[must_use]
    pub const fn build(self) -> WavEncoder {
        WavEncoder {
            channels: self.channels,
            sampling_rate: self.sampling_rate,
            bits_per_sample: self.bits_per_sample,
            mime: self.mime,
            state: EncoderState::Idle,
        }
    }
}

pub struct WavEncoder {
    channels: u16,
    sampling_rate: u32,
    bits_per_sample: u16,
    mime: &'static str,
    state: EncoderState,
}

impl WavEncoder {
    fn riff_header(&self) -> [u8; RIFF_HEADER_LEN] {
        let byte_rate =
            self.sampling_rate * u32::from(self.channels) * u32::from(self.bits_per_sample / 8);
        let block_align = self.channels * (self.bits_per_sample / 8);

        let mut header = [0u8; RIFF_HEADER_LEN];
        header[0..4].copy_from_slice(b"RIFF");
        header[4..8].copy_from_slice(&0xFFFF_FFFFu32.to_le_bytes()); // unknown total size
        header[8..12].copy_from_slice(b"WAVE");
        header[12..16].copy_from_slice(b"fmt ");
        header[16..20].copy_from_slice(&16u32.to_le_bytes()); // fmt chunk size
        header[20..22].copy_from_slice(&1u16.to_le_bytes()); // PCM
        header[22..24].copy_from_slice(&self.channels.to_le_bytes());
        header[24..28].copy_from_slice(&self.sampling_rate.to_le_bytes());
        header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
        header[32..34].copy_from_slice(&block_align.to_le_bytes());
        header[34..36].copy_from_slice(&self.bits_per_sample.to_le_bytes());
        header[36..40].copy_from_slice(b"data");
        header[40..44].copy_from_slice(&0xFFFF_FFFFu32.to_le_bytes()); // unknown data size
        header
    }
}

impl Encoder for WavEncoder {
    fn mime(&self) -> &'static str {
        self.mime
    }

    fn sampling_rate(&self) -> u32 {
        self.sampling_rate
    }

    fn is_running(&self) -> bool {
        self.state == EncoderState::Running
    }

    fn start(&mut self, sink: &mut dyn FnMut(&[u8])) {
        if self.state != EncoderState::Idle {
            return;
        }
        sink(&self.riff_header());
        self.state = EncoderState::Running;
    }

    fn encode(&mut self, pcm: &[u8], sink: &mut dyn FnMut(&[u8])) {
        if self.state != EncoderState::Running {
            return;
        }
        if !pcm.is_empty() {
            sink(pcm);
        }
    }

    fn stop(&mut self, _sink: &mut dyn FnMut(&[u8])) {
        // PCM passthrough buffers nothing internally, so there is nothing
        // left to flush; stop only needs to retire the state machine.
        self.state = EncoderState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_emits_44_byte_header_once() {
        let mut encoder = WavEncoderBuilder::new(2, 44_100, 16).build();
        let mut emitted = Vec::new();
        encoder.start(&mut |bytes| emitted.extend_from_slice(bytes));
        assert_eq!(emitted.len(), RIFF_HEADER_LEN);
        assert_eq!(&emitted[0..4], b"RIFF");
        assert_eq!(&emitted[8..12], b"WAVE");
        assert!(encoder.is_running());

        emitted.clear();
        encoder.start(&mut |bytes| emitted.extend_from_slice(bytes));
        assert!(emitted.is_empty(), "start while Running must be a no-op");
    }

    #[test]
    fn encode_passes_pcm_bytes_through_unmodified() {
        let mut encoder = WavEncoderBuilder::new(1, 8_000, 16).build();
        let mut emitted = Vec::new();
        encoder.start(&mut |bytes| emitted.extend_from_slice(bytes));
        emitted.clear();

        let pcm = [1u8, 2, 3, 4];
        encoder.encode(&pcm, &mut |bytes| emitted.extend_from_slice(bytes));
        assert_eq!(emitted, pcm);
    }

    #[test]
    fn encode_while_idle_is_silently_rejected() {
        let mut encoder = WavEncoderBuilder::new(1, 8_000, 16).build();
        let mut emitted = Vec::new();
        encoder.encode(&[1, 2, 3], &mut |bytes| emitted.extend_from_slice(bytes));
        assert!(emitted.is_empty());
    }

    #[test]
    fn stop_returns_encoder_to_idle() {
        let mut encoder = WavEncoderBuilder::new(1, 8_000, 16).build();
        let mut sink = |_: &[u8]| {};
        encoder.start(&mut sink);
        encoder.stop(&mut sink);
        assert!(!encoder.is_running());
    }
}
