// SPDX-FileCopyrightText: © 2025 SlimStreamer Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! `Pipeline`: owns one `CaptureSource` bound to a single sampling rate and
//! pumps chunks to the Streamer (§4.6).

use slimstreamer_core::buffer_pool::BufferPool;
use slimstreamer_core::chunk::Chunk;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::capture::CaptureSource;

/// The rate, channel count, and bit depth a `Pipeline` declares for its
/// output chunks, plus how many milliseconds of audio each chunk carries.
#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    pub sampling_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    pub chunk_duration_ms: u32,
}

impl PipelineConfig {
    #[must_use]
    pub const fn bytes_per_frame(&self) -> usize {
        self.channels as usize * (self.bits_per_sample as usize / 8)
    }

    #[must_use]
    pub fn frames_per_chunk(&self) -> usize {
        (self.chunk_duration_ms as usize * self.sampling_rate as usize) / 1000
    }

    #[must_use]
    pub fn chunk_bytes(&self) -> usize {
        self.frames_per_chunk() * self.bytes_per_frame()
    }
}

/// A `(CaptureSource, Destination)` pair bound to one sampling rate.
pub struct Pipeline {
    config: PipelineConfig,
    pool: BufferPool,
}

impl Pipeline {
    #[must_use]
    pub fn new(config: PipelineConfig, pool: BufferPool) -> Self {
        Self { config, pool }
    }

    #[must_use]
    pub const fn rate(&self) -> u32 {
        self.config.sampling_rate
    }

    /// Spawns the dedicated blocking capture thread and pumps chunks to
    /// `chunk_tx` until the source errors, the receiver is dropped, or
    /// `cancel` fires. Cancellation is observed between chunk reads, so the
    /// thread always terminates after at most one in-flight read (§5, §7:
    /// no orphan capture threads survive a stop request).
    pub fn spawn(
        self,
        mut source: Box<dyn CaptureSource>,
        chunk_tx: mpsc::Sender<Chunk>,
        cancel: CancellationToken,
    ) -> std::thread::JoinHandle<()> {
        let config = self.config;
        let pool = self.pool;
        let chunk_bytes = config.chunk_bytes();

        std::thread::spawn(move || {
            let mut scratch = vec![0u8; chunk_bytes];

            loop {
                if cancel.is_cancelled() {
                    return;
                }

                match pool.allocate() {
                    Some(mut buffer) => {
                        if let Err(error) = source.read_exact(&mut buffer[..chunk_bytes]) {
                            tracing::error!(
                                device = %source.device_name(),
                                rate = config.sampling_rate,
                                %error,
                                "capture device error; terminating pipeline"
                            );
                            let eos = Chunk::end_of_stream(
                                config.sampling_rate,
                                config.channels,
                                config.bits_per_sample,
                            );
                            let _ = chunk_tx.blocking_send(eos);
                            return;
                        }

                        let chunk = Chunk::new(
                            buffer,
                            config.frames_per_chunk(),
                            config.sampling_rate,
                            config.channels,
                            config.bits_per_sample,
                            false,
                        );
                        if chunk_tx.blocking_send(chunk).is_err() {
                            return; // Streamer side gone; nothing left to pump to.
                        }
                    },
                    None => {
                        tracing::warn!(
                            rate = config.sampling_rate,
                            "buffer pool exhausted; dropping chunk"
                        );
                        if let Err(error) = source.read_exact(&mut scratch) {
                            tracing::error!(
                                device = %source.device_name(),
                                rate = config.sampling_rate,
                                %error,
                                "capture device error; terminating pipeline"
                            );
                            let eos = Chunk::end_of_stream(
                                config.sampling_rate,
                                config.channels,
                                config.bits_per_sample,
                            );
                            let _ = chunk_tx.blocking_send(eos);
                            return;
                        }
                    },
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::SilenceCaptureSource;

    #[tokio::test]
    async fn pump_delivers_chunks_tagged_with_rate_and_frame_count() {
        let config = PipelineConfig {
            sampling_rate: 8_000,
            channels: 1,
            bits_per_sample: 16,
            chunk_duration_ms: 10,
        };
        let pool = BufferPool::new(2, config.chunk_bytes());
        let pipeline = Pipeline::new(config, pool);
        let (tx, mut rx) = mpsc::channel(4);

        let source = Box::new(SilenceCaptureSource::new("hw:test".to_string()));
        let _handle = pipeline.spawn(source, tx, CancellationToken::new());

        let chunk = rx.recv().await.expect("pipeline delivers a chunk");
        assert_eq!(chunk.sampling_rate(), 8_000);
        assert_eq!(chunk.frames(), 80);
        assert!(!chunk.end_of_stream());
    }

    #[tokio::test]
    async fn pool_exhaustion_drops_chunk_but_pump_keeps_running() {
        let config = PipelineConfig {
            sampling_rate: 8_000,
            channels: 1,
            bits_per_sample: 16,
            chunk_duration_ms: 10,
        };
        // Pool of zero usable slots: every allocation fails, forcing the
        // scratch-buffer discard path, but the pump must not stall.
        let pool = BufferPool::new(0, config.chunk_bytes());
        let pipeline = Pipeline::new(config, pool);
        let (tx, mut rx) = mpsc::channel(4);

        let source = Box::new(SilenceCaptureSource::new("hw:test".to_string()));
        let _handle = pipeline.spawn(source, tx, CancellationToken::new());

        // No chunk should arrive (pool always exhausted); the channel stays
        // open and empty rather than the thread panicking or blocking forever.
        let result = tokio::time::timeout(std::time::Duration::from_millis(50), rx.recv()).await;
        assert!(result.is_err(), "no chunk should ever be delivered from an empty pool");
    }
}
