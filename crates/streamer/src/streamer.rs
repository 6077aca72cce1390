// SPDX-FileCopyrightText: © 2025 SlimStreamer Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! `Streamer`: the rate arbiter (§4.7). Owns every `Pipeline` and every
//! connected `Client`, routes chunks from capture threads to the clients
//! whose negotiated rate matches, and renegotiates clients that fall out of
//! step with their pipeline.
//!
//! All mutable state lives inside a single task (`Streamer::run`), reached
//! only through `StreamerHandle`'s message-passing methods, mirroring the
//! engine-actor/handle split the control plane uses elsewhere.

use std::collections::HashMap;

use slimstreamer_core::chunk::Chunk;
use slimstreamer_core::control::SessionControlMessage;
use slimstreamer_core::error::SlimStreamerError;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::capture::CaptureSource;
use crate::client::ClientEntry;
use crate::http_session::HttpStreamingSession;
use crate::pipeline::{Pipeline, PipelineConfig};

const COMMAND_QUEUE_DEPTH: usize = 32;
const CHUNK_QUEUE_DEPTH: usize = 256;

enum StreamerCommand {
    RegisterClient { client_id: String, control_tx: mpsc::Sender<SessionControlMessage> },
    AttachDataSession { client_id: String, session: Box<HttpStreamingSession> },
    RemoveClient { client_id: String },
    Stop { done: oneshot::Sender<()> },
}

/// A cheaply cloneable handle to a running `Streamer` actor.
#[derive(Clone)]
pub struct StreamerHandle {
    command_tx: mpsc::Sender<StreamerCommand>,
}

impl StreamerHandle {
    /// Registers a newly connected control session.
    pub async fn register_client(&self, client_id: String, control_tx: mpsc::Sender<SessionControlMessage>) {
        let _ = self.command_tx.send(StreamerCommand::RegisterClient { client_id, control_tx }).await;
    }

    /// Attaches a data session once the client has issued `GET /stream`.
    pub async fn attach_data_session(&self, client_id: String, session: HttpStreamingSession) {
        let _ = self
            .command_tx
            .send(StreamerCommand::AttachDataSession { client_id, session: Box::new(session) })
            .await;
    }

    /// Drops a client entirely, e.g. once its control socket closes.
    pub async fn remove_client(&self, client_id: String) {
        let _ = self.command_tx.send(StreamerCommand::RemoveClient { client_id }).await;
    }

    /// Drains every client's data session, stops every capture thread, and
    /// waits for the actor to finish (§7: clean shutdown).
    pub async fn stop(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.command_tx.send(StreamerCommand::Stop { done: done_tx }).await.is_ok() {
            let _ = done_rx.await;
        }
    }
}

struct Streamer {
    clients: HashMap<String, ClientEntry>,
    pipeline_handles: Vec<std::thread::JoinHandle<()>>,
    cancel: CancellationToken,
}

impl Streamer {
    async fn run(mut self, mut chunk_rx: mpsc::Receiver<Chunk>, mut command_rx: mpsc::Receiver<StreamerCommand>) {
        let mut chunks_done = false;

        loop {
            tokio::select! {
                maybe_chunk = chunk_rx.recv(), if !chunks_done => {
                    match maybe_chunk {
                        Some(chunk) => self.route_chunk(chunk).await,
                        None => chunks_done = true,
                    }
                },
                maybe_command = command_rx.recv() => {
                    match maybe_command {
                        Some(StreamerCommand::RegisterClient { client_id, control_tx }) => {
                            self.clients.insert(client_id.clone(), ClientEntry::new(client_id, control_tx));
                        },
                        Some(StreamerCommand::AttachDataSession { client_id, session }) => {
                            if let Some(client) = self.clients.get_mut(&client_id) {
                                client.attach_data_session(*session);
                            }
                        },
                        Some(StreamerCommand::RemoveClient { client_id }) => {
                            if let Some(mut client) = self.clients.remove(&client_id) {
                                if let Some(mut session) = client.take_data_session() {
                                    session.flush().await;
                                }
                            }
                        },
                        Some(StreamerCommand::Stop { done }) => {
                            self.shutdown().await;
                            let _ = done.send(());
                            return;
                        },
                        None => {
                            self.shutdown().await;
                            return;
                        },
                    }
                },
            }
        }
    }

    /// Delivers `chunk` to every client whose negotiated rate matches it,
    /// releasing it immediately for everyone else. A client whose session
    /// reports a rate mismatch is drained, closed, and renegotiated via its
    /// control session (§4.7).
    async fn route_chunk(&mut self, chunk: Chunk) {
        let mut to_renegotiate = Vec::new();

        for (client_id, client) in &mut self.clients {
            let Some(session) = client.data_session_mut() else {
                continue; // no data session yet; chunk is simply released
            };
            if session.negotiated_rate() != chunk.sampling_rate() {
                continue; // subscribed to a different rate; not this client's concern
            }

            match session.stream_chunk(&chunk) {
                Ok(()) => {},
                Err(SlimStreamerError::RateMismatch { negotiated, observed }) => {
                    tracing::info!(client_id = %client_id, negotiated, observed, "client rate mismatch; renegotiating");
                    to_renegotiate.push(client_id.clone());
                },
                Err(error) => {
                    tracing::error!(client_id = %client_id, %error, "error streaming chunk to client");
                    to_renegotiate.push(client_id.clone());
                },
            }
        }

        for client_id in to_renegotiate {
            self.drain_and_renegotiate(&client_id, chunk.sampling_rate()).await;
        }
    }

    async fn drain_and_renegotiate(&mut self, client_id: &str, new_rate: u32) {
        let Some(client) = self.clients.get_mut(client_id) else { return };
        if let Some(mut session) = client.take_data_session() {
            session.flush().await;
        }
        client.send_control(SessionControlMessage::Stop).await;
        client.send_control(SessionControlMessage::RateChanged { new_rate }).await;
    }

    async fn shutdown(&mut self) {
        for (_, mut client) in self.clients.drain() {
            if let Some(mut session) = client.take_data_session() {
                session.flush().await;
            }
            client.send_control(SessionControlMessage::Stop).await;
        }

        self.cancel.cancel();
        for handle in std::mem::take(&mut self.pipeline_handles) {
            let _ = tokio::task::spawn_blocking(move || handle.join()).await;
        }
    }
}

/// Builds one `Pipeline` per configured rate, spawns its capture thread, and
/// starts the Streamer actor. Returns a handle for the control plane.
#[must_use]
pub fn spawn(pipelines: Vec<(Pipeline, Box<dyn CaptureSource>)>) -> StreamerHandle {
    let cancel = CancellationToken::new();
    let (chunk_tx, chunk_rx) = mpsc::channel(CHUNK_QUEUE_DEPTH);
    let mut pipeline_handles = Vec::with_capacity(pipelines.len());

    for (pipeline, source) in pipelines {
        pipeline_handles.push(pipeline.spawn(source, chunk_tx.clone(), cancel.clone()));
    }
    drop(chunk_tx);

    let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
    let streamer = Streamer { clients: HashMap::new(), pipeline_handles, cancel };
    tokio::spawn(streamer.run(chunk_rx, command_rx));

    StreamerHandle { command_tx }
}

/// Convenience constructor pairing each `PipelineConfig` with its pool and
/// capture source, for callers that haven't already built `Pipeline`s.
#[must_use]
pub fn spawn_from_configs(
    configs: Vec<(PipelineConfig, Box<dyn CaptureSource>)>,
    pool_size: usize,
) -> StreamerHandle {
    let pipelines = configs
        .into_iter()
        .map(|(config, source)| {
            let pool = slimstreamer_core::buffer_pool::BufferPool::new(pool_size, config.chunk_bytes());
            (Pipeline::new(config, pool), source)
        })
        .collect();
    spawn(pipelines)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use slimstreamer_codec::WavEncoderBuilder;
    use slimstreamer_core::buffer_pool::BufferPool;

    use super::*;
    use crate::buffered_writer::BufferedAsyncWriter;
    use crate::capture::SilenceCaptureSource;

    fn test_config(sampling_rate: u32) -> PipelineConfig {
        PipelineConfig { sampling_rate, channels: 2, bits_per_sample: 16, chunk_duration_ms: 10 }
    }

    #[tokio::test]
    async fn chunk_at_matching_rate_reaches_its_client() {
        let config = test_config(44_100);
        let pool = BufferPool::new(4, config.chunk_bytes());
        let pipeline = Pipeline::new(config, pool);
        let source = Box::new(SilenceCaptureSource::new("hw:test".to_string()));
        let handle = spawn(vec![(pipeline, source)]);

        let (control_tx, _control_rx) = mpsc::channel(4);
        handle.register_client("C1".to_string(), control_tx).await;

        let (sink, mut collected) = tokio::io::duplex(65536);
        let writer = BufferedAsyncWriter::spawn(sink, 128);
        let encoder = Box::new(WavEncoderBuilder::new(2, 44_100, 16).build());
        let mut session = HttpStreamingSession::new("C1".to_string(), encoder, writer);
        session.start();
        handle.attach_data_session("C1".to_string(), session).await;

        // Give the actor loop time to route at least one chunk through.
        tokio::time::sleep(Duration::from_millis(30)).await;
        handle.stop().await;

        use tokio::io::AsyncReadExt;
        let mut buf = [0u8; 64];
        let timeout = tokio::time::timeout(Duration::from_millis(50), collected.read(&mut buf)).await;
        let read = timeout.expect("read completes").expect("read succeeds");
        assert!(read > 0, "streamed bytes should reach the client side of the duplex pair");
    }

    #[tokio::test]
    async fn unattached_client_does_not_block_routing() {
        let config = test_config(8_000);
        let pool = BufferPool::new(2, config.chunk_bytes());
        let pipeline = Pipeline::new(config, pool);
        let source = Box::new(SilenceCaptureSource::new("hw:test".to_string()));
        let handle = spawn(vec![(pipeline, source)]);

        let (control_tx, _control_rx) = mpsc::channel(4);
        handle.register_client("C1".to_string(), control_tx).await;

        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.stop().await;
    }
}
