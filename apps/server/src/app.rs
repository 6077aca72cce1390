// SPDX-FileCopyrightText: © 2025 SlimStreamer Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Wires capture pipelines, the rate arbiter, the SlimProto control
//! listener, and the HTTP data-channel listener into one running server.

use slimstreamer_codec::WavEncoderBuilder;
use slimstreamer_core::error::SlimStreamerError;
use slimstreamer_proto::SlimProtoSession;
use slimstreamer_streamer::{
    parse_client_id, BufferedAsyncWriter, CaptureSource, HttpStreamingSession, PipelineConfig,
    SilenceCaptureSource, StreamerHandle,
};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use crate::config::{CaptureConfig, Config};

/// Starts capture pipelines, then runs the control and data listeners until
/// either one exits (normally only on a bind or accept-loop failure).
///
/// # Errors
///
/// Returns an error if either listener fails to bind, or its accept loop
/// errors out.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let streamer = build_streamer(&config);

    let control_listener = TcpListener::bind(&config.server.control_address).await?;
    tracing::info!(address = %config.server.control_address, "control listener bound");
    let http_listener = TcpListener::bind(&config.server.http_address).await?;
    tracing::info!(address = %config.server.http_address, "data listener bound");

    let control_streamer = streamer.clone();
    let capture_config = config.capture.clone();
    let writer_queue_depth = config.buffer.writer_queue_depth;

    let control_task = tokio::spawn(accept_control_connections(control_listener, control_streamer));
    let http_task = tokio::spawn(accept_http_connections(http_listener, streamer, capture_config, writer_queue_depth));

    tokio::select! {
        result = control_task => result?,
        result = http_task => result?,
    }
}

fn build_streamer(config: &Config) -> StreamerHandle {
    let pipeline_configs = config
        .capture
        .rates
        .iter()
        .map(|rate| {
            let pipeline_config = PipelineConfig {
                sampling_rate: rate.sampling_rate,
                channels: config.capture.channels,
                bits_per_sample: config.capture.bits_per_sample,
                chunk_duration_ms: config.capture.chunk_duration_ms,
            };
            let source: Box<dyn CaptureSource> = Box::new(SilenceCaptureSource::new(rate.device_name.clone()));
            (pipeline_config, source)
        })
        .collect();

    slimstreamer_streamer::spawn_streamer_from_configs(pipeline_configs, config.buffer.pool_size)
}

async fn accept_control_connections(listener: TcpListener, streamer: StreamerHandle) -> anyhow::Result<()> {
    loop {
        let (socket, peer_addr) = listener.accept().await?;
        let client_id = peer_addr.to_string();
        let streamer = streamer.clone();
        tokio::spawn(async move {
            if let Err(error) = run_control_session(socket, client_id.clone(), streamer.clone()).await {
                tracing::warn!(client_id = %client_id, %error, "control session ended with error");
            }
            streamer.remove_client(client_id).await;
        });
    }
}

async fn run_control_session(
    socket: TcpStream,
    client_id: String,
    streamer: StreamerHandle,
) -> Result<(), SlimStreamerError> {
    let (control_tx, control_rx) = mpsc::channel(8);
    let (ping_tx, mut ping_rx) = mpsc::channel(8);
    streamer.register_client(client_id.clone(), control_tx).await;

    tokio::spawn(async move {
        while let Some(reply) = ping_rx.recv().await {
            tracing::debug!(
                client_id = %reply.client_id,
                rtt_ms = reply.rtt.as_millis(),
                "control session ping round-trip"
            );
        }
    });

    let session = SlimProtoSession::new(client_id);
    session.run(socket, control_rx, ping_tx).await
}

async fn accept_http_connections(
    listener: TcpListener,
    streamer: StreamerHandle,
    capture_config: CaptureConfig,
    writer_queue_depth: usize,
) -> anyhow::Result<()> {
    loop {
        let (socket, peer_addr) = listener.accept().await?;
        let streamer = streamer.clone();
        let capture_config = capture_config.clone();
        tokio::spawn(async move {
            if let Err(error) =
                handle_http_connection(socket, streamer, capture_config, writer_queue_depth).await
            {
                tracing::warn!(%peer_addr, %error, "http streaming connection ended with error");
            }
        });
    }
}

async fn handle_http_connection(
    socket: TcpStream,
    streamer: StreamerHandle,
    capture_config: CaptureConfig,
    writer_queue_depth: usize,
) -> anyhow::Result<()> {
    let mut reader = BufReader::new(socket);
    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;

    // Discard the remaining header lines up to the blank line terminator;
    // the CORE ignores everything but the request line's query string.
    loop {
        let mut header_line = String::new();
        let n = reader.read_line(&mut header_line).await?;
        if n == 0 || header_line.trim().is_empty() {
            break;
        }
    }

    let Some(client_id) = parse_query(&request_line).and_then(parse_client_id) else {
        reader.write_all(b"HTTP/1.1 400 Bad Request\r\n\r\n").await?;
        anyhow::bail!("GET /stream request missing a client id");
    };
    let client_id = client_id.to_string();

    let default_rate = capture_config.rates.first().map_or(44_100, |r| r.sampling_rate);
    let encoder =
        Box::new(WavEncoderBuilder::new(capture_config.channels, default_rate, capture_config.bits_per_sample).build());
    let writer = BufferedAsyncWriter::spawn(reader, writer_queue_depth);
    let mut session = HttpStreamingSession::new(client_id.clone(), encoder, writer);
    session.start();

    tracing::info!(client_id = %client_id, rate = default_rate, "data session attached");
    streamer.attach_data_session(client_id, session).await;
    Ok(())
}

/// Extracts the query string from an HTTP request line, e.g.
/// `"GET /stream?player=C1 HTTP/1.1"` -> `Some("player=C1")`.
fn parse_query(request_line: &str) -> Option<&str> {
    let path = request_line.split_whitespace().nth(1)?;
    path.split_once('?').map(|(_, query)| query)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_query_extracts_substring_after_question_mark() {
        assert_eq!(parse_query("GET /stream?player=C1 HTTP/1.1"), Some("player=C1"));
        assert_eq!(parse_query("GET /stream HTTP/1.1"), None);
        assert_eq!(parse_query(""), None);
    }
}
