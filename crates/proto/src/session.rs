// SPDX-FileCopyrightText: © 2025 SlimStreamer Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! `SlimProtoSession`: the per-client control connection (§4.5).
//!
//! On connect it sends the fixed handshake sequence, then concurrently
//! forwards `SessionControlMessage`s from the Streamer as `STRM` commands
//! and reads `STAT` records from the client, reporting time-sync replies
//! back so the caller can compute ping RTT.

use std::time::Instant;

use slimstreamer_core::control::SessionControlMessage;
use slimstreamer_core::error::SlimStreamerError;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;

use crate::opcodes::{self, SetdField, StrmCommand};
use crate::stat::{StatRecord, STAT_RECORD_LEN};

/// A `STAT(STMt)` reply to a ping, with the measured round-trip time.
#[derive(Debug, Clone)]
pub struct PingReply {
    pub client_id: String,
    pub rtt: std::time::Duration,
}

/// The per-client SlimProto control session.
///
/// Holds only identity; the socket and channels are threaded through
/// `run` so the session can be driven entirely by the Scheduler without
/// this type itself needing interior mutability.
pub struct SlimProtoSession {
    client_id: String,
}

impl SlimProtoSession {
    #[must_use]
    pub const fn new(client_id: String) -> Self {
        Self { client_id }
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Runs the connect handshake, then the command/STAT loop, until the
    /// control channel is told to stop or the socket errs.
    ///
    /// # Errors
    ///
    /// Returns `SlimStreamerError::IoError` on socket failure and
    /// `SlimStreamerError::ProtocolError` on a malformed `STAT` frame;
    /// either terminates only this session (§7).
    pub async fn run(
        &self,
        socket: TcpStream,
        mut control_rx: mpsc::Receiver<SessionControlMessage>,
        ping_reply_tx: mpsc::Sender<PingReply>,
    ) -> Result<(), SlimStreamerError> {
        let (mut reader, mut writer) = socket.into_split();

        Self::send_connect_sequence(&mut writer).await?;

        let mut ping_in_flight: Option<Instant> = None;
        let mut frame_buf = [0u8; 8];

        loop {
            tokio::select! {
                control = control_rx.recv() => {
                    match control {
                        Some(SessionControlMessage::Stop) => {
                            writer.write_all(&opcodes::encode_strm(StrmCommand::Stop)).await?;
                            return Ok(());
                        },
                        Some(SessionControlMessage::Start) => {
                            writer.write_all(&opcodes::encode_strm(StrmCommand::Stop)).await?;
                        },
                        Some(SessionControlMessage::RateChanged { new_rate }) => {
                            writer.write_all(&opcodes::encode_strm(StrmCommand::Stop)).await?;
                            writer
                                .write_all(&opcodes::encode_strm(StrmCommand::Start {
                                    sampling_rate: new_rate,
                                }))
                                .await?;
                        },
                        None => return Ok(()),
                    }
                },

                read_result = reader.read_exact(&mut frame_buf) => {
                    read_result?;
                    let record = Self::read_stat_body(&mut reader, &frame_buf).await?;

                    if record.is_time_reply() {
                        if let Some(sent_at) = ping_in_flight.take() {
                            let rtt = sent_at.elapsed();
                            tracing::debug!(
                                client_id = %self.client_id,
                                rtt_ms = rtt.as_millis(),
                                "received STAT(STMt) ping reply"
                            );
                            let _ = ping_reply_tx
                                .send(PingReply { client_id: self.client_id.clone(), rtt })
                                .await;
                        }
                    }
                },
            }

            if ping_in_flight.is_none() {
                ping_in_flight = Some(Instant::now());
                let timestamp_ms = u64::try_from(
                    std::time::SystemTime::now()
                        .duration_since(std::time::UNIX_EPOCH)
                        .unwrap_or_default()
                        .as_millis(),
                )
                .unwrap_or(u64::MAX);
                writer
                    .write_all(&opcodes::encode_strm(StrmCommand::Time { timestamp_ms }))
                    .await?;
            }
        }
    }

    async fn send_connect_sequence(
        writer: &mut tokio::net::tcp::OwnedWriteHalf,
    ) -> Result<(), SlimStreamerError> {
        writer.write_all(&opcodes::encode_strm(StrmCommand::Stop)).await?;
        writer.write_all(&opcodes::encode_setd(SetdField::RequestName)).await?;
        writer.write_all(&opcodes::encode_setd(SetdField::Squeezebox3)).await?;
        writer.write_all(&opcodes::encode_aude(true, true)).await?;
        writer.write_all(&opcodes::encode_audg(0, 0)).await?;
        Ok(())
    }

    async fn read_stat_body(
        reader: &mut tokio::net::tcp::OwnedReadHalf,
        frame_prefix: &[u8; 8],
    ) -> Result<StatRecord, SlimStreamerError> {
        if &frame_prefix[0..4] != b"STAT" {
            return Err(SlimStreamerError::ProtocolError(format!(
                "expected STAT opcode, got {:?}",
                &frame_prefix[0..4]
            )));
        }
        let declared_len = u32::from_be_bytes(frame_prefix[4..8].try_into().unwrap()) as usize;
        if declared_len < STAT_RECORD_LEN {
            return Err(SlimStreamerError::ProtocolError(format!(
                "STAT length {declared_len} shorter than fixed record size {STAT_RECORD_LEN}"
            )));
        }

        let mut body = vec![0u8; declared_len];
        body[0..8].copy_from_slice(frame_prefix);
        reader.read_exact(&mut body[8..]).await?;
        StatRecord::decode(&body)
    }
}

#[cfg(test)]
mod tests {
    use tokio::net::TcpListener;

    use super::*;

    #[tokio::test]
    async fn connect_sequence_writes_expected_commands_in_order() {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind loopback");
        let addr = listener.local_addr().expect("local addr");

        let server_task = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept");
            let mut buf = vec![0u8; 256];
            let n = socket.read(&mut buf).await.expect("read connect sequence");
            buf.truncate(n);
            buf
        });

        let client_socket = TcpStream::connect(addr).await.expect("connect");
        let (_reader, mut writer) = client_socket.into_split();
        SlimProtoSession::send_connect_sequence(&mut writer).await.expect("send handshake");
        drop(writer);

        let bytes = server_task.await.expect("server task");
        assert_eq!(&bytes[2..6], b"STRM");
        assert_eq!(bytes[6], b'q');
    }

    #[test]
    fn read_stat_body_rejects_short_declared_length() {
        let mut frame_prefix = [0u8; 8];
        frame_prefix[0..4].copy_from_slice(b"STAT");
        frame_prefix[4..8].copy_from_slice(&1u32.to_be_bytes());
        // Exercised indirectly via StatRecord::decode's own length check;
        // this asserts the prefix itself is recognised as too short.
        let declared_len = u32::from_be_bytes(frame_prefix[4..8].try_into().unwrap()) as usize;
        assert!(declared_len < STAT_RECORD_LEN);
    }
}
