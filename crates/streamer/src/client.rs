// SPDX-FileCopyrightText: © 2025 SlimStreamer Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! `Client`: the logical pairing of a control session and a data session,
//! identified by a client ID (§3). Owned exclusively by the `Streamer`.

use slimstreamer_core::control::SessionControlMessage;
use tokio::sync::mpsc;

use crate::http_session::HttpStreamingSession;

/// One connected client as the Streamer sees it: a channel into its running
/// `SlimProtoSession` task, and (once it has issued `GET /stream`) its
/// `HTTPStreamingSession`.
pub struct ClientEntry {
    client_id: String,
    control_tx: mpsc::Sender<SessionControlMessage>,
    data_session: Option<HttpStreamingSession>,
}

impl ClientEntry {
    #[must_use]
    pub const fn new(client_id: String, control_tx: mpsc::Sender<SessionControlMessage>) -> Self {
        Self { client_id, control_tx, data_session: None }
    }

    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    #[must_use]
    pub const fn data_session(&self) -> Option<&HttpStreamingSession> {
        self.data_session.as_ref()
    }

    #[must_use]
    pub fn data_session_mut(&mut self) -> Option<&mut HttpStreamingSession> {
        self.data_session.as_mut()
    }

    /// The rate of the most recent chunk this client accepted, i.e. its
    /// data session's negotiated rate.
    #[must_use]
    pub fn selected_rate(&self) -> Option<u32> {
        self.data_session.as_ref().map(HttpStreamingSession::negotiated_rate)
    }

    pub fn attach_data_session(&mut self, session: HttpStreamingSession) {
        self.data_session = Some(session);
    }

    /// Removes the data session (e.g. after drain-and-close completes).
    pub fn take_data_session(&mut self) -> Option<HttpStreamingSession> {
        self.data_session.take()
    }

    /// Forwards a control message to this client's `SlimProtoSession`.
    pub async fn send_control(&self, message: SessionControlMessage) {
        if self.control_tx.send(message).await.is_err() {
            tracing::warn!(client_id = %self.client_id, "control session gone; message dropped");
        }
    }
}
