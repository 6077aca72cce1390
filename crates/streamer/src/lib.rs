// SPDX-FileCopyrightText: © 2025 SlimStreamer Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Multi-rate pipeline engine, HTTP streaming sessions, and the rate
//! arbiter: the moving parts that sit between capture devices and
//! connected thin-client players.

pub mod buffered_writer;
pub mod capture;
pub mod client;
pub mod http_session;
pub mod pipeline;
pub mod scheduler;
pub mod streamer;

pub use buffered_writer::BufferedAsyncWriter;
pub use capture::{CaptureSource, SilenceCaptureSource};
pub use client::ClientEntry;
pub use http_session::{parse_client_id, HttpStreamingSession};
pub use pipeline::{Pipeline, PipelineConfig};
pub use scheduler::Scheduler;
pub use streamer::{spawn as spawn_streamer, spawn_from_configs as spawn_streamer_from_configs, StreamerHandle};
