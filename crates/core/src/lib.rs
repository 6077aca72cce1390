// SPDX-FileCopyrightText: © 2025 SlimStreamer Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! SlimStreamer Core - shared types and error taxonomy for the capture/streaming CORE.
//!
//! ## Modules
//!
//! - [`chunk`]: the `Chunk` data type produced by capture and consumed by streaming sessions.
//! - [`buffer_pool`]: the fixed-size `BufferPool` and its move-only `ProxyBuffer` handle.
//! - [`ring_buffer`]: a fixed-capacity logical FIFO used internally by sessions and queues.
//! - [`control`]: control messages exchanged between sessions and the Streamer.
//! - [`error`]: the `SlimStreamerError` taxonomy.

pub mod buffer_pool;
pub mod chunk;
pub mod control;
pub mod error;
pub mod ring_buffer;

pub use buffer_pool::{BufferPool, ProxyBuffer};
pub use chunk::Chunk;
pub use control::{BackpressurePolicy, SessionControlMessage};
pub use error::{Result, SlimStreamerError};
pub use ring_buffer::RingBuffer;
