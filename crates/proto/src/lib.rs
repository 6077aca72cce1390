// SPDX-FileCopyrightText: © 2025 SlimStreamer Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! SlimProto: the framed binary control channel between `SlimProtoSession`
//! and a thin-client player (§4.5).
//!
//! ## Modules
//!
//! - [`opcodes`]: server→client command framing (`STRM`, `SETD`, `AUDE`, `AUDG`).
//! - [`stat`]: the client→server `STAT` record, packed with no padding.
//! - [`session`]: the per-client control session actor.

pub mod opcodes;
pub mod session;
pub mod stat;

pub use opcodes::StrmCommand;
pub use session::{PingReply, SlimProtoSession};
pub use stat::StatRecord;
