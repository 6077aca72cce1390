// SPDX-FileCopyrightText: © 2025 SlimStreamer Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Encoders that turn raw PCM chunks into the wire format an
//! `HTTPStreamingSession` writes to its socket (§4.2).

pub mod encoder;
pub mod wav;

pub use encoder::{Encoder, EncoderState};
pub use wav::{WavEncoder, WavEncoderBuilder};
