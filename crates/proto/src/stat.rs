// SPDX-FileCopyrightText: © 2025 SlimStreamer Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! The client→server `STAT` record: a packed structure serialised with no
//! padding, carrying its own 32-bit length field.
//!
//! Open question (design §9): whether `length` counts the opcode and the
//! length field itself is unspecified upstream. This implementation treats
//! `length` as fully self-contained — the total byte length of the record,
//! including the 4-byte opcode and the 4-byte length field — so a decoder
//! never needs information from outside the record to validate it.

use slimstreamer_core::error::SlimStreamerError;

/// `STAT(STMt)`: the event a player sends in reply to `STRM{Time}`, used to
/// compute ping RTT.
pub const EVENT_TIME_REPLY: [u8; 4] = *b"STMt";

pub const STAT_RECORD_LEN: usize = 57;

/// A decoded `STAT` record (§4.5).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatRecord {
    pub event: [u8; 4],
    pub num_crlf: u8,
    pub stream_buffer_fullness: u32,
    pub stream_buffer_size: u32,
    pub bytes_received: u64,
    pub jiffies: u32,
    pub output_buffer_fullness: u32,
    pub output_buffer_size: u32,
    pub elapsed_seconds: u32,
    pub voltage: u16,
    pub elapsed_milliseconds: u32,
    pub server_timestamp: u32,
    pub error_code: u16,
}

impl StatRecord {
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(STAT_RECORD_LEN);
        out.extend_from_slice(b"STAT");
        #[allow(clippy::cast_possible_truncation)]
        out.extend_from_slice(&(STAT_RECORD_LEN as u32).to_be_bytes());
        out.extend_from_slice(&self.event);
        out.push(self.num_crlf);
        out.extend_from_slice(&self.stream_buffer_fullness.to_be_bytes());
        out.extend_from_slice(&self.stream_buffer_size.to_be_bytes());
        out.extend_from_slice(&self.bytes_received.to_be_bytes());
        out.extend_from_slice(&self.jiffies.to_be_bytes());
        out.extend_from_slice(&self.output_buffer_fullness.to_be_bytes());
        out.extend_from_slice(&self.output_buffer_size.to_be_bytes());
        out.extend_from_slice(&self.elapsed_seconds.to_be_bytes());
        out.extend_from_slice(&self.voltage.to_be_bytes());
        out.extend_from_slice(&self.elapsed_milliseconds.to_be_bytes());
        out.extend_from_slice(&self.server_timestamp.to_be_bytes());
        out.extend_from_slice(&self.error_code.to_be_bytes());
        debug_assert_eq!(out.len(), STAT_RECORD_LEN);
        out
    }

    /// Decodes a `STAT` record from a complete, in-memory buffer.
    ///
    /// # Errors
    ///
    /// Returns `SlimStreamerError::ProtocolError` if the opcode is not
    /// `STAT` or the payload is shorter than the fixed record layout.
    pub fn decode(bytes: &[u8]) -> Result<Self, SlimStreamerError> {
        if bytes.len() < STAT_RECORD_LEN {
            return Err(SlimStreamerError::ProtocolError(format!(
                "STAT record too short: {} bytes, need {STAT_RECORD_LEN}",
                bytes.len()
            )));
        }
        if &bytes[0..4] != b"STAT" {
            return Err(SlimStreamerError::ProtocolError(format!(
                "expected STAT opcode, got {:?}",
                &bytes[0..4]
            )));
        }

        let mut event = [0u8; 4];
        event.copy_from_slice(&bytes[8..12]);

        Ok(Self {
            event,
            num_crlf: bytes[12],
            stream_buffer_fullness: u32::from_be_bytes(bytes[13..17].try_into().unwrap()),
            stream_buffer_size: u32::from_be_bytes(bytes[17..21].try_into().unwrap()),
            bytes_received: u64::from_be_bytes(bytes[21..29].try_into().unwrap()),
            jiffies: u32::from_be_bytes(bytes[29..33].try_into().unwrap()),
            output_buffer_fullness: u32::from_be_bytes(bytes[33..37].try_into().unwrap()),
            output_buffer_size: u32::from_be_bytes(bytes[37..41].try_into().unwrap()),
            elapsed_seconds: u32::from_be_bytes(bytes[41..45].try_into().unwrap()),
            voltage: u16::from_be_bytes(bytes[45..47].try_into().unwrap()),
            elapsed_milliseconds: u32::from_be_bytes(bytes[47..51].try_into().unwrap()),
            server_timestamp: u32::from_be_bytes(bytes[51..55].try_into().unwrap()),
            error_code: u16::from_be_bytes(bytes[55..57].try_into().unwrap()),
        })
    }

    #[must_use]
    pub fn is_time_reply(&self) -> bool {
        self.event == EVENT_TIME_REPLY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> StatRecord {
        StatRecord {
            event: EVENT_TIME_REPLY,
            num_crlf: 2,
            stream_buffer_fullness: 1024,
            stream_buffer_size: 65536,
            bytes_received: 90_210,
            jiffies: 123_456,
            output_buffer_fullness: 512,
            output_buffer_size: 8192,
            elapsed_seconds: 42,
            voltage: 3300,
            elapsed_milliseconds: 42_500,
            server_timestamp: 1_700_000_000,
            error_code: 0,
        }
    }

    #[test]
    fn encode_then_decode_round_trips_exactly() {
        let record = sample();
        let bytes = record.encode();
        assert_eq!(bytes.len(), STAT_RECORD_LEN);
        let decoded = StatRecord::decode(&bytes).expect("valid record decodes");
        assert_eq!(decoded, record);
    }

    #[test]
    fn decode_rejects_wrong_opcode() {
        let mut bytes = sample().encode();
        bytes[0..4].copy_from_slice(b"STRM");
        assert!(StatRecord::decode(&bytes).is_err());
    }

    #[test]
    fn decode_rejects_short_payload() {
        let bytes = sample().encode();
        let err = StatRecord::decode(&bytes[..STAT_RECORD_LEN - 1]).unwrap_err();
        assert!(err.to_string().contains("too short"));
    }

    #[test]
    fn is_time_reply_recognises_stmt_event() {
        assert!(sample().is_time_reply());
    }
}
