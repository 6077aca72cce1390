// SPDX-FileCopyrightText: © 2025 SlimStreamer Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Server→client SlimProto command framing. Every command is a 4-byte ASCII
//! opcode plus payload, prefixed by a 16-bit big-endian length counting the
//! opcode and payload together (the length field itself is not counted).

/// `STRM` subcommands the CORE issues. Other subcommands a real player
/// understands (pause, unpause, skip-ahead, ...) are out of scope: the
/// design names them "opaque" and the CORE never needs to send them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrmCommand {
    Stop,
    Start { sampling_rate: u32 },
    /// Used as a ping: the client is expected to reply with a `STAT(STMt)`.
    Time { timestamp_ms: u64 },
}

/// Which `SETD` device-identification field to request or declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetdField {
    RequestName,
    Squeezebox3,
}

fn frame(opcode: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    #[allow(clippy::cast_possible_truncation)]
    let length = (opcode.len() + payload.len()) as u16;
    let mut out = Vec::with_capacity(2 + opcode.len() + payload.len());
    out.extend_from_slice(&length.to_be_bytes());
    out.extend_from_slice(opcode);
    out.extend_from_slice(payload);
    out
}

#[must_use]
pub fn encode_strm(command: StrmCommand) -> Vec<u8> {
    let mut payload = Vec::new();
    match command {
        StrmCommand::Stop => payload.push(b'q'),
        StrmCommand::Start { sampling_rate } => {
            payload.push(b's');
            payload.extend_from_slice(&sampling_rate.to_be_bytes());
        },
        StrmCommand::Time { timestamp_ms } => {
            payload.push(b't');
            payload.extend_from_slice(&timestamp_ms.to_be_bytes());
        },
    }
    frame(b"STRM", &payload)
}

#[must_use]
pub fn encode_setd(field: SetdField) -> Vec<u8> {
    let id: u8 = match field {
        SetdField::RequestName => 0,
        SetdField::Squeezebox3 => 2,
    };
    frame(b"SETD", &[id])
}

#[must_use]
pub fn encode_aude(spdif_enable: bool, dac_enable: bool) -> Vec<u8> {
    frame(b"AUDE", &[u8::from(spdif_enable), u8::from(dac_enable)])
}

#[must_use]
pub fn encode_audg(gain_left: u32, gain_right: u32) -> Vec<u8> {
    let mut payload = Vec::with_capacity(8);
    payload.extend_from_slice(&gain_left.to_be_bytes());
    payload.extend_from_slice(&gain_right.to_be_bytes());
    frame(b"AUDG", &payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strm_stop_frames_opcode_and_length() {
        let bytes = encode_strm(StrmCommand::Stop);
        let length = u16::from_be_bytes([bytes[0], bytes[1]]);
        assert_eq!(length as usize, bytes.len() - 2);
        assert_eq!(&bytes[2..6], b"STRM");
        assert_eq!(bytes[6], b'q');
    }

    #[test]
    fn strm_start_carries_big_endian_rate() {
        let bytes = encode_strm(StrmCommand::Start { sampling_rate: 44_100 });
        assert_eq!(bytes[6], b's');
        let rate = u32::from_be_bytes([bytes[7], bytes[8], bytes[9], bytes[10]]);
        assert_eq!(rate, 44_100);
    }

    #[test]
    fn setd_encodes_requested_field() {
        let bytes = encode_setd(SetdField::Squeezebox3);
        assert_eq!(&bytes[2..6], b"SETD");
        assert_eq!(bytes[6], 2);
    }
}
