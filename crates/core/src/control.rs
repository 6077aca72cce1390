// SPDX-FileCopyrightText: © 2025 SlimStreamer Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Control messages exchanged between sessions and the Streamer, and the
//! backpressure policy used when delivering encoded bytes to a writer.

/// How a destination handles backpressure from a slow consumer.
///
/// The CORE only ever exercises `BestEffort` on the data path (§5: the two
/// sanctioned lossy paths are pool exhaustion and a full writer queue), but
/// the type carries `Reliable` too since the Scheduler's own internal
/// queues (chunk handoff from a capture thread) must never silently drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackpressurePolicy {
    /// Block (or retry) rather than drop.
    Reliable,
    /// Drop and log a warning rather than stall the producer.
    #[default]
    BestEffort,
}

/// A message sent to a session (`HTTPStreamingSession` or `SlimProtoSession`)
/// to drive its lifecycle from the Streamer.
#[derive(Debug, Clone)]
pub enum SessionControlMessage {
    /// Begin accepting chunks / commands.
    Start,
    /// Enter drain-and-close: flush pending bytes, then close the socket.
    Stop,
    /// Renegotiate to a new sampling rate after a rate switch (§4.7).
    RateChanged { new_rate: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backpressure_policy_defaults_to_best_effort() {
        assert_eq!(BackpressurePolicy::default(), BackpressurePolicy::BestEffort);
    }
}
