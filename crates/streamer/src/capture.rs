// SPDX-FileCopyrightText: © 2025 SlimStreamer Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! `CaptureSource`: a rate-specific blocking producer of interleaved PCM
//! frames from a named capture device (§2, §6). The device driver itself is
//! an external collaborator; this trait is the seam the CORE reads through.

/// A blocking source of interleaved PCM frames. Implementations read whole
/// chunks; partial reads retry internally rather than returning short.
pub trait CaptureSource: Send {
    /// The device-name string identifying this source (e.g. `hw:1,1,1`).
    fn device_name(&self) -> &str;

    /// Reads exactly `buf.len()` bytes of interleaved PCM into `buf`,
    /// blocking the calling thread until they are available.
    ///
    /// # Errors
    ///
    /// Returns `Err` on device EOF or a fatal device failure; the caller
    /// (`Pipeline::pump`) treats this as terminal for the owning pipeline.
    fn read_exact(&mut self, buf: &mut [u8]) -> std::io::Result<()>;
}

/// A deterministic silence generator, useful for tests and for local
/// development without a real capture device attached.
pub struct SilenceCaptureSource {
    device_name: String,
}

impl SilenceCaptureSource {
    #[must_use]
    pub const fn new(device_name: String) -> Self {
        Self { device_name }
    }
}

impl CaptureSource for SilenceCaptureSource {
    fn device_name(&self) -> &str {
        &self.device_name
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> std::io::Result<()> {
        buf.fill(0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silence_source_fills_buffer_with_zeroes() {
        let mut source = SilenceCaptureSource::new("hw:test".to_string());
        let mut buf = [0xFFu8; 16];
        source.read_exact(&mut buf).expect("silence never fails");
        assert_eq!(buf, [0u8; 16]);
    }
}
