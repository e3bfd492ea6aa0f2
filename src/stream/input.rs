//! Capture stream with no hardware behind it.

use super::{pacing_delay, AudioStream};
use crate::config::BYTES_PER_SAMPLE;
use crate::{ChannelMask, SampleFormat};

/// A mono 8 kHz capture stream that produces silence in real time.
///
/// The board has no capture path; this stream exists so hosts that always
/// open an input find one with a stable format.
#[derive(Debug, Default)]
pub struct InputStream {
    frames_read: u64,
}

impl InputStream {
    /// Fixed capture rate in Hz.
    pub const SAMPLE_RATE: u32 = 8000;
    /// Fixed capture buffer size in bytes (20 ms).
    pub const BUFFER_SIZE: usize = 320;

    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Fills `buffer` with silence after sleeping for as long as capturing it
    /// would take. Returns `buffer.len()`.
    pub async fn read(&mut self, buffer: &mut [u8]) -> usize {
        buffer.fill(0);
        tokio::time::sleep(pacing_delay(
            buffer.len(),
            BYTES_PER_SAMPLE,
            Self::SAMPLE_RATE,
        ))
        .await;
        self.frames_read += (buffer.len() / BYTES_PER_SAMPLE) as u64;
        buffer.len()
    }

    /// Frames delivered so far.
    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    /// Frames dropped since the last call. Always 0.
    pub fn frames_lost(&mut self) -> u32 {
        0
    }
}

impl AudioStream for InputStream {
    fn sample_rate(&self) -> u32 {
        Self::SAMPLE_RATE
    }

    fn channel_mask(&self) -> ChannelMask {
        ChannelMask::MONO
    }

    fn format(&self) -> SampleFormat {
        SampleFormat::Pcm16
    }

    fn buffer_size(&self) -> usize {
        Self::BUFFER_SIZE
    }

    fn standby(&mut self) {}

    fn set_parameters(&mut self, params: &str) {
        tracing::debug!(params, "input stream ignores parameters");
    }

    fn parameters(&self, _keys: &str) -> String {
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn test_fixed_format() {
        let stream = InputStream::new();
        assert_eq!(stream.sample_rate(), 8000);
        assert_eq!(stream.channel_mask(), ChannelMask::MONO);
        assert_eq!(stream.format(), SampleFormat::Pcm16);
        assert_eq!(stream.buffer_size(), 320);
        assert_eq!(stream.parameters("routing"), "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_paces_silence() {
        let mut stream = InputStream::new();
        let mut buffer = [0xAAu8; InputStream::BUFFER_SIZE];

        let start = tokio::time::Instant::now();
        assert_eq!(stream.read(&mut buffer).await, 320);
        assert!(start.elapsed() >= Duration::from_millis(20));
        assert!(buffer.iter().all(|&b| b == 0));
        assert_eq!(stream.frames_read(), 160);
        assert_eq!(stream.frames_lost(), 0);
    }
}
