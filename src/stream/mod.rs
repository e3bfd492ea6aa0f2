//! Client-facing streams.
//!
//! Both stream kinds answer the same format queries and control calls through
//! [`AudioStream`]; only the data direction differs. [`OutputStream`] carries
//! the full conversion pipeline, [`InputStream`] is a silent fixed-format
//! source.

mod input;
mod output;

use std::time::Duration;

pub use input::InputStream;
pub use output::OutputStream;
pub(crate) use output::OutputBackends;

use crate::{ChannelMask, SampleFormat};

/// Capabilities shared by every stream.
pub trait AudioStream: Send {
    /// Client sample rate in Hz.
    fn sample_rate(&self) -> u32;

    /// Client channel layout.
    fn channel_mask(&self) -> ChannelMask;

    /// Client sample format.
    fn format(&self) -> SampleFormat;

    /// Preferred client buffer size in bytes.
    fn buffer_size(&self) -> usize;

    /// Releases hardware resources until the next transfer. Idempotent.
    fn standby(&mut self);

    /// Applies a `key=value;...` parameter string. Unknown keys are ignored.
    fn set_parameters(&mut self, params: &str);

    /// Returns the current values of the requested `;`-separated keys.
    /// Keys the stream does not know are omitted.
    fn parameters(&self, keys: &str) -> String;
}

/// Counters for one stream, readable at any time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Client bytes reported as consumed.
    pub bytes_consumed: u64,
    /// Frames handed to the hardware sink.
    pub frames_to_hardware: u64,
    /// Writes that were dropped and paced instead.
    pub underruns: u64,
    /// Standby to active transitions.
    pub activations: u64,
}

/// Real-time duration of `bytes` of audio at `frame_size` bytes per frame and
/// `sample_rate` frames per second, truncated to whole microseconds.
///
/// ```
/// use pcm_bridge::stream::pacing_delay;
/// use std::time::Duration;
///
/// // 4800 stereo frames at 48 kHz
/// assert_eq!(pacing_delay(19200, 4, 48000), Duration::from_millis(100));
/// ```
pub fn pacing_delay(bytes: usize, frame_size: usize, sample_rate: u32) -> Duration {
    let per_second = frame_size as u64 * u64::from(sample_rate);
    if per_second == 0 {
        return Duration::ZERO;
    }
    Duration::from_micros(bytes as u64 * 1_000_000 / per_second)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pacing_delay() {
        assert_eq!(pacing_delay(4096, 4, 48000), Duration::from_micros(21_333));
        assert_eq!(pacing_delay(320, 2, 8000), Duration::from_millis(20));
        assert_eq!(pacing_delay(0, 4, 48000), Duration::ZERO);
    }

    #[test]
    fn test_pacing_delay_degenerate_format() {
        assert_eq!(pacing_delay(4096, 0, 48000), Duration::ZERO);
        assert_eq!(pacing_delay(4096, 4, 0), Duration::ZERO);
    }

    #[test]
    fn test_stream_stats_default() {
        let stats = StreamStats::default();
        assert_eq!(stats.bytes_consumed, 0);
        assert_eq!(stats.underruns, 0);
        assert_eq!(stats.activations, 0);
    }
}
