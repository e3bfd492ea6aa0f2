//! Configuration types for the hardware device and client streams.

use std::time::Duration;

/// Bytes per sample for 16-bit PCM.
pub const BYTES_PER_SAMPLE: usize = 2;

/// Sample formats a client may request.
///
/// Only [`SampleFormat::Pcm16`] is accepted by an output stream; the others
/// exist so a request can name them and be rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleFormat {
    /// Signed 16-bit little-endian linear PCM.
    #[default]
    Pcm16,
    /// Unsigned 8-bit linear PCM.
    Pcm8,
    /// Signed 32-bit linear PCM.
    Pcm32,
    /// 32-bit float PCM.
    Float32,
}

/// Output channel mask as a bit set of speaker positions.
///
/// Only [`ChannelMask::MONO`] and [`ChannelMask::STEREO`] map to a channel
/// count; any other mask is rejected at open time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelMask(pub u32);

impl ChannelMask {
    /// Front-left speaker only.
    pub const MONO: Self = Self(0x1);
    /// Front-left and front-right speakers.
    pub const STEREO: Self = Self(0x3);

    /// Returns the channel count for supported layouts.
    #[must_use]
    pub fn channel_count(self) -> Option<u16> {
        match self {
            Self::MONO => Some(1),
            Self::STEREO => Some(2),
            _ => None,
        }
    }

    /// Returns the raw mask bits.
    #[must_use]
    pub fn bits(self) -> u32 {
        self.0
    }
}

impl Default for ChannelMask {
    fn default() -> Self {
        Self::STEREO
    }
}

/// Format requested by a client when opening an output stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamRequest {
    /// Client sample rate in Hz.
    pub sample_rate: u32,
    /// Client channel layout.
    pub channel_mask: ChannelMask,
    /// Client sample format.
    pub format: SampleFormat,
}

impl StreamRequest {
    /// Creates a 16-bit PCM request.
    #[must_use]
    pub fn pcm16(sample_rate: u32, channel_mask: ChannelMask) -> Self {
        Self {
            sample_rate,
            channel_mask,
            format: SampleFormat::Pcm16,
        }
    }
}

/// Fixed capability of the PCM output hardware.
///
/// Constructed once when the device is initialized and shared read-only with
/// every stream. The hardware always runs 16-bit little-endian PCM.
///
/// # Example
///
/// ```
/// use pcm_bridge::HardwareConfig;
/// use std::time::Duration;
///
/// let config = HardwareConfig::default();
/// assert_eq!(config.frame_size(), 4);
/// assert_eq!(config.latency(), Duration::from_millis(42));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HardwareConfig {
    /// Sound card index.
    pub card: u32,
    /// PCM device index on the card.
    pub device: u32,
    /// Native sample rate in Hz.
    ///
    /// Default: 48000
    pub sample_rate: u32,
    /// Native channel count.
    ///
    /// Default: 2
    pub channels: u16,
    /// Frames per hardware period.
    ///
    /// Default: 1024
    pub period_size: usize,
    /// Number of periods in the hardware ring.
    ///
    /// Default: 2
    pub period_count: usize,
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            card: 0,
            device: 0,
            sample_rate: 48000,
            channels: 2,
            period_size: 1024,
            period_count: 2,
        }
    }
}

impl HardwareConfig {
    /// Bytes per hardware frame.
    #[must_use]
    pub fn frame_size(&self) -> usize {
        usize::from(self.channels) * BYTES_PER_SAMPLE
    }

    /// Frames held by the whole hardware ring.
    #[must_use]
    pub fn ring_frames(&self) -> usize {
        self.period_size * self.period_count
    }

    /// Duration of one period at the native rate.
    #[must_use]
    pub fn period_duration(&self) -> Duration {
        frames_to_duration(self.period_size, self.sample_rate)
    }

    /// Output latency in whole milliseconds: the full ring at the native rate.
    #[must_use]
    pub fn latency(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        let ms = self.ring_frames() as u64 * 1000 / u64::from(self.sample_rate);
        Duration::from_millis(ms)
    }
}

/// Conversion quality hint passed to a resampler factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResamplerQuality {
    /// Cheapest conversion; the default.
    #[default]
    Low,
    /// Balanced quality and cost.
    Medium,
    /// Highest quality offered by the backend.
    High,
}

/// Duration of `frames` frames at `sample_rate`.
pub(crate) fn frames_to_duration(frames: usize, sample_rate: u32) -> Duration {
    if sample_rate == 0 {
        return Duration::ZERO;
    }
    Duration::from_micros(frames as u64 * 1_000_000 / u64::from(sample_rate))
}
