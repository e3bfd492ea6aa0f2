//! Open-time format negotiation.
//!
//! Decides once, when a stream is opened, which conversion stages a client
//! format needs to reach the hardware format and how large each stage's
//! scratch buffer must be. The result is immutable for the stream lifetime.

use crate::config::BYTES_PER_SAMPLE;
use crate::format::RemixDirection;
use crate::{ChannelMask, HardwareConfig, SampleFormat, StreamError, StreamRequest};

/// Negotiated configuration of one output stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputStreamConfig {
    /// Client sample rate in Hz.
    pub client_sample_rate: u32,
    /// Client channel layout.
    pub client_channel_mask: ChannelMask,
    /// Client sample format (always PCM16 once negotiated).
    pub format: SampleFormat,
    /// Channel count derived from `client_channel_mask`.
    pub client_channels: u16,
    /// Fixed hardware capability.
    pub hardware: HardwareConfig,
    /// Buffer size reported to the client: one hardware period of client
    /// frames, regardless of rate conversion.
    pub client_buffer_size: usize,
    /// Whether the client rate differs from the hardware rate.
    pub needs_resample: bool,
    /// Channel conversion to apply, if any.
    pub remix: Option<RemixDirection>,
    /// Resampler output buffer size in bytes, 0 if unused.
    pub resampler_scratch_size: usize,
    /// Remix output buffer size in bytes, 0 if unused.
    pub remix_scratch_size: usize,
}

impl OutputStreamConfig {
    /// Negotiates a client request against the hardware capability.
    ///
    /// # Errors
    ///
    /// - [`StreamError::UnsupportedFormat`] if the format is not PCM16
    /// - [`StreamError::UnsupportedSampleRate`] if the rate is zero
    /// - [`StreamError::UnsupportedChannelLayout`] if the mask is neither
    ///   mono nor stereo
    ///
    /// # Example
    ///
    /// ```
    /// use pcm_bridge::{ChannelMask, HardwareConfig, OutputStreamConfig, StreamRequest};
    ///
    /// let request = StreamRequest::pcm16(44100, ChannelMask::MONO);
    /// let config = OutputStreamConfig::negotiate(&request, &HardwareConfig::default()).unwrap();
    ///
    /// assert!(config.needs_resample);
    /// assert_eq!(config.client_buffer_size, 2048);
    /// assert_eq!(config.resampler_scratch_size, 2048);
    /// assert_eq!(config.remix_scratch_size, 4096);
    /// ```
    pub fn negotiate(
        request: &StreamRequest,
        hardware: &HardwareConfig,
    ) -> Result<Self, StreamError> {
        if request.format != SampleFormat::Pcm16 {
            return Err(StreamError::UnsupportedFormat {
                format: request.format,
            });
        }
        if request.sample_rate == 0 {
            return Err(StreamError::UnsupportedSampleRate {
                rate: request.sample_rate,
            });
        }
        let client_channels =
            request
                .channel_mask
                .channel_count()
                .ok_or(StreamError::UnsupportedChannelLayout {
                    mask: request.channel_mask.bits(),
                })?;

        let client_buffer_size =
            usize::from(client_channels) * BYTES_PER_SAMPLE * hardware.period_size;
        let needs_resample = request.sample_rate != hardware.sample_rate;
        let remix = RemixDirection::between(client_channels, hardware.channels);

        let resampler_scratch_size = if needs_resample {
            client_buffer_size
        } else {
            0
        };
        let remix_scratch_size = remix.map_or(0, |direction| {
            direction.output_len(client_buffer_size / BYTES_PER_SAMPLE) * BYTES_PER_SAMPLE
        });

        Ok(Self {
            client_sample_rate: request.sample_rate,
            client_channel_mask: request.channel_mask,
            format: request.format,
            client_channels,
            hardware: *hardware,
            client_buffer_size,
            needs_resample,
            remix,
            resampler_scratch_size,
            remix_scratch_size,
        })
    }

    /// Bytes per client frame.
    #[must_use]
    pub fn client_frame_size(&self) -> usize {
        usize::from(self.client_channels) * BYTES_PER_SAMPLE
    }

    /// Whether any conversion stage runs.
    #[must_use]
    pub fn is_passthrough(&self) -> bool {
        !self.needs_resample && self.remix.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn negotiate(rate: u32, mask: ChannelMask) -> OutputStreamConfig {
        OutputStreamConfig::negotiate(&StreamRequest::pcm16(rate, mask), &HardwareConfig::default())
            .unwrap()
    }

    #[test]
    fn test_native_format_is_passthrough() {
        let config = negotiate(48000, ChannelMask::STEREO);
        assert!(config.is_passthrough());
        assert_eq!(config.client_buffer_size, 4096);
        assert_eq!(config.resampler_scratch_size, 0);
        assert_eq!(config.remix_scratch_size, 0);
    }

    #[test]
    fn test_mono_native_rate_needs_upmix_only() {
        let config = negotiate(48000, ChannelMask::MONO);
        assert!(!config.needs_resample);
        assert_eq!(config.remix, Some(RemixDirection::Up));
        assert_eq!(config.client_buffer_size, 2048);
        assert_eq!(config.remix_scratch_size, 4096);
    }

    #[test]
    fn test_stereo_to_mono_hardware_halves_remix_buffer() {
        let hardware = HardwareConfig {
            channels: 1,
            ..Default::default()
        };
        let config = OutputStreamConfig::negotiate(
            &StreamRequest::pcm16(44100, ChannelMask::STEREO),
            &hardware,
        )
        .unwrap();
        assert_eq!(config.remix, Some(RemixDirection::Down));
        assert_eq!(config.remix_scratch_size, 2048);
        assert_eq!(config.resampler_scratch_size, 4096);
    }

    #[test]
    fn test_buffer_size_follows_period_not_rate() {
        let slow = negotiate(8000, ChannelMask::STEREO);
        let fast = negotiate(96000, ChannelMask::STEREO);
        assert_eq!(slow.client_buffer_size, fast.client_buffer_size);
    }

    #[test]
    fn test_rejects_non_pcm16() {
        let request = StreamRequest {
            format: SampleFormat::Float32,
            ..StreamRequest::pcm16(48000, ChannelMask::STEREO)
        };
        let result = OutputStreamConfig::negotiate(&request, &HardwareConfig::default());
        assert!(matches!(
            result,
            Err(StreamError::UnsupportedFormat {
                format: SampleFormat::Float32
            })
        ));
    }

    #[test]
    fn test_rejects_zero_rate() {
        let request = StreamRequest::pcm16(0, ChannelMask::STEREO);
        let result = OutputStreamConfig::negotiate(&request, &HardwareConfig::default());
        assert!(matches!(
            result,
            Err(StreamError::UnsupportedSampleRate { rate: 0 })
        ));
    }

    #[test]
    fn test_rejects_surround_mask() {
        let request = StreamRequest::pcm16(48000, ChannelMask(0x3f));
        let result = OutputStreamConfig::negotiate(&request, &HardwareConfig::default());
        assert!(matches!(
            result,
            Err(StreamError::UnsupportedChannelLayout { mask: 0x3f })
        ));
    }
}
