//! Error types for pcm-bridge.
//!
//! Errors are split into two categories:
//! - **Fatal errors** ([`StreamError`]): returned from stream open and from the
//!   standby exit path
//! - **Soft failures** ([`SinkError`], [`MixerError`]): hardware write and mixer
//!   failures, logged and surfaced via [`EventCallback`](crate::EventCallback)
//!   but never returned from [`OutputStream::write`](crate::OutputStream::write)

/// Client-visible errors of the output stream.
///
/// `UnsupportedFormat`, `UnsupportedSampleRate`, `UnsupportedChannelLayout`
/// and `AllocationFailure` are fatal to the open call that produced them. `DeviceUnavailable` and
/// `ResamplerInitFailed` come from leaving standby and are recoverable: the
/// next write tries again.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// The requested sample format is not 16-bit linear PCM.
    #[error("unsupported sample format: {format:?}")]
    UnsupportedFormat {
        /// The format that was requested.
        format: crate::SampleFormat,
    },

    /// The requested sample rate cannot be played or paced.
    #[error("unsupported sample rate: {rate}Hz")]
    UnsupportedSampleRate {
        /// The rate that was requested.
        rate: u32,
    },

    /// The requested channel mask is neither mono nor stereo.
    #[error("unsupported channel layout: mask {mask:#x}")]
    UnsupportedChannelLayout {
        /// Raw channel mask bits that were requested.
        mask: u32,
    },

    /// The hardware sink could not be opened or is not ready.
    #[error("device unavailable: {name} - {reason}")]
    DeviceUnavailable {
        /// Name of the hardware sink.
        name: String,
        /// Reason the device is unavailable.
        reason: String,
    },

    /// The sample-rate converter could not be created.
    #[error("resampler init failed: {reason}")]
    ResamplerInitFailed {
        /// Why the resampler could not be created.
        reason: String,
    },

    /// The hardware configuration cannot drive a stream.
    #[error("invalid hardware config: {reason}")]
    InvalidHardwareConfig {
        /// What is wrong with the configuration.
        reason: String,
    },

    /// A scratch buffer could not be allocated.
    #[error("failed to allocate {bytes} byte {buffer} buffer")]
    AllocationFailure {
        /// Which scratch buffer failed.
        buffer: &'static str,
        /// Requested size in bytes.
        bytes: usize,
    },
}

/// Errors raised by a [`PcmDevice`](crate::PcmDevice) or
/// [`PcmHandle`](crate::PcmHandle) implementation.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// The device could not be opened.
    #[error("open failed: {reason}")]
    OpenFailed {
        /// Description of what went wrong.
        reason: String,
    },

    /// The device opened but is not ready to accept audio.
    #[error("device not ready")]
    NotReady,

    /// A write operation failed.
    #[error("write failed: {reason}")]
    WriteFailed {
        /// Description of what went wrong.
        reason: String,
    },

    /// The device stopped consuming audio (callback thread gone).
    #[error("device closed")]
    Closed,

    /// An error from the underlying audio library.
    #[error("audio backend error: {0}")]
    Backend(String),
}

impl SinkError {
    /// Creates an open failed error with the given reason.
    pub fn open_failed(reason: impl Into<String>) -> Self {
        Self::OpenFailed {
            reason: reason.into(),
        }
    }

    /// Creates a write failed error with the given reason.
    pub fn write_failed(reason: impl Into<String>) -> Self {
        Self::WriteFailed {
            reason: reason.into(),
        }
    }
}

/// Errors raised when creating a resampler.
#[derive(Debug, thiserror::Error)]
pub enum ResamplerError {
    /// A source or destination rate of zero.
    #[error("invalid conversion {src_rate}Hz -> {dst_rate}Hz")]
    InvalidRate {
        /// Source rate in Hz.
        src_rate: u32,
        /// Destination rate in Hz.
        dst_rate: u32,
    },

    /// The resampler cannot handle this channel count.
    #[error("unsupported channel count: {0}")]
    UnsupportedChannels(u16),
}

/// Errors raised by a [`Mixer`](crate::mixer::Mixer) implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MixerError {
    /// The mixer device could not be opened.
    #[error("mixer unavailable: {reason}")]
    Unavailable {
        /// Why the mixer could not be opened.
        reason: String,
    },

    /// No control with this name exists.
    #[error("control not found: {name}")]
    ControlNotFound {
        /// Name of the missing control.
        name: String,
    },

    /// The value is not valid for this control.
    #[error("invalid value for {name}: {value}")]
    InvalidValue {
        /// Name of the control.
        name: String,
        /// The rejected value.
        value: String,
    },

    /// The driver rejected the set operation.
    #[error("failed to set {name}: {reason}")]
    SetFailed {
        /// Name of the control.
        name: String,
        /// Driver-reported reason.
        reason: String,
    },
}

impl From<ResamplerError> for StreamError {
    fn from(err: ResamplerError) -> Self {
        Self::ResamplerInitFailed {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SampleFormat;

    #[test]
    fn test_stream_error_display() {
        let err = StreamError::UnsupportedChannelLayout { mask: 0x3f };
        assert_eq!(err.to_string(), "unsupported channel layout: mask 0x3f");

        let err = StreamError::UnsupportedFormat {
            format: SampleFormat::Float32,
        };
        assert!(err.to_string().contains("Float32"));

        let err = StreamError::UnsupportedSampleRate { rate: 0 };
        assert_eq!(err.to_string(), "unsupported sample rate: 0Hz");
    }

    #[test]
    fn test_sink_error_write_failed() {
        let err = SinkError::write_failed("xrun");
        assert_eq!(err.to_string(), "write failed: xrun");
    }

    #[test]
    fn test_resampler_error_maps_to_init_failed() {
        let err: StreamError = ResamplerError::InvalidRate {
            src_rate: 0,
            dst_rate: 48000,
        }
        .into();
        assert!(matches!(err, StreamError::ResamplerInitFailed { .. }));
        assert!(err.to_string().contains("0Hz -> 48000Hz"));
    }

    #[test]
    fn test_allocation_failure_display() {
        let err = StreamError::AllocationFailure {
            buffer: "remix",
            bytes: 8192,
        };
        assert_eq!(err.to_string(), "failed to allocate 8192 byte remix buffer");
    }
}
