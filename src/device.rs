//! Device entry point and builder.

use std::sync::Arc;

use crate::format::{LinearResamplerFactory, ResamplerFactory};
use crate::mixer::{MemoryMixer, Mixer};
use crate::routing::RoutingController;
use crate::sink::PcmDevice;
use crate::stream::OutputBackends;
use crate::{
    event_callback, CpalPcmDevice, EventCallback, HardwareConfig, InputStream, OutputStream,
    ResamplerQuality, StreamError, StreamEvent, StreamRequest,
};

/// Builder for an [`AudioHardware`] device.
///
/// Every collaborator has a default: the system output through CPAL, the
/// linear resampler and an in-memory codec mixer.
///
/// # Example
///
/// ```
/// use pcm_bridge::{AudioHardware, HardwareConfig, MockPcmDevice};
///
/// let hardware = AudioHardware::builder()
///     .config(HardwareConfig {
///         period_size: 512,
///         ..Default::default()
///     })
///     .pcm_device(MockPcmDevice::new())
///     .on_event(|e| eprintln!("{e:?}"))
///     .build()
///     .unwrap();
///
/// assert_eq!(hardware.hardware_config().period_size, 512);
/// ```
#[must_use]
pub struct AudioHardwareBuilder {
    config: HardwareConfig,
    pcm_device: Option<Arc<dyn PcmDevice>>,
    resampler_factory: Arc<dyn ResamplerFactory>,
    resampler_quality: ResamplerQuality,
    mixer: Option<Arc<dyn Mixer>>,
    event_callback: Option<EventCallback>,
}

impl Default for AudioHardwareBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioHardwareBuilder {
    /// Creates a builder with default settings.
    pub fn new() -> Self {
        Self {
            config: HardwareConfig::default(),
            pcm_device: None,
            resampler_factory: Arc::new(LinearResamplerFactory),
            resampler_quality: ResamplerQuality::default(),
            mixer: None,
            event_callback: None,
        }
    }

    /// Sets the fixed hardware configuration.
    ///
    /// Default: 48 kHz stereo, two periods of 1024 frames.
    pub fn config(mut self, config: HardwareConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the hardware sink.
    ///
    /// Default: [`CpalPcmDevice::default_output()`]
    pub fn pcm_device<D: PcmDevice + 'static>(mut self, device: D) -> Self {
        self.pcm_device = Some(Arc::new(device));
        self
    }

    /// Sets the sample-rate converter factory.
    ///
    /// Default: [`LinearResamplerFactory`]
    pub fn resampler_factory<F: ResamplerFactory + 'static>(mut self, factory: F) -> Self {
        self.resampler_factory = Arc::new(factory);
        self
    }

    /// Sets the quality requested from the resampler factory.
    pub fn resampler_quality(mut self, quality: ResamplerQuality) -> Self {
        self.resampler_quality = quality;
        self
    }

    /// Sets the mixer used for routing.
    ///
    /// Default: [`MemoryMixer::codec()`]
    pub fn mixer<M: Mixer + 'static>(mut self, mixer: M) -> Self {
        self.mixer = Some(Arc::new(mixer));
        self
    }

    /// Set a callback to receive runtime events.
    ///
    /// Events include standby transitions, hidden underruns and route changes.
    pub fn on_event<F>(mut self, callback: F) -> Self
    where
        F: Fn(StreamEvent) + Send + Sync + 'static,
    {
        self.event_callback = Some(event_callback(callback));
        self
    }

    fn validate(&self) -> Result<(), StreamError> {
        let config = &self.config;
        if config.sample_rate == 0 {
            return Err(StreamError::InvalidHardwareConfig {
                reason: "sample rate must be non-zero".to_string(),
            });
        }
        if !matches!(config.channels, 1 | 2) {
            return Err(StreamError::InvalidHardwareConfig {
                reason: format!("{} channels, expected mono or stereo", config.channels),
            });
        }
        if config.period_size == 0 || config.period_count == 0 {
            return Err(StreamError::InvalidHardwareConfig {
                reason: "period size and count must be non-zero".to_string(),
            });
        }
        Ok(())
    }

    /// Builds the device.
    ///
    /// # Errors
    ///
    /// Returns [`StreamError::InvalidHardwareConfig`] if the rate, channel
    /// count or period geometry is unusable.
    pub fn build(self) -> Result<AudioHardware, StreamError> {
        self.validate()?;

        let pcm_device = self
            .pcm_device
            .unwrap_or_else(|| Arc::new(CpalPcmDevice::default_output()));
        let mixer = self
            .mixer
            .unwrap_or_else(|| Arc::new(MemoryMixer::codec()));
        let routing =
            RoutingController::new(mixer).with_event_callback(self.event_callback.clone());

        tracing::info!(
            device = pcm_device.name(),
            rate = self.config.sample_rate,
            channels = self.config.channels,
            period_size = self.config.period_size,
            period_count = self.config.period_count,
            "audio hardware initialized"
        );

        Ok(AudioHardware {
            config: self.config,
            pcm_device,
            resampler_factory: self.resampler_factory,
            resampler_quality: self.resampler_quality,
            routing,
            event_callback: self.event_callback,
        })
    }
}

/// An initialized audio device.
///
/// Holds the fixed hardware configuration and the shared collaborators, and
/// opens streams against them. Only one output stream should hold the
/// hardware at a time.
pub struct AudioHardware {
    config: HardwareConfig,
    pcm_device: Arc<dyn PcmDevice>,
    resampler_factory: Arc<dyn ResamplerFactory>,
    resampler_quality: ResamplerQuality,
    routing: RoutingController,
    event_callback: Option<EventCallback>,
}

impl AudioHardware {
    /// Creates a new builder.
    pub fn builder() -> AudioHardwareBuilder {
        AudioHardwareBuilder::new()
    }

    /// Fixed hardware configuration.
    pub fn hardware_config(&self) -> &HardwareConfig {
        &self.config
    }

    /// Routing controller shared by every stream of this device.
    pub fn routing(&self) -> &RoutingController {
        &self.routing
    }

    /// Opens an output stream in standby. No hardware is touched until the
    /// first write.
    ///
    /// # Errors
    ///
    /// - [`StreamError::UnsupportedFormat`] if the format is not PCM16
    /// - [`StreamError::UnsupportedSampleRate`] if the rate is zero
    /// - [`StreamError::UnsupportedChannelLayout`] if the layout is not mono
    ///   or stereo
    /// - [`StreamError::AllocationFailure`] if a scratch buffer cannot be
    ///   allocated
    pub fn open_output_stream(&self, request: &StreamRequest) -> Result<OutputStream, StreamError> {
        OutputStream::open(
            request,
            &self.config,
            OutputBackends {
                device: Arc::clone(&self.pcm_device),
                resamplers: Arc::clone(&self.resampler_factory),
                quality: self.resampler_quality,
                routing: self.routing.clone(),
                event_callback: self.event_callback.clone(),
            },
        )
        .map_err(|e| {
            tracing::error!(error = %e, ?request, "failed to open output stream");
            e
        })
    }

    /// Closes an output stream, releasing the hardware if it holds it.
    pub fn close_output_stream(&self, stream: OutputStream) {
        stream.close();
    }

    /// Opens the silent capture stream.
    pub fn open_input_stream(&self) -> InputStream {
        InputStream::new()
    }

    /// Capture buffer size in bytes, whatever the requested format.
    pub fn input_buffer_size(&self, _request: &StreamRequest) -> usize {
        InputStream::BUFFER_SIZE
    }
}
