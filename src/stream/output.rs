//! Output stream: standby state machine and write pipeline.
//!
//! ```text
//! client bytes ─► decode ─► [resample] ─► [remix] ─► PcmHandle::write
//! ```
//!
//! The hardware sink and the resampler exist only while the stream is active.
//! Scratch buffers are allocated once at open and live as long as the stream.

use std::sync::Arc;

use super::{pacing_delay, AudioStream, StreamStats};
use crate::config::BYTES_PER_SAMPLE;
use crate::format::{decode_le, remix, OutputStreamConfig, Resampler, ResamplerFactory};
use crate::parameters::{Parameters, ROUTING_KEY};
use crate::routing::{RouteOutcome, RoutingController};
use crate::sink::{PcmDevice, PcmHandle};
use crate::{
    ChannelMask, EventCallback, HardwareConfig, OutputDevice, ResamplerQuality, SampleFormat,
    SinkError, StreamError, StreamEvent, StreamRequest, UnderrunCause,
};

/// Collaborators an output stream is opened with.
pub(crate) struct OutputBackends {
    pub device: Arc<dyn PcmDevice>,
    pub resamplers: Arc<dyn ResamplerFactory>,
    pub quality: ResamplerQuality,
    pub routing: RoutingController,
    pub event_callback: Option<EventCallback>,
}

enum StandbyState {
    Standby,
    Active {
        pcm: Box<dyn PcmHandle>,
        /// Present iff the stream resamples.
        resampler: Option<Box<dyn Resampler>>,
    },
}

/// A playback stream that adapts one client format to the hardware format.
///
/// Created by [`AudioHardware::open_output_stream`]. The stream starts in
/// standby and acquires the hardware on the first [`write`](Self::write).
/// Dropping the stream releases the hardware.
///
/// [`AudioHardware::open_output_stream`]: crate::AudioHardware::open_output_stream
pub struct OutputStream {
    config: OutputStreamConfig,
    state: StandbyState,
    device: Arc<dyn PcmDevice>,
    resamplers: Arc<dyn ResamplerFactory>,
    quality: ResamplerQuality,
    routing: RoutingController,
    event_callback: Option<EventCallback>,
    /// Decoded client samples of the current write.
    staging: Vec<i16>,
    resampler_scratch: Vec<i16>,
    remix_scratch: Vec<i16>,
    routed: Option<OutputDevice>,
    stats: StreamStats,
}

/// A sink write that failed after `frames` hardware frames were delivered.
struct PartialWrite {
    error: SinkError,
    frames: usize,
}

impl OutputStream {
    /// Negotiates `request` and allocates the scratch buffers. Touches no
    /// hardware.
    pub(crate) fn open(
        request: &StreamRequest,
        hardware: &HardwareConfig,
        backends: OutputBackends,
    ) -> Result<Self, StreamError> {
        let config = OutputStreamConfig::negotiate(request, hardware)?;
        let mut staging = alloc_scratch("staging", config.client_buffer_size)?;
        staging.clear();
        let resampler_scratch = alloc_scratch("resampler", config.resampler_scratch_size)?;
        let remix_scratch = alloc_scratch("remix", config.remix_scratch_size)?;

        tracing::debug!(
            rate = config.client_sample_rate,
            channels = config.client_channels,
            resample = config.needs_resample,
            remix = ?config.remix,
            buffer_size = config.client_buffer_size,
            "output stream opened"
        );

        Ok(Self {
            config,
            state: StandbyState::Standby,
            device: backends.device,
            resamplers: backends.resamplers,
            quality: backends.quality,
            routing: backends.routing,
            event_callback: backends.event_callback,
            staging,
            resampler_scratch,
            remix_scratch,
            routed: None,
            stats: StreamStats::default(),
        })
    }

    /// Negotiated configuration.
    pub fn config(&self) -> &OutputStreamConfig {
        &self.config
    }

    /// Whether the stream currently holds no hardware resources.
    pub fn is_standby(&self) -> bool {
        matches!(self.state, StandbyState::Standby)
    }

    /// Output latency of the hardware ring.
    pub fn latency(&self) -> std::time::Duration {
        self.config.hardware.latency()
    }

    /// Current counters.
    pub fn stats(&self) -> StreamStats {
        self.stats
    }

    fn emit_event(&self, event: StreamEvent) {
        if let Some(ref callback) = self.event_callback {
            callback(event);
        }
    }

    /// Leaves standby: opens the hardware sink, then the resampler if the
    /// stream needs one. On failure nothing is held.
    async fn enter_active(&mut self) -> Result<(), StreamError> {
        if !self.is_standby() {
            return Ok(());
        }

        let hardware = self.config.hardware;
        let unavailable = |e: SinkError| StreamError::DeviceUnavailable {
            name: self.device.name().to_string(),
            reason: e.to_string(),
        };

        let pcm = self.device.open(&hardware).await.map_err(unavailable)?;
        if !pcm.is_ready() {
            pcm.close();
            return Err(unavailable(SinkError::NotReady));
        }

        let resampler = if self.config.needs_resample {
            match self.resamplers.create(
                self.config.client_sample_rate,
                hardware.sample_rate,
                self.config.client_channels,
                self.quality,
            ) {
                Ok(resampler) if resampler.channels() == self.config.client_channels => {
                    Some(resampler)
                }
                Ok(resampler) => {
                    pcm.close();
                    return Err(StreamError::ResamplerInitFailed {
                        reason: format!(
                            "resampler runs {} channels, stream has {}",
                            resampler.channels(),
                            self.config.client_channels
                        ),
                    });
                }
                Err(e) => {
                    pcm.close();
                    return Err(e.into());
                }
            }
        } else {
            None
        };

        let resampling = resampler.is_some();
        self.state = StandbyState::Active { pcm, resampler };
        self.stats.activations += 1;
        tracing::info!(device = self.device.name(), resampling, "leaving standby");
        self.emit_event(StreamEvent::StandbyExited { resampling });
        Ok(())
    }

    /// Enters standby, closing the sink and dropping the resampler.
    fn enter_standby(&mut self) {
        let StandbyState::Active { pcm, resampler } =
            std::mem::replace(&mut self.state, StandbyState::Standby)
        else {
            return;
        };
        drop(resampler);
        pcm.close();
        tracing::info!(device = self.device.name(), "entering standby");
        self.emit_event(StreamEvent::StandbyEntered);
    }

    /// Sleeps for the real-time duration of `bytes` client bytes, standing in
    /// for audio that never reached the hardware.
    async fn underrun(&mut self, cause: UnderrunCause, bytes: usize, error: String) {
        let paced = pacing_delay(
            bytes,
            self.config.client_frame_size(),
            self.config.client_sample_rate,
        );
        tracing::warn!(?cause, bytes, paced_us = paced.as_micros() as u64, %error, "dropping audio");
        self.stats.underruns += 1;
        self.stats.bytes_consumed += bytes as u64;
        self.emit_event(StreamEvent::Underrun {
            cause,
            dropped_bytes: bytes,
            paced,
            error,
        });
        tokio::time::sleep(paced).await;
    }

    /// Writes client PCM and returns how many of its bytes were consumed.
    ///
    /// Never fails. If the hardware cannot be acquired or rejects the data,
    /// the audio is dropped, the call sleeps for as long as the audio would
    /// have played and the whole buffer is reported as consumed.
    ///
    /// When resampling, the result is the input the resampler actually took
    /// and may be less than `buffer.len()`; the caller resubmits the rest.
    /// Trailing bytes that do not form a whole client frame are dropped and
    /// counted as consumed once every whole frame has been taken.
    pub async fn write(&mut self, buffer: &[u8]) -> usize {
        if buffer.is_empty() {
            return 0;
        }

        if let Err(e) = self.enter_active().await {
            tracing::error!(error = %e, "failed to leave standby");
            self.underrun(UnderrunCause::Activation, buffer.len(), e.to_string())
                .await;
            return buffer.len();
        }

        let frame_size = self.config.client_frame_size();
        let whole = buffer.len() - buffer.len() % frame_size;
        self.staging.clear();
        decode_le(&buffer[..whole], &mut self.staging);

        match self.submit(buffer.len()).await {
            Ok((processed, frames)) => {
                self.stats.bytes_consumed += processed as u64;
                self.stats.frames_to_hardware += frames as u64;
                tracing::trace!(requested = buffer.len(), processed, frames, "write complete");
                processed
            }
            Err(PartialWrite { error, frames }) => {
                tracing::error!(%error, frames, "hardware write failed");
                let delivered = self.client_bytes_for(frames).min(buffer.len());
                self.stats.bytes_consumed += delivered as u64;
                self.stats.frames_to_hardware += frames as u64;
                self.underrun(
                    UnderrunCause::SinkWrite,
                    buffer.len() - delivered,
                    error.to_string(),
                )
                .await;
                buffer.len()
            }
        }
    }

    /// Client bytes that play for as long as `frames` hardware frames.
    fn client_bytes_for(&self, frames: usize) -> usize {
        let client_frames = (frames as u64 * u64::from(self.config.client_sample_rate))
            .checked_div(u64::from(self.config.hardware.sample_rate))
            .unwrap_or(0);
        client_frames as usize * self.config.client_frame_size()
    }

    /// Runs the staged samples through the conversion stages into the sink.
    /// Returns the client bytes consumed and the frames written.
    async fn submit(&mut self, requested: usize) -> Result<(usize, usize), PartialWrite> {
        let Self {
            config,
            state,
            staging,
            resampler_scratch,
            remix_scratch,
            ..
        } = self;
        let StandbyState::Active { pcm, resampler } = state else {
            return Err(PartialWrite {
                error: SinkError::Closed,
                frames: 0,
            });
        };

        let client_channels = usize::from(config.client_channels);
        let hw_channels = usize::from(config.hardware.channels);

        let (converted, processed): (&[i16], usize) = match resampler {
            Some(resampler) => {
                let result = resampler.resample(staging, resampler_scratch);
                // A trailing partial frame goes with the last whole one.
                let processed = if result.consumed_frames == staging.len() / client_channels {
                    requested
                } else {
                    result.consumed_frames * config.client_frame_size()
                };
                (
                    &resampler_scratch[..result.produced_frames * client_channels],
                    processed,
                )
            }
            None => (staging.as_slice(), requested),
        };

        let mut frames = 0;
        match config.remix {
            Some(direction) => {
                let chunk_frames = (remix_scratch.len() / hw_channels).max(1);
                for chunk in converted.chunks(chunk_frames * client_channels) {
                    let written = remix(direction, chunk, remix_scratch);
                    if let Err(error) = pcm.write(&remix_scratch[..written]).await {
                        return Err(PartialWrite { error, frames });
                    }
                    frames += written / hw_channels;
                }
            }
            None if converted.is_empty() => {}
            None => {
                pcm.write(converted)
                    .await
                    .map_err(|error| PartialWrite { error, frames: 0 })?;
                frames = converted.len() / hw_channels;
            }
        }

        Ok((processed, frames))
    }

    /// Applies a parameter string, routing the output if it names a device.
    ///
    /// Returns the routing outcome, or `None` if the string carries no
    /// usable routing value.
    pub fn apply_parameters(&mut self, params: &str) -> Option<RouteOutcome> {
        let device = Parameters::parse(params).routing()?;
        let outcome = self.routing.apply_route(device);
        if let RouteOutcome::Applied { device, .. } = outcome {
            self.routed = Some(device);
        }
        Some(outcome)
    }

    /// Releases the hardware and drops the stream.
    pub fn close(self) {
        drop(self);
    }
}

impl AudioStream for OutputStream {
    fn sample_rate(&self) -> u32 {
        self.config.client_sample_rate
    }

    fn channel_mask(&self) -> ChannelMask {
        self.config.client_channel_mask
    }

    fn format(&self) -> SampleFormat {
        self.config.format
    }

    fn buffer_size(&self) -> usize {
        self.config.client_buffer_size
    }

    fn standby(&mut self) {
        self.enter_standby();
    }

    fn set_parameters(&mut self, params: &str) {
        self.apply_parameters(params);
    }

    fn parameters(&self, keys: &str) -> String {
        let mut reply = Parameters::default();
        for key in keys.split(';').map(str::trim) {
            if key == ROUTING_KEY {
                if let Some(device) = self.routed {
                    reply.insert(ROUTING_KEY, device.bits().to_string());
                }
            }
        }
        reply.to_string()
    }
}

impl Drop for OutputStream {
    fn drop(&mut self) {
        self.enter_standby();
    }
}

fn alloc_scratch(buffer: &'static str, bytes: usize) -> Result<Vec<i16>, StreamError> {
    let samples = bytes / BYTES_PER_SAMPLE;
    let mut scratch = Vec::new();
    scratch
        .try_reserve_exact(samples)
        .map_err(|_| StreamError::AllocationFailure { buffer, bytes })?;
    scratch.resize(samples, 0);
    Ok(scratch)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::format::{encode_le, LinearResampler, LinearResamplerFactory};
    use crate::mixer::MemoryMixer;
    use crate::{MockPcmDevice, ResamplerError};

    struct FailingFactory;

    impl ResamplerFactory for FailingFactory {
        fn create(
            &self,
            src_rate: u32,
            dst_rate: u32,
            _channels: u16,
            _quality: ResamplerQuality,
        ) -> Result<Box<dyn Resampler>, ResamplerError> {
            Err(ResamplerError::InvalidRate { src_rate, dst_rate })
        }
    }

    /// Hands out resamplers that run one channel more than asked for.
    struct WideFactory;

    impl ResamplerFactory for WideFactory {
        fn create(
            &self,
            src_rate: u32,
            dst_rate: u32,
            channels: u16,
            _quality: ResamplerQuality,
        ) -> Result<Box<dyn Resampler>, ResamplerError> {
            Ok(Box::new(LinearResampler::new(src_rate, dst_rate, channels + 1)?))
        }
    }

    fn backends(device: &MockPcmDevice, resamplers: Arc<dyn ResamplerFactory>) -> OutputBackends {
        OutputBackends {
            device: Arc::new(device.clone()),
            resamplers,
            quality: ResamplerQuality::default(),
            routing: RoutingController::new(Arc::new(MemoryMixer::codec())),
            event_callback: None,
        }
    }

    fn open(device: &MockPcmDevice, rate: u32, mask: ChannelMask) -> OutputStream {
        OutputStream::open(
            &StreamRequest::pcm16(rate, mask),
            &HardwareConfig::default(),
            backends(device, Arc::new(LinearResamplerFactory)),
        )
        .unwrap()
    }

    #[test]
    fn test_open_rejects_bad_requests() {
        let device = MockPcmDevice::new();
        let request = StreamRequest {
            format: SampleFormat::Float32,
            ..StreamRequest::pcm16(48000, ChannelMask::STEREO)
        };
        let result = OutputStream::open(
            &request,
            &HardwareConfig::default(),
            backends(&device, Arc::new(LinearResamplerFactory)),
        );
        assert!(matches!(result, Err(StreamError::UnsupportedFormat { .. })));

        let result = OutputStream::open(
            &StreamRequest::pcm16(48000, ChannelMask(0x7)),
            &HardwareConfig::default(),
            backends(&device, Arc::new(LinearResamplerFactory)),
        );
        assert!(matches!(
            result,
            Err(StreamError::UnsupportedChannelLayout { mask: 0x7 })
        ));

        let result = OutputStream::open(
            &StreamRequest::pcm16(0, ChannelMask::STEREO),
            &HardwareConfig::default(),
            backends(&device, Arc::new(LinearResamplerFactory)),
        );
        assert!(matches!(
            result,
            Err(StreamError::UnsupportedSampleRate { rate: 0 })
        ));
        assert_eq!(device.open_count(), 0);
    }

    #[test]
    fn test_scratch_sized_at_open() {
        let device = MockPcmDevice::new();
        let stream = open(&device, 44100, ChannelMask::MONO);
        assert_eq!(stream.resampler_scratch.len() * BYTES_PER_SAMPLE, 2048);
        assert_eq!(stream.remix_scratch.len() * BYTES_PER_SAMPLE, 4096);
        assert!(stream.is_standby());
        assert_eq!(device.open_count(), 0);
    }

    #[tokio::test]
    async fn test_first_write_activates() {
        let device = MockPcmDevice::new();
        let mut stream = open(&device, 48000, ChannelMask::STEREO);

        assert_eq!(stream.write(&encode_le(&[1, 2, 3, 4])).await, 8);
        assert!(!stream.is_standby());
        assert_eq!(device.open_count(), 1);
        assert_eq!(device.last_config(), Some(HardwareConfig::default()));

        stream.write(&encode_le(&[5, 6])).await;
        assert_eq!(device.open_count(), 1);
        assert_eq!(stream.stats().activations, 1);
    }

    #[tokio::test]
    async fn test_zero_length_write_touches_nothing() {
        let device = MockPcmDevice::new();
        let mut stream = open(&device, 44100, ChannelMask::MONO);
        assert_eq!(stream.write(&[]).await, 0);
        assert!(stream.is_standby());
        assert_eq!(device.open_count(), 0);
    }

    #[tokio::test]
    async fn test_upmix_path() {
        let device = MockPcmDevice::new();
        let mut stream = open(&device, 48000, ChannelMask::MONO);
        assert_eq!(stream.write(&encode_le(&[1, -2, 3])).await, 6);
        assert_eq!(device.written_samples(), vec![1, 1, -2, -2, 3, 3]);
        assert_eq!(stream.stats().frames_to_hardware, 3);
    }

    #[tokio::test]
    async fn test_downmix_path() {
        let device = MockPcmDevice::new();
        let hardware = HardwareConfig {
            channels: 1,
            ..Default::default()
        };
        let mut stream = OutputStream::open(
            &StreamRequest::pcm16(48000, ChannelMask::STEREO),
            &hardware,
            backends(&device, Arc::new(LinearResamplerFactory)),
        )
        .unwrap();
        assert_eq!(stream.write(&encode_le(&[100, 200, -1, 0])).await, 8);
        assert_eq!(device.written_samples(), vec![150, -1]);
    }

    #[tokio::test]
    async fn test_large_remix_write_is_chunked() {
        let device = MockPcmDevice::new();
        let mut stream = open(&device, 48000, ChannelMask::MONO);
        // Remix scratch holds one period (1024 stereo frames).
        let mono: Vec<i16> = (0..2500).map(|i| (i % 100) as i16).collect();
        assert_eq!(stream.write(&encode_le(&mono)).await, 5000);

        let sizes: Vec<usize> = device.writes().iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![2048, 2048, 904]);
        let written = device.written_samples();
        assert_eq!(written.len(), 5000);
        assert!(written.chunks(2).zip(&mono).all(|(pair, &m)| *pair == [m, m]));
    }

    #[tokio::test]
    async fn test_resampled_write_reports_consumed_input() {
        let device = MockPcmDevice::new();
        let mut stream = open(&device, 24000, ChannelMask::STEREO);
        let samples = vec![7i16; 1024 * 2];
        let consumed = stream.write(&encode_le(&samples)).await;
        assert_eq!(consumed, 513 * 4);
        assert_eq!(device.written_samples().len(), 1024 * 2);
        assert_eq!(stream.stats().bytes_consumed, 513 * 4);
    }

    #[tokio::test]
    async fn test_resample_then_downmix() {
        let device = MockPcmDevice::new();
        let hardware = HardwareConfig {
            channels: 1,
            ..Default::default()
        };
        let mut stream = OutputStream::open(
            &StreamRequest::pcm16(44100, ChannelMask::STEREO),
            &hardware,
            backends(&device, Arc::new(LinearResamplerFactory)),
        )
        .unwrap();

        let stereo: Vec<i16> = [100, 300].repeat(1024);
        let bytes = encode_le(&stereo);
        let consumed = stream.write(&bytes).await;
        // 1024 output frames advance 940.8 input frames.
        assert_eq!(consumed, 941 * 4);
        let written = device.written_samples();
        assert_eq!(written.len(), 1024);
        assert!(written.iter().all(|&s| s == 200));
        assert_eq!(stream.stats().frames_to_hardware, 1024);

        let rest = stream.write(&bytes[consumed..]).await;
        assert_eq!(consumed + rest, bytes.len());
        assert_eq!(stream.stats().bytes_consumed, bytes.len() as u64);
    }

    #[tokio::test]
    async fn test_resampled_partial_frame_is_consumed() {
        let device = MockPcmDevice::new();
        let mut stream = open(&device, 44100, ChannelMask::STEREO);

        // Ten stereo frames and three stray bytes.
        let bytes = vec![0u8; 43];
        let mut pending = &bytes[..];
        let mut writes = 0;
        while !pending.is_empty() && writes < 10 {
            let consumed = stream.write(pending).await;
            assert!(consumed > 0);
            pending = &pending[consumed..];
            writes += 1;
        }
        assert!(pending.is_empty());
        assert_eq!(writes, 1);

        assert_eq!(stream.write(&[1, 2, 3]).await, 3);
    }

    #[tokio::test]
    async fn test_resampler_channel_mismatch_fails_activation() {
        let device = MockPcmDevice::new();
        let mut stream = OutputStream::open(
            &StreamRequest::pcm16(44100, ChannelMask::STEREO),
            &HardwareConfig::default(),
            backends(&device, Arc::new(WideFactory)),
        )
        .unwrap();
        let err = stream.enter_active().await.unwrap_err();
        assert!(matches!(err, StreamError::ResamplerInitFailed { .. }));
        assert!(stream.is_standby());
        assert!(!device.is_open());
    }

    #[tokio::test]
    async fn test_partial_frame_is_dropped() {
        let device = MockPcmDevice::new();
        let mut stream = open(&device, 48000, ChannelMask::STEREO);
        assert_eq!(stream.write(&[1, 0, 2, 0, 3, 0]).await, 6);
        assert_eq!(device.written_samples(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_not_ready_device_is_closed() {
        let device = MockPcmDevice::new();
        device.report_not_ready(true);
        let mut stream = open(&device, 48000, ChannelMask::STEREO);
        let err = stream.enter_active().await.unwrap_err();
        assert!(matches!(err, StreamError::DeviceUnavailable { .. }));
        assert!(stream.is_standby());
        assert_eq!(device.open_count(), 1);
        assert_eq!(device.close_count(), 1);
    }

    #[tokio::test]
    async fn test_resampler_failure_closes_sink() {
        let device = MockPcmDevice::new();
        let mut stream = OutputStream::open(
            &StreamRequest::pcm16(44100, ChannelMask::STEREO),
            &HardwareConfig::default(),
            backends(&device, Arc::new(FailingFactory)),
        )
        .unwrap();
        let err = stream.enter_active().await.unwrap_err();
        assert!(matches!(err, StreamError::ResamplerInitFailed { .. }));
        assert!(stream.is_standby());
        assert!(!device.is_open());
    }

    #[tokio::test(start_paused = true)]
    async fn test_activation_failure_paces_and_retries() {
        let device = MockPcmDevice::new();
        device.fail_open(true);
        let mut stream = open(&device, 48000, ChannelMask::STEREO);

        let start = tokio::time::Instant::now();
        assert_eq!(stream.write(&vec![0u8; 19200]).await, 19200);
        assert!(start.elapsed() >= Duration::from_millis(100));
        assert_eq!(stream.stats().underruns, 1);
        assert!(stream.is_standby());

        device.fail_open(false);
        assert_eq!(stream.write(&vec![0u8; 16]).await, 16);
        assert!(!stream.is_standby());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sink_failure_stays_active() {
        let device = MockPcmDevice::new();
        let mut stream = open(&device, 48000, ChannelMask::STEREO);
        stream.write(&[0u8; 4]).await;
        device.fail_writes(true);

        let start = tokio::time::Instant::now();
        assert_eq!(stream.write(&vec![0u8; 4096]).await, 4096);
        assert!(start.elapsed() >= pacing_delay(4096, 4, 48000));
        assert!(!stream.is_standby());
        assert_eq!(device.open_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_chunk_paces_only_undelivered_audio() {
        let events = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let recorded = Arc::clone(&events);
        let device = MockPcmDevice::new();
        device.fail_writes_after(1);
        let mut parts = backends(&device, Arc::new(LinearResamplerFactory));
        parts.event_callback = Some(crate::event_callback(move |e| recorded.lock().push(e)));
        let mut stream = OutputStream::open(
            &StreamRequest::pcm16(48000, ChannelMask::MONO),
            &HardwareConfig::default(),
            parts,
        )
        .unwrap();

        // Three remix chunks; only the first 1024 frames reach the sink.
        let start = tokio::time::Instant::now();
        assert_eq!(stream.write(&vec![0u8; 5000]).await, 5000);
        let elapsed = start.elapsed();

        let undelivered = 5000 - 1024 * 2;
        assert!(elapsed >= pacing_delay(undelivered, 2, 48000));
        assert!(elapsed < pacing_delay(5000, 2, 48000));

        let stats = stream.stats();
        assert_eq!(stats.frames_to_hardware, 1024);
        assert_eq!(stats.bytes_consumed, 5000);
        assert_eq!(stats.underruns, 1);
        assert!(events.lock().iter().any(|e| matches!(
            e,
            StreamEvent::Underrun {
                cause: UnderrunCause::SinkWrite,
                dropped_bytes,
                ..
            } if *dropped_bytes == undelivered
        )));
    }

    #[tokio::test]
    async fn test_standby_is_idempotent() {
        let events = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&events);
        let device = MockPcmDevice::new();
        let mut parts = backends(&device, Arc::new(LinearResamplerFactory));
        parts.event_callback = Some(crate::event_callback(move |event| {
            if matches!(event, StreamEvent::StandbyEntered) {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        }));
        let mut stream = OutputStream::open(
            &StreamRequest::pcm16(44100, ChannelMask::MONO),
            &HardwareConfig::default(),
            parts,
        )
        .unwrap();

        stream.standby();
        assert_eq!(device.close_count(), 0);

        stream.write(&encode_le(&[1, 2, 3, 4])).await;
        stream.standby();
        stream.standby();
        assert!(stream.is_standby());
        assert_eq!(device.close_count(), 1);
        assert_eq!(events.load(Ordering::SeqCst), 1);

        // Scratch survives standby.
        assert_eq!(stream.remix_scratch.len(), 2048);
    }

    #[tokio::test]
    async fn test_drop_releases_device() {
        let device = MockPcmDevice::new();
        let mut stream = open(&device, 48000, ChannelMask::STEREO);
        stream.write(&[0u8; 8]).await;
        assert!(device.is_open());
        stream.close();
        assert!(!device.is_open());
    }

    #[test]
    fn test_parameters_report_route() {
        let device = MockPcmDevice::new();
        let mut stream = open(&device, 48000, ChannelMask::STEREO);
        assert_eq!(stream.parameters("routing"), "");

        stream.set_parameters("routing=8");
        assert_eq!(stream.parameters("routing;volume"), "routing=8");
        assert!(stream.apply_parameters("volume=3").is_none());
        assert_eq!(
            stream.apply_parameters("routing=4"),
            Some(RouteOutcome::Ignored { bits: 4 })
        );
        assert_eq!(stream.parameters("routing"), "routing=8");
    }

    #[test]
    fn test_stream_queries() {
        let device = MockPcmDevice::new();
        let stream = open(&device, 22050, ChannelMask::MONO);
        assert_eq!(stream.sample_rate(), 22050);
        assert_eq!(stream.channel_mask(), ChannelMask::MONO);
        assert_eq!(stream.format(), SampleFormat::Pcm16);
        assert_eq!(stream.buffer_size(), 2048);
        assert_eq!(stream.latency(), Duration::from_millis(42));
    }
}
