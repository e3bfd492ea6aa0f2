//! CPAL output device wrapper.

use std::sync::mpsc as std_mpsc;
use std::thread::JoinHandle;
use std::time::Duration;

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, SampleRate, Stream, StreamConfig as CpalStreamConfig};
use ringbuf::traits::{Consumer, Producer, Split};
use ringbuf::{HeapCons, HeapProd, HeapRb};
use tokio::sync::oneshot;

use super::{PcmDevice, PcmHandle};
use crate::{HardwareConfig, SinkError};

/// Shortest wait between attempts to push into a full ring.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// A CPAL output device opened in the fixed hardware format.
///
/// Opening spawns a thread that owns the CPAL stream (streams are not `Send`
/// on every platform). Writes go through a lock-free SPSC ring sized to the
/// hardware ring; the device callback drains it and plays silence when it
/// runs dry.
pub struct CpalPcmDevice {
    name: String,
    device_name: Option<String>,
}

impl CpalPcmDevice {
    /// Uses the system's default output device.
    pub fn default_output() -> Self {
        Self {
            name: "cpal:default".to_string(),
            device_name: None,
        }
    }

    /// Uses a specific output device by name.
    pub fn by_name(name: impl Into<String>) -> Self {
        let device_name = name.into();
        Self {
            name: format!("cpal:{device_name}"),
            device_name: Some(device_name),
        }
    }
}

impl Default for CpalPcmDevice {
    fn default() -> Self {
        Self::default_output()
    }
}

#[async_trait]
impl PcmDevice for CpalPcmDevice {
    fn name(&self) -> &str {
        &self.name
    }

    async fn open(&self, config: &HardwareConfig) -> Result<Box<dyn PcmHandle>, SinkError> {
        let capacity = config.ring_frames() * usize::from(config.channels);
        let (producer, consumer) = HeapRb::<i16>::new(capacity.max(1)).split();

        let (ready_tx, ready_rx) = oneshot::channel();
        let (stop_tx, stop_rx) = std_mpsc::channel::<()>();
        let device_name = self.device_name.clone();
        let stream_config = *config;

        let thread = std::thread::Builder::new()
            .name("pcm-output".to_string())
            .spawn(move || {
                let stream = match start_stream(device_name.as_deref(), &stream_config, consumer) {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));
                // Parked until the handle is closed or dropped.
                let _ = stop_rx.recv();
                drop(stream);
            })
            .map_err(|e| SinkError::Backend(e.to_string()))?;

        match ready_rx.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = thread.join();
                return Err(e);
            }
            Err(_) => return Err(SinkError::open_failed("output thread exited")),
        }

        tracing::debug!(device = %self.name, rate = config.sample_rate, channels = config.channels, "output stream started");

        Ok(Box::new(CpalPcmHandle {
            producer,
            stop: Some(stop_tx),
            thread: Some(thread),
            poll_interval: (config.period_duration() / 2).max(MIN_POLL_INTERVAL),
        }))
    }
}

fn start_stream(
    device_name: Option<&str>,
    config: &HardwareConfig,
    mut consumer: HeapCons<i16>,
) -> Result<Stream, SinkError> {
    let host = cpal::default_host();
    let device = match device_name {
        None => host
            .default_output_device()
            .ok_or_else(|| SinkError::open_failed("no default output device"))?,
        Some(name) => host
            .output_devices()
            .map_err(|e| SinkError::Backend(e.to_string()))?
            .find(|d| d.name().is_ok_and(|n| n == name))
            .ok_or_else(|| SinkError::open_failed(format!("device not found: {name}")))?,
    };

    let cpal_config = CpalStreamConfig {
        channels: config.channels,
        sample_rate: SampleRate(config.sample_rate),
        buffer_size: BufferSize::Default,
    };

    let stream = device
        .build_output_stream(
            &cpal_config,
            move |data: &mut [i16], _: &cpal::OutputCallbackInfo| {
                let filled = consumer.pop_slice(data);
                data[filled..].fill(0);
            },
            |err| {
                tracing::error!("Audio output stream error: {}", err);
            },
            None,
        )
        .map_err(|e| SinkError::open_failed(e.to_string()))?;

    stream
        .play()
        .map_err(|e| SinkError::Backend(e.to_string()))?;

    Ok(stream)
}

struct CpalPcmHandle {
    producer: HeapProd<i16>,
    stop: Option<std_mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
    poll_interval: Duration,
}

impl CpalPcmHandle {
    fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    fn shutdown(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}

#[async_trait]
impl PcmHandle for CpalPcmHandle {
    fn is_ready(&self) -> bool {
        self.is_running()
    }

    async fn write(&mut self, samples: &[i16]) -> Result<(), SinkError> {
        let mut remaining = samples;
        while !remaining.is_empty() {
            if !self.is_running() {
                return Err(SinkError::Closed);
            }
            let pushed = self.producer.push_slice(remaining);
            remaining = &remaining[pushed..];
            if !remaining.is_empty() {
                tokio::time::sleep(self.poll_interval).await;
            }
        }
        Ok(())
    }

    fn close(mut self: Box<Self>) {
        self.shutdown();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for CpalPcmHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
