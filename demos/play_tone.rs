//! Tone playback example.
//!
//! Plays a 440 Hz tone as a 22.05 kHz mono client through the default output
//! device, which runs at 48 kHz stereo. Every write is resampled and upmixed.
//!
//! Run with: cargo run --example play_tone

use pcm_bridge::format::encode_le;
use pcm_bridge::{AudioHardware, AudioStream, ChannelMask, CpalPcmDevice, StreamRequest};

const CLIENT_RATE: u32 = 22050;
const FREQUENCY: f32 = 440.0;
const SECONDS: usize = 2;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for debug output
    tracing_subscriber::fmt::init();

    let hardware = AudioHardware::builder()
        .pcm_device(CpalPcmDevice::default_output())
        .on_event(|e| println!("event: {e:?}"))
        .build()?;

    let mut stream =
        hardware.open_output_stream(&StreamRequest::pcm16(CLIENT_RATE, ChannelMask::MONO))?;
    println!(
        "Playing {FREQUENCY} Hz for {SECONDS}s (client buffer {} bytes, latency {:?})",
        stream.buffer_size(),
        stream.latency()
    );

    let total = CLIENT_RATE as usize * SECONDS;
    let samples: Vec<i16> = (0..total)
        .map(|i| {
            let t = i as f32 / CLIENT_RATE as f32;
            ((t * FREQUENCY * std::f32::consts::TAU).sin() * 6000.0) as i16
        })
        .collect();
    let bytes = encode_le(&samples);

    // Feed one client buffer at a time, resubmitting what the stream did not take.
    let mut pending = &bytes[..];
    while !pending.is_empty() {
        let len = pending.len().min(stream.buffer_size());
        let consumed = stream.write(&pending[..len]).await;
        pending = &pending[consumed..];
    }

    let stats = stream.stats();
    stream.standby();
    hardware.close_output_stream(stream);

    println!("Stats: {stats:?}");
    Ok(())
}
