//! # pcm-bridge
//!
//! **Note:** This crate is under active development. The API may change before 1.0.
//!
//! Adapts a fixed-format PCM output device to clients of any supported format.
//!
//! `pcm-bridge` opens output streams at whatever rate and mono/stereo layout
//! a client asks for, and converts every write to the single format the
//! hardware runs at. The hardware is acquired lazily on the first write and
//! released again in standby, and a write never fails: when the hardware is
//! unavailable the audio is dropped and the call is paced in real time.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pcm_bridge::{AudioHardware, AudioStream, ChannelMask, StreamRequest};
//!
//! # async fn run() -> Result<(), pcm_bridge::StreamError> {
//! let hardware = AudioHardware::builder()
//!     .on_event(|e| tracing::warn!(?e, "stream event"))
//!     .build()?;
//!
//! let mut stream = hardware.open_output_stream(&StreamRequest::pcm16(44100, ChannelMask::MONO))?;
//! let mut pending: &[u8] = &vec![0u8; stream.buffer_size()];
//! while !pending.is_empty() {
//!     let consumed = stream.write(pending).await;
//!     pending = &pending[consumed..];
//! }
//!
//! stream.standby();
//! hardware.close_output_stream(stream);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **Negotiation**: at open, the client format is checked and the
//!   conversion stages and their buffer sizes are fixed
//! - **Standby state machine**: the hardware sink and resampler exist only
//!   while the stream is active
//! - **Write pipeline**: decode, resample, remix, then a blocking write into
//!   the hardware ring
//! - **Routing**: mixer route tables applied from parameter strings,
//!   independent of stream state

#![warn(missing_docs)]
// Audio code requires intentional numeric casts between sample formats
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::cast_lossless
)]
// unwrap/expect allowed in tests only
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]
// These doc lints are too strict for internal implementation details
#![allow(clippy::missing_panics_doc, clippy::missing_errors_doc)]

mod config;
mod device;
mod error;
mod event;
pub mod format;
pub mod mixer;
mod parameters;
pub mod routing;
mod sink;
pub mod stream;

pub use config::{
    ChannelMask, HardwareConfig, ResamplerQuality, SampleFormat, StreamRequest, BYTES_PER_SAMPLE,
};
pub use device::{AudioHardware, AudioHardwareBuilder};
pub use error::{MixerError, ResamplerError, SinkError, StreamError};
pub use event::{event_callback, EventCallback, StreamEvent, UnderrunCause};
pub use format::OutputStreamConfig;
pub use parameters::{Parameters, ROUTING_KEY};
pub use routing::{OutputDevice, RouteOutcome, RoutingController};
pub use sink::{CpalPcmDevice, MockPcmDevice, PcmDevice, PcmHandle};
pub use stream::{AudioStream, InputStream, OutputStream, StreamStats};
