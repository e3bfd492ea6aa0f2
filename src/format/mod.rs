//! Audio format negotiation and conversion.
//!
//! This module provides the stages between a client buffer and the hardware:
//! - Open-time negotiation of which stages are needed ([`OutputStreamConfig`])
//! - Sample rate conversion ([`Resampler`])
//! - Channel conversion (mono ↔ stereo)

mod convert;
mod negotiate;
mod resample;

pub use convert::{
    decode_le, downmix_to_mono, encode_le, remix, upmix_to_stereo, RemixDirection,
};
pub use negotiate::OutputStreamConfig;
pub use resample::{
    LinearResampler, LinearResamplerFactory, ResampleResult, Resampler, ResamplerFactory,
};
