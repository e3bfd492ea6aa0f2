//! Sample rate conversion.
//!
//! The output stream treats the converter as a black box behind
//! [`Resampler`]: it hands over every input frame it has and the converter
//! reports how many it actually consumed and how many it produced. A
//! converter may hold frames back, so consumption is not 1:1 with the input.
//!
//! [`LinearResampler`] is the built-in implementation: streaming linear
//! interpolation, fast and good enough for speech and system sounds.

use crate::error::ResamplerError;
use crate::ResamplerQuality;

/// Frame counts reported by one [`Resampler::resample`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResampleResult {
    /// Input frames consumed; never more than were offered.
    pub consumed_frames: usize,
    /// Output frames written; never more than fit in the output buffer.
    pub produced_frames: usize,
}

/// A stateful sample-rate converter over interleaved 16-bit frames.
pub trait Resampler: Send {
    /// Number of interleaved channels per frame.
    fn channels(&self) -> u16;

    /// Converts as much of `input` as fits into `output`.
    ///
    /// Both slices hold interleaved frames; partial trailing frames are
    /// ignored. State carries over between calls so consecutive buffers form
    /// one continuous signal.
    fn resample(&mut self, input: &[i16], output: &mut [i16]) -> ResampleResult;
}

/// Creates [`Resampler`] instances on demand.
///
/// The output stream calls this each time it leaves standby and drops the
/// instance when it re-enters standby.
pub trait ResamplerFactory: Send + Sync {
    /// Creates a converter from `src_rate` to `dst_rate`.
    fn create(
        &self,
        src_rate: u32,
        dst_rate: u32,
        channels: u16,
        quality: ResamplerQuality,
    ) -> Result<Box<dyn Resampler>, ResamplerError>;
}

/// Streaming linear-interpolation resampler.
///
/// Output frame `k` samples the input at position `k * src_rate / dst_rate`,
/// interpolating between the two neighboring input frames. The last consumed
/// frame is kept so interpolation continues across buffer boundaries.
///
/// # Example
///
/// ```
/// use pcm_bridge::format::{LinearResampler, Resampler};
///
/// let mut resampler = LinearResampler::new(24000, 48000, 1).unwrap();
/// let mut output = [0i16; 16];
/// let result = resampler.resample(&[0, 100, 200, 300], &mut output);
///
/// assert_eq!(result.consumed_frames, 4);
/// assert_eq!(result.produced_frames, 6);
/// assert_eq!(&output[..6], &[0, 50, 100, 150, 200, 250]);
/// ```
#[derive(Debug, Clone)]
pub struct LinearResampler {
    channels: usize,
    /// Input frames advanced per output frame.
    step: f64,
    /// Read position in input frames; `-1.0` addresses `history`.
    position: f64,
    /// Last consumed input frame.
    history: Vec<i16>,
}

impl LinearResampler {
    /// Creates a resampler from `src_rate` to `dst_rate`.
    pub fn new(src_rate: u32, dst_rate: u32, channels: u16) -> Result<Self, ResamplerError> {
        if src_rate == 0 || dst_rate == 0 {
            return Err(ResamplerError::InvalidRate { src_rate, dst_rate });
        }
        if channels == 0 {
            return Err(ResamplerError::UnsupportedChannels(channels));
        }
        Ok(Self {
            channels: usize::from(channels),
            step: f64::from(src_rate) / f64::from(dst_rate),
            position: 0.0,
            history: vec![0; usize::from(channels)],
        })
    }

    fn sample(&self, input: &[i16], frame: isize, channel: usize) -> i16 {
        if frame < 0 {
            self.history[channel]
        } else {
            input[frame as usize * self.channels + channel]
        }
    }
}

impl Resampler for LinearResampler {
    fn channels(&self) -> u16 {
        self.channels as u16
    }

    fn resample(&mut self, input: &[i16], output: &mut [i16]) -> ResampleResult {
        let ch = self.channels;
        let in_frames = input.len() / ch;
        let out_capacity = output.len() / ch;
        if in_frames == 0 {
            return ResampleResult::default();
        }

        let mut produced = 0;
        let mut pos = self.position;
        while produced < out_capacity {
            let left = pos.floor();
            let right = left as isize + 1;
            if right as usize >= in_frames {
                break;
            }
            let frac = pos - left;
            for c in 0..ch {
                let a = f64::from(self.sample(input, left as isize, c));
                let b = f64::from(self.sample(input, right, c));
                output[produced * ch + c] = (a + (b - a) * frac).round() as i16;
            }
            produced += 1;
            pos += self.step;
        }

        // Keep the left neighbor of the next output frame as history.
        let consumed = (pos.floor() as isize + 1).clamp(0, in_frames as isize) as usize;
        if consumed > 0 {
            self.history
                .copy_from_slice(&input[(consumed - 1) * ch..consumed * ch]);
        }
        self.position = pos - consumed as f64;

        ResampleResult {
            consumed_frames: consumed,
            produced_frames: produced,
        }
    }
}

/// Factory for [`LinearResampler`]. Every quality level maps to the same
/// interpolation.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearResamplerFactory;

impl ResamplerFactory for LinearResamplerFactory {
    fn create(
        &self,
        src_rate: u32,
        dst_rate: u32,
        channels: u16,
        quality: ResamplerQuality,
    ) -> Result<Box<dyn Resampler>, ResamplerError> {
        tracing::debug!(src_rate, dst_rate, channels, ?quality, "creating linear resampler");
        Ok(Box::new(LinearResampler::new(src_rate, dst_rate, channels)?))
    }
}
