//! Channel remixing and byte/sample conversion for 16-bit PCM.

/// Direction of a mono/stereo channel remix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemixDirection {
    /// Mono to stereo: each sample is duplicated into both channels.
    Up,
    /// Stereo to mono: left and right are averaged.
    Down,
}

impl RemixDirection {
    /// Picks a direction for a channel count change, if one is needed.
    ///
    /// Returns `None` when the counts match or the pair is not mono/stereo.
    pub fn between(from_channels: u16, to_channels: u16) -> Option<Self> {
        match (from_channels, to_channels) {
            (1, 2) => Some(Self::Up),
            (2, 1) => Some(Self::Down),
            _ => None,
        }
    }

    /// Output samples produced for `input_samples` input samples.
    pub fn output_len(self, input_samples: usize) -> usize {
        match self {
            Self::Up => input_samples * 2,
            Self::Down => input_samples / 2,
        }
    }
}

/// Downmixes interleaved stereo into mono, one sample per frame.
///
/// Each output sample is `(left + right) >> 1`: the sum is computed in `i32`
/// so it cannot overflow, and the shift rounds toward negative infinity.
/// A trailing unpaired sample is ignored. Returns the number of mono samples
/// written, which is `min(stereo.len() / 2, mono.len())`.
pub fn downmix_to_mono(stereo: &[i16], mono: &mut [i16]) -> usize {
    let mut written = 0;
    for (out, pair) in mono.iter_mut().zip(stereo.chunks_exact(2)) {
        *out = ((i32::from(pair[0]) + i32::from(pair[1])) >> 1) as i16;
        written += 1;
    }
    written
}

/// Upmixes mono into interleaved stereo by duplicating each sample.
///
/// Returns the number of stereo samples written (twice the mono samples
/// consumed), bounded by the capacity of `stereo`.
pub fn upmix_to_stereo(mono: &[i16], stereo: &mut [i16]) -> usize {
    let mut written = 0;
    for (pair, &sample) in stereo.chunks_exact_mut(2).zip(mono) {
        pair[0] = sample;
        pair[1] = sample;
        written += 2;
    }
    written
}

/// Applies `direction` from `src` into `dst`, returning samples written.
pub fn remix(direction: RemixDirection, src: &[i16], dst: &mut [i16]) -> usize {
    match direction {
        RemixDirection::Up => upmix_to_stereo(src, dst),
        RemixDirection::Down => downmix_to_mono(src, dst),
    }
}

/// Decodes little-endian 16-bit PCM bytes, appending samples to `out`.
///
/// A trailing odd byte is ignored. `out` keeps its capacity between calls.
pub fn decode_le(bytes: &[u8], out: &mut Vec<i16>) {
    out.extend(
        bytes
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]])),
    );
}

/// Encodes samples as little-endian 16-bit PCM bytes.
pub fn encode_le(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}
