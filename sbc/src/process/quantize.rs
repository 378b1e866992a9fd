//! Scale factors and uniform (de)quantization of subband samples.

use crate::structs::frame::Frame;
use crate::utils::tables::{DEC_EXTRA_BITS, SCALE_OUT_BITS};

/// Largest 4-bit scale factor.
pub const MAX_SCALE_FACTOR: u8 = 15;

/// Scale factor covering a set of Q15 subband samples.
///
/// It is the exponent of the smallest power of two that bounds every
/// magnitude, so each sample lies within `±2^(sf + 1)` in PCM units.
pub fn scale_factor<I: IntoIterator<Item = i32>>(samples: I) -> u8 {
    let mut acc: u32 = 1 << SCALE_OUT_BITS;
    for s in samples {
        let magnitude = s.unsigned_abs();
        if magnitude != 0 {
            acc |= magnitude - 1;
        }
    }

    let top = 31 - acc.leading_zeros();
    (top - SCALE_OUT_BITS).min(MAX_SCALE_FACTOR as u32) as u8
}

/// Fills `frame.scale_factor` from the encoder subband samples.
pub fn compute_scale_factors(frame: &mut Frame) {
    let blocks = frame.params.blocks;
    for ch in 0..frame.params.channels() {
        for sb in 0..frame.params.subbands {
            frame.scale_factor[ch][sb] =
                scale_factor(frame.sb_sample[..blocks].iter().map(|block| block[ch][sb]));
        }
    }
}

/// Maps a Q15 sample onto one of `2^bits - 1` levels spanning `±2^(sf + 1)`.
#[inline(always)]
pub fn quantize(sample: i32, scale_factor: u8, bits: u8) -> u16 {
    let levels = (1u64 << bits) - 1;
    let shift = scale_factor as u32 + SCALE_OUT_BITS + 1;
    let delta = 1i64 << shift;
    let offset = (sample as i64).clamp(-delta, delta) + delta;

    ((levels * offset as u64) >> (shift + 1)) as u16
}

/// Inverse of [`quantize`]; the result carries two extra fractional bits.
#[inline(always)]
pub fn dequantize(codeword: u16, scale_factor: u8, bits: u8) -> i32 {
    if bits == 0 {
        return 0;
    }

    let levels = (1i64 << bits) - 1;
    let shift = scale_factor as u32 + 1 + DEC_EXTRA_BITS;
    let value = ((((codeword as i64) << 1) | 1) << shift) / levels - (1i64 << shift);

    value as i32
}

/// Quantizes every allocated cell of `frame` into `frame.codeword`.
pub fn quantize_frame(frame: &mut Frame) {
    let (blocks, channels, subbands) = (
        frame.params.blocks,
        frame.params.channels(),
        frame.params.subbands,
    );

    for blk in 0..blocks {
        for ch in 0..channels {
            for sb in 0..subbands {
                let bits = frame.bits[ch][sb];
                frame.codeword[blk][ch][sb] = if bits == 0 {
                    0
                } else {
                    quantize(frame.sb_sample[blk][ch][sb], frame.scale_factor[ch][sb], bits)
                };
            }
        }
    }
}

/// Rebuilds `frame.sb_sample` from the parsed codewords.
pub fn dequantize_frame(frame: &mut Frame) {
    let (blocks, channels, subbands) = (
        frame.params.blocks,
        frame.params.channels(),
        frame.params.subbands,
    );

    for blk in 0..blocks {
        for ch in 0..channels {
            for sb in 0..subbands {
                frame.sb_sample[blk][ch][sb] = dequantize(
                    frame.codeword[blk][ch][sb],
                    frame.scale_factor[ch][sb],
                    frame.bits[ch][sb],
                );
            }
        }
    }
}
