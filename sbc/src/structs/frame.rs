use crate::structs::params::CodecParams;

pub const MAX_BLOCKS: usize = 16;
pub const MAX_CHANNELS: usize = 2;
pub const MAX_SUBBANDS: usize = 8;

/// Per-frame working state shared by the encoder and decoder pipelines.
///
/// Everything here is recomputed (encoder) or reparsed (decoder) for every
/// frame; nothing carries over between calls.
#[derive(Debug, Clone)]
pub struct Frame {
    pub params: CodecParams,

    /// Subband samples as `[block][channel][subband]`.
    ///
    /// Q15 on the encoder side; on the decoder side the dequantized values
    /// carry two extra fractional bits.
    pub sb_sample: [[[i32; MAX_SUBBANDS]; MAX_CHANNELS]; MAX_BLOCKS],

    /// Quantized codewords, same shape as `sb_sample`.
    pub codeword: [[[u16; MAX_SUBBANDS]; MAX_CHANNELS]; MAX_BLOCKS],

    /// 4-bit scale factors as `[channel][subband]`.
    pub scale_factor: [[u8; MAX_SUBBANDS]; MAX_CHANNELS],

    /// Allocated codeword widths as `[channel][subband]`.
    pub bits: [[u8; MAX_SUBBANDS]; MAX_CHANNELS],

    /// Joint stereo flags, bit `sb` set when subband `sb` carries mid/side.
    pub joint: u8,

    /// Packed frame length in bytes.
    pub length: usize,
}

impl Frame {
    pub fn new(params: CodecParams) -> Self {
        Self {
            params,
            sb_sample: [[[0; MAX_SUBBANDS]; MAX_CHANNELS]; MAX_BLOCKS],
            codeword: [[[0; MAX_SUBBANDS]; MAX_CHANNELS]; MAX_BLOCKS],
            scale_factor: [[0; MAX_SUBBANDS]; MAX_CHANNELS],
            bits: [[0; MAX_SUBBANDS]; MAX_CHANNELS],
            joint: 0,
            length: params.frame_length(),
        }
    }

    pub fn reset(&mut self, params: CodecParams) {
        *self = Self::new(params);
    }

    /// Whether subband `sb` is coded as mid/side.
    pub const fn is_joint(&self, sb: usize) -> bool {
        (self.joint >> sb) & 1 != 0
    }
}
