//! Polyphase analysis filterbank.
//!
//! Each block of `M` new PCM samples per channel yields `M` subband samples in
//! Q15. The input window is stored hop by hop (two blocks per hop) in a
//! permuted order so that the windowing stage folds adjacent sample pairs into
//! the same accumulator. Which of two constant tables applies depends on
//! whether the block is the older or the newer half of its hop.

use crate::structs::frame::{Frame, MAX_CHANNELS, MAX_SUBBANDS};
use crate::utils::errors::SbcError;
use crate::utils::tables::{COS_BITS, PERMUTE_4, PERMUTE_8, PROTO_BITS, SCALE_OUT_BITS, cos16, proto};

/// Per-channel sample window: the longest impulse response (80 taps) plus
/// room for 16 hops before the history is moved back to the end.
const WINDOW_CAPACITY: usize = 336;

/// Fractional bits kept between the windowing and modulation stages.
const T_FRAC_BITS: u32 = 8;

#[derive(Debug, Clone)]
struct AnalysisTables {
    /// Signed prototype taps in storage order, `[parity][slot]`.
    window: [[i32; 10 * MAX_SUBBANDS]; 2],
    /// Modulation matrix, `[parity][accumulator][subband]`.
    cosine: [[[i32; MAX_SUBBANDS]; MAX_SUBBANDS]; 2],
    /// Storage slot of each hop rank.
    slot_of_rank: [usize; 2 * MAX_SUBBANDS],
}

/// Accumulator group of window row `y` and the sign it enters with.
///
/// Rows `M/2 ± j` add into group `j`; rows `M/2 + j` and `5M/2 - j` with
/// `M/2 < j < M` form a difference; row `3M/2` does not contribute.
fn fold(subbands: usize, y: usize) -> (usize, i32) {
    let h = (subbands / 2) as i32;
    let y = y as i32;

    if y == 3 * h {
        return (0, 0);
    }
    let j = y - h;
    if j.abs() <= h {
        return (j.unsigned_abs() as usize, 1);
    }
    if j > h && j < 2 * h {
        return (j as usize, 1);
    }

    ((5 * h - y) as usize, -1)
}

impl AnalysisTables {
    fn new(subbands: usize) -> Self {
        let hop = 2 * subbands;
        let taps = 10 * subbands;
        let permute: &[usize] = if subbands == 4 { &PERMUTE_4 } else { &PERMUTE_8 };
        let proto = proto(subbands);

        let mut window = [[0i32; 10 * MAX_SUBBANDS]; 2];
        let mut cosine = [[[0i32; MAX_SUBBANDS]; MAX_SUBBANDS]; 2];

        for parity in 0..2 {
            let mut group = [0usize; MAX_SUBBANDS];

            for p in 0..taps {
                let pos = p + parity * subbands;
                let tap = (pos / hop * hop + permute[pos % hop]) as isize
                    - (parity * subbands) as isize;
                if tap < 0 || tap >= taps as isize {
                    continue;
                }

                let tap = tap as usize;
                let (g, sign) = fold(subbands, tap % hop);
                window[parity][p] = sign * proto[tap];
                if sign != 0 {
                    group[(p % hop) / 2] = g;
                }
            }

            let step = (8 / subbands) as i32;
            for (k, &g) in group.iter().enumerate().take(subbands) {
                for sb in 0..subbands {
                    cosine[parity][k][sb] = cos16(g as i32 * (2 * sb as i32 + 1) * step);
                }
            }
        }

        let mut slot_of_rank = [0usize; 2 * MAX_SUBBANDS];
        for (slot, &rank) in permute.iter().enumerate() {
            slot_of_rank[rank] = slot;
        }

        Self {
            window,
            cosine,
            slot_of_rank,
        }
    }
}

/// Encoder-side filterbank with its per-channel history.
#[derive(Debug, Clone)]
pub struct Analysis {
    subbands: usize,
    channels: usize,
    tables: AnalysisTables,
    x: [[i16; WINDOW_CAPACITY]; MAX_CHANNELS],
    position: usize,
    older: bool,
}

impl Analysis {
    pub fn new(subbands: usize, channels: usize) -> Result<Self, SbcError> {
        if !matches!(subbands, 4 | 8) {
            return Err(SbcError::InvalidArgument("analysis needs 4 or 8 subbands"));
        }
        if !(1..=MAX_CHANNELS).contains(&channels) {
            return Err(SbcError::InvalidArgument("analysis needs 1 or 2 channels"));
        }

        Ok(Self {
            subbands,
            channels,
            tables: AnalysisTables::new(subbands),
            x: [[0; WINDOW_CAPACITY]; MAX_CHANNELS],
            position: WINDOW_CAPACITY - 10 * subbands,
            older: true,
        })
    }

    pub fn subbands(&self) -> usize {
        self.subbands
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Clears the history, as at the start of a stream.
    pub fn reset(&mut self) {
        self.x = [[0; WINDOW_CAPACITY]; MAX_CHANNELS];
        self.position = WINDOW_CAPACITY - 10 * self.subbands;
        self.older = true;
    }

    /// Filters one block of interleaved PCM (`subbands * channels` samples).
    pub fn process_block(&mut self, pcm: &[i16], out: &mut [[i32; MAX_SUBBANDS]; MAX_CHANNELS]) {
        let m = self.subbands;
        let hop = 2 * m;
        let taps = 10 * m;

        if self.older {
            if self.position < hop {
                for x in self.x.iter_mut().take(self.channels) {
                    x.copy_within(self.position..self.position + taps, WINDOW_CAPACITY - taps);
                }
                self.position = WINDOW_CAPACITY - taps;
            }
            self.position -= hop;
        }

        let parity = self.older as usize;
        let pair_base = if self.older { 0 } else { m };
        let base = self.position + parity * m;
        let window = &self.tables.window[parity][..taps];
        let cosine = &self.tables.cosine[parity];

        for ch in 0..self.channels {
            let x = &mut self.x[ch];
            for j in 0..m {
                let rank = hop - 1 - (pair_base + j);
                x[self.position + self.tables.slot_of_rank[rank]] = pcm[j * self.channels + ch];
            }

            let mut acc = [1i64 << (PROTO_BITS - T_FRAC_BITS - 1); MAX_SUBBANDS];
            for (p, (&s, &w)) in x[base..base + taps].iter().zip(window).enumerate() {
                acc[(p % hop) / 2] += s as i64 * w as i64;
            }

            let mut t = [0i64; MAX_SUBBANDS];
            for k in 0..m {
                t[k] = acc[k] >> (PROTO_BITS - T_FRAC_BITS);
            }

            let out_shift = T_FRAC_BITS + COS_BITS - SCALE_OUT_BITS;
            for sb in 0..m {
                let mut sum = 1i64 << (out_shift - 1);
                for k in 0..m {
                    sum += t[k] * cosine[k][sb] as i64;
                }
                out[ch][sb] = (sum >> out_shift).clamp(-(i32::MAX as i64), i32::MAX as i64) as i32;
            }
        }

        self.older = !self.older;
    }

    /// Filters `frame.params.blocks` blocks of interleaved PCM into `frame.sb_sample`.
    pub fn process_frame(&mut self, pcm: &[i16], frame: &mut Frame) {
        let block_len = self.subbands * self.channels;
        for (blk, chunk) in pcm
            .chunks_exact(block_len)
            .take(frame.params.blocks)
            .enumerate()
        {
            self.process_block(chunk, &mut frame.sb_sample[blk]);
        }
    }
}
