//! Polyphase synthesis filterbank.

use crate::structs::frame::{Frame, MAX_CHANNELS, MAX_SUBBANDS};
use crate::utils::errors::SbcError;
use crate::utils::tables::{COS_BITS, DEC_EXTRA_BITS, PROTO_BITS, cos16, proto};

/// History length per channel: twenty blocks of matrixed values plus a
/// nine-entry tail mirrored from the start on wrap-around.
const HISTORY_LEN: usize = 20 * MAX_SUBBANDS + 10;

/// Decoder-side filterbank with its per-channel history.
///
/// Every block, each of the `2M` lanes steps its offset back by one and
/// stores one matrixed value there. Output sample `i` then reads five values
/// from lane `i` and five from lane `(i + M) mod 2M`.
#[derive(Debug, Clone)]
pub struct Synthesis {
    subbands: usize,
    channels: usize,
    v: [[i32; HISTORY_LEN]; MAX_CHANNELS],
    offset: [[usize; 2 * MAX_SUBBANDS]; MAX_CHANNELS],
    matrix: [[i32; MAX_SUBBANDS]; 2 * MAX_SUBBANDS],
    even: [i32; 5 * MAX_SUBBANDS],
    odd: [i32; 5 * MAX_SUBBANDS],
}

impl Synthesis {
    pub fn new(subbands: usize, channels: usize) -> Result<Self, SbcError> {
        if !matches!(subbands, 4 | 8) {
            return Err(SbcError::InvalidArgument("synthesis needs 4 or 8 subbands"));
        }
        if !(1..=MAX_CHANNELS).contains(&channels) {
            return Err(SbcError::InvalidArgument("synthesis needs 1 or 2 channels"));
        }

        let m = subbands;
        let step = (8 / m) as i32;

        let mut matrix = [[0i32; MAX_SUBBANDS]; 2 * MAX_SUBBANDS];
        for (i, row) in matrix.iter_mut().enumerate().take(2 * m) {
            for (k, c) in row.iter_mut().enumerate().take(m) {
                *c = cos16((2 * k as i32 + 1) * (i as i32 + m as i32 / 2) * step);
            }
        }

        // Synthesis window: prototype scaled by -M, split into even and odd
        // M-sample segments.
        let proto = proto(m);
        let mut even = [0i32; 5 * MAX_SUBBANDS];
        let mut odd = [0i32; 5 * MAX_SUBBANDS];
        for j in 0..m {
            for a in 0..5 {
                even[5 * j + a] = -(m as i32) * proto[j + 2 * a * m];
                odd[5 * j + a] = -(m as i32) * proto[j + (2 * a + 1) * m];
            }
        }

        let mut synthesis = Self {
            subbands,
            channels,
            v: [[0; HISTORY_LEN]; MAX_CHANNELS],
            offset: [[0; 2 * MAX_SUBBANDS]; MAX_CHANNELS],
            matrix,
            even,
            odd,
        };
        synthesis.reset();

        Ok(synthesis)
    }

    pub fn subbands(&self) -> usize {
        self.subbands
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Clears the history, as at the start of a stream or after a discontinuity.
    pub fn reset(&mut self) {
        self.v = [[0; HISTORY_LEN]; MAX_CHANNELS];
        for lanes in self.offset.iter_mut() {
            for (i, off) in lanes.iter_mut().enumerate() {
                *off = 10 * i + 10;
            }
        }
    }

    /// Reconstructs one block of `subbands` samples for channel `ch`.
    ///
    /// `samples` are dequantized subband values with two extra fractional bits.
    /// Output samples are written to `pcm[i * stride]`.
    pub fn process_block(&mut self, ch: usize, samples: &[i32; MAX_SUBBANDS], pcm: &mut [i16], stride: usize) {
        let m = self.subbands;
        let wrap = 20 * m;
        let v = &mut self.v[ch];
        let offset = &mut self.offset[ch];

        for (i, off) in offset.iter_mut().enumerate().take(2 * m) {
            if *off == 0 {
                *off = wrap - 1;
                v.copy_within(0..9, wrap);
            } else {
                *off -= 1;
            }

            let mut acc = 1i64 << (COS_BITS - 1);
            for k in 0..m {
                acc += self.matrix[i][k] as i64 * samples[k] as i64;
            }
            v[*off] = (acc >> COS_BITS) as i32;
        }

        for i in 0..m {
            let lane = offset[i];
            let partner = offset[(i + m) % (2 * m)];
            let mut acc = 1i64 << (PROTO_BITS + DEC_EXTRA_BITS - 1);
            for a in 0..5 {
                acc += v[lane + 2 * a] as i64 * self.even[5 * i + a] as i64;
                acc += v[partner + 2 * a + 1] as i64 * self.odd[5 * i + a] as i64;
            }
            pcm[i * stride] = (acc >> (PROTO_BITS + DEC_EXTRA_BITS))
                .clamp(i16::MIN as i64, i16::MAX as i64) as i16;
        }
    }

    /// Reconstructs a whole frame into interleaved PCM.
    ///
    /// `pcm` must hold `blocks * subbands * channels` samples.
    pub fn process_frame(&mut self, frame: &Frame, pcm: &mut [i16]) {
        let m = self.subbands;
        let channels = self.channels;
        for (blk, block) in frame.sb_sample[..frame.params.blocks].iter().enumerate() {
            let base = blk * m * channels;
            for (ch, samples) in block.iter().enumerate().take(channels) {
                self.process_block(ch, samples, &mut pcm[base + ch..], channels);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::analysis::Analysis;
    use crate::process::analysis::tests::test_signal;
    use crate::utils::tables::SCALE_OUT_BITS;

    fn snr_db(reference: &[i16], decoded: &[i16]) -> f64 {
        let (mut signal, mut noise) = (0f64, 0f64);
        for (&r, &d) in reference.iter().zip(decoded) {
            signal += (r as f64).powi(2);
            noise += (r as f64 - d as f64).powi(2);
        }
        10.0 * (signal / noise.max(1e-9)).log10()
    }

    #[test]
    fn analysis_synthesis_is_near_transparent() -> anyhow::Result<()> {
        for subbands in [4, 8] {
            let mut analysis = Analysis::new(subbands, 1)?;
            let mut synthesis = Synthesis::new(subbands, 1)?;
            let len = 400 * subbands;
            let pcm = test_signal(len, 1);
            let mut decoded = vec![0i16; len];
            let mut out = [[0i32; MAX_SUBBANDS]; MAX_CHANNELS];

            for (block, dst) in pcm.chunks_exact(subbands).zip(decoded.chunks_exact_mut(subbands)) {
                analysis.process_block(block, &mut out);
                for v in out[0].iter_mut() {
                    *v >>= SCALE_OUT_BITS - DEC_EXTRA_BITS;
                }
                synthesis.process_block(0, &out[0], dst, 1);
            }

            // Combined filterbank delay is 9M + 1 samples.
            let delay = 9 * subbands + 1;
            let snr = snr_db(&pcm[..len - delay], &decoded[delay..]);
            assert!(snr > 55.0, "{subbands} subbands: {snr:.1} dB");
        }
        Ok(())
    }

    #[test]
    fn silence_in_silence_out() -> anyhow::Result<()> {
        let mut synthesis = Synthesis::new(8, 2)?;
        let mut pcm = [1i16; 8];
        for _ in 0..50 {
            synthesis.process_block(1, &[0; MAX_SUBBANDS], &mut pcm, 1);
            assert_eq!(pcm, [0; 8]);
        }
        Ok(())
    }

    #[test]
    fn output_is_clipped() -> anyhow::Result<()> {
        let mut synthesis = Synthesis::new(4, 1)?;
        let mut pcm = [0i16; 4];
        let mut peak = 0i16;
        for blk in 0..20 {
            let level = if blk % 2 == 0 { 1 << 18 } else { -(1 << 18) };
            synthesis.process_block(0, &[level, level, level, level, 0, 0, 0, 0], &mut pcm, 1);
            peak = peak.max(pcm.iter().map(|s| s.saturating_abs()).max().unwrap_or(0));
        }
        assert_eq!(peak, i16::MAX);
        Ok(())
    }
}
