//! Bit allocation.
//!
//! Encoder and decoder run exactly the same computation on the transmitted
//! scale factors, so every rounding and tie-break below is part of the
//! bitstream format.

use crate::structs::frame::{MAX_CHANNELS, MAX_SUBBANDS};
use crate::structs::params::{AllocationMethod, ChannelMode, CodecParams};
use crate::utils::tables::{LOUDNESS_OFFSET_4, LOUDNESS_OFFSET_8};

/// Codeword width ceiling.
const MAX_BITS: i32 = 16;

/// Bit need assigned to zero scale factors under loudness allocation.
const LOUDNESS_SILENT_NEED: i32 = -5;

pub type BitMatrix = [[u8; MAX_SUBBANDS]; MAX_CHANNELS];

/// Computes the codeword width of every channel and subband.
///
/// Mono and dual channel frames spend `bitpool` on each channel separately;
/// stereo and joint stereo frames share it between both channels.
pub fn allocate(params: &CodecParams, scale_factor: &BitMatrix) -> BitMatrix {
    let need = bit_need(params, scale_factor);
    let mut bits = [[0u8; MAX_SUBBANDS]; MAX_CHANNELS];
    let mut cells = [(0usize, 0usize); MAX_CHANNELS * MAX_SUBBANDS];

    match params.channel_mode {
        ChannelMode::Mono | ChannelMode::DualChannel => {
            for ch in 0..params.channels() {
                for (sb, cell) in cells.iter_mut().take(params.subbands).enumerate() {
                    *cell = (ch, sb);
                }
                distribute(&need, &mut bits, &cells[..params.subbands], params.bitpool);
            }
        }
        ChannelMode::Stereo | ChannelMode::JointStereo => {
            let len = 2 * params.subbands;
            for (i, cell) in cells.iter_mut().take(len).enumerate() {
                *cell = (i & 1, i >> 1);
            }
            distribute(&need, &mut bits, &cells[..len], params.bitpool);
        }
    }

    bits
}

fn bit_need(params: &CodecParams, scale_factor: &BitMatrix) -> [[i32; MAX_SUBBANDS]; MAX_CHANNELS] {
    let mut need = [[0i32; MAX_SUBBANDS]; MAX_CHANNELS];
    let freq = params.frequency.index() as usize;

    for ch in 0..params.channels() {
        for sb in 0..params.subbands {
            let sf = scale_factor[ch][sb] as i32;
            need[ch][sb] = match params.allocation {
                AllocationMethod::Snr => sf,
                AllocationMethod::Loudness if sf == 0 => LOUDNESS_SILENT_NEED,
                AllocationMethod::Loudness => {
                    let offset = if params.subbands == 4 {
                        LOUDNESS_OFFSET_4[freq][sb]
                    } else {
                        LOUDNESS_OFFSET_8[freq][sb]
                    };
                    let loudness = sf - offset;
                    if loudness > 0 { loudness / 2 } else { loudness }
                }
            };
        }
    }

    need
}

/// Spends `bitpool` over `cells`, visited in the given order.
fn distribute(
    need: &[[i32; MAX_SUBBANDS]; MAX_CHANNELS],
    bits: &mut BitMatrix,
    cells: &[(usize, usize)],
    bitpool: u8,
) {
    let bitpool = bitpool as i32;
    let max_need = cells
        .iter()
        .map(|&(ch, sb)| need[ch][sb])
        .max()
        .unwrap_or(0);

    // Lower the slice until the next step would overshoot the budget.
    let mut bitcount = 0;
    let mut slicecount = 0;
    let mut bitslice = max_need + 1;
    loop {
        bitslice -= 1;
        bitcount += slicecount;
        slicecount = 0;
        for &(ch, sb) in cells {
            let n = need[ch][sb];
            if n > bitslice + 1 && n < bitslice + MAX_BITS {
                slicecount += 1;
            } else if n == bitslice + 1 {
                slicecount += 2;
            }
        }
        if bitcount + slicecount >= bitpool {
            break;
        }
    }

    if bitcount + slicecount == bitpool {
        bitcount += slicecount;
        bitslice -= 1;
    }

    for &(ch, sb) in cells {
        let n = need[ch][sb];
        bits[ch][sb] = if n < bitslice + 2 {
            0
        } else {
            (n - bitslice).min(MAX_BITS) as u8
        };
    }

    for &(ch, sb) in cells {
        if bitcount >= bitpool {
            break;
        }
        let b = bits[ch][sb] as i32;
        if (2..MAX_BITS).contains(&b) {
            bits[ch][sb] += 1;
            bitcount += 1;
        } else if need[ch][sb] == bitslice + 1 && bitpool > bitcount + 1 {
            bits[ch][sb] = 2;
            bitcount += 2;
        }
    }

    for &(ch, sb) in cells {
        if bitcount >= bitpool {
            break;
        }
        if (bits[ch][sb] as i32) < MAX_BITS {
            bits[ch][sb] += 1;
            bitcount += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structs::params::{Profile, SamplingFrequency};

    fn params(mode: ChannelMode, allocation: AllocationMethod, subbands: usize, bitpool: u8) -> CodecParams {
        CodecParams {
            profile: Profile::Standard,
            frequency: SamplingFrequency::Freq44100,
            blocks: 16,
            channel_mode: mode,
            allocation,
            subbands,
            bitpool,
        }
    }

    fn channel_sum(bits: &BitMatrix, ch: usize, subbands: usize) -> u32 {
        bits[ch][..subbands].iter().map(|&b| b as u32).sum()
    }

    // Deterministic pseudo-random scale factors.
    fn scale_factors(seed: u32) -> BitMatrix {
        let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(12345);
        let mut sf = [[0u8; MAX_SUBBANDS]; MAX_CHANNELS];
        for row in sf.iter_mut() {
            for v in row.iter_mut() {
                state = state.wrapping_mul(1_103_515_245).wrapping_add(12345);
                *v = ((state >> 16) % 16) as u8;
            }
        }
        sf
    }

    #[test]
    fn silent_mono_frame() {
        let p = CodecParams {
            frequency: SamplingFrequency::Freq16000,
            ..params(ChannelMode::Mono, AllocationMethod::Loudness, 4, 16)
        };
        let bits = allocate(&p, &[[0; MAX_SUBBANDS]; MAX_CHANNELS]);
        assert_eq!(bits[0][..4], [4, 4, 4, 4]);
    }

    #[test]
    fn snr_tracks_scale_factors() {
        let p = params(ChannelMode::Mono, AllocationMethod::Snr, 4, 16);
        let mut sf = [[0u8; MAX_SUBBANDS]; MAX_CHANNELS];
        sf[0][..4].copy_from_slice(&[12, 8, 4, 0]);
        let bits = allocate(&p, &sf);
        assert_eq!(bits[0][..4], [10, 6, 0, 0]);
    }

    #[test]
    fn deterministic_and_within_budget() {
        let modes = [
            ChannelMode::Mono,
            ChannelMode::DualChannel,
            ChannelMode::Stereo,
            ChannelMode::JointStereo,
        ];

        for seed in 0..200 {
            let sf = scale_factors(seed);
            for mode in modes {
                for allocation in [AllocationMethod::Loudness, AllocationMethod::Snr] {
                    for subbands in [4, 8] {
                        let probe = params(mode, allocation, subbands, 2);
                        let ceiling = probe.max_bitpool().min(255) as u8;
                        for bitpool in [2, 7, 16, 35, 53, ceiling] {
                            let p = CodecParams { bitpool, ..probe };
                            let bits = allocate(&p, &sf);
                            assert_eq!(bits, allocate(&p, &sf));

                            let groups = if mode.is_stereo() { 1 } else { p.channels() };
                            let cells = (subbands * p.channels() / groups) as u32;
                            for g in 0..groups {
                                let used = if mode.is_stereo() {
                                    channel_sum(&bits, 0, subbands) + channel_sum(&bits, 1, subbands)
                                } else {
                                    channel_sum(&bits, g, subbands)
                                };
                                let budget = bitpool as u32;
                                assert!(used <= budget, "{p} overspent: {used}");
                                assert!(
                                    used + cells > budget || used == 16 * cells,
                                    "{p} left {} bits unused",
                                    budget - used
                                );
                            }
                            assert!(bits.iter().flatten().all(|&b| b <= 16));
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn stereo_shares_the_bitpool() {
        let p = params(ChannelMode::Stereo, AllocationMethod::Snr, 4, 20);
        let mut sf = [[0u8; MAX_SUBBANDS]; MAX_CHANNELS];
        sf[0][..4].copy_from_slice(&[10, 6, 2, 1]);
        sf[1][..4].copy_from_slice(&[10, 6, 2, 1]);
        let bits = allocate(&p, &sf);
        assert_eq!(bits[0], bits[1]);
        assert_eq!(channel_sum(&bits, 0, 4) + channel_sum(&bits, 1, 4), 20);
    }
}
