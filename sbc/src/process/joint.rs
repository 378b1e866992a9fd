//! Joint stereo decision.

use crate::process::quantize::scale_factor;
use crate::structs::frame::{Frame, MAX_BLOCKS};

/// Decides per subband whether mid/side coding is cheaper than left/right.
///
/// Expects `frame.scale_factor` to hold the left/right scale factors. Every
/// subband but the last is eligible; a subband switches to mid/side when the
/// sum of its mid/side scale factors is strictly lower. Switched subbands get
/// their samples and scale factors replaced. Returns the joint flag bitmap,
/// which is also stored in `frame.joint`.
pub fn select_joint_stereo(frame: &mut Frame) -> u8 {
    let blocks = frame.params.blocks;
    let subbands = frame.params.subbands;

    let mut joint = 0u8;
    let mut mid = [0i32; MAX_BLOCKS];
    let mut side = [0i32; MAX_BLOCKS];

    for sb in (0..subbands - 1).rev() {
        for (blk, block) in frame.sb_sample[..blocks].iter().enumerate() {
            let (l, r) = (block[0][sb], block[1][sb]);
            mid[blk] = (l >> 1) + (r >> 1);
            side[blk] = (l >> 1) - (r >> 1);
        }

        let sf_mid = scale_factor(mid[..blocks].iter().copied());
        let sf_side = scale_factor(side[..blocks].iter().copied());
        let separate = frame.scale_factor[0][sb] as u32 + frame.scale_factor[1][sb] as u32;

        if sf_mid as u32 + sf_side as u32 >= separate {
            continue;
        }

        joint |= 1 << sb;
        frame.scale_factor[0][sb] = sf_mid;
        frame.scale_factor[1][sb] = sf_side;
        for (blk, block) in frame.sb_sample[..blocks].iter_mut().enumerate() {
            block[0][sb] = mid[blk];
            block[1][sb] = side[blk];
        }
    }

    frame.joint = joint;
    joint
}

/// Turns decoded mid/side subbands back into left/right.
pub fn undo_joint_stereo(frame: &mut Frame) {
    let blocks = frame.params.blocks;
    for sb in 0..frame.params.subbands {
        if !frame.is_joint(sb) {
            continue;
        }
        for block in frame.sb_sample[..blocks].iter_mut() {
            let (m, s) = (block[0][sb], block[1][sb]);
            block[0][sb] = m + s;
            block[1][sb] = m - s;
        }
    }
}
