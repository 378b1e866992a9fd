//! Fixed-point constants shared by the filterbanks and the bit allocator.

/// Fractional bits of the prototype window coefficients.
pub const PROTO_BITS: u32 = 20;

/// Fractional bits of the cosine modulation coefficients.
pub const COS_BITS: u32 = 15;

/// Fractional bits of encoder subband samples.
pub const SCALE_OUT_BITS: u32 = 15;

/// Extra fractional bits carried by dequantized subband samples.
pub const DEC_EXTRA_BITS: u32 = 2;

/// Prototype lowpass window for 4 subbands, Q20.
#[rustfmt::skip]
pub const PROTO_4: [i32; 40] = [
         0,     563,    1564,    2867,    4024,    4081,    1956,   -3209,
     11444,   21431,   30278,   33758,   27134,    6430,  -30222,  -81418,
    142180,  204460,  258617,  295518,  308612,  295518,  258617,  204460,
   -142180,  -81418,  -30222,    6430,   27134,   33758,   30278,   21431,
    -11444,   -3209,    1956,    4081,    4024,    2867,    1564,     563,
];

/// Prototype lowpass window for 8 subbands, Q20.
#[rustfmt::skip]
pub const PROTO_8: [i32; 80] = [
         0,     164,     360,     582,     864,    1195,    1548,    1870,
      2110,    2206,    2091,    1695,     946,    -187,   -1730,   -3667,
      5934,    8419,   10966,   13366,   15364,   16677,   17009,   16063,
     13566,    9288,    3066,   -5155,  -15352,  -27378,  -40973,  -55771,
     71302,   87016,  102315,  116598,  129252,  139738,  147591,  152452,
    154094,  152452,  147591,  139738,  129252,  116598,  102315,   87016,
    -71302,  -55771,  -40973,  -27378,  -15352,   -5155,    3066,    9288,
     13566,   16063,   17009,   16677,   15364,   13366,   10966,    8419,
     -5934,   -3667,   -1730,    -187,     946,    1695,    2091,    2206,
      2110,    1870,    1548,    1195,     864,     582,     360,     164,
];

pub const fn proto(subbands: usize) -> &'static [i32] {
    if subbands == 4 { &PROTO_4 } else { &PROTO_8 }
}

/// `cos(m * pi / 16)` for m in 0..=8, Q15.
const COS16: [i32; 9] = [32768, 32138, 30274, 27246, 23170, 18205, 12540, 6393, 0];

/// `cos(m * pi / 16)` for any integer `m`, Q15.
pub const fn cos16(m: i32) -> i32 {
    let mut m = m.rem_euclid(32);
    if m > 16 {
        m = 32 - m;
    }
    if m <= 8 {
        COS16[m as usize]
    } else {
        -COS16[(16 - m) as usize]
    }
}

/// Order in which the 2M samples of one window hop are stored, slot to rank.
///
/// Ranks count back in time from the newest sample of the hop. Storing
/// samples in this order lets every analysis accumulator read adjacent pairs.
pub const PERMUTE_4: [usize; 8] = [0, 4, 1, 3, 7, 5, 6, 2];
pub const PERMUTE_8: [usize; 16] = [0, 8, 1, 7, 2, 6, 3, 5, 4, 12, 9, 15, 10, 14, 11, 13];

/// Loudness offsets for 4 subbands, indexed by sampling frequency.
pub const LOUDNESS_OFFSET_4: [[i32; 4]; 4] = [
    [-1, 0, 0, 0],
    [-2, 0, 0, 1],
    [-2, 0, 0, 1],
    [-2, 0, 0, 1],
];

/// Loudness offsets for 8 subbands, indexed by sampling frequency.
pub const LOUDNESS_OFFSET_8: [[i32; 8]; 4] = [
    [-2, 0, 0, 0, 0, 0, 0, 1],
    [-3, 0, 0, 0, 0, 0, 1, 2],
    [-4, 0, 0, 0, 0, 0, 1, 2],
    [-4, 0, 0, 0, 0, 0, 1, 2],
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_symmetry() {
        assert_eq!(cos16(0), 32768);
        assert_eq!(cos16(8), 0);
        assert_eq!(cos16(16), -32768);
        assert_eq!(cos16(-3), cos16(3));
        assert_eq!(cos16(35), cos16(3));
        assert_eq!(cos16(12), -cos16(4));
    }

    #[test]
    fn permutations_are_bijective() {
        for perm in [&PERMUTE_4[..], &PERMUTE_8[..]] {
            let mut seen = vec![false; perm.len()];
            for &rank in perm {
                assert!(!seen[rank]);
                seen[rank] = true;
            }
        }
    }

    #[test]
    fn prototype_is_symmetric() {
        for (m, p) in [(4usize, &PROTO_4[..]), (8, &PROTO_8[..])] {
            for i in 1..5 * m {
                assert_eq!(p[i].abs(), p[10 * m - i].abs(), "m = {m}, i = {i}");
            }
        }
    }
}
