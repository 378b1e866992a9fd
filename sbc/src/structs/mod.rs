//! Data structures describing SBC configurations and frames.

/// Codec configuration: sampling frequency, block count, channel mode,
/// allocation method, subband count and bitpool.
pub mod params;

/// Per-frame subband samples, scale factors, bit allocation and joint flags.
pub mod frame;
