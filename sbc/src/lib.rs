#![doc = include_str!("../README.md")]
//!
//! ## Technical Overview
//!
//! SBC is the subband codec of Bluetooth A2DP, with mSBC as its fixed
//! wideband speech profile for HFP.
//!
//! ### Frame Organization
//!
//! **Header**: sync word, configuration byte, bitpool and CRC8.
//! **Side information**: joint stereo flags and 4-bit scale factors, covered by the CRC.
//! **Audio data**: quantized subband samples in block, channel, subband order,
//! with widths derived from the scale factors by the bit allocator.
//!
//! ### Configurations
//!
//! - 16, 32, 44.1 and 48 kHz
//! - 4, 8, 12 or 16 blocks per frame (15 for mSBC)
//! - 4 or 8 subbands
//! - mono, dual channel, stereo and joint stereo
//! - loudness or SNR allocation
//!
//! ## Quick Start
//!
//! ```rust
//! use sbc::process::{decode::Decoder, encode::Encoder, extract::Extractor};
//! use sbc::structs::params::{AllocationMethod, ChannelMode, CodecParams, SamplingFrequency};
//!
//! let params = CodecParams::new(
//!     SamplingFrequency::Freq44100,
//!     16,
//!     ChannelMode::JointStereo,
//!     AllocationMethod::Loudness,
//!     8,
//!     53,
//! )?;
//!
//! let mut encoder = Encoder::new(params)?;
//! let pcm = vec![0i16; 4 * encoder.codesize()];
//!
//! let mut stream = Vec::new();
//! for chunk in pcm.chunks_exact(encoder.codesize()) {
//!     let (_, frame) = encoder.encode_to_vec(chunk)?;
//!     stream.extend_from_slice(&frame);
//! }
//!
//! let mut extractor = Extractor::default();
//! let mut decoder = Decoder::default();
//! let mut out = vec![0i16; 256];
//!
//! extractor.push_bytes(&stream);
//! for frame in extractor.filter_map(Result::ok) {
//!     let decoded = decoder.decode(frame.as_ref(), &mut out)?;
//!     assert_eq!(decoded.samples, 256);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

/// Processing stages of the codec.
///
/// 1. **Encoding** ([`process::encode`]): analysis, scale factors, joint
///    stereo, allocation, quantization and packing.
///
/// 2. **Extraction** ([`process::extract`]): frame boundaries in byte streams.
///
/// 3. **Decoding** ([`process::decode`]): parsing, CRC check, allocation,
///    dequantization and synthesis.
pub mod process;

/// Data structures representing SBC format components.
///
/// - **Parameters** ([`structs::params`]): validated codec configuration
/// - **Frames** ([`structs::frame`]): per-frame working state
pub mod structs;

/// Utility functions and supporting infrastructure.
///
/// - **Bitstream I/O** ([`utils::bitstream_io`]): bit-level reading and writing
/// - **CRC Validation** ([`utils::crc`]): CRC8 over header and scale factors
/// - **Error Handling** ([`utils::errors`]): error types
/// - **Tables** ([`utils::tables`]): filterbank and allocation constants
pub mod utils;
