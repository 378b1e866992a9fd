//! Encoder and decoder pipeline stages.

/// Polyphase analysis filterbank producing subband samples from PCM.
pub mod analysis;

/// Polyphase synthesis filterbank reconstructing PCM from subband samples.
pub mod synthesis;

/// Scale factors, quantization and dequantization.
pub mod quantize;

/// Bit allocation shared by the encoder and decoder.
pub mod allocation;

/// Joint stereo decision and its inverse.
pub mod joint;

/// Frame serialisation.
pub mod pack;

/// Header and frame parsing with CRC verification.
pub mod parse;

/// PCM to SBC encoding.
///
/// Provides the [`Encoder`](encode::Encoder), which owns the analysis history.
pub mod encode;

/// SBC to PCM decoding.
///
/// Provides the [`Decoder`](decode::Decoder), which owns the synthesis history
/// and returns a [`DecodedFrame`](decode::DecodedFrame) per call.
pub mod decode;

/// Frame extraction from concatenated SBC streams.
///
/// Provides the [`Extractor`](extract::Extractor) for locking onto sync bytes and
/// yielding CRC-checked [`Frame`](extract::Frame) buffers from pushed data.
pub mod extract;
