use crate::process::joint::undo_joint_stereo;
use crate::process::parse::{parse_frame, parse_header};
use crate::process::quantize::dequantize_frame;
use crate::process::synthesis::Synthesis;
use crate::structs::frame::Frame;
use crate::structs::params::CodecParams;
use crate::utils::errors::SbcError;

/// Decodes SBC frames to interleaved 16-bit PCM.
///
/// The decoder keeps the synthesis filterbank history between calls. It is
/// created lazily from the first frame and rebuilt whenever the subband or
/// channel count changes. A frame that fails to decode leaves the history
/// untouched.
///
/// ```rust
/// use sbc::process::decode::Decoder;
///
/// let frame = [0x9c, 0x00, 0x10, 0x70, 0x00, 0x00, 0x77, 0x77, 0x77, 0x77, 0x77, 0x77, 0x77, 0x77];
/// let mut pcm = [0i16; 16];
///
/// let decoded = Decoder::default().decode(&frame, &mut pcm)?;
/// assert_eq!(decoded.consumed, 14);
/// assert_eq!(decoded.samples, 16);
/// # Ok::<(), sbc::utils::errors::SbcError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Decoder {
    synthesis: Option<Synthesis>,
}

/// Outcome of decoding one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedFrame {
    /// Parameters read from the frame header.
    pub params: CodecParams,

    /// Bytes of input taken by the frame.
    pub consumed: usize,

    /// Interleaved PCM samples written, over all channels.
    pub samples: usize,
}

impl Decoder {
    /// Decodes the frame at the front of `data` into `pcm`.
    ///
    /// `pcm` must hold `blocks * subbands * channels` samples. Trailing bytes
    /// after the frame are ignored.
    pub fn decode(&mut self, data: &[u8], pcm: &mut [i16]) -> Result<DecodedFrame, SbcError> {
        let mut frame = Frame::new(CodecParams::msbc());
        let consumed = parse_frame(data, &mut frame)?;
        let params = frame.params;

        let samples = params.samples_per_frame() * params.channels();
        if pcm.len() < samples {
            return Err(SbcError::InvalidArgument(
                "PCM buffer cannot hold a decoded frame",
            ));
        }

        dequantize_frame(&mut frame);
        undo_joint_stereo(&mut frame);

        let stale = self.synthesis.as_ref().is_none_or(|s| {
            s.subbands() != params.subbands || s.channels() != params.channels()
        });
        if stale {
            self.synthesis = Some(Synthesis::new(params.subbands, params.channels())?);
        }
        if let Some(synthesis) = self.synthesis.as_mut() {
            synthesis.process_frame(&frame, &mut pcm[..samples]);
        }

        Ok(DecodedFrame {
            params,
            consumed,
            samples,
        })
    }

    /// Same as [`Decoder::decode`], allocating the PCM output.
    pub fn decode_to_vec(&mut self, data: &[u8]) -> Result<(DecodedFrame, Vec<i16>), SbcError> {
        let mut pcm = Vec::new();
        if let Ok(params) = parse_header(data) {
            pcm.resize(params.samples_per_frame() * params.channels(), 0);
        }
        let decoded = self.decode(data, &mut pcm)?;

        Ok((decoded, pcm))
    }

    /// Drops the filterbank history, as after a seek or a stream change.
    pub fn reset(&mut self) {
        self.synthesis = None;
    }
}
