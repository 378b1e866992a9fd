use crate::process::allocation::allocate;
use crate::process::analysis::Analysis;
use crate::process::joint::select_joint_stereo;
use crate::process::pack::pack_frame;
use crate::process::quantize::{compute_scale_factors, quantize_frame};
use crate::structs::frame::Frame;
use crate::structs::params::{ChannelMode, CodecParams};
use crate::utils::errors::{FrameError, SbcError};

/// Encodes interleaved 16-bit PCM into SBC frames.
///
/// The encoder owns the analysis filterbank history, so consecutive calls
/// must be fed consecutive audio. Call [`Encoder::reset`] after a
/// discontinuity.
///
/// ```rust
/// use sbc::process::encode::Encoder;
/// use sbc::structs::params::CodecParams;
///
/// let mut encoder = Encoder::new(CodecParams::msbc())?;
/// let pcm = vec![0i16; encoder.codesize()];
/// let (consumed, frame) = encoder.encode_to_vec(&pcm)?;
///
/// assert_eq!(consumed, 120);
/// assert_eq!(frame.len(), 57);
/// # Ok::<(), sbc::utils::errors::SbcError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Encoder {
    params: CodecParams,
    analysis: Analysis,
    frame: Frame,
}

impl Encoder {
    /// Creates an encoder for a validated configuration.
    pub fn new(params: CodecParams) -> Result<Self, SbcError> {
        params.validate()?;

        Ok(Self {
            params,
            analysis: Analysis::new(params.subbands, params.channels())?,
            frame: Frame::new(params),
        })
    }

    pub fn params(&self) -> &CodecParams {
        &self.params
    }

    /// Interleaved PCM samples consumed by one frame.
    pub fn codesize(&self) -> usize {
        self.params.samples_per_frame() * self.params.channels()
    }

    /// Bytes produced by one frame.
    pub fn frame_length(&self) -> usize {
        self.params.frame_length()
    }

    /// Clears the filterbank history.
    pub fn reset(&mut self) {
        self.analysis.reset();
    }

    /// Encodes one frame from the front of `pcm` into `out`.
    ///
    /// Returns the number of PCM samples consumed and the number of bytes
    /// written. Nothing is consumed when `out` cannot hold the frame.
    pub fn encode(&mut self, pcm: &[i16], out: &mut [u8]) -> Result<(usize, usize), SbcError> {
        let codesize = self.codesize();
        let length = self.frame_length();

        if out.len() < length {
            return Err(FrameError::OutputTooSmall {
                needed: length,
                available: out.len(),
            }
            .into());
        }
        if pcm.len() < codesize {
            return Err(SbcError::InsufficientData {
                needed: codesize,
                available: pcm.len(),
            });
        }

        let frame = &mut self.frame;
        frame.reset(self.params);

        self.analysis.process_frame(&pcm[..codesize], frame);
        compute_scale_factors(frame);
        if self.params.channel_mode == ChannelMode::JointStereo {
            select_joint_stereo(frame);
        }
        frame.bits = allocate(&self.params, &frame.scale_factor);
        quantize_frame(frame);

        let written = pack_frame(frame, out)?;

        Ok((codesize, written))
    }

    /// Same as [`Encoder::encode`], allocating the output frame.
    pub fn encode_to_vec(&mut self, pcm: &[i16]) -> Result<(usize, Vec<u8>), SbcError> {
        let mut out = vec![0u8; self.frame_length()];
        let (consumed, written) = self.encode(pcm, &mut out)?;
        out.truncate(written);

        Ok((consumed, out))
    }
}
