use crate::process::parse::frame_crc;
use crate::structs::frame::Frame;
use crate::structs::params::{ChannelMode, HEADER_LEN};
use crate::utils::bitstream_io::BitstreamIoWriter;
use crate::utils::errors::{FrameError, SbcError};

/// Serialises a quantized frame into `out` and returns the number of bytes
/// written, which is always `frame.params.frame_length()`.
///
/// Expects `frame.scale_factor`, `frame.joint`, `frame.bits` and
/// `frame.codeword` to be filled in.
pub fn pack_frame(frame: &Frame, out: &mut [u8]) -> Result<usize, SbcError> {
    let params = &frame.params;
    let length = params.frame_length();

    if out.len() < length {
        return Err(FrameError::OutputTooSmall {
            needed: length,
            available: out.len(),
        }
        .into());
    }

    let mut bytes = write_fields(frame, length).map_err(|_| {
        SbcError::InvalidArgument("frame contents do not fit the configured frame length")
    })?;

    if bytes.len() > length {
        return Err(SbcError::InvalidArgument(
            "frame contents do not fit the configured frame length",
        ));
    }
    bytes.resize(length, 0);

    bytes[3] = frame_crc(&bytes, params)?;
    out[..length].copy_from_slice(&bytes);

    Ok(length)
}

fn write_fields(frame: &Frame, length: usize) -> std::io::Result<Vec<u8>> {
    let params = &frame.params;
    let channels = params.channels();
    let subbands = params.subbands;

    let mut writer = BitstreamIoWriter::with_capacity(length);
    writer.put_n(8, params.profile.syncword())?;
    writer.put_n(8, params.config_byte())?;
    writer.put_n(8, params.bitpool_byte())?;
    writer.put_n(8, 0u8)?;
    debug_assert_eq!(writer.position(), 8 * HEADER_LEN as u64);

    if params.channel_mode == ChannelMode::JointStereo {
        for sb in 0..subbands {
            writer.put(sb + 1 < subbands && frame.is_joint(sb))?;
        }
    }

    for ch in 0..channels {
        for sb in 0..subbands {
            writer.put_n(4, frame.scale_factor[ch][sb])?;
        }
    }

    for blk in 0..params.blocks {
        for ch in 0..channels {
            for sb in 0..subbands {
                let bits = frame.bits[ch][sb];
                if bits != 0 {
                    writer.put_n(bits as u32, frame.codeword[blk][ch][sb])?;
                }
            }
        }
    }

    writer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::allocation::allocate;
    use crate::process::parse::parse_frame;
    use crate::process::quantize::quantize_frame;
    use crate::structs::params::{AllocationMethod, CodecParams, SamplingFrequency};

    fn silent_frame(params: CodecParams) -> Frame {
        let mut frame = Frame::new(params);
        frame.bits = allocate(&params, &frame.scale_factor);
        quantize_frame(&mut frame);
        frame
    }

    #[test]
    fn silent_mono_frame_bytes() -> anyhow::Result<()> {
        let params = CodecParams::new(
            SamplingFrequency::Freq16000,
            4,
            ChannelMode::Mono,
            AllocationMethod::Loudness,
            4,
            16,
        )?;
        let mut out = [0u8; 14];
        let written = pack_frame(&silent_frame(params), &mut out)?;

        assert_eq!(written, 14);
        assert_eq!(
            out,
            [0x9c, 0x00, 0x10, 0x70, 0x00, 0x00, 0x77, 0x77, 0x77, 0x77, 0x77, 0x77, 0x77, 0x77]
        );
        Ok(())
    }

    #[test]
    fn silent_msbc_frame_bytes() -> anyhow::Result<()> {
        let mut out = [0u8; 57];
        pack_frame(&silent_frame(CodecParams::msbc()), &mut out)?;

        #[rustfmt::skip]
        let expected = [
            0xad, 0x00, 0x00, 0xc5, 0x00, 0x00, 0x00, 0x00, 0x77, 0x6d, 0xb6, 0xdd, 0xdb, 0x6d, 0xb7,
            0x76, 0xdb, 0x6d, 0xdd, 0xb6, 0xdb, 0x77, 0x6d, 0xb6, 0xdd, 0xdb, 0x6d, 0xb7, 0x76, 0xdb,
            0x6d, 0xdd, 0xb6, 0xdb, 0x77, 0x6d, 0xb6, 0xdd, 0xdb, 0x6d, 0xb7, 0x76, 0xdb, 0x6d, 0xdd,
            0xb6, 0xdb, 0x77, 0x6d, 0xb6, 0xdd, 0xdb, 0x6d, 0xb7, 0x76, 0xdb, 0x6c,
        ];
        assert_eq!(out, expected);
        Ok(())
    }

    #[test]
    fn output_too_small() -> anyhow::Result<()> {
        let params = CodecParams::new(
            SamplingFrequency::Freq44100,
            16,
            ChannelMode::JointStereo,
            AllocationMethod::Loudness,
            8,
            53,
        )?;
        let mut out = [0u8; 118];
        assert_eq!(
            pack_frame(&silent_frame(params), &mut out),
            Err(SbcError::InvalidFrame(FrameError::OutputTooSmall {
                needed: 119,
                available: 118
            }))
        );
        Ok(())
    }

    #[test]
    fn pack_then_parse_preserves_fields() -> anyhow::Result<()> {
        let params = CodecParams::new(
            SamplingFrequency::Freq48000,
            12,
            ChannelMode::JointStereo,
            AllocationMethod::Snr,
            8,
            40,
        )?;
        let mut frame = Frame::new(params);
        frame.joint = 0b0010_0101;
        for ch in 0..2 {
            for sb in 0..8 {
                frame.scale_factor[ch][sb] = ((ch * 5 + sb * 3) % 16) as u8;
            }
        }
        frame.bits = allocate(&params, &frame.scale_factor);
        for blk in 0..12 {
            for ch in 0..2 {
                for sb in 0..8 {
                    let max = (1u32 << frame.bits[ch][sb]) - 1;
                    frame.codeword[blk][ch][sb] = ((blk * 31 + ch * 7 + sb) as u32 % (max + 1)) as u16;
                }
            }
        }

        let mut out = vec![0u8; params.frame_length()];
        pack_frame(&frame, &mut out)?;

        let mut parsed = Frame::new(params);
        assert_eq!(parse_frame(&out, &mut parsed)?, out.len());
        assert_eq!(parsed.joint, frame.joint);
        assert_eq!(parsed.scale_factor, frame.scale_factor);
        assert_eq!(parsed.bits, frame.bits);
        assert_eq!(parsed.codeword, frame.codeword);
        Ok(())
    }
}
