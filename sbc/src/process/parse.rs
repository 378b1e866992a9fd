use std::io;

use crate::process::allocation::allocate;
use crate::structs::frame::Frame;
use crate::structs::params::{
    AllocationMethod, ChannelMode, CodecParams, HEADER_LEN, Profile, SamplingFrequency,
};
use crate::utils::bitstream_io::BsIoSliceReader;
use crate::utils::crc::SBC_CRC;
use crate::utils::errors::{FrameError, SbcError};

/// Decodes the configuration carried by a frame header.
///
/// Only the first four bytes are inspected; the CRC is not verified.
pub fn parse_header(data: &[u8]) -> Result<CodecParams, SbcError> {
    if data.len() < HEADER_LEN {
        return Err(SbcError::InvalidArgument(
            "buffer is shorter than an SBC frame header",
        ));
    }

    let Some(profile) = Profile::from_syncword(data[0]) else {
        return Err(FrameError::InvalidSyncWord(data[0]).into());
    };

    if profile == Profile::Msbc {
        let reserved = u16::from_be_bytes([data[1], data[2]]);
        if reserved != 0 {
            return Err(FrameError::ReservedBitsSet(reserved).into());
        }
        return Ok(CodecParams::msbc());
    }

    let mut reader = BsIoSliceReader::from_slice(&data[1..3]);
    let header = read_config(&mut reader).map_err(|_| {
        SbcError::InvalidArgument("buffer is shorter than an SBC frame header")
    })?;

    header.validate()?;

    Ok(header)
}

fn read_config(reader: &mut BsIoSliceReader<'_>) -> io::Result<CodecParams> {
    let frequency = SamplingFrequency::from_index(reader.get_n(2)?);
    let blocks = 4 * (reader.get_n::<u8>(2)? as usize + 1);
    let channel_mode = ChannelMode::from_index(reader.get_n(2)?);
    let allocation = AllocationMethod::from_bit(reader.get()?);
    let subbands = if reader.get()? { 8 } else { 4 };
    let bitpool = reader.get_n(8)?;

    Ok(CodecParams {
        profile: Profile::Standard,
        frequency,
        blocks,
        channel_mode,
        allocation,
        subbands,
        bitpool,
    })
}

/// CRC of a packed frame: header bytes 1 and 2, then the joint flags and
/// scale factors that follow the CRC byte.
pub fn frame_crc(data: &[u8], params: &CodecParams) -> Result<u8, SbcError> {
    let body_bits = params.crc_body_bits() as u64;
    let needed = HEADER_LEN + (body_bits as usize).div_ceil(8);

    let mut reader = BsIoSliceReader::from_slice(data);
    let crc = reader
        .crc8_check(&SBC_CRC, SBC_CRC.init, 8, 16)
        .and_then(|crc| reader.crc8_check(&SBC_CRC, crc, 32, body_bits))
        .map_err(|_| SbcError::InsufficientData {
            needed,
            available: data.len(),
        })?;

    Ok(crc)
}

/// Unpacks a complete frame into `frame`: header, joint flags, scale factors,
/// bit allocation and codewords. Returns the frame length in bytes.
///
/// Dequantization is left to the caller.
pub fn parse_frame(data: &[u8], frame: &mut Frame) -> Result<usize, SbcError> {
    let params = parse_header(data)?;
    let length = params.frame_length();

    if data.len() < length {
        return Err(SbcError::InsufficientData {
            needed: length,
            available: data.len(),
        });
    }

    let data = &data[..length];
    let truncated = |_: io::Error| SbcError::InsufficientData {
        needed: length,
        available: data.len(),
    };

    frame.reset(params);

    let channels = params.channels();
    let subbands = params.subbands;
    let mut reader = BsIoSliceReader::from_slice(data);
    reader.skip_n(8 * HEADER_LEN as u32).map_err(truncated)?;

    if params.channel_mode == ChannelMode::JointStereo {
        for sb in 0..subbands {
            let bit = reader.get().map_err(truncated)?;
            if bit && sb + 1 < subbands {
                frame.joint |= 1 << sb;
            }
        }
    }

    for ch in 0..channels {
        for sb in 0..subbands {
            frame.scale_factor[ch][sb] = reader.get_n(4).map_err(truncated)?;
        }
    }

    let calculated = frame_crc(data, &params)?;
    let read = data[3];
    if calculated != read {
        return Err(SbcError::InvalidCrc { calculated, read });
    }

    frame.bits = allocate(&params, &frame.scale_factor);

    for blk in 0..params.blocks {
        for ch in 0..channels {
            for sb in 0..subbands {
                let bits = frame.bits[ch][sb];
                if bits != 0 {
                    frame.codeword[blk][ch][sb] = reader.get_n(bits as u32).map_err(truncated)?;
                }
            }
        }
    }

    Ok(length)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_fields() -> anyhow::Result<()> {
        let params = parse_header(&[0x9c, 0xbd, 0x35, 0x00])?;
        assert_eq!(params.frequency, SamplingFrequency::Freq44100);
        assert_eq!(params.blocks, 16);
        assert_eq!(params.channel_mode, ChannelMode::JointStereo);
        assert_eq!(params.allocation, AllocationMethod::Loudness);
        assert_eq!(params.subbands, 8);
        assert_eq!(params.bitpool, 53);
        assert_eq!(params.config_byte(), 0xbd);
        Ok(())
    }

    #[test]
    fn header_errors() {
        assert!(matches!(
            parse_header(&[0x9c, 0xbd]),
            Err(SbcError::InvalidArgument(_))
        ));
        assert_eq!(
            parse_header(&[0x9d, 0xbd, 0x35, 0x00]),
            Err(SbcError::InvalidFrame(FrameError::InvalidSyncWord(0x9d)))
        );
        // Mono, 4 subbands: ceiling is 64.
        assert_eq!(
            parse_header(&[0x9c, 0x30, 65, 0x00]),
            Err(SbcError::InvalidFrame(FrameError::BitpoolTooLarge {
                bitpool: 65,
                max: 64
            }))
        );
        assert_eq!(
            parse_header(&[0xad, 0x00, 0x01, 0x00]),
            Err(SbcError::InvalidFrame(FrameError::ReservedBitsSet(1)))
        );
    }

    #[test]
    fn msbc_header() -> anyhow::Result<()> {
        assert_eq!(parse_header(&[0xad, 0x00, 0x00, 0xc5])?, CodecParams::msbc());
        Ok(())
    }
}
