use std::fmt::Display;

use crate::utils::errors::{FrameError, SbcError};

/// Sync word of standard A2DP frames.
pub const SBC_SYNCWORD: u8 = 0x9c;

/// Sync word of wideband speech (mSBC) frames.
pub const MSBC_SYNCWORD: u8 = 0xad;

/// Fixed bitpool of mSBC frames.
pub const MSBC_BITPOOL: u8 = 26;

/// Fixed block count of mSBC frames.
pub const MSBC_BLOCKS: usize = 15;

/// Size of the fixed header: sync word, configuration, bitpool and CRC.
pub const HEADER_LEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SamplingFrequency {
    Freq16000,
    Freq32000,
    Freq44100,
    Freq48000,
}

impl SamplingFrequency {
    pub const fn from_index(index: u8) -> Self {
        match index & 3 {
            0 => Self::Freq16000,
            1 => Self::Freq32000,
            2 => Self::Freq44100,
            _ => Self::Freq48000,
        }
    }

    pub const fn index(self) -> u8 {
        self as u8
    }

    pub const fn hz(self) -> u32 {
        match self {
            Self::Freq16000 => 16000,
            Self::Freq32000 => 32000,
            Self::Freq44100 => 44100,
            Self::Freq48000 => 48000,
        }
    }

    pub fn from_hz(hz: u32) -> Result<Self, FrameError> {
        match hz {
            16000 => Ok(Self::Freq16000),
            32000 => Ok(Self::Freq32000),
            44100 => Ok(Self::Freq44100),
            48000 => Ok(Self::Freq48000),
            _ => Err(FrameError::UnsupportedSamplingFrequency(hz)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelMode {
    Mono,
    DualChannel,
    Stereo,
    JointStereo,
}

impl ChannelMode {
    pub const fn from_index(index: u8) -> Self {
        match index & 3 {
            0 => Self::Mono,
            1 => Self::DualChannel,
            2 => Self::Stereo,
            _ => Self::JointStereo,
        }
    }

    pub const fn index(self) -> u8 {
        self as u8
    }

    pub const fn channels(self) -> usize {
        match self {
            Self::Mono => 1,
            _ => 2,
        }
    }

    /// Stereo modes share one bitpool between both channels.
    pub const fn is_stereo(self) -> bool {
        matches!(self, Self::Stereo | Self::JointStereo)
    }
}

impl Display for ChannelMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mono => write!(f, "Mono"),
            Self::DualChannel => write!(f, "Dual channel"),
            Self::Stereo => write!(f, "Stereo"),
            Self::JointStereo => write!(f, "Joint stereo"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AllocationMethod {
    Loudness,
    Snr,
}

impl AllocationMethod {
    pub const fn from_bit(bit: bool) -> Self {
        if bit { Self::Snr } else { Self::Loudness }
    }

    pub const fn bit(self) -> bool {
        matches!(self, Self::Snr)
    }
}

impl Display for AllocationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Loudness => write!(f, "Loudness"),
            Self::Snr => write!(f, "SNR"),
        }
    }
}

/// Bitstream flavour, selected by the sync word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Profile {
    #[default]
    Standard,
    Msbc,
}

impl Profile {
    pub const fn from_syncword(sync: u8) -> Option<Self> {
        match sync {
            SBC_SYNCWORD => Some(Self::Standard),
            MSBC_SYNCWORD => Some(Self::Msbc),
            _ => None,
        }
    }

    pub const fn syncword(self) -> u8 {
        match self {
            Self::Standard => SBC_SYNCWORD,
            Self::Msbc => MSBC_SYNCWORD,
        }
    }
}

/// Immutable per-stream codec configuration.
///
/// Construct with [`CodecParams::new`] or [`CodecParams::msbc`]; both validate.
/// A hand-built value can be checked with [`CodecParams::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CodecParams {
    pub profile: Profile,
    pub frequency: SamplingFrequency,
    pub blocks: usize,
    pub channel_mode: ChannelMode,
    pub allocation: AllocationMethod,
    pub subbands: usize,
    pub bitpool: u8,
}

impl CodecParams {
    pub fn new(
        frequency: SamplingFrequency,
        blocks: usize,
        channel_mode: ChannelMode,
        allocation: AllocationMethod,
        subbands: usize,
        bitpool: u8,
    ) -> Result<Self, SbcError> {
        let params = Self {
            profile: Profile::Standard,
            frequency,
            blocks,
            channel_mode,
            allocation,
            subbands,
            bitpool,
        };
        params.validate()?;

        Ok(params)
    }

    /// The fixed wideband speech configuration.
    pub const fn msbc() -> Self {
        Self {
            profile: Profile::Msbc,
            frequency: SamplingFrequency::Freq16000,
            blocks: MSBC_BLOCKS,
            channel_mode: ChannelMode::Mono,
            allocation: AllocationMethod::Loudness,
            subbands: 8,
            bitpool: MSBC_BITPOOL,
        }
    }

    /// Checks every field against the ranges the wire format can carry.
    pub fn validate(&self) -> Result<(), SbcError> {
        if self.profile == Profile::Msbc {
            if *self != Self::msbc() {
                return Err(FrameError::InvalidMsbcConfiguration.into());
            }
            return Ok(());
        }

        if !matches!(self.subbands, 4 | 8) {
            return Err(FrameError::UnsupportedSubbands(self.subbands).into());
        }

        if !matches!(self.blocks, 4 | 8 | 12 | 16) {
            return Err(FrameError::UnsupportedBlocks(self.blocks).into());
        }

        if self.bitpool < 2 {
            return Err(FrameError::BitpoolTooSmall(self.bitpool).into());
        }

        let max = self.max_bitpool();
        if self.bitpool as u32 > max {
            return Err(FrameError::BitpoolTooLarge {
                bitpool: self.bitpool,
                max,
            }
            .into());
        }

        Ok(())
    }

    pub const fn channels(&self) -> usize {
        self.channel_mode.channels()
    }

    /// Bitpool ceiling of the channel mode: per channel for mono and dual
    /// channel, shared for stereo and joint stereo.
    pub const fn max_bitpool(&self) -> u32 {
        if self.channel_mode.is_stereo() {
            32 * self.subbands as u32
        } else {
            16 * self.subbands as u32
        }
    }

    /// Two-bit block count field. mSBC frames do not carry one.
    pub const fn blocks_code(&self) -> u8 {
        match self.blocks {
            4 => 0,
            8 => 1,
            12 => 2,
            _ => 3,
        }
    }

    /// Second header byte.
    pub const fn config_byte(&self) -> u8 {
        if matches!(self.profile, Profile::Msbc) {
            return 0;
        }

        (self.frequency.index() << 6)
            | (self.blocks_code() << 4)
            | (self.channel_mode.index() << 2)
            | ((self.allocation.bit() as u8) << 1)
            | (self.subbands == 8) as u8
    }

    /// Third header byte; reserved zero in mSBC frames.
    pub const fn bitpool_byte(&self) -> u8 {
        match self.profile {
            Profile::Standard => self.bitpool,
            Profile::Msbc => 0,
        }
    }

    /// Number of header and scale factor bits covered by the CRC after byte 3.
    pub const fn crc_body_bits(&self) -> usize {
        let join = if matches!(self.channel_mode, ChannelMode::JointStereo) {
            self.subbands
        } else {
            0
        };

        join + 4 * self.subbands * self.channels()
    }

    /// Packed frame length in bytes.
    pub const fn frame_length(&self) -> usize {
        let channels = self.channels();
        let bitpool = self.bitpool as usize;

        let audio_bits = match self.channel_mode {
            ChannelMode::Mono | ChannelMode::DualChannel => self.blocks * channels * bitpool,
            ChannelMode::Stereo => self.blocks * bitpool,
            ChannelMode::JointStereo => self.subbands + self.blocks * bitpool,
        };

        HEADER_LEN + (4 * self.subbands * channels) / 8 + audio_bits.div_ceil(8)
    }

    /// PCM samples per channel carried by one frame.
    pub const fn samples_per_frame(&self) -> usize {
        self.blocks * self.subbands
    }

    /// Bits per second at this configuration.
    pub const fn bitrate(&self) -> u32 {
        (8 * self.frame_length() as u64 * self.frequency.hz() as u64
            / self.samples_per_frame() as u64) as u32
    }
}

impl Display for CodecParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{} Hz, {}, {} blocks, {} subbands, {} allocation, bitpool {}",
            if self.profile == Profile::Msbc { "mSBC, " } else { "" },
            self.frequency.hz(),
            self.channel_mode,
            self.blocks,
            self.subbands,
            self.allocation,
            self.bitpool
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(mode: ChannelMode, subbands: usize, blocks: usize, bitpool: u8) -> CodecParams {
        CodecParams {
            profile: Profile::Standard,
            frequency: SamplingFrequency::Freq44100,
            blocks,
            channel_mode: mode,
            allocation: AllocationMethod::Loudness,
            subbands,
            bitpool,
        }
    }

    #[test]
    fn validation_is_idempotent() {
        let cases = [
            params(ChannelMode::JointStereo, 8, 16, 53),
            params(ChannelMode::Mono, 4, 4, 65),
            params(ChannelMode::Stereo, 8, 16, 255),
            params(ChannelMode::DualChannel, 6, 16, 20),
            params(ChannelMode::Mono, 8, 10, 20),
            params(ChannelMode::Mono, 8, 16, 1),
            CodecParams::msbc(),
        ];

        for case in cases {
            let first = case.validate();
            let second = case.validate();
            assert_eq!(first, second);
        }
    }

    #[test]
    fn bitpool_ceilings() {
        assert!(params(ChannelMode::Mono, 4, 16, 64).validate().is_ok());
        assert_eq!(
            params(ChannelMode::Mono, 4, 16, 65).validate(),
            Err(SbcError::InvalidFrame(FrameError::BitpoolTooLarge {
                bitpool: 65,
                max: 64
            }))
        );
        assert!(params(ChannelMode::DualChannel, 8, 16, 128).validate().is_ok());
        assert!(params(ChannelMode::DualChannel, 8, 16, 129).validate().is_err());
        assert!(params(ChannelMode::Stereo, 4, 16, 128).validate().is_ok());
        assert!(params(ChannelMode::Stereo, 4, 16, 129).validate().is_err());
        assert!(params(ChannelMode::JointStereo, 8, 16, 255).validate().is_ok());
        assert_eq!(params(ChannelMode::JointStereo, 8, 16, 1).max_bitpool(), 256);
    }

    #[test]
    fn rejects_unsupported_layouts() {
        assert_eq!(
            params(ChannelMode::Mono, 6, 16, 20).validate(),
            Err(SbcError::InvalidFrame(FrameError::UnsupportedSubbands(6)))
        );
        assert_eq!(
            params(ChannelMode::Mono, 8, 15, 20).validate(),
            Err(SbcError::InvalidFrame(FrameError::UnsupportedBlocks(15)))
        );

        let mut msbc = CodecParams::msbc();
        assert!(msbc.validate().is_ok());
        msbc.bitpool = 30;
        assert_eq!(
            msbc.validate(),
            Err(SbcError::InvalidFrame(FrameError::InvalidMsbcConfiguration))
        );
    }

    #[test]
    fn frame_lengths() {
        // A2DP high quality joint stereo: 44.1 kHz, 16 blocks, 8 subbands, bitpool 53.
        let hq = params(ChannelMode::JointStereo, 8, 16, 53);
        assert_eq!(hq.frame_length(), 119);
        assert_eq!(hq.bitrate(), 327_993);

        assert_eq!(params(ChannelMode::Mono, 4, 4, 16).frame_length(), 14);
        assert_eq!(params(ChannelMode::DualChannel, 8, 16, 32).frame_length(), 140);
        assert_eq!(params(ChannelMode::Stereo, 8, 16, 255).frame_length(), 522);
        assert_eq!(CodecParams::msbc().frame_length(), 57);
    }

    #[test]
    fn header_byte_layout() {
        let p = CodecParams {
            frequency: SamplingFrequency::Freq48000,
            allocation: AllocationMethod::Snr,
            ..params(ChannelMode::JointStereo, 8, 12, 35)
        };
        assert_eq!(p.config_byte(), 0b11_10_11_1_1);
        assert_eq!(CodecParams::msbc().config_byte(), 0);
        assert_eq!(CodecParams::msbc().bitpool_byte(), 0);
        assert_eq!(p.crc_body_bits(), 8 + 64);
    }
}
