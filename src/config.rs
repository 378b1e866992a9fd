use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::cli::command::{AllocationArg, ChannelModeArg, EncodeArgs};
use sbc::structs::params::{ChannelMode, CodecParams, SamplingFrequency};
use sbc::utils::errors::FrameError;

pub const DEFAULT_SUBBANDS: usize = 8;
pub const DEFAULT_BLOCKS: usize = 16;
pub const DEFAULT_BITPOOL: u8 = 53;

/// Encoder profile as read from YAML. Unset fields fall through to the
/// command line and then to the built-in defaults.
///
/// ```yaml
/// subbands: 8
/// blocks: 16
/// channel-mode: joint-stereo
/// allocation: loudness
/// bitpool: 53
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct EncoderConfig {
    pub subbands: Option<usize>,
    pub blocks: Option<usize>,
    pub channel_mode: Option<ChannelModeArg>,
    pub allocation: Option<AllocationArg>,
    pub bitpool: Option<u8>,
    pub msbc: Option<bool>,
}

impl EncoderConfig {
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read encoder config {}", path.display()))?;
        Self::from_yaml(&text)
            .with_context(|| format!("Invalid encoder config {}", path.display()))
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        let config: Self = serde_yaml_ng::from_str(text)?;
        log::debug!("Encoder config: {config:?}");
        Ok(config)
    }

    pub fn from_args(args: &EncodeArgs) -> Self {
        Self {
            subbands: args.subbands,
            blocks: args.blocks,
            channel_mode: args.mode,
            allocation: args.allocation,
            bitpool: args.bitpool,
            msbc: args.msbc.then_some(true),
        }
    }

    /// Layers `overrides` on top of `self`; set fields in `overrides` win.
    pub fn merge(self, overrides: Self) -> Self {
        Self {
            subbands: overrides.subbands.or(self.subbands),
            blocks: overrides.blocks.or(self.blocks),
            channel_mode: overrides.channel_mode.or(self.channel_mode),
            allocation: overrides.allocation.or(self.allocation),
            bitpool: overrides.bitpool.or(self.bitpool),
            msbc: overrides.msbc.or(self.msbc),
        }
    }

    /// Produces validated codec parameters for input of the given format.
    pub fn resolve(&self, sample_rate: u32, channels: u16) -> Result<CodecParams> {
        if self.msbc.unwrap_or(false) {
            if sample_rate != 16000 || channels != 1 {
                bail!("mSBC needs 16 kHz mono input, got {sample_rate} Hz with {channels} channels");
            }
            if self.has_frame_settings() {
                log::warn!("mSBC uses a fixed frame layout, ignoring explicit codec settings");
            }
            return Ok(CodecParams::msbc());
        }

        let frequency = SamplingFrequency::from_hz(sample_rate)?;

        let channel_mode = match (self.channel_mode, channels) {
            (None, 1) => ChannelMode::Mono,
            (None, 2) => ChannelMode::JointStereo,
            (Some(mode), _) => mode.into(),
            (None, n) => return Err(FrameError::UnsupportedChannels(n as usize).into()),
        };
        if channel_mode.channels() != channels as usize {
            bail!("Channel mode {channel_mode} does not match {channels}-channel input");
        }

        let params = CodecParams::new(
            frequency,
            self.blocks.unwrap_or(DEFAULT_BLOCKS),
            channel_mode,
            self.allocation.unwrap_or(AllocationArg::Loudness).into(),
            self.subbands.unwrap_or(DEFAULT_SUBBANDS),
            self.bitpool.unwrap_or(DEFAULT_BITPOOL),
        )?;

        Ok(params)
    }

    fn has_frame_settings(&self) -> bool {
        self.subbands.is_some()
            || self.blocks.is_some()
            || self.channel_mode.is_some()
            || self.allocation.is_some()
            || self.bitpool.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sbc::structs::params::AllocationMethod;

    #[test]
    fn parse_yaml_profile() -> Result<()> {
        let config = EncoderConfig::from_yaml(
            "subbands: 4\nchannel-mode: dual-channel\nallocation: snr\nbitpool: 32\n",
        )?;

        assert_eq!(
            config,
            EncoderConfig {
                subbands: Some(4),
                channel_mode: Some(ChannelModeArg::DualChannel),
                allocation: Some(AllocationArg::Snr),
                bitpool: Some(32),
                ..Default::default()
            }
        );

        assert!(EncoderConfig::from_yaml("bitrate: 320\n").is_err());
        Ok(())
    }

    #[test]
    fn command_line_wins() {
        let file = EncoderConfig {
            subbands: Some(4),
            bitpool: Some(32),
            ..Default::default()
        };
        let cli = EncoderConfig {
            bitpool: Some(40),
            blocks: Some(8),
            ..Default::default()
        };

        let merged = file.merge(cli);
        assert_eq!(merged.subbands, Some(4));
        assert_eq!(merged.blocks, Some(8));
        assert_eq!(merged.bitpool, Some(40));
    }

    #[test]
    fn defaults_follow_channel_count() -> Result<()> {
        let config = EncoderConfig::default();

        let stereo = config.resolve(44100, 2)?;
        assert_eq!(stereo.channel_mode, ChannelMode::JointStereo);
        assert_eq!(stereo.allocation, AllocationMethod::Loudness);
        assert_eq!((stereo.subbands, stereo.blocks, stereo.bitpool), (8, 16, 53));

        let mono = config.resolve(48000, 1)?;
        assert_eq!(mono.channel_mode, ChannelMode::Mono);

        assert!(config.resolve(22050, 2).is_err());
        assert_eq!(
            config
                .resolve(48000, 6)
                .err()
                .and_then(|e| e.downcast::<FrameError>().ok()),
            Some(FrameError::UnsupportedChannels(6))
        );
        Ok(())
    }

    #[test]
    fn resolve_checks_layout() -> Result<()> {
        let mono_mode = EncoderConfig {
            channel_mode: Some(ChannelModeArg::Mono),
            ..Default::default()
        };
        assert!(mono_mode.resolve(48000, 2).is_err());

        let msbc = EncoderConfig {
            msbc: Some(true),
            ..Default::default()
        };
        assert_eq!(msbc.resolve(16000, 1)?, CodecParams::msbc());
        assert!(msbc.resolve(16000, 2).is_err());

        let too_large = EncoderConfig {
            subbands: Some(4),
            channel_mode: Some(ChannelModeArg::Mono),
            bitpool: Some(100),
            ..Default::default()
        };
        assert!(too_large.resolve(32000, 1).is_err());
        Ok(())
    }
}
