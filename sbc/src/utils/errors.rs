#[macro_export]
macro_rules! log_or_err {
    ($state:expr, $level:expr, $err:expr $(,)?) => {{
        if $level <= $state.fail_level {
            return Err($err);
        } else {
            match $level {
                ::log::Level::Error => ::log::error!("{}", $err),
                ::log::Level::Warn => ::log::warn!("{}", $err),
                ::log::Level::Info => ::log::info!("{}", $err),
                ::log::Level::Debug => ::log::debug!("{}", $err),
                ::log::Level::Trace => ::log::trace!("{}", $err),
            }
        }
    }};
}

/// Errors returned by the encoder and decoder.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SbcError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(&'static str),

    #[error("Invalid frame: {0}")]
    InvalidFrame(#[from] FrameError),

    #[error("CRC mismatch. Calculated {calculated:#04X}, Read {read:#04X}")]
    InvalidCrc { calculated: u8, read: u8 },

    #[error("Insufficient data: frame needs {needed} bytes, {available} available")]
    InsufficientData { needed: usize, available: usize },
}

/// Static invariant violations in a configuration or a parsed header.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("Invalid sync word {0:#04X}")]
    InvalidSyncWord(u8),

    #[error("Reserved header bits must be zero in mSBC frames. Read {0:#06X}")]
    ReservedBitsSet(u16),

    #[error("Unsupported sampling frequency: {0} Hz")]
    UnsupportedSamplingFrequency(u32),

    #[error("Unsupported block count: {0}")]
    UnsupportedBlocks(usize),

    #[error("Unsupported subband count: {0}")]
    UnsupportedSubbands(usize),

    #[error("Unsupported channel count: {0}")]
    UnsupportedChannels(usize),

    #[error("Bitpool must be at least 2. Got {0}")]
    BitpoolTooSmall(u8),

    #[error("Bitpool {bitpool} exceeds the {max} ceiling of this channel mode")]
    BitpoolTooLarge { bitpool: u8, max: u32 },

    #[error("mSBC frames require 16 kHz mono, 15 blocks, 8 subbands, loudness allocation")]
    InvalidMsbcConfiguration,

    #[error("Output buffer too small: frame needs {needed} bytes, {available} available")]
    OutputTooSmall { needed: usize, available: usize },
}

#[derive(thiserror::Error, Debug)]
pub enum ExtractError {
    #[error("Insufficient buffer data for frame extraction")]
    InsufficientData,

    #[error("Invalid frame header at stream offset {offset}: {source}")]
    InvalidHeader { offset: u64, source: FrameError },

    #[error(
        "CRC failed on frame at stream offset {offset}. Calculated {calculated:#04X}, Read {read:#04X}"
    )]
    CrcMismatch {
        offset: u64,
        calculated: u8,
        read: u8,
    },

    #[error("Frame parameters changed at stream offset {offset}")]
    ParametersChanged { offset: u64 },
}
