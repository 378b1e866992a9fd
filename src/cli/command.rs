use std::path::PathBuf;

use clap::{Args, Parser as ClapParser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

use sbc::structs::params::{AllocationMethod, ChannelMode};

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("VERGEN_GIT_DESCRIBE"),
    ", built ",
    env!("BUILD_TIMESTAMP"),
    ")\nsbc library ",
    env!("SBC_VERSION"),
);

#[derive(Debug, ClapParser)]
#[command(
    name         = env!("CARGO_PKG_NAME"),
    version      = env!("CARGO_PKG_VERSION"),
    long_version = LONG_VERSION,
    author       = env!("CARGO_PKG_AUTHORS"),
    about        = "Tools for encoding, decoding and inspecting Bluetooth SBC streams",
    long_about   = None,
)]
pub struct Cli {
    /// Set the log level
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    pub loglevel: LogLevel,

    /// Treat warnings as fatal errors (fail on first warning).
    #[arg(long, global = true)]
    pub strict: bool,

    /// Log output format.
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,

    /// Show progress bars during operations.
    #[arg(long, global = true)]
    pub progress: bool,

    /// Choose an operation to perform.
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Encode a 16-bit PCM WAV file into a raw SBC stream.
    Encode(EncodeArgs),

    /// Decode a raw SBC stream into a 16-bit PCM WAV file.
    Decode(DecodeArgs),

    /// Print stream information
    Info(InfoArgs),
}

#[derive(Debug, Args)]
pub struct EncodeArgs {
    /// Input WAV file (use "-" for stdin).
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output SBC stream (use "-" for stdout).
    #[arg(short, long, value_name = "PATH")]
    pub output: PathBuf,

    /// YAML encoder profile. Options given on the command line take precedence.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Number of subbands (4 or 8).
    #[arg(long)]
    pub subbands: Option<usize>,

    /// Blocks per frame (4, 8, 12 or 16).
    #[arg(long)]
    pub blocks: Option<usize>,

    /// Channel mode. Defaults to joint stereo for two channels.
    #[arg(long, value_enum)]
    pub mode: Option<ChannelModeArg>,

    /// Bit allocation method.
    #[arg(long, value_enum)]
    pub allocation: Option<AllocationArg>,

    /// Bitpool, the per-frame bit budget of the audio data.
    #[arg(long)]
    pub bitpool: Option<u8>,

    /// Produce mSBC frames (16 kHz mono input only).
    #[arg(long)]
    pub msbc: bool,
}

#[derive(Debug, Args)]
pub struct DecodeArgs {
    /// Input SBC stream (use "-" for stdin).
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Output WAV file. Without it the stream is decoded and verified only.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Disable progress estimation
    #[arg(long)]
    pub no_estimate_progress: bool,
}

#[derive(Debug, Args)]
pub struct InfoArgs {
    /// Input SBC stream (use "-" for stdin).
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogLevel {
    /// Disable logging output.
    Off,
    /// No output except errors.
    Error,
    /// Show warnings and errors.
    Warn,
    /// Show info, warnings and errors (default).
    Info,
    /// Show debug, info, warnings and errors.
    Debug,
    /// Show all log messages including trace.
    Trace,
}

impl LogLevel {
    /// Convert LogLevel to log::LevelFilter
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormat {
    /// Colorized human-readable text.
    Plain,
    /// Structured JSON per log record.
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChannelModeArg {
    Mono,
    DualChannel,
    Stereo,
    JointStereo,
}

impl From<ChannelModeArg> for ChannelMode {
    fn from(mode: ChannelModeArg) -> Self {
        match mode {
            ChannelModeArg::Mono => ChannelMode::Mono,
            ChannelModeArg::DualChannel => ChannelMode::DualChannel,
            ChannelModeArg::Stereo => ChannelMode::Stereo,
            ChannelModeArg::JointStereo => ChannelMode::JointStereo,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum AllocationArg {
    Loudness,
    Snr,
}

impl From<AllocationArg> for AllocationMethod {
    fn from(allocation: AllocationArg) -> Self {
        match allocation {
            AllocationArg::Loudness => AllocationMethod::Loudness,
            AllocationArg::Snr => AllocationMethod::Snr,
        }
    }
}
