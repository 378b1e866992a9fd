use super::processor::DecodedChunk;
use crate::wav::WAVWriter;
use anyhow::{Result, anyhow};
use indicatif::ProgressBar;
use log::Level;
use sbc::log_or_err;
use std::io::{Seek, Write};

pub struct WriterState {
    pub fail_level: Level,
}

/// Collects decoded frames into a WAV writer.
///
/// The output layout is fixed by the first frame. Later frames with a
/// different rate or channel count cannot be stored in the same file and are
/// dropped.
pub struct DecodeHandler<W: Write + Seek> {
    sink: Option<W>,
    writer: Option<WAVWriter<W>>,
    layout: Option<(u32, u16)>,
    pub decoded_frames: u64,
    pub decoded_samples: u64,
    pub dropped_frames: u64,
    pub final_sample_rate: u32,
}

pub struct FrameHandlerContext<'a> {
    pub pb: &'a Option<ProgressBar>,
    pub state: &'a WriterState,
}

impl<W: Write + Seek> DecodeHandler<W> {
    /// `sink` receives the WAV file; without one the frames are only counted.
    pub fn new(sink: Option<W>) -> Self {
        Self {
            sink,
            writer: None,
            layout: None,
            decoded_frames: 0,
            decoded_samples: 0,
            dropped_frames: 0,
            final_sample_rate: 48000,
        }
    }

    pub fn handle_decoded_frame(
        &mut self,
        decoded: DecodedChunk,
        ctx: &FrameHandlerContext,
    ) -> Result<()> {
        let sample_rate = decoded.params.frequency.hz();
        let channels = decoded.params.channels() as u16;

        match self.layout {
            None => {
                log::info!("Stream format: {}", decoded.params);
                self.layout = Some((sample_rate, channels));
                self.final_sample_rate = sample_rate;
                self.create_writer(sample_rate, channels)?;
            }
            Some(layout) if layout != (sample_rate, channels) => {
                self.dropped_frames += 1;
                if let Some(pb) = ctx.pb {
                    pb.set_message("decoding (format change, frames dropped)");
                }
                log_or_err!(
                    ctx.state,
                    Level::Warn,
                    anyhow!(
                        "Dropping frame at stream offset {}: {sample_rate} Hz, {channels} channels does not match the output format {} Hz, {} channels",
                        decoded.offset,
                        layout.0,
                        layout.1
                    )
                );
                return Ok(());
            }
            Some(_) => {}
        }

        if let Some(writer) = self.writer.as_mut() {
            writer.write_pcm_16bit(&decoded.pcm)?;
        }

        self.decoded_frames += 1;
        self.decoded_samples += decoded.params.samples_per_frame() as u64;

        Ok(())
    }

    fn create_writer(&mut self, sample_rate: u32, channels: u16) -> Result<()> {
        let Some(sink) = self.sink.take() else {
            return Ok(());
        };

        let mut writer = WAVWriter::new(sink);
        writer.configure_audio_format(sample_rate, channels)?;
        writer.write_header()?;
        self.writer = Some(writer);

        Ok(())
    }

    /// Patches the WAV header and returns the sink.
    pub fn finalize(&mut self) -> Result<Option<W>> {
        let Some(mut writer) = self.writer.take() else {
            return Ok(self.sink.take());
        };

        writer.finish()?;
        let stats = writer.stats();
        log::info!(
            "Wrote {} bytes of PCM ({} Hz, {} channels)",
            stats.data_written,
            stats.sample_rate,
            stats.channels
        );

        if self.dropped_frames > 0 {
            log::warn!(
                "{} frames were dropped because their format differed from the first frame",
                self.dropped_frames
            );
        }

        Ok(Some(writer.into_inner()?))
    }
}
