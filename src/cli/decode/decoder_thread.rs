use super::processor::{DecodedChunk, ProcessFramesContext, process_frames};
use crate::input::InputReader;
use anyhow::Result;
use indicatif::ProgressBar;
use sbc::process::{decode::Decoder, extract::Extractor};
use std::sync::mpsc;
use std::thread;

pub struct DecoderThreadConfig {
    pub input_path: std::path::PathBuf,
    pub strict_mode: bool,
    pub tx: mpsc::Sender<Result<DecodedChunk>>,
    pub pb: Option<ProgressBar>,
    pub extractor: Extractor,
    pub decoder: Decoder,
}

pub fn spawn_decoder_thread(config: DecoderThreadConfig) -> thread::JoinHandle<Result<()>> {
    thread::spawn(move || -> Result<()> {
        let DecoderThreadConfig {
            input_path,
            strict_mode,
            tx,
            pb,
            mut extractor,
            mut decoder,
        } = config;

        let mut frame_count: u64 = 0;
        let mut total_samples = 0u64;

        let mut input_reader = InputReader::new(&input_path)?;

        input_reader.process_chunks(64 * 1024, |chunk| {
            extractor.push_bytes(chunk);

            let mut ctx = ProcessFramesContext {
                extractor: &mut extractor,
                decoder: &mut decoder,
                frame_count: &mut frame_count,
                total_samples: &mut total_samples,
                strict_mode,
                tx: &tx,
                pb: &pb,
            };

            let should_exit = process_frames(&mut ctx)?;

            Ok(!should_exit)
        })?;

        let trailing = extractor.buffered();
        if trailing > 0 {
            log::warn!("Discarding {trailing} trailing bytes that do not form a complete frame");
        }

        log::info!(
            "Processing complete: {frame_count} frames, {total_samples} samples per channel, {} rejected frame candidates",
            extractor.error_count()
        );
        Ok(())
    })
}
