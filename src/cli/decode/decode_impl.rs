use super::decoder_thread::{DecoderThreadConfig, spawn_decoder_thread};
use super::handler::{DecodeHandler, FrameHandlerContext, WriterState};
use super::progress::{create_progress_bar, estimate_total_frames, finalize_progress_bar};
use crate::cli::command::{Cli, DecodeArgs};
use crate::input::is_pipe;
use anyhow::{Context, Result, bail};
use indicatif::MultiProgress;
use log::Level;
use sbc::process::{decode::Decoder, extract::Extractor};
use std::fs::File;
use std::sync::mpsc;

pub fn cmd_decode(args: &DecodeArgs, cli: &Cli, multi: Option<&MultiProgress>) -> Result<()> {
    log::info!(
        "Decoding SBC stream: {} (strict mode: {})",
        args.input.display(),
        cli.strict
    );

    let sink = match &args.output {
        Some(path) if is_pipe(path) => {
            bail!("WAV output needs a seekable file, cannot write to stdout")
        }
        Some(path) => {
            log::info!("Output path specified: {}", path.display());
            let file = File::create(path)
                .with_context(|| format!("Failed to create output {}", path.display()))?;
            Some(file)
        }
        None => {
            log::info!("No output path given, decoding for verification only");
            None
        }
    };

    let pipe_input = is_pipe(&args.input);
    let should_estimate = !args.no_estimate_progress && !pipe_input && multi.is_some();
    let total_frames = if should_estimate {
        estimate_total_frames(&args.input)?
    } else {
        if pipe_input {
            log::debug!("Skipping progress estimation for pipe input");
        } else if args.no_estimate_progress {
            log::debug!("Progress estimation disabled by --no-estimate-progress flag");
        }
        None
    };

    let pb = if let Some(multi) = multi {
        Some(create_progress_bar(multi, total_frames, "decoding")?)
    } else {
        None
    };

    let fail_level = if cli.strict {
        Level::Warn
    } else {
        Level::Error
    };

    let mut extractor = Extractor::default();
    extractor.set_fail_level(fail_level);

    let (tx, rx) = mpsc::channel();
    let decode_thread = spawn_decoder_thread(DecoderThreadConfig {
        input_path: args.input.clone(),
        strict_mode: cli.strict,
        tx,
        pb: pb.clone(),
        extractor,
        decoder: Decoder::default(),
    });

    let state = WriterState { fail_level };
    let mut handler = DecodeHandler::new(sink);
    let start_time = std::time::Instant::now();

    while let Ok(result) = rx.recv() {
        let handled = result.and_then(|decoded| {
            let ctx = FrameHandlerContext {
                pb: &pb,
                state: &state,
            };
            handler.handle_decoded_frame(decoded, &ctx)
        });

        if let Err(e) = handled {
            if let Some(pb) = &pb {
                pb.finish_with_message("decode failed");
            }
            return Err(e);
        }
    }

    handler.finalize()?;

    match decode_thread.join() {
        Ok(Ok(())) => {
            finalize_progress_bar(
                &pb,
                total_frames,
                handler.decoded_samples,
                handler.final_sample_rate,
                start_time,
            );
            if handler.decoded_frames == 0 {
                bail!("No SBC frames found in {}", args.input.display());
            }
            log::info!(
                "Decoding completed successfully: {} frames",
                handler.decoded_frames
            );
        }
        Ok(Err(e)) => {
            if let Some(pb) = &pb {
                pb.finish_with_message("decode failed");
            }
            return Err(e);
        }
        Err(_) => {
            if let Some(pb) = &pb {
                pb.finish_with_message("decode thread panicked");
            }
            return Err(anyhow::anyhow!("Decode thread panicked"));
        }
    }

    Ok(())
}
