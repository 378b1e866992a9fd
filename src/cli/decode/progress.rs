use crate::input::InputReader;
use crate::timestamp::{duration_secs, time_str};
use anyhow::Result;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Instant;
use sbc::process::extract::Extractor;

/// Estimates the frame count from the file size and the length of the first
/// valid frame. SBC streams rarely change their configuration, so this is
/// exact for most inputs.
pub fn estimate_total_frames(input_path: &Path) -> Result<Option<u64>> {
    let file_size = std::fs::metadata(input_path)?.len();

    let mut input_reader = InputReader::new(input_path)?;
    let mut extractor = Extractor::default();
    let mut frame_length = None;

    input_reader.process_chunks(4096, |chunk| {
        extractor.push_bytes(chunk);
        frame_length = extractor
            .by_ref()
            .find_map(|result| result.ok())
            .map(|frame| frame.data.len() as u64);

        Ok(frame_length.is_none())
    })?;

    let Some(frame_length) = frame_length else {
        log::debug!("No frame found for progress estimation");
        return Ok(None);
    };

    let estimate = file_size / frame_length;
    log::debug!("Estimated {estimate} frames of {frame_length} bytes in {file_size} bytes");

    Ok(Some(estimate))
}

pub fn create_progress_bar(
    multi: &MultiProgress,
    total_frames: Option<u64>,
    message: &'static str,
) -> Result<ProgressBar> {
    let pb = if let Some(total) = total_frames {
        let pb = multi.add(ProgressBar::new(total));
        pb.set_style(ProgressStyle::with_template(
            "{bar:40.cyan/blue} {pos}/{len} frames ({percent}%)\n{msg} | elapsed: {elapsed_precise} | ETA: {eta_precise}",
        )?);

        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    } else {
        let pb = multi.add(ProgressBar::new_spinner());
        pb.set_style(ProgressStyle::with_template(
            "{spinner:.green} {pos} frames\n{msg} | elapsed: {elapsed_precise}",
        )?);

        pb
    };
    pb.set_message(message);
    Ok(pb)
}

/// Replaces the ETA with the realtime factor and the audio position reached.
pub fn finalize_progress_bar(
    pb: &Option<ProgressBar>,
    total_frames: Option<u64>,
    samples: u64,
    sample_rate: u32,
    start_time: Instant,
) {
    let Some(pb) = pb else {
        return;
    };

    let elapsed = start_time.elapsed();
    let audio_duration_secs = duration_secs(samples, sample_rate);
    let realtime_multiplier = audio_duration_secs / elapsed.as_secs_f64().max(1e-6);
    let final_time_str = time_str(audio_duration_secs);

    if total_frames.is_some() {
        pb.set_style(
            ProgressStyle::with_template(
                "{bar:40.cyan/blue} {pos}/{len} frames ({percent}%)\n{msg} | elapsed: {elapsed_precise}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
    } else {
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} {pos} frames\n{msg} | elapsed: {elapsed_precise}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
    }

    pb.finish_with_message(format!(
        "speed: {realtime_multiplier:.1}x | timestamp: {final_time_str}"
    ));
}
