use anyhow::{Result, anyhow};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::Level;

use super::command::{Cli, InfoArgs};
use crate::input::InputReader;
use crate::timestamp::{duration_secs, time_str};
use sbc::process::extract::{Extractor, Frame};
use sbc::structs::params::CodecParams;
use sbc::utils::errors::ExtractError;

pub fn cmd_info(args: &InfoArgs, cli: &Cli, multi: Option<&MultiProgress>) -> Result<()> {
    log::info!("Analyzing SBC stream: {}", args.input.display());

    let mut input_reader = InputReader::new(&args.input)?;
    let mut extractor = Extractor::default();
    if cli.strict {
        extractor.set_fail_level(Level::Warn);
    }

    let mut context = AnalysisContext::default();

    if let Some(multi) = multi {
        let pb = multi.add(ProgressBar::new_spinner());
        pb.set_style(ProgressStyle::with_template("{spinner:.green} {msg}")?);
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb.set_message("Analyzing frames...");
        context.pb = Some(pb);
    }

    input_reader.process_chunks(64 * 1024, |chunk| {
        context.total_bytes += chunk.len() as u64;
        extractor.push_bytes(chunk);

        for frame_result in extractor.by_ref() {
            match frame_result {
                Ok(frame) => context.process_frame(&frame),
                Err(ExtractError::InsufficientData) => break,
                Err(e) => return Err(anyhow!(e)),
            }
        }

        Ok(true)
    })?;

    if let Some(pb) = context.pb.take() {
        pb.finish_and_clear();
    }

    if context.first.is_none() {
        println!("No SBC frame found in the input.");
        println!("This doesn't appear to be a valid SBC stream.");
        return Ok(());
    }

    display_summary(&context.summary(extractor.error_count(), extractor.buffered()));
    Ok(())
}

#[derive(Default)]
struct AnalysisContext {
    pb: Option<ProgressBar>,
    first: Option<CodecParams>,
    current: Option<CodecParams>,
    frame_count: u64,
    frame_bytes: u64,
    total_bytes: u64,
    duration: f64,
    parameter_changes: u64,
}

struct Summary {
    frame_count: u64,
    frame_bytes: u64,
    total_bytes: u64,
    duration: f64,
    parameter_changes: u64,
    rejected: usize,
    trailing: usize,
}

impl AnalysisContext {
    fn process_frame(&mut self, frame: &Frame) {
        let params = frame.params;

        if self.first.is_none() {
            self.first = Some(params);
            self.display_immediate_info(&params, frame.offset);
        } else if self.current != Some(params) {
            self.parameter_changes += 1;
            let show = || {
                println!("Parameters changed at offset {}", frame.offset);
                display_stream_info(&params);
            };
            match &self.pb {
                Some(pb) => pb.suspend(show),
                None => show(),
            }
        }
        self.current = Some(params);

        self.frame_count += 1;
        self.frame_bytes += frame.data.len() as u64;
        self.duration += duration_secs(params.samples_per_frame() as u64, params.frequency.hz());

        if self.frame_count % 1000 == 0 {
            if let Some(pb) = &self.pb {
                pb.set_message(format!("Analyzing frames...       {}", self.frame_count));
                pb.tick();
            }
        }
    }

    fn display_immediate_info(&self, params: &CodecParams, offset: u64) {
        let show = || {
            println!();
            println!("SBC Stream Information");
            println!("======================");
            println!();
            if offset > 0 {
                println!("First frame at offset       {offset}");
                println!();
            }
            display_stream_info(params);
        };

        match &self.pb {
            Some(pb) => pb.suspend(show),
            None => show(),
        }
    }

    fn summary(&self, rejected: usize, trailing: usize) -> Summary {
        Summary {
            frame_count: self.frame_count,
            frame_bytes: self.frame_bytes,
            total_bytes: self.total_bytes,
            duration: self.duration,
            parameter_changes: self.parameter_changes,
            rejected,
            trailing,
        }
    }
}

fn display_stream_info(params: &CodecParams) {
    println!("Stream Information");
    println!("  Profile                   {}", if params == &CodecParams::msbc() { "mSBC" } else { "SBC" });
    println!("  Sampling rate             {} Hz", params.frequency.hz());
    println!("  Channel mode              {}", params.channel_mode);
    println!("  Blocks                    {}", params.blocks);
    println!("  Subbands                  {}", params.subbands);
    println!("  Allocation method         {}", params.allocation);
    println!("  Bitpool                   {}", params.bitpool);
    println!("  Frame length              {} bytes", params.frame_length());
    println!("  Samples per frame         {}", params.samples_per_frame());
    println!("  Bitrate                   {:.1} kbps", params.bitrate() as f64 / 1000.0);
    println!();
}

fn display_summary(summary: &Summary) {
    println!("Analysis Summary");
    println!("  Frames processed          {}", summary.frame_count);

    let size_mb = summary.total_bytes as f64 / 1_000_000.0;
    println!(
        "  Size                      {size_mb:.2} MB ({} bytes)",
        summary.total_bytes
    );
    println!("  Duration                  {}", time_str(summary.duration));

    if summary.duration > 0.0 {
        let avg_data_rate_kbps = summary.frame_bytes as f64 * 8.0 / summary.duration / 1000.0;
        println!("  Average data rate         {avg_data_rate_kbps:.1} kbps");
    }
    if summary.parameter_changes > 0 {
        println!("  Parameter changes         {}", summary.parameter_changes);
    }
    if summary.rejected > 0 {
        println!("  Rejected candidates       {}", summary.rejected);
    }
    if summary.trailing > 0 {
        println!("  Trailing bytes            {}", summary.trailing);
    }
    println!();
}
