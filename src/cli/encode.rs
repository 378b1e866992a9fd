use std::io::{Read, Write};
use std::time::Instant;

use anyhow::{Result, bail};
use indicatif::MultiProgress;

use super::command::EncodeArgs;
use super::decode::progress::{create_progress_bar, finalize_progress_bar};
use crate::config::EncoderConfig;
use crate::input::{InputReader, create_output};
use crate::wav::WAVReader;
use sbc::process::encode::Encoder;

pub fn cmd_encode(args: &EncodeArgs, multi: Option<&MultiProgress>) -> Result<()> {
    log::info!("Encoding WAV input: {}", args.input.display());

    let mut reader = WAVReader::new(InputReader::new(&args.input)?)?;
    let format = reader.format().clone();
    log::debug!(
        "Input format: {} Hz, {} channels, {} bits",
        format.sample_rate,
        format.channels,
        format.bits_per_sample
    );

    let file_config = match &args.config {
        Some(path) => EncoderConfig::from_path(path)?,
        None => EncoderConfig::default(),
    };
    let config = file_config.merge(EncoderConfig::from_args(args));
    let params = config.resolve(format.sample_rate, format.channels)?;

    let mut encoder = Encoder::new(params)?;
    log::info!(
        "Codec parameters: {params} ({} bytes per frame, {:.1} kbps)",
        encoder.frame_length(),
        params.bitrate() as f64 / 1000.0
    );

    let total_frames = reader
        .frames_hint()
        .map(|samples| samples.div_ceil(params.samples_per_frame() as u64));
    let pb = if let Some(multi) = multi {
        Some(create_progress_bar(multi, total_frames, "encoding")?)
    } else {
        None
    };

    let mut output = create_output(&args.output)?;
    let start_time = Instant::now();

    let stats = encode_stream(&mut reader, &mut encoder, &mut output, |frames| {
        if let Some(pb) = &pb {
            pb.set_position(frames);
        }
    })?;
    output.flush()?;

    if stats.frames == 0 {
        if let Some(pb) = &pb {
            pb.finish_with_message("no audio");
        }
        bail!("Input {} contains no audio samples", args.input.display());
    }

    finalize_progress_bar(
        &pb,
        total_frames,
        stats.samples,
        params.frequency.hz(),
        start_time,
    );

    if stats.padding > 0 {
        log::debug!(
            "Final frame padded with {} samples of silence per channel",
            stats.padding
        );
    }

    log::info!(
        "Encoding completed successfully: {} frames, {} bytes",
        stats.frames,
        stats.bytes
    );

    Ok(())
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EncodeStats {
    pub frames: u64,
    pub bytes: u64,
    /// Per-channel samples read from the input.
    pub samples: u64,
    /// Per-channel samples of silence appended to complete the last frame.
    pub padding: u64,
}

/// Encodes every sample of `reader` and writes the frames to `output`.
pub fn encode_stream<R: Read, W: Write>(
    reader: &mut WAVReader<R>,
    encoder: &mut Encoder,
    output: &mut W,
    mut on_frame: impl FnMut(u64),
) -> Result<EncodeStats> {
    let channels = encoder.params().channels();
    let codesize = encoder.codesize();
    let mut pcm = vec![0i16; codesize];
    let mut frame = vec![0u8; encoder.frame_length()];
    let mut stats = EncodeStats::default();

    loop {
        let filled = read_full(reader, &mut pcm)?;
        if filled == 0 {
            break;
        }

        if filled < codesize {
            pcm[filled..].fill(0);
            stats.padding = ((codesize - filled) / channels) as u64;
        }

        let (_, written) = encoder.encode(&pcm, &mut frame)?;
        output.write_all(&frame[..written])?;

        stats.frames += 1;
        stats.bytes += written as u64;
        stats.samples += (filled / channels) as u64;
        on_frame(stats.frames);

        if filled < codesize {
            break;
        }
    }

    Ok(stats)
}

fn read_full<R: Read>(reader: &mut WAVReader<R>, buf: &mut [i16]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read_samples(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wav::WAVWriter;
    use sbc::process::decode::Decoder;
    use sbc::process::extract::Extractor;
    use sbc::structs::params::CodecParams;
    use std::io::Cursor;

    fn wav_input(sample_rate: u32, channels: u16, samples: &[i16]) -> Result<Vec<u8>> {
        let mut writer = WAVWriter::new(Cursor::new(Vec::new()));
        writer.configure_audio_format(sample_rate, channels)?;
        writer.write_header()?;
        writer.write_pcm_16bit(samples)?;
        writer.finish()?;

        Ok(writer.into_inner()?.into_inner())
    }

    #[test]
    fn pads_final_frame() -> Result<()> {
        let samples = (0..300)
            .map(|i| ((i as f64 * 0.05).sin() * 8000.0) as i16)
            .collect::<Vec<_>>();
        let mut reader = WAVReader::new(Cursor::new(wav_input(16000, 1, &samples)?))?;
        let mut encoder = Encoder::new(CodecParams::msbc())?;
        let mut output = Vec::new();

        let mut positions = Vec::new();
        let stats = encode_stream(&mut reader, &mut encoder, &mut output, |f| positions.push(f))?;

        assert_eq!(
            stats,
            EncodeStats {
                frames: 3,
                bytes: 3 * 57,
                samples: 300,
                padding: 60,
            }
        );
        assert_eq!(positions, [1, 2, 3]);
        assert_eq!(output.len(), 171);

        let mut extractor = Extractor::default();
        extractor.push_bytes(&output);
        let mut decoder = Decoder::default();
        let mut decoded = 0;
        for frame in extractor.filter_map(Result::ok) {
            let (result, _) = decoder.decode_to_vec(&frame.data)?;
            decoded += result.samples;
        }
        assert_eq!(decoded, 360);
        Ok(())
    }

    #[test]
    fn empty_input_produces_nothing() -> Result<()> {
        let mut reader = WAVReader::new(Cursor::new(wav_input(16000, 1, &[])?))?;
        let mut encoder = Encoder::new(CodecParams::msbc())?;
        let mut output = Vec::new();

        let stats = encode_stream(&mut reader, &mut encoder, &mut output, |_| {})?;
        assert_eq!(stats, EncodeStats::default());
        assert!(output.is_empty());
        Ok(())
    }
}
