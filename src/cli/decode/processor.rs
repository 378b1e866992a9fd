use anyhow::{Result, anyhow};
use indicatif::ProgressBar;
use sbc::process::{decode::Decoder, extract::Extractor};
use sbc::structs::params::CodecParams;
use sbc::utils::errors::ExtractError;
use std::sync::mpsc;

/// PCM of one decoded frame, interleaved.
#[derive(Debug)]
pub struct DecodedChunk {
    pub offset: u64,
    pub params: CodecParams,
    pub pcm: Vec<i16>,
}

pub struct ProcessFramesContext<'a> {
    pub extractor: &'a mut Extractor,
    pub decoder: &'a mut Decoder,
    pub frame_count: &'a mut u64,
    pub total_samples: &'a mut u64,
    pub strict_mode: bool,
    pub tx: &'a mpsc::Sender<Result<DecodedChunk>>,
    pub pb: &'a Option<ProgressBar>,
}

/// Drains the extractor. Returns true when processing should stop, either
/// because the receiver hung up or a fatal error was sent.
pub fn process_frames(ctx: &mut ProcessFramesContext) -> Result<bool> {
    loop {
        match ctx.extractor.next() {
            Some(Ok(frame)) => {
                *ctx.frame_count += 1;
                if let Some(pb) = ctx.pb {
                    pb.set_position(*ctx.frame_count);
                }

                match ctx.decoder.decode_to_vec(&frame.data) {
                    Ok((decoded, pcm)) => {
                        *ctx.total_samples += decoded.params.samples_per_frame() as u64;
                        let chunk = DecodedChunk {
                            offset: frame.offset,
                            params: decoded.params,
                            pcm,
                        };
                        if ctx.tx.send(Ok(chunk)).is_err() {
                            return Ok(true);
                        }
                    }
                    Err(e) => {
                        log::error!("Decode error at stream offset {}: {e}", frame.offset);
                        if ctx.strict_mode {
                            let _ = ctx.tx.send(Err(e.into()));
                            return Ok(true);
                        }
                    }
                }
            }
            Some(Err(ExtractError::InsufficientData)) | None => break,
            Some(Err(e)) => {
                // Only errors at or above the fail level reach this point.
                let _ = ctx.tx.send(Err(anyhow!(e)));
                return Ok(true);
            }
        }
    }

    if ctx.extractor.error_count() > 0 {
        if let Some(pb) = ctx.pb {
            pb.set_message("decoding (some frames skipped)");
        }
    }

    Ok(false)
}
