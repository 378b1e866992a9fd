use crate::log_or_err;
use crate::process::parse::{frame_crc, parse_header};
use crate::structs::params::{CodecParams, HEADER_LEN, MSBC_SYNCWORD, SBC_SYNCWORD};
use crate::utils::errors::{ExtractError, SbcError};
use log::{Level, debug};
use std::collections::VecDeque;
use std::sync::Arc;

/// Splits a continuous byte stream into SBC frames.
///
/// Data is pushed in arbitrary chunks. The extractor looks for a sync byte,
/// checks the header and CRC of the candidate frame and hands out complete
/// frames. A rejected candidate moves the search forward by one byte.
///
/// Rejections are logged at `Debug` until the first frame is found and at
/// `Warn` afterwards; raising the fail level with
/// [`Extractor::set_fail_level`] turns them into errors.
///
/// ```rust
/// use sbc::process::encode::Encoder;
/// use sbc::process::extract::Extractor;
/// use sbc::structs::params::CodecParams;
///
/// let mut encoder = Encoder::new(CodecParams::msbc())?;
/// let (_, frame) = encoder.encode_to_vec(&[0; 120])?;
///
/// let mut stream = vec![0xff, 0x00];
/// stream.extend_from_slice(&frame);
/// stream.extend_from_slice(&frame);
///
/// let mut extractor = Extractor::default();
/// extractor.push_bytes(&stream);
///
/// let frames = extractor.filter_map(Result::ok).count();
/// assert_eq!(frames, 2);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct Extractor {
    buffer: VecDeque<u8>,
    params: Option<CodecParams>,
    offset: u64,
    pending: bool,
    error_count: usize,
    frames_processed: usize,
    fail_level: Level,
}

impl Default for Extractor {
    fn default() -> Self {
        Self {
            buffer: VecDeque::with_capacity(4096),
            params: None,
            offset: 0,
            pending: false,
            error_count: 0,
            frames_processed: 0,
            fail_level: Level::Error,
        }
    }
}

impl Extractor {
    /// Appends stream bytes to the internal buffer.
    pub fn push_bytes(&mut self, data: &[u8]) {
        self.buffer.extend(data);
        self.pending = true;
    }

    /// Sets the level at which rejected data becomes an error.
    ///
    /// - `log::Level::Error`: only fail on Error level messages (default)
    /// - `log::Level::Warn`: also fail on mid-stream corruption and parameter changes
    pub fn set_fail_level(&mut self, level: Level) {
        self.fail_level = level;
    }

    /// Parameters of the most recent frame, once the stream is locked.
    pub fn params(&self) -> Option<CodecParams> {
        self.params
    }

    /// Bytes waiting in the buffer, such as a truncated trailing frame.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Candidate frames rejected so far.
    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn frames_processed(&self) -> usize {
        self.frames_processed
    }

    fn consume_front(&mut self, cnt: usize) {
        self.buffer.drain(..cnt);
        self.offset += cnt as u64;
    }

    /// Drops everything before the next sync byte.
    fn seek_sync(&mut self) {
        let skip = self
            .buffer
            .iter()
            .position(|&b| b == SBC_SYNCWORD || b == MSBC_SYNCWORD)
            .unwrap_or(self.buffer.len());

        if skip > 0 {
            debug!("Skipped {skip} bytes at stream offset {}", self.offset);
            self.consume_front(skip);
        }
    }

    fn reject_level(&self) -> Level {
        if self.params.is_some() {
            Level::Warn
        } else {
            Level::Debug
        }
    }

    fn extract(&mut self) -> Result<Frame, ExtractError> {
        loop {
            self.seek_sync();

            if self.buffer.len() < HEADER_LEN {
                return Err(ExtractError::InsufficientData);
            }

            let offset = self.offset;
            let header = [self.buffer[0], self.buffer[1], self.buffer[2], self.buffer[3]];
            let params = match parse_header(&header) {
                Ok(params) => params,
                Err(SbcError::InvalidFrame(source)) => {
                    self.consume_front(1);
                    self.error_count += 1;
                    log_or_err!(
                        self,
                        self.reject_level(),
                        ExtractError::InvalidHeader { offset, source }
                    );
                    continue;
                }
                Err(_) => return Err(ExtractError::InsufficientData),
            };

            let length = params.frame_length();
            if self.buffer.len() < length {
                return Err(ExtractError::InsufficientData);
            }

            let data = self.buffer.range(..length).copied().collect::<Vec<_>>();
            let calculated = match frame_crc(&data, &params) {
                Ok(crc) => crc,
                Err(_) => return Err(ExtractError::InsufficientData),
            };
            if calculated != data[3] {
                self.consume_front(1);
                self.error_count += 1;
                log_or_err!(
                    self,
                    self.reject_level(),
                    ExtractError::CrcMismatch {
                        offset,
                        calculated,
                        read: data[3],
                    }
                );
                continue;
            }

            self.consume_front(length);
            self.frames_processed += 1;

            let previous = self.params.replace(params);
            if previous.is_some_and(|p| p != params) {
                log_or_err!(self, Level::Warn, ExtractError::ParametersChanged { offset });
            }

            return Ok(Frame {
                offset,
                params,
                data: data.into(),
            });
        }
    }
}

impl Iterator for Extractor {
    type Item = Result<Frame, ExtractError>;

    /// Yields the next frame, or one `InsufficientData` error once the
    /// buffered data runs out. Iteration then stops until more bytes are
    /// pushed.
    fn next(&mut self) -> Option<Self::Item> {
        if !self.pending {
            return None;
        }

        let result = self.extract();
        if matches!(result, Err(ExtractError::InsufficientData)) {
            self.pending = false;
        }

        Some(result)
    }
}

/// A complete SBC frame cut from a stream.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Stream offset of the sync byte.
    pub offset: u64,
    pub params: CodecParams,
    pub data: Arc<[u8]>,
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::analysis::tests::test_signal;
    use crate::process::encode::Encoder;
    use crate::structs::params::{AllocationMethod, ChannelMode, SamplingFrequency};
    use crate::utils::errors::FrameError;

    fn encoded_frames(params: CodecParams, count: usize) -> anyhow::Result<Vec<Vec<u8>>> {
        let mut encoder = Encoder::new(params)?;
        let pcm = test_signal(count * params.samples_per_frame(), params.channels());

        let frames = pcm
            .chunks_exact(encoder.codesize())
            .map(|chunk| encoder.encode_to_vec(chunk).map(|(_, frame)| frame))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(frames)
    }

    // Four joint stereo frames with two rejected candidates in between.
    fn corrupted_stream() -> anyhow::Result<(Vec<Vec<u8>>, Vec<u8>)> {
        let params = CodecParams::new(
            SamplingFrequency::Freq48000,
            16,
            ChannelMode::JointStereo,
            AllocationMethod::Loudness,
            8,
            35,
        )?;
        let frames = encoded_frames(params, 4)?;

        let mut stream = vec![0x00, 0x12];
        stream.extend_from_slice(&frames[0]);
        // Bitpool zero.
        stream.extend_from_slice(&[0x9c, 0x00, 0x00, 0x00, 0xff, 0xff]);
        stream.extend_from_slice(&frames[1]);
        // mSBC with reserved bits set.
        stream.extend_from_slice(&[0xad, 0x01, 0x00, 0x00]);
        stream.extend_from_slice(&frames[2]);
        stream.extend_from_slice(&frames[3]);

        Ok((frames, stream))
    }

    #[test]
    fn skip_invalid_data() -> anyhow::Result<()> {
        let (frames, stream) = corrupted_stream()?;
        let mut extractor = Extractor::default();
        extractor.push_bytes(&stream);

        let mut extracted = Vec::new();
        let mut end_with_insufficient_data = false;
        for result in &mut extractor {
            match result {
                Ok(frame) => extracted.push(frame),
                Err(ExtractError::InsufficientData) => end_with_insufficient_data = true,
                Err(e) => anyhow::bail!("unexpected error: {e}"),
            }
        }

        assert!(end_with_insufficient_data);
        assert_eq!(extracted.len(), 4);
        for (frame, expected) in extracted.iter().zip(&frames) {
            assert_eq!(frame.as_ref(), expected.as_slice());
        }
        assert_eq!(extracted[0].offset, 2);
        assert_eq!(extracted[1].offset, 2 + frames[0].len() as u64 + 6);
        assert_eq!(extractor.error_count(), 2);
        assert_eq!(extractor.buffered(), 0);
        Ok(())
    }

    #[test]
    fn buf_extract() -> anyhow::Result<()> {
        let (frames, stream) = corrupted_stream()?;
        let mut extractor = Extractor::default();
        let mut extracted = Vec::new();

        for chunk in stream.chunks(7) {
            extractor.push_bytes(chunk);
            for result in &mut extractor {
                if let Ok(frame) = result {
                    extracted.push(frame.data.to_vec());
                }
            }
        }

        assert_eq!(extracted, frames);
        assert_eq!(extractor.frames_processed(), 4);
        Ok(())
    }

    #[test]
    fn strict_mode_reports_corruption() -> anyhow::Result<()> {
        let (frames, stream) = corrupted_stream()?;
        let mut extractor = Extractor::default();
        extractor.set_fail_level(Level::Warn);
        extractor.push_bytes(&stream);

        let results = extractor.by_ref().collect::<Vec<_>>();
        let errors = results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .collect::<Vec<_>>();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 4);
        assert!(matches!(
            errors[0],
            ExtractError::InvalidHeader {
                source: FrameError::BitpoolTooSmall(0),
                ..
            }
        ));
        assert!(matches!(
            errors[1],
            ExtractError::InvalidHeader {
                source: FrameError::ReservedBitsSet(0x0100),
                ..
            }
        ));
        assert!(matches!(errors[2], ExtractError::InsufficientData));
        assert_eq!(errors.len(), 3);
        assert_eq!(frames.len(), 4);
        Ok(())
    }

    #[test]
    fn parameter_change() -> anyhow::Result<()> {
        let msbc = encoded_frames(CodecParams::msbc(), 1)?;
        let mono = encoded_frames(
            CodecParams::new(
                SamplingFrequency::Freq32000,
                8,
                ChannelMode::Mono,
                AllocationMethod::Snr,
                4,
                20,
            )?,
            1,
        )?;
        let stream = [msbc[0].as_slice(), mono[0].as_slice()].concat();

        let mut lenient = Extractor::default();
        lenient.push_bytes(&stream);
        assert_eq!(lenient.by_ref().filter(|r| r.is_ok()).count(), 2);
        assert_eq!(lenient.params().map(|p| p.subbands), Some(4));

        let mut strict = Extractor::default();
        strict.set_fail_level(Level::Warn);
        strict.push_bytes(&stream);
        assert!(strict.next().is_some_and(|r| r.is_ok()));
        assert!(matches!(
            strict.next(),
            Some(Err(ExtractError::ParametersChanged { offset: 57 }))
        ));
        Ok(())
    }

    #[test]
    fn truncated_tail_stays_buffered() -> anyhow::Result<()> {
        let frames = encoded_frames(CodecParams::msbc(), 2)?;
        let mut extractor = Extractor::default();
        extractor.push_bytes(&frames[0]);
        extractor.push_bytes(&frames[1][..30]);

        assert!(extractor.next().is_some_and(|r| r.is_ok()));
        assert!(matches!(
            extractor.next(),
            Some(Err(ExtractError::InsufficientData))
        ));
        assert!(extractor.next().is_none());
        assert_eq!(extractor.buffered(), 30);

        extractor.push_bytes(&frames[1][30..]);
        let frame = extractor.next().and_then(Result::ok);
        assert_eq!(frame.map(|f| f.offset), Some(57));
        Ok(())
    }
}
