use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};

use crate::byteorder::WriteBytesLe;
use sbcd_macros::{ToBytes, riff_chunk};

pub const WAVE_FORMAT_PCM: u16 = 0x0001;
pub const WAVE_FORMAT_EXTENSIBLE: u16 = 0xfffe;

/// `KSDATAFORMAT_SUBTYPE_PCM`, the subformat of extensible integer PCM.
const SUBTYPE_PCM: [u8; 16] = [
    0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x10, 0x00, 0x80, 0x00, 0x00, 0xaa, 0x00, 0x38, 0x9b, 0x71,
];

/// Largest fmt chunk body read: the extensible layout.
const MAX_FMT_SIZE: usize = 40;

/// Sample width of everything read and written here.
pub const BITS_PER_SAMPLE: u16 = 16;

/// A chunk of a RIFF file: four-byte id, 32-bit little-endian size, body and
/// a pad byte when the body length is odd.
pub trait RiffChunk {
    fn chunk_id(&self) -> &[u8; 4];
    fn chunk_data(&self) -> Vec<u8>;

    fn write_all<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        let data = self.chunk_data();

        writer.write_all(self.chunk_id())?;
        writer.write_all(&(data.len() as u32).to_le_bytes())?;
        writer.write_all(&data)?;
        if data.len() % 2 == 1 {
            writer.write_all(&[0])?;
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, ToBytes)]
#[riff_chunk(b"fmt ")]
pub struct FormatChunk {
    pub format_tag: u16,
    pub channels: u16,
    pub sample_rate: u32,
    pub byte_rate: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
}

impl FormatChunk {
    pub fn pcm16(sample_rate: u32, channels: u16) -> Self {
        let block_align = channels * (BITS_PER_SAMPLE / 8);
        Self {
            format_tag: WAVE_FORMAT_PCM,
            channels,
            sample_rate,
            byte_rate: sample_rate * block_align as u32,
            block_align,
            bits_per_sample: BITS_PER_SAMPLE,
        }
    }

    fn parse(data: &[u8]) -> io::Result<Self> {
        if data.len() < 16 {
            return Err(invalid_data("fmt chunk is shorter than 16 bytes"));
        }

        let u16_at = |i: usize| u16::from_le_bytes([data[i], data[i + 1]]);
        let u32_at = |i: usize| u32::from_le_bytes([data[i], data[i + 1], data[i + 2], data[i + 3]]);

        // Extensible headers carry the real format as a GUID.
        let format_tag = match u16_at(0) {
            WAVE_FORMAT_EXTENSIBLE if data.len() < MAX_FMT_SIZE || u16_at(16) < 22 => {
                return Err(invalid_data("extensible fmt chunk is truncated"));
            }
            WAVE_FORMAT_EXTENSIBLE if data[24..40] != SUBTYPE_PCM => {
                return Err(invalid_data("only integer PCM WAV input is supported"));
            }
            WAVE_FORMAT_EXTENSIBLE => WAVE_FORMAT_PCM,
            tag => tag,
        };

        Ok(Self {
            format_tag,
            channels: u16_at(2),
            sample_rate: u32_at(4),
            byte_rate: u32_at(8),
            block_align: u16_at(12),
            bits_per_sample: u16_at(14),
        })
    }
}

fn invalid_data(msg: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.to_string())
}

/// RIFF/WAVE writer for 16-bit PCM.
///
/// Sizes are patched by [`WAVWriter::finish`]; until then they are written
/// as zero.
pub struct WAVWriter<W: Write + Seek> {
    writer: BufWriter<W>,
    format: FormatChunk,
    riff_size_position: u64,
    data_size_position: u64,
    data_written: u64,
}

impl<W: Write + Seek> WAVWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
            format: FormatChunk::pcm16(48000, 2),
            riff_size_position: 0,
            data_size_position: 0,
            data_written: 0,
        }
    }

    /// Configure audio format parameters
    pub fn configure_audio_format(&mut self, sample_rate: u32, channels: u16) -> io::Result<()> {
        if self.data_written > 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "Cannot change format after writing data",
            ));
        }

        self.format = FormatChunk::pcm16(sample_rate, channels);
        Ok(())
    }

    pub fn write_header(&mut self) -> io::Result<()> {
        self.writer.write_all(b"RIFF")?;
        self.riff_size_position = self.writer.stream_position()?;
        self.writer.write_all(&0u32.to_le_bytes())?;
        self.writer.write_all(b"WAVE")?;

        self.format.write_all(&mut self.writer)?;

        self.writer.write_all(b"data")?;
        self.data_size_position = self.writer.stream_position()?;
        self.writer.write_all(&0u32.to_le_bytes())?;

        Ok(())
    }

    /// Appends interleaved samples.
    pub fn write_pcm_16bit(&mut self, samples: &[i16]) -> io::Result<()> {
        let mut bytes = Vec::with_capacity(samples.len() * 2);
        samples.iter().for_each(|s| s.write_le(&mut bytes));

        self.writer.write_all(&bytes)?;
        self.data_written += bytes.len() as u64;
        Ok(())
    }

    /// Finish writing and update the RIFF and data chunk sizes
    pub fn finish(&mut self) -> io::Result<()> {
        if self.data_written % 2 == 1 {
            self.writer.write_all(&[0])?;
        }
        self.writer.flush()?;

        let end = self.writer.stream_position()?;
        let data_size = u32::try_from(self.data_written)
            .map_err(|_| invalid_data("data exceeds the 4 GiB RIFF limit"))?;
        let riff_size = u32::try_from(end - 8)
            .map_err(|_| invalid_data("file exceeds the 4 GiB RIFF limit"))?;

        self.writer.seek(SeekFrom::Start(self.data_size_position))?;
        self.writer.write_all(&data_size.to_le_bytes())?;

        self.writer.seek(SeekFrom::Start(self.riff_size_position))?;
        self.writer.write_all(&riff_size.to_le_bytes())?;

        self.writer.seek(SeekFrom::Start(end))?;
        self.writer.flush()?;

        Ok(())
    }

    pub fn into_inner(self) -> io::Result<W> {
        self.writer.into_inner().map_err(|e| e.into_error())
    }

    pub fn stats(&self) -> WAVStats {
        WAVStats {
            data_written: self.data_written,
            sample_rate: self.format.sample_rate,
            channels: self.format.channels,
        }
    }
}

#[derive(Debug, Clone)]
pub struct WAVStats {
    pub data_written: u64,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Streaming RIFF/WAVE reader for 16-bit PCM.
///
/// Works on pipes: the header is read front to back and the data chunk is
/// consumed without seeking. A data size of zero or `u32::MAX`, as written
/// by streaming tools, means "until end of input".
pub struct WAVReader<R: Read> {
    reader: R,
    format: FormatChunk,
    remaining: Option<u64>,
    carry: Option<u8>,
}

impl<R: Read> WAVReader<R> {
    pub fn new(mut reader: R) -> io::Result<Self> {
        let mut riff = [0u8; 12];
        reader.read_exact(&mut riff)?;
        if &riff[0..4] != b"RIFF" || &riff[8..12] != b"WAVE" {
            return Err(invalid_data("not a RIFF/WAVE file"));
        }

        let mut format = None;
        loop {
            let mut header = [0u8; 8];
            reader.read_exact(&mut header)?;
            let size = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

            match &header[0..4] {
                b"fmt " => {
                    let kept = (size as usize).min(MAX_FMT_SIZE);
                    let mut data = vec![0u8; kept];
                    reader.read_exact(&mut data)?;

                    let rest = size as u64 - kept as u64 + (size as u64 & 1);
                    io::copy(&mut (&mut reader).take(rest), &mut io::sink())?;

                    format = Some(FormatChunk::parse(&data)?);
                }
                b"data" => {
                    let Some(format) = format else {
                        return Err(invalid_data("data chunk before fmt chunk"));
                    };
                    Self::check_format(&format)?;

                    let remaining = match size {
                        0 | u32::MAX => None,
                        size => Some(size as u64),
                    };

                    return Ok(Self {
                        reader,
                        format,
                        remaining,
                        carry: None,
                    });
                }
                id => {
                    log::debug!(
                        "Skipping RIFF chunk {:?} ({size} bytes)",
                        String::from_utf8_lossy(id)
                    );
                    let padded = size as u64 + (size as u64 & 1);
                    io::copy(&mut (&mut reader).take(padded), &mut io::sink())?;
                }
            }
        }
    }

    fn check_format(format: &FormatChunk) -> io::Result<()> {
        if format.format_tag != WAVE_FORMAT_PCM {
            return Err(invalid_data("only integer PCM WAV input is supported"));
        }
        if format.bits_per_sample != BITS_PER_SAMPLE {
            return Err(invalid_data("only 16-bit WAV input is supported"));
        }
        if format.channels == 0 {
            return Err(invalid_data("WAV input has no channels"));
        }

        Ok(())
    }

    pub fn format(&self) -> &FormatChunk {
        &self.format
    }

    /// Samples per channel announced by the header, if it carries a size.
    pub fn frames_hint(&self) -> Option<u64> {
        self.remaining
            .map(|bytes| bytes / self.format.block_align.max(1) as u64)
    }

    /// Reads up to `buf.len()` interleaved samples. Returns 0 at the end of
    /// the data chunk.
    pub fn read_samples(&mut self, buf: &mut [i16]) -> io::Result<usize> {
        let mut bytes = vec![0u8; buf.len() * 2];
        let mut filled = 0;

        if let Some(byte) = self.carry.take() {
            bytes[0] = byte;
            filled = 1;
        }

        while filled < bytes.len() {
            let want = match self.remaining {
                Some(0) => break,
                Some(remaining) => (bytes.len() - filled).min(remaining as usize),
                None => bytes.len() - filled,
            };

            let n = self.reader.read(&mut bytes[filled..filled + want])?;
            if n == 0 {
                break;
            }

            filled += n;
            if let Some(remaining) = self.remaining.as_mut() {
                *remaining -= n as u64;
            }
        }

        if filled % 2 == 1 {
            self.carry = Some(bytes[filled - 1]);
        }

        let samples = filled / 2;
        for (sample, pair) in buf.iter_mut().zip(bytes[..samples * 2].chunks_exact(2)) {
            *sample = i16::from_le_bytes([pair[0], pair[1]]);
        }

        Ok(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn write_wav(sample_rate: u32, channels: u16, samples: &[i16]) -> io::Result<Vec<u8>> {
        let mut writer = WAVWriter::new(Cursor::new(Vec::new()));
        writer.configure_audio_format(sample_rate, channels)?;
        writer.write_header()?;
        writer.write_pcm_16bit(samples)?;
        writer.finish()?;

        Ok(writer.into_inner()?.into_inner())
    }

    #[test]
    fn header_layout() -> io::Result<()> {
        let buffer = write_wav(44100, 2, &[1, -1, 2, -2])?;

        assert_eq!(buffer.len(), 44 + 8);
        assert_eq!(&buffer[0..4], b"RIFF");
        assert_eq!(&buffer[4..8], &(44u32).to_le_bytes());
        assert_eq!(&buffer[8..12], b"WAVE");
        assert_eq!(&buffer[12..16], b"fmt ");
        assert_eq!(&buffer[16..20], &16u32.to_le_bytes());
        assert_eq!(&buffer[20..22], &WAVE_FORMAT_PCM.to_le_bytes());
        assert_eq!(&buffer[22..24], &2u16.to_le_bytes());
        assert_eq!(&buffer[24..28], &44100u32.to_le_bytes());
        assert_eq!(&buffer[28..32], &176_400u32.to_le_bytes());
        assert_eq!(&buffer[36..40], b"data");
        assert_eq!(&buffer[40..44], &8u32.to_le_bytes());
        assert_eq!(&buffer[44..46], &1i16.to_le_bytes());
        Ok(())
    }

    #[test]
    fn reader_reads_writer_output() -> io::Result<()> {
        let samples = (0..1000).map(|i| (i * 37 - 18000) as i16).collect::<Vec<_>>();
        let buffer = write_wav(16000, 1, &samples)?;

        let mut reader = WAVReader::new(Cursor::new(buffer))?;
        assert_eq!(reader.format(), &FormatChunk::pcm16(16000, 1));
        assert_eq!(reader.frames_hint(), Some(1000));

        let mut read = Vec::new();
        let mut buf = [0i16; 333];
        loop {
            let n = reader.read_samples(&mut buf)?;
            if n == 0 {
                break;
            }
            read.extend_from_slice(&buf[..n]);
        }

        assert_eq!(read, samples);
        Ok(())
    }

    #[test]
    fn reader_skips_unknown_chunks() -> io::Result<()> {
        let mut buffer = Vec::new();
        buffer.extend_from_slice(b"RIFF\0\0\0\0WAVE");
        buffer.extend_from_slice(b"LIST\x03\0\0\0abc\0");
        FormatChunk::pcm16(48000, 2).write_all(&mut buffer)?;
        buffer.extend_from_slice(b"data\xff\xff\xff\xff");
        buffer.extend_from_slice(&[1, 0, 2, 0, 3]);

        let mut reader = WAVReader::new(Cursor::new(buffer))?;
        assert_eq!(reader.format().channels, 2);
        assert_eq!(reader.frames_hint(), None);

        let mut buf = [0i16; 8];
        assert_eq!(reader.read_samples(&mut buf)?, 2);
        assert_eq!(&buf[..2], &[1, 2]);
        assert_eq!(reader.read_samples(&mut buf)?, 0);
        Ok(())
    }

    fn extensible_wav(subformat: [u8; 16], fmt_size: u32) -> Vec<u8> {
        let mut fmt = Vec::new();
        let mut base = FormatChunk::pcm16(32000, 2);
        base.format_tag = WAVE_FORMAT_EXTENSIBLE;
        base.write_le(&mut fmt);
        fmt.extend_from_slice(&22u16.to_le_bytes());
        fmt.extend_from_slice(&16u16.to_le_bytes());
        fmt.extend_from_slice(&3u32.to_le_bytes());
        fmt.extend_from_slice(&subformat);
        fmt.resize(fmt_size as usize, 0xee);

        let mut buffer = Vec::new();
        buffer.extend_from_slice(b"RIFF\0\0\0\0WAVE");
        buffer.extend_from_slice(b"fmt ");
        buffer.extend_from_slice(&fmt_size.to_le_bytes());
        buffer.extend_from_slice(&fmt);
        buffer.extend_from_slice(b"data\x04\0\0\0");
        buffer.extend_from_slice(&[1, 0, 2, 0]);
        buffer
    }

    #[test]
    fn reader_accepts_extensible_pcm() -> io::Result<()> {
        let mut reader = WAVReader::new(Cursor::new(extensible_wav(SUBTYPE_PCM, 40)))?;
        assert_eq!(reader.format(), &FormatChunk::pcm16(32000, 2));

        let mut buf = [0i16; 4];
        assert_eq!(reader.read_samples(&mut buf)?, 2);
        assert_eq!(&buf[..2], &[1, 2]);
        Ok(())
    }

    #[test]
    fn reader_rejects_extensible_float() {
        let mut float = SUBTYPE_PCM;
        float[0] = 0x03;

        assert!(WAVReader::new(Cursor::new(extensible_wav(float, 40))).is_err());
    }

    #[test]
    fn reader_skips_oversized_fmt_tail() -> io::Result<()> {
        // Oddly sized on purpose to exercise the pad byte.
        let mut wav = extensible_wav(SUBTYPE_PCM, 1001);
        let data_at = 12 + 8 + 1001;
        wav.insert(data_at, 0);

        let mut reader = WAVReader::new(Cursor::new(wav))?;
        assert_eq!(reader.format().channels, 2);

        let mut buf = [0i16; 4];
        assert_eq!(reader.read_samples(&mut buf)?, 2);
        assert_eq!(&buf[..2], &[1, 2]);
        Ok(())
    }

    #[test]
    fn reader_rejects_float_input() {
        let mut buffer = Vec::new();
        buffer.extend_from_slice(b"RIFF\0\0\0\0WAVE");
        let mut format = FormatChunk::pcm16(48000, 2);
        format.format_tag = 3;
        format.bits_per_sample = 32;
        let _ = format.write_all(&mut buffer);
        buffer.extend_from_slice(b"data\0\0\0\0");

        assert!(WAVReader::new(Cursor::new(buffer)).is_err());
    }
}
