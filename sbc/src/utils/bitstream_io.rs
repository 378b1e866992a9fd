//! Bitstream I/O utilities for SBC frames.
//!
//! Thin wrappers over `bitstream_io` big-endian readers and writers with the
//! bounds checks and CRC helpers the frame packer and unpacker need.

use std::io;
use std::io::SeekFrom;

use bitstream_io::{BigEndian, BitRead, BitReader, BitWrite, BitWriter, UnsignedInteger};

use crate::utils::crc::Crc8;

const STACK_BUF_SIZE: usize = 256;

#[derive(Debug)]
pub struct BitstreamIoReader<R: io::Read + io::Seek> {
    bs: BitReader<R, BigEndian>,
    len: u64,
}

pub type BsIoSliceReader<'a> = BitstreamIoReader<io::Cursor<&'a [u8]>>;

impl<R> BitstreamIoReader<R>
where
    R: io::Read + io::Seek,
{
    pub fn new(read: R, len_bytes: u64) -> Self {
        Self {
            bs: BitReader::new(read),
            len: len_bytes << 3,
        }
    }

    #[inline(always)]
    pub fn get(&mut self) -> io::Result<bool> {
        self.bs.read_bit()
    }

    #[inline(always)]
    pub fn get_n<I: UnsignedInteger>(&mut self, n: u32) -> io::Result<I> {
        match self.bs.read_unsigned_var(n) {
            Ok(val) => Ok(val),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "get_n({}): out of bounds bits at {}",
                    n,
                    self.bs.position_in_bits().unwrap_or(0)
                ),
            )),
            Err(e) => Err(e),
        }
    }

    /// CRC over `len` bits starting at absolute bit `start`, continuing from `checksum`.
    ///
    /// The read position is restored afterwards.
    pub fn crc8_check(&mut self, crc: &Crc8, checksum: u8, start: u64, len: u64) -> io::Result<u8> {
        let position = self.position()?;

        if start + len > self.len {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "crc8_check: out of bounds bits",
            ));
        }

        self.bs.seek_bits(SeekFrom::Start(start))?;

        let mut checksum = checksum;

        let prefix_len = ((8 - (start & 7)) & 7).min(len);
        let suffix_len = (len - prefix_len) & 7;
        let middle_len = (len - prefix_len - suffix_len) as usize;

        if prefix_len != 0 {
            let prefix: u8 = self.bs.read_var(prefix_len as u32)?;
            checksum = crc.update_bits(checksum, prefix, prefix_len as u32);
        }

        let bytes_len = middle_len >> 3;
        if bytes_len <= STACK_BUF_SIZE {
            let mut stack_buf = [0u8; STACK_BUF_SIZE];
            let buf = &mut stack_buf[..bytes_len];
            self.bs.read_bytes(buf)?;
            checksum = crc.update(checksum, buf);
        } else {
            let mut heap_buf = vec![0; bytes_len];
            self.bs.read_bytes(&mut heap_buf)?;
            checksum = crc.update(checksum, &heap_buf);
        };

        if suffix_len != 0 {
            let suffix: u8 = self.bs.read_var(suffix_len as u32)?;
            checksum = crc.update_bits(checksum, suffix, suffix_len as u32);
        }

        self.bs.seek_bits(SeekFrom::Start(position))?;

        Ok(checksum)
    }

    #[inline(always)]
    pub fn available(&mut self) -> io::Result<u64> {
        self.bs.position_in_bits().map(|pos| self.len - pos)
    }

    #[inline(always)]
    pub fn skip_n(&mut self, n: u32) -> io::Result<()> {
        if n as u64 > self.available()? {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "skip_n: out of bounds bits",
            ));
        }
        self.bs.skip(n)
    }

    #[inline(always)]
    pub fn position(&mut self) -> io::Result<u64> {
        self.bs.position_in_bits()
    }
}

impl<'a> BsIoSliceReader<'a> {
    pub fn from_slice(buf: &'a [u8]) -> Self {
        let len = buf.len() as u64;
        let read = io::Cursor::new(buf);

        Self::new(read, len)
    }
}

/// MSB-first bit writer collecting a frame into a byte vector.
pub struct BitstreamIoWriter {
    bs: BitWriter<Vec<u8>, BigEndian>,
    written: u64,
}

impl std::fmt::Debug for BitstreamIoWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BitstreamIoWriter")
            .field("written", &self.written)
            .finish_non_exhaustive()
    }
}

impl BitstreamIoWriter {
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            bs: BitWriter::new(Vec::with_capacity(bytes)),
            written: 0,
        }
    }

    #[inline(always)]
    pub fn put(&mut self, bit: bool) -> io::Result<()> {
        self.written += 1;
        self.bs.write_bit(bit)
    }

    #[inline(always)]
    pub fn put_n<I: UnsignedInteger>(&mut self, n: u32, value: I) -> io::Result<()> {
        self.written += n as u64;
        self.bs.write_unsigned_var(n, value)
    }

    /// Number of bits written so far.
    #[inline(always)]
    pub fn position(&self) -> u64 {
        self.written
    }

    /// Pads with zero bits to the next byte boundary and returns the bytes.
    pub fn finish(mut self) -> io::Result<Vec<u8>> {
        self.bs.byte_align()?;
        Ok(self.bs.into_writer())
    }
}
