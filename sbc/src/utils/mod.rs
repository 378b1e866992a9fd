//! Supporting infrastructure.
//!
//! Bit-level reading and writing, CRC8, error types and the constant tables of
//! the filterbanks and the loudness allocator.

pub mod bitstream_io;
pub mod crc;
pub mod errors;
pub mod tables;
