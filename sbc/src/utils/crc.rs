//! CRC validation utilities for SBC frames.
//!
//! The frame check is a CRC-8 with generator `x^8 + x^4 + x^3 + x^2 + 1`
//! (`0x1D`) seeded with `0x0F`, processed most-significant bit first. Whole
//! bytes go through a lookup table; a trailing partial byte is folded in bit
//! by bit.

/// CRC algorithm specification with polynomial and initial value.
pub struct Algorithm<T> {
    poly: T,
    init: T,
}

/// CRC-8 algorithm protecting the SBC header and scale factors.
pub const CRC_SBC_ALG: Algorithm<u8> = Algorithm {
    poly: 0x1d,
    init: 0x0f,
};

/// Shifts `len` message bits through the register.
///
/// The message bits must already be XORed into the top of `value`.
#[inline(always)]
pub const fn crc8(poly: u8, mut value: u8, len: usize) -> u8 {
    let mut i = 0;
    while i < len {
        value = (value << 1) ^ (((value >> 7) & 1) * poly);
        i += 1;
    }

    value
}

#[inline(always)]
const fn crc8_table(poly: u8) -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < table.len() {
        table[i] = crc8(poly, i as u8, 8);
        i += 1;
    }

    table
}

#[derive(Debug)]
pub struct Crc8 {
    pub poly: u8,
    pub init: u8,
    table: [u8; 256],
}

impl Crc8 {
    pub const fn new(algorithm: &Algorithm<u8>) -> Self {
        Self {
            poly: algorithm.poly,
            init: algorithm.init,
            table: crc8_table(algorithm.poly),
        }
    }

    const fn table_entry(&self, index: u8) -> u8 {
        self.table[index as usize]
    }

    #[inline(always)]
    pub const fn update(&self, mut crc: u8, bytes: &[u8]) -> u8 {
        let mut i = 0;

        while i < bytes.len() {
            crc = self.table_entry(crc ^ bytes[i]);
            i += 1;
        }

        crc
    }

    /// Folds the `len` low bits of `value` (1..=8, MSB first) into `crc`.
    #[inline(always)]
    pub const fn update_bits(&self, crc: u8, value: u8, len: u32) -> u8 {
        if len == 0 {
            return crc;
        }

        let aligned = if len >= 8 { value } else { value << (8 - len) };
        crc8(self.poly, crc ^ aligned, len as usize)
    }

    /// Checksum over `bits` bits of `data`, starting at its first byte.
    pub const fn checksum_bits(&self, crc: u8, data: &[u8], bits: usize) -> u8 {
        let whole = bits >> 3;
        let rest = (bits & 7) as u32;

        let mut crc = crc;
        let mut i = 0;
        while i < whole {
            crc = self.table_entry(crc ^ data[i]);
            i += 1;
        }

        if rest != 0 {
            crc = self.update_bits(crc, data[whole] >> (8 - rest), rest);
        }

        crc
    }
}

/// Shared instance used by the packer, the unpacker and the extractor.
pub static SBC_CRC: Crc8 = Crc8::new(&CRC_SBC_ALG);
