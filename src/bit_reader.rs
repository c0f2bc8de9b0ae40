//! Bit-level reading over SCTE-35 section data.
//!
//! Splice info sections pack fields at arbitrary bit widths, so parsing
//! works through a cursor that tracks a bit offset into a byte buffer.

use crate::{CueError, ticks_to_secs};

/// A cursor that reads values of arbitrary bit width from a byte buffer.
///
/// Every read advances the offset; reading past the end of the buffer is an
/// error. Callers are expected to have sliced the buffer to the section
/// length before constructing the reader, so an underflow means the section
/// itself is malformed.
pub(crate) struct BitReader<'a> {
    buffer: &'a [u8],
    offset: usize,
}

impl<'a> BitReader<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        BitReader { buffer, offset: 0 }
    }

    /// Reads `num_bits` (at most 64) and returns them right-aligned.
    pub fn read_uint(&mut self, num_bits: usize) -> Result<u64, CueError> {
        debug_assert!(num_bits <= 64);
        let mut value: u64 = 0;
        let mut bits_read = 0;

        while bits_read < num_bits {
            let byte_index = self.offset / 8;
            let bit_offset = self.offset % 8;

            if byte_index >= self.buffer.len() {
                return Err(CueError::UnexpectedEnd {
                    offset: self.offset,
                });
            }

            let byte = self.buffer[byte_index];
            let take = (num_bits - bits_read).min(8 - bit_offset);
            let mask = if take >= 8 { 0xFF } else { (1u8 << take) - 1 };
            let bits = (byte >> (8 - bit_offset - take)) & mask;

            value = (value << take) | bits as u64;
            self.offset += take;
            bits_read += take;
        }

        Ok(value)
    }

    /// Reads a single bit as a flag.
    pub fn read_flag(&mut self) -> Result<bool, CueError> {
        Ok(self.read_uint(1)? == 1)
    }

    /// Reads `num_bits` and formats them as a `0x`-prefixed lowercase hex
    /// string with leading zeros trimmed, e.g. `"0xfc"` or `"0x0"`.
    ///
    /// Widths beyond 64 bits are read byte-wise, so wide fields (such as the
    /// 80-bit EIDR tail) keep all of their bits.
    pub fn read_hex(&mut self, num_bits: usize) -> Result<String, CueError> {
        if num_bits <= 64 {
            return Ok(format!("{:#x}", self.read_uint(num_bits)?));
        }
        debug_assert!(num_bits % 8 == 0);
        let bytes = self.read_bytes(num_bits / 8)?;
        let digits: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
        let trimmed = digits.trim_start_matches('0');
        let digits = if trimmed.is_empty() { "0" } else { trimmed };
        Ok(format!("0x{digits}"))
    }

    /// Reads `num_bits / 8` whole bytes.
    pub fn read_bytes(&mut self, num_bytes: usize) -> Result<Vec<u8>, CueError> {
        let mut out = Vec::with_capacity(num_bytes);
        for _ in 0..num_bytes {
            out.push(self.read_uint(8)? as u8);
        }
        Ok(out)
    }

    /// Reads `num_bits` as raw bytes interpreted as characters.
    ///
    /// Non-UTF-8 bytes are replaced rather than rejected; identifier fields
    /// in the wild are plain ASCII.
    pub fn read_ascii(&mut self, num_bits: usize) -> Result<String, CueError> {
        debug_assert!(num_bits % 8 == 0);
        let bytes = self.read_bytes(num_bits / 8)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Reads `num_bits` as a 90 kHz tick count and returns seconds,
    /// truncated to six decimal places.
    pub fn read_ticks_as_seconds(&mut self, num_bits: usize) -> Result<f64, CueError> {
        Ok(ticks_to_secs(self.read_uint(num_bits)?))
    }

    /// Advances the offset without reading.
    pub fn skip(&mut self, num_bits: usize) -> Result<(), CueError> {
        let new_offset = self.offset + num_bits;
        if new_offset > self.buffer.len() * 8 {
            return Err(CueError::UnexpectedEnd {
                offset: self.offset,
            });
        }
        self.offset = new_offset;
        Ok(())
    }

    /// Current bit offset into the buffer.
    pub fn offset(&self) -> usize {
        self.offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_within_a_byte() {
        let buffer = [0b1010_1010, 0b1111_0000];
        let mut reader = BitReader::new(&buffer);
        assert_eq!(reader.read_uint(4).unwrap(), 0b1010);
        assert_eq!(reader.read_uint(4).unwrap(), 0b1010);
        assert_eq!(reader.read_uint(8).unwrap(), 0b1111_0000);
    }

    #[test]
    fn reads_across_byte_boundaries() {
        let buffer = [0b1010_1010, 0b1111_0000];
        let mut reader = BitReader::new(&buffer);
        assert_eq!(reader.read_uint(6).unwrap(), 0b101010);
        assert_eq!(reader.read_uint(6).unwrap(), 0b101111);
    }

    #[test]
    fn skip_advances() {
        let buffer = [0b1010_1010];
        let mut reader = BitReader::new(&buffer);
        reader.skip(4).unwrap();
        assert_eq!(reader.read_uint(4).unwrap(), 0b1010);
    }

    #[test]
    fn underflow_is_an_error() {
        let buffer = [0xAA];
        let mut reader = BitReader::new(&buffer);
        assert!(matches!(
            reader.read_uint(16),
            Err(CueError::UnexpectedEnd { .. })
        ));
    }

    #[test]
    fn hex_keeps_the_go_style_prefix() {
        let buffer = [0xFC, 0x00];
        let mut reader = BitReader::new(&buffer);
        assert_eq!(reader.read_hex(8).unwrap(), "0xfc");
        assert_eq!(reader.read_hex(8).unwrap(), "0x0");
    }

    #[test]
    fn wide_hex_preserves_all_bits() {
        let buffer = [0x0D, 0x0E, 0x6A, 0x92, 0x33, 0x73, 0x6B, 0x61, 0x31, 0x00];
        let mut reader = BitReader::new(&buffer);
        assert_eq!(reader.read_hex(80).unwrap(), "0xd0e6a9233736b613100");
    }

    #[test]
    fn ascii_reads_whole_bytes() {
        let buffer = *b"CUEI";
        let mut reader = BitReader::new(&buffer);
        assert_eq!(reader.read_ascii(32).unwrap(), "CUEI");
    }

    #[test]
    fn ticks_truncate() {
        // 11111111 ticks = 123.4567888.. seconds; truncates at six decimals.
        let buffer = 11_111_111u64.to_be_bytes();
        let mut reader = BitReader::new(&buffer);
        assert_eq!(reader.read_ticks_as_seconds(64).unwrap(), 123.456788);
    }
}
