//! Bit-level reader for instantaneous integer codes.
//!
//! Bits are consumed most-significant first within each byte, which is the
//! layout WebGraph writes. The reader keeps up to 64 bits buffered and
//! refills from its [`ByteSource`] a word or a byte at a time.
//!
//! Every decode advances [`BitReader::position`] by exactly the number of
//! bits the code occupies. Running out of input mid-code is reported as
//! [`Error::CorruptStream`], as is any code whose length would not fit in
//! 64 bits.

use bvgraph_common::utils::error::{Error, Result};

use super::source::{ByteSource, SeekableSource, SliceSource};

/// Keeps the lowest `n` bits of `value`.
#[inline]
fn low_bits(value: u64, n: u32) -> u64 {
    if n >= 64 {
        value
    } else {
        value & ((1u64 << n) - 1)
    }
}

/// Decodes unary, gamma, delta, zeta and nibble codes from a byte source.
#[derive(Debug, Clone)]
pub struct BitReader<S> {
    source: S,
    /// The low `fill` bits are unread, most significant first.
    buffer: u64,
    fill: u32,
    position: u64,
}

impl<'a> BitReader<SliceSource<'a>> {
    /// Creates a reader at bit 0 of `data`.
    #[must_use]
    pub fn from_slice(data: &'a [u8]) -> Self {
        Self::new(SliceSource::new(data))
    }
}

impl<S: ByteSource> BitReader<S> {
    /// Creates a reader at the start of `source`.
    pub fn new(source: S) -> Self {
        Self {
            source,
            buffer: 0,
            fill: 0,
            position: 0,
        }
    }

    /// Returns the absolute bit offset of the next unread bit.
    #[inline]
    #[must_use]
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Returns the underlying source.
    pub fn into_source(self) -> S {
        self.source
    }

    fn refill(&mut self) -> Result<()> {
        if self.fill <= 32 {
            if let Some(word) = self.source.next_u32()? {
                self.buffer = (self.buffer << 32) | u64::from(word);
                self.fill += 32;
                return Ok(());
            }
        }
        match self.source.next_byte()? {
            Some(byte) => {
                self.buffer = (self.buffer << 8) | u64::from(byte);
                self.fill += 8;
                Ok(())
            }
            None => Err(Error::corrupt(format!(
                "read past end of stream at bit {}",
                self.position
            ))),
        }
    }

    /// Reads a single bit.
    #[inline]
    pub fn read_bit(&mut self) -> Result<bool> {
        if self.fill == 0 {
            self.refill()?;
        }
        self.fill -= 1;
        self.position += 1;
        Ok((self.buffer >> self.fill) & 1 == 1)
    }

    /// Reads `len` raw bits as an unsigned integer, first bit most significant.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CorruptStream`] if `len > 64` or the stream ends.
    pub fn read_int(&mut self, len: u32) -> Result<u64> {
        if len > 64 {
            return Err(Error::corrupt(format!(
                "{len}-bit integer at bit {} does not fit in 64 bits",
                self.position
            )));
        }

        let mut value = 0u64;
        let mut remaining = len;
        while remaining > 0 {
            if self.fill == 0 {
                self.refill()?;
            }
            let take = remaining.min(self.fill);
            self.fill -= take;
            let bits = low_bits(self.buffer >> self.fill, take);
            value = value.checked_shl(take).unwrap_or(0) | bits;
            remaining -= take;
        }
        self.position += u64::from(len);
        Ok(value)
    }

    /// Reads a unary code: the number of 0 bits before the next 1.
    pub fn read_unary(&mut self) -> Result<u64> {
        let mut zeros = 0u64;
        loop {
            if self.fill == 0 {
                self.refill()?;
            }
            let window = low_bits(self.buffer, self.fill);
            if window == 0 {
                zeros += u64::from(self.fill);
                self.position += u64::from(self.fill);
                self.fill = 0;
                continue;
            }
            let lead = window.leading_zeros() - (64 - self.fill);
            self.fill -= lead + 1;
            self.position += u64::from(lead) + 1;
            return Ok(zeros + u64::from(lead));
        }
    }

    /// Reads an Elias gamma code.
    pub fn read_gamma(&mut self) -> Result<u64> {
        let start = self.position;
        let msb = self.read_unary()?;
        self.read_with_prefix(msb, "gamma", start)
    }

    /// Reads an Elias delta code (gamma-coded length, then the mantissa).
    pub fn read_delta(&mut self) -> Result<u64> {
        let start = self.position;
        let msb = self.read_gamma()?;
        self.read_with_prefix(msb, "delta", start)
    }

    fn read_with_prefix(&mut self, msb: u64, code: &str, start: u64) -> Result<u64> {
        if msb >= 64 {
            return Err(Error::corrupt(format!(
                "{code} code at bit {start} has a {msb}-bit mantissa"
            )));
        }
        let msb = msb as u32;
        Ok(((1u64 << msb) | self.read_int(msb)?) - 1)
    }

    /// Reads a zeta code of order `k`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CorruptStream`] if `k` is zero, the stream ends, or
    /// the encoded value would not fit in 64 bits.
    pub fn read_zeta(&mut self, k: u32) -> Result<u64> {
        let start = self.position;
        if k == 0 {
            return Err(Error::corrupt("zeta code of order 0"));
        }
        let h = self.read_unary()?;
        let hk = h
            .checked_mul(u64::from(k))
            .filter(|hk| hk + u64::from(k) <= 64)
            .ok_or_else(|| {
                Error::corrupt(format!("zeta({k}) code at bit {start} is too wide"))
            })? as u32;

        let left = 1u64 << hk;
        let m = self.read_int(hk + k - 1)?;
        if m < left {
            Ok(m + left - 1)
        } else {
            Ok((m << 1) + u64::from(self.read_bit()?) - 1)
        }
    }

    /// Reads a nibble code: 3-bit groups, each preceded by a stop bit.
    pub fn read_nibble(&mut self) -> Result<u64> {
        let start = self.position;
        let mut value = 0u64;
        loop {
            if value >> 61 != 0 {
                return Err(Error::corrupt(format!(
                    "nibble code at bit {start} overflows 64 bits"
                )));
            }
            let stop = self.read_bit()?;
            value = (value << 3) | self.read_int(3)?;
            if stop {
                return Ok(value);
            }
        }
    }
}

impl<S: SeekableSource> BitReader<S> {
    /// Moves to an absolute bit offset.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CorruptStream`] if `bit` lies beyond the end.
    pub fn seek(&mut self, bit: u64) -> Result<()> {
        let len_bits = self.len_bits();
        if bit > len_bits {
            return Err(Error::corrupt(format!(
                "seek to bit {bit} past end of {len_bits}-bit stream"
            )));
        }
        self.source.seek_byte(bit / 8)?;
        self.buffer = 0;
        self.fill = 0;
        self.position = bit;

        let skip = (bit % 8) as u32;
        if skip > 0 {
            if let Some(byte) = self.source.next_byte()? {
                self.buffer = u64::from(byte);
                self.fill = 8 - skip;
            }
        }
        Ok(())
    }

    /// Total length of the underlying stream in bits.
    #[must_use]
    pub fn len_bits(&self) -> u64 {
        self.source.len_bytes() * 8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unary_and_gamma_patterns() {
        // 1 | 010 | 011 | 00100 | 0001 -> gamma 0, 1, 2, 3 then unary 3
        let data = [0b1010_0110, 0b0100_0001];
        let mut r = BitReader::from_slice(&data);

        assert_eq!(r.read_gamma().unwrap(), 0);
        assert_eq!(r.read_gamma().unwrap(), 1);
        assert_eq!(r.read_gamma().unwrap(), 2);
        assert_eq!(r.read_gamma().unwrap(), 3);
        assert_eq!(r.position(), 12);
        assert_eq!(r.read_unary().unwrap(), 3);
        assert_eq!(r.position(), 16);
    }

    #[test]
    fn test_delta_pattern() {
        // delta(4): x + 1 = 5 = 101b, msb 2 -> gamma(2) = 011, then mantissa 01
        let data = [0b0110_1000];
        let mut r = BitReader::from_slice(&data);
        assert_eq!(r.read_delta().unwrap(), 4);
        assert_eq!(r.position(), 5);
    }

    #[test]
    fn test_zeta_short_and_long_forms() {
        // zeta(3) of 0: "1" then "00" -> m = 0 < left = 1 -> 0
        // zeta(3) of 5: "1" then "110" -> m = 0b11 >= left, one more bit -> (3 << 1) + 0 - 1
        let data = [0b1001_1100];
        let mut r = BitReader::from_slice(&data);
        assert_eq!(r.read_zeta(3).unwrap(), 0);
        assert_eq!(r.read_zeta(3).unwrap(), 5);
        assert_eq!(r.position(), 7);
    }

    #[test]
    fn test_zeta_one_matches_gamma() {
        let data = [0b0010_0011, 0b0000_0000];
        let mut a = BitReader::from_slice(&data);
        let mut b = BitReader::from_slice(&data);
        assert_eq!(a.read_zeta(1).unwrap(), b.read_gamma().unwrap());
        assert_eq!(a.position(), b.position());
    }

    #[test]
    fn test_nibble_pattern() {
        // 0 101 | 1 011 -> (5 << 3) | 3 = 43
        let data = [0b0101_1011];
        let mut r = BitReader::from_slice(&data);
        assert_eq!(r.read_nibble().unwrap(), 43);
    }

    #[test]
    fn test_read_int_across_words() {
        let data = [0xde, 0xad, 0xbe, 0xef, 0x01, 0x23, 0x45, 0x67, 0x89];
        let mut r = BitReader::from_slice(&data);
        assert_eq!(r.read_int(4).unwrap(), 0xd);
        assert_eq!(r.read_int(64).unwrap(), 0xeadb_eef0_1234_5678);
        assert_eq!(r.read_int(4).unwrap(), 0x9);
        assert_eq!(r.position(), 72);
    }

    #[test]
    fn test_seek_mid_byte() {
        let data = [0b0000_0001, 0b1000_0000];
        let mut r = BitReader::from_slice(&data);

        r.seek(7).unwrap();
        assert!(r.read_bit().unwrap());
        assert!(r.read_bit().unwrap());
        assert_eq!(r.position(), 9);

        r.seek(16).unwrap();
        assert!(r.read_bit().is_err());
        assert!(r.seek(17).is_err());
    }

    #[test]
    fn test_end_of_stream_is_corruption() {
        // All zeros: a unary code never terminates
        let data = [0u8; 3];
        let mut r = BitReader::from_slice(&data);
        let err = r.read_gamma().unwrap_err();
        assert!(err.is_corruption());

        let mut r = BitReader::from_slice(&[]);
        assert!(r.read_bit().unwrap_err().is_corruption());
    }

    #[test]
    fn test_oversized_codes_rejected() {
        // 64 zeros then a one: gamma prefix too long for a u64 mantissa
        let mut data = vec![0u8; 8];
        data.push(0x80);
        data.extend_from_slice(&[0xff; 9]);
        let mut r = BitReader::from_slice(&data);
        assert!(r.read_gamma().unwrap_err().is_corruption());

        let mut r = BitReader::from_slice(&[0xff]);
        assert!(r.read_int(65).is_err());
        assert!(r.read_zeta(0).is_err());
    }
}
