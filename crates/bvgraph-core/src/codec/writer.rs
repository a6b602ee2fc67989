//! Bit-level writer, the inverse of [`BitReader`](super::BitReader).
//!
//! Graphs are never compressed by this workspace; the writer exists so that
//! fixtures, benches and offset tables can be produced bit-exactly.

/// Appends codes to a growable byte buffer, most-significant bit first.
#[derive(Debug, Default, Clone)]
pub struct BitWriter {
    bytes: Vec<u8>,
    current: u8,
    used: u32,
    written: u64,
}

impl BitWriter {
    /// Creates an empty writer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bits written so far.
    #[must_use]
    pub fn written_bits(&self) -> u64 {
        self.written
    }

    /// Writes a single bit.
    pub fn write_bit(&mut self, bit: bool) {
        self.current = (self.current << 1) | u8::from(bit);
        self.used += 1;
        self.written += 1;
        if self.used == 8 {
            self.bytes.push(self.current);
            self.current = 0;
            self.used = 0;
        }
    }

    /// Writes the low `len` bits of `value`, most significant first.
    pub fn write_int(&mut self, value: u64, len: u32) {
        debug_assert!(len <= 64);
        for shift in (0..len).rev() {
            self.write_bit((value >> shift) & 1 == 1);
        }
    }

    /// Writes `value` zeros followed by a one.
    pub fn write_unary(&mut self, value: u64) {
        for _ in 0..value {
            self.write_bit(false);
        }
        self.write_bit(true);
    }

    /// Writes an Elias gamma code. `value` must be below `u64::MAX`.
    pub fn write_gamma(&mut self, value: u64) {
        let x = value + 1;
        let msb = 63 - x.leading_zeros();
        self.write_unary(u64::from(msb));
        self.write_int(x, msb);
    }

    /// Writes an Elias delta code. `value` must be below `u64::MAX`.
    pub fn write_delta(&mut self, value: u64) {
        let x = value + 1;
        let msb = 63 - x.leading_zeros();
        self.write_gamma(u64::from(msb));
        self.write_int(x, msb);
    }

    /// Writes a zeta code of order `k`. `value` must be below `u64::MAX`.
    pub fn write_zeta(&mut self, value: u64, k: u32) {
        debug_assert!(k > 0);
        let x = value + 1;
        let msb = 63 - x.leading_zeros();
        let h = msb / k;
        self.write_unary(u64::from(h));
        let left = 1u64 << (h * k);
        if x - left < left {
            self.write_int(x - left, h * k + k - 1);
        } else {
            self.write_int(x, h * k + k);
        }
    }

    /// Writes a nibble code.
    pub fn write_nibble(&mut self, value: u64) {
        let bits = 64 - value.leading_zeros();
        let groups = bits.div_ceil(3).max(1);
        for group in (0..groups).rev() {
            self.write_bit(group == 0);
            self.write_int(value >> (group * 3), 3);
        }
    }

    /// Finishes the stream, padding the last byte with zeros.
    #[must_use]
    pub fn into_bytes(mut self) -> Vec<u8> {
        if self.used > 0 {
            self.bytes.push(self.current << (8 - self.used));
        }
        self.bytes
    }
}
