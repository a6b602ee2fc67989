//! Byte sources feeding a [`BitReader`](super::BitReader).
//!
//! A reader pulls whole bytes (and, when cheap, big-endian 32-bit words) from
//! a source and slices them into bits. Two sources cover every access mode:
//!
//! - [`SliceSource`] - a borrowed byte slice (heap-resident or memory-mapped
//!   bitstreams); seekable in O(1)
//! - [`ReadSource`] - any [`BufRead`], typically a buffered file for disk
//!   streaming; forward only

use std::io::{BufRead, ErrorKind};

use bvgraph_common::utils::error::{Error, Result};
use byteorder::{BigEndian, ByteOrder};

/// A forward stream of bytes.
pub trait ByteSource {
    /// Returns the next byte, or `None` at end of input.
    fn next_byte(&mut self) -> Result<Option<u8>>;

    /// Returns the next four bytes as a big-endian word, if all four are
    /// immediately available. Returning `None` never consumes anything.
    fn next_u32(&mut self) -> Result<Option<u32>> {
        Ok(None)
    }
}

/// A byte source that can jump to any byte offset.
pub trait SeekableSource: ByteSource {
    /// Moves to `byte`. Seeking to exactly the end is allowed.
    fn seek_byte(&mut self, byte: u64) -> Result<()>;

    /// Total length in bytes.
    fn len_bytes(&self) -> u64;
}

/// Byte source over a borrowed slice.
#[derive(Debug, Clone, Copy)]
pub struct SliceSource<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SliceSource<'a> {
    /// Creates a source positioned at the first byte.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Returns the underlying slice.
    #[must_use]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }
}

impl ByteSource for SliceSource<'_> {
    #[inline]
    fn next_byte(&mut self) -> Result<Option<u8>> {
        let byte = self.data.get(self.pos).copied();
        if byte.is_some() {
            self.pos += 1;
        }
        Ok(byte)
    }

    #[inline]
    fn next_u32(&mut self) -> Result<Option<u32>> {
        match self.data.get(self.pos..self.pos + 4) {
            Some(word) => {
                self.pos += 4;
                Ok(Some(BigEndian::read_u32(word)))
            }
            None => Ok(None),
        }
    }
}

impl SeekableSource for SliceSource<'_> {
    fn seek_byte(&mut self, byte: u64) -> Result<()> {
        if byte > self.data.len() as u64 {
            return Err(Error::corrupt(format!(
                "seek to byte {byte} past end of {}-byte stream",
                self.data.len()
            )));
        }
        self.pos = byte as usize;
        Ok(())
    }

    fn len_bytes(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Byte source over a buffered reader.
#[derive(Debug)]
pub struct ReadSource<R> {
    inner: R,
}

impl<R: BufRead> ReadSource<R> {
    /// Wraps a buffered reader.
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Returns the wrapped reader.
    pub fn into_inner(self) -> R {
        self.inner
    }

    fn buffered(&mut self) -> Result<&[u8]> {
        loop {
            match self.inner.fill_buf() {
                Ok(_) => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(self.inner.fill_buf()?)
    }
}

impl<R: BufRead> ByteSource for ReadSource<R> {
    fn next_byte(&mut self) -> Result<Option<u8>> {
        let byte = self.buffered()?.first().copied();
        if byte.is_some() {
            self.inner.consume(1);
        }
        Ok(byte)
    }

    fn next_u32(&mut self) -> Result<Option<u32>> {
        let word = self.buffered()?.get(..4).map(BigEndian::read_u32);
        if word.is_some() {
            self.inner.consume(4);
        }
        Ok(word)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, BufReader, Cursor, Read};

    /// Fails its first read with `Interrupted`.
    struct InterruptOnce<R> {
        inner: R,
        interrupted: bool,
    }

    impl<R: Read> Read for InterruptOnce<R> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(io::Error::from(ErrorKind::Interrupted));
            }
            self.inner.read(buf)
        }
    }

    #[test]
    fn test_slice_source_words_and_bytes() {
        let data = [0x12, 0x34, 0x56, 0x78, 0x9a];
        let mut src = SliceSource::new(&data);

        assert_eq!(src.next_u32().unwrap(), Some(0x1234_5678));
        assert_eq!(src.next_u32().unwrap(), None);
        assert_eq!(src.next_byte().unwrap(), Some(0x9a));
        assert_eq!(src.next_byte().unwrap(), None);
    }

    #[test]
    fn test_slice_source_seek_bounds() {
        let data = [1, 2, 3];
        let mut src = SliceSource::new(&data);

        src.seek_byte(3).unwrap();
        assert_eq!(src.next_byte().unwrap(), None);
        assert!(src.seek_byte(4).is_err());

        src.seek_byte(1).unwrap();
        assert_eq!(src.next_byte().unwrap(), Some(2));
    }

    #[test]
    fn test_read_source_small_buffer() {
        // A two-byte buffer never has four bytes ready, so words fall back to bytes
        let reader = BufReader::with_capacity(2, Cursor::new(vec![0xaa, 0xbb, 0xcc]));
        let mut src = ReadSource::new(reader);

        assert_eq!(src.next_u32().unwrap(), None);
        assert_eq!(src.next_byte().unwrap(), Some(0xaa));
        assert_eq!(src.next_byte().unwrap(), Some(0xbb));
        assert_eq!(src.next_byte().unwrap(), Some(0xcc));
        assert_eq!(src.next_byte().unwrap(), None);
    }

    #[test]
    fn test_read_source_retries_interrupted_reads() {
        let reader = BufReader::new(InterruptOnce {
            inner: Cursor::new(vec![0x01, 0x02, 0x03, 0x04, 0x05]),
            interrupted: false,
        });
        let mut src = ReadSource::new(reader);

        assert_eq!(src.next_u32().unwrap(), Some(0x0102_0304));
        assert_eq!(src.next_byte().unwrap(), Some(0x05));
        assert_eq!(src.next_byte().unwrap(), None);
    }
}
