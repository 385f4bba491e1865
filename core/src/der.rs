//! DER / ASN.1 support for the data stored on the card.

use std::borrow::Cow;

use crate::error::{Error, Result};

/// Stateful, simple and customised DER / ASN.1 reader for the card.
/// Tags are skipped, only lengths and values are interpreted.
pub struct Reader<'a> {
    buffer: &'a [u8],
    cursor: usize,
}

impl<'a> Reader<'a> {
    /// Creates a new reader from the buffer.
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, cursor: 0 }
    }

    /// Reads data of specified size without seeking the cursor.
    pub fn peek(&self, length: usize) -> Result<&'a [u8]> {
        self.cursor
            .checked_add(length)
            .and_then(|end| self.buffer.get(self.cursor..end))
            .ok_or_else(|| {
                Error::InvalidData(format!(
                    "{} octet(s) wanted at {}, but the buffer has {}",
                    length,
                    self.cursor,
                    self.buffer.len(),
                ))
            })
    }

    /// Seeks the cursor without reading data
    pub fn seek(&mut self, length: usize) {
        self.cursor += length;
    }

    /// Reads a next octet and seeks the cursor.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<u8> {
        let byte = self.peek(1)?[0];
        self.seek(1);
        Ok(byte)
    }

    /// Reads data of specified size and seeks the cursor.
    /// Short version of `self.peek` + `self.seek`
    pub fn read(&mut self, length: usize) -> Result<&'a [u8]> {
        let bytes = self.peek(length)?;
        self.seek(length);
        Ok(bytes)
    }

    /// Reads the tag and the length of data at the current position, seeking the cursor.
    /// Tags of up to two octets are supported, as used on the card.
    pub fn read_length(&mut self) -> Result<usize> {
        if self.next()? & 0x1f == 0x1f {
            self.next()?;
        }

        let head = self.next()? as usize;
        if head & 0x80 == 0 {
            return Ok(head);
        }

        let octets = head & 0x7f;
        if octets > std::mem::size_of::<usize>() {
            return Err(Error::InvalidData(format!("length of {} octets", octets)));
        }

        let mut size = 0usize;
        for _ in 0..octets {
            size <<= 8;
            size |= self.next()? as usize
        }

        Ok(size)
    }

    /// Reads the data at the current position automatically, seeking the cursor.
    /// Short version of `self.read(self.read_length())`.
    pub fn read_auto(&mut self) -> Result<&'a [u8]> {
        let length = self.read_length()?;

        self.read(length)
    }

    /// Read a `Cow<'a, str>' at the current position, seeking the cursor.
    pub fn read_str(&mut self) -> Result<Cow<'a, str>> {
        self.read_auto().map(String::from_utf8_lossy)
    }

    /// Read a `String` at the current position, seeking the cursor.
    pub fn read_string(&mut self) -> Result<String> {
        self.read_str().map(|s| s.into_owned())
    }

    /// Runs the closure in the sequence at the current position, seeking the cursor.
    pub fn in_sequence<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Reader<'a>) -> Result<T>,
    {
        f(&mut Self::new(self.read_auto()?))
    }
}

/// Calculates entire size of the payload from the partial buffer of them.
pub fn entire_size_from_partial(header: &[u8]) -> Result<usize> {
    let mut reader = Reader::new(header);
    let length = reader.read_length()?;

    length
        .checked_add(reader.cursor)
        .ok_or_else(|| Error::InvalidData(format!("length {:#X} overflows", length)))
}
