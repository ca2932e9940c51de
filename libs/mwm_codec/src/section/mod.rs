//! Framing shared by every section.
//!
//! Layout (little-endian):
//!
//! ```text
//! header:  magic u32, version u16, reserved u16
//! body:    section specific records
//! footer:  crc64 u64 over header and body
//! ```

pub mod restriction;
pub mod routing;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use crc::{CRC_64_GO_ISO, Crc};

use crate::CodecError;

pub const VERSION: u16 = 1;

const HEADER_SIZE: usize = 8;
const FOOTER_SIZE: usize = 8;

const CRC64: Crc<u64> = Crc::<u64>::new(&CRC_64_GO_ISO);

/// Checksum of a byte slice, as stored in section footers.
pub fn checksum(data: &[u8]) -> u64 {
    CRC64.checksum(data)
}

/// Begins a section buffer with its header written.
pub(crate) fn begin(magic: u32, capacity: usize) -> BytesMut {
    let mut buf = BytesMut::with_capacity(HEADER_SIZE + capacity + FOOTER_SIZE);
    buf.put_u32_le(magic);
    buf.put_u16_le(VERSION);
    buf.put_u16_le(0);
    buf
}

/// Appends the footer checksum and freezes the buffer.
pub(crate) fn seal(mut buf: BytesMut) -> Bytes {
    let crc = checksum(&buf);
    buf.put_u64_le(crc);
    buf.freeze()
}

/// Validates header and footer, returning a reader over the body.
pub(crate) fn open(data: &[u8], magic: u32) -> Result<Reader<'_>, CodecError> {
    if data.len() < HEADER_SIZE + FOOTER_SIZE {
        return Err(CodecError::Truncated {
            needed: HEADER_SIZE + FOOTER_SIZE,
            remaining: data.len(),
        });
    }

    let (framed, mut footer) = data.split_at(data.len() - FOOTER_SIZE);
    let mut header = framed;

    let found = header.get_u32_le();
    if found != magic {
        return Err(CodecError::BadMagic {
            expected: magic,
            found,
        });
    }

    let version = header.get_u16_le();
    if version != VERSION {
        return Err(CodecError::UnsupportedVersion(version));
    }
    header.advance(2);

    let stored = footer.get_u64_le();
    let computed = checksum(framed);
    if stored != computed {
        return Err(CodecError::ChecksumMismatch { stored, computed });
    }

    Ok(Reader { buf: header })
}

/// Bounds-checked little-endian reader over a section body.
pub(crate) struct Reader<'a> {
    buf: &'a [u8],
}

impl Reader<'_> {
    fn require(&self, needed: usize) -> Result<(), CodecError> {
        match self.buf.remaining() {
            remaining if remaining < needed => Err(CodecError::Truncated { needed, remaining }),
            _ => Ok(()),
        }
    }

    pub fn u8(&mut self) -> Result<u8, CodecError> {
        self.require(1)?;
        Ok(self.buf.get_u8())
    }

    pub fn u16(&mut self) -> Result<u16, CodecError> {
        self.require(2)?;
        Ok(self.buf.get_u16_le())
    }

    pub fn u32(&mut self) -> Result<u32, CodecError> {
        self.require(4)?;
        Ok(self.buf.get_u32_le())
    }

    pub fn i32(&mut self) -> Result<i32, CodecError> {
        self.require(4)?;
        Ok(self.buf.get_i32_le())
    }

    /// Reads a record count, rejecting counts that cannot fit in the rest of the body.
    pub fn count(&mut self, min_record_size: usize) -> Result<usize, CodecError> {
        let count = self.u32()? as usize;
        self.require(count.saturating_mul(min_record_size))?;
        Ok(count)
    }

    pub fn finish(self) -> Result<(), CodecError> {
        match self.buf.remaining() {
            0 => Ok(()),
            n => Err(CodecError::TrailingBytes(n)),
        }
    }
}
