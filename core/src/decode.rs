//! Byte-level decoding: a cursor-based `Decoder` for sequential parsing
//! (ported from the original `basic::parser::decode` module), plus a
//! `ByteView` for the random-access reads the lazy model layer needs.

use crate::result::*;
use byteorder::{BigEndian, ByteOrder};
use std::char;

/// A sequential, big-endian decoder over a byte slice.
///
/// The cursor is a mutable borrow rather than a field so that `limit`
/// can hand out a sub-decoder that shares the same underlying position:
/// advancing the sub-decoder advances the parent too.
pub struct Decoder<'a> {
    bytes: &'a [u8],
    cursor: &'a mut usize,
    limit: usize,
}

impl<'a> Decoder<'a> {
    /// Creates a new decoder. The cursor has to be a mutable pointer to
    /// support limits without copying.
    pub fn new(bytes: &'a [u8], cursor: &'a mut usize) -> Decoder<'a> {
        Decoder {
            bytes,
            cursor,
            limit: bytes.len(),
        }
    }

    /// Limits the decoder to `to` bytes after the cursor.
    pub fn limit(&mut self, to: usize) -> Result<Decoder> {
        let end = *self.cursor + to;
        self.check(end)?;
        Ok(Decoder {
            bytes: self.bytes,
            cursor: self.cursor,
            limit: end,
        })
    }

    /// Removes the limit, returning an error if it was exceeded or not
    /// fully consumed.
    pub fn remove_limit(self) -> Result<()> {
        if self.limit == *self.cursor {
            Ok(())
        } else {
            Err(Error::LimitExceeded)
        }
    }

    /// Skips a certain number of bytes.
    pub fn skip(&mut self, to: usize) -> Result<()> {
        let end = *self.cursor + to;
        self.check(end)?;
        *self.cursor = end;
        Ok(())
    }

    /// Returns the current cursor position.
    pub fn cursor(&self) -> usize {
        *self.cursor
    }

    /// Reads a specific amount of bytes.
    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        let end = *self.cursor + count;
        self.check(end)?;

        let bytes = &self.bytes[*self.cursor..end];
        *self.cursor = end;
        Ok(bytes)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(BigEndian::read_u16(self.read_bytes(2)?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(BigEndian::read_u32(self.read_bytes(4)?))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(BigEndian::read_u64(self.read_bytes(8)?))
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(self.read_u16()? as i16)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(self.read_u32()? as i32)
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(self.read_u64()? as i64)
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(BigEndian::read_f32(self.read_bytes(4)?))
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(BigEndian::read_f64(self.read_bytes(8)?))
    }

    /// Decodes a modified UTF-8 string of `length` encoded bytes.
    ///
    /// `length` is the amount of bytes the string was encoded in, which
    /// may differ from the resulting char count.
    pub fn read_str(&mut self, length: usize) -> Result<String> {
        let mut out = String::with_capacity(length);

        let mut i = length;
        while i > 0 {
            let r1 = u32::from(self.read_u8()?);
            let ch = if r1 != 0 && r1 < 0x80 {
                i -= 1;
                r1
            } else if r1 >= 0xC0 && r1 < 0xE0 && i >= 1 {
                i -= 2;
                let r2 = u32::from(self.read_u8()?);
                (r1 & 0x1F) << 6 | (r2 & 0x3F)
            } else if r1 >= 0xE0 && r1 < 0xF0 && i >= 3 {
                i -= 3;
                let r2 = u32::from(self.read_u8()?);
                let r3 = u32::from(self.read_u8()?);
                if r1 == 0xED && r2 >= 0xA0 && r2 <= 0xAF {
                    if i >= 6 {
                        i -= 6;

                        self.read_u8()?;
                        let r5 = u32::from(self.read_u8()?);
                        let r6 = u32::from(self.read_u8()?);
                        // r1 and r4 (0xED, 0xED) are implied by the
                        // surrogate-pair encoding and carry no bits.
                        0x1_0000 + ((r2 & 0x0F) << 16) + ((r3 & 0x3F) << 10) + ((r5 & 0x0F) << 6)
                            + (r6 & 0x3F)
                    } else {
                        return Err(Error::InvalidUTF8);
                    }
                } else {
                    ((r1 & 0x0F) << 12) + ((r2 & 0x3F) << 6) + (r3 & 0x3F)
                }
            } else {
                return Err(Error::InvalidUTF8);
            };

            let ch = char::from_u32(ch).ok_or(Error::InvalidUTF8)?;
            out.push(ch);
        }

        Ok(out)
    }

    fn check(&self, location: usize) -> Result<()> {
        if location <= self.limit {
            Ok(())
        } else {
            Err(Error::LimitExceeded)
        }
    }
}

/// A random-access, big-endian view over an immutable byte slice.
///
/// Unlike `Decoder`, `ByteView` has no notion of a cursor: every read
/// takes an explicit offset. This is what the lazy model layer holds
/// on to, since a `MethodModel` or `CodeModel` needs to re-read the
/// same backing buffer from an arbitrary offset on demand, long after
/// the sequential top-to-bottom class-file parse has finished.
#[derive(Clone, Copy)]
pub struct ByteView<'a> {
    bytes: &'a [u8],
}

impl<'a> ByteView<'a> {
    pub fn new(bytes: &'a [u8]) -> ByteView<'a> {
        ByteView { bytes }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_slice(&self) -> &'a [u8] {
        self.bytes
    }

    /// Returns a sequential `Decoder` over the same bytes, starting at
    /// the position held in `cursor`.
    pub fn decoder_at(&self, cursor: &'a mut usize) -> Decoder<'a> {
        Decoder::new(self.bytes, cursor)
    }

    fn check(&self, end: usize) -> Result<()> {
        if end <= self.bytes.len() {
            Ok(())
        } else {
            Err(Error::LimitExceeded)
        }
    }

    pub fn read_bytes(&self, off: usize, len: usize) -> Result<&'a [u8]> {
        let end = off + len;
        self.check(end)?;
        Ok(&self.bytes[off..end])
    }

    pub fn u1(&self, off: usize) -> Result<u8> {
        Ok(self.read_bytes(off, 1)?[0])
    }

    pub fn u2(&self, off: usize) -> Result<u16> {
        Ok(BigEndian::read_u16(self.read_bytes(off, 2)?))
    }

    pub fn u4(&self, off: usize) -> Result<u32> {
        Ok(BigEndian::read_u32(self.read_bytes(off, 4)?))
    }

    pub fn s1(&self, off: usize) -> Result<i8> {
        Ok(self.u1(off)? as i8)
    }

    pub fn s2(&self, off: usize) -> Result<i16> {
        Ok(self.u2(off)? as i16)
    }

    pub fn s4(&self, off: usize) -> Result<i32> {
        Ok(self.u4(off)? as i32)
    }

    pub fn s8(&self, off: usize) -> Result<i64> {
        Ok(BigEndian::read_i64(self.read_bytes(off, 8)?))
    }

    pub fn f4(&self, off: usize) -> Result<f32> {
        Ok(BigEndian::read_f32(self.read_bytes(off, 4)?))
    }

    pub fn f8(&self, off: usize) -> Result<f64> {
        Ok(BigEndian::read_f64(self.read_bytes(off, 8)?))
    }
}

/// **Very** important tests (yes)
#[cfg(test)]
mod test {
    use super::Decoder;

    macro_rules! test_values {
        ( $func:ident { $( $input:expr => $expected:expr ),* $(,)? } ) => {
            #[test]
            fn $func() {
                $(
                    let mut cursor = 0;
                    let mut decoder = Decoder::new(&$input, &mut cursor);
                    for e in &$expected {
                        assert_eq!(decoder.$func().unwrap(), *e);
                    }
                )*
            }
        };
    }

    test_values! {read_u8 {
        [0] => [0],
        [5] => [5],
        [0xFF] => [0xFF],
        [0xAA, 0xBB, 0xCC] => [0xAA, 0xBB, 0xCC],
    }}

    test_values! {read_u16 {
        [0x00, 0xFE] => [0x00FE],
        [0xAA, 0xBB] => [0xAABB],
        [0xFF, 0xFF, 0xCA, 0xFE] => [0xFFFF, 0xCAFE],
    }}

    test_values! {read_u32 {
        [0x00, 0xFE, 0x00, 0xAB] => [0x00FE00AB],
        [0xCA, 0xFE, 0xBA, 0xBE] => [0xCAFEBABE],
    }}

    #[test]
    fn read_str_basic() {
        let bytes = b"Hello, world!";
        let mut cursor = 0;
        let mut decoder = Decoder::new(bytes, &mut cursor);
        assert_eq!(decoder.read_str(bytes.len()).unwrap(), "Hello, world!");
    }

    #[test]
    fn read_str_null_byte_is_two_bytes() {
        let bytes = [0xC0, 0x80];
        let mut cursor = 0;
        let mut decoder = Decoder::new(&bytes, &mut cursor);
        assert_eq!(decoder.read_str(2).unwrap(), "\u{0}");
    }

    #[test]
    fn read_str_supplementary_surrogate_pair() {
        // U+1F600 encoded as a CESU-8-style surrogate pair, each half
        // re-encoded as a 3-byte sequence.
        let s = "\u{1F600}";
        let mut buf = Vec::new();
        crate::encode::write_modified_utf8(s, &mut buf);
        let mut cursor = 0;
        let mut decoder = Decoder::new(&buf, &mut cursor);
        assert_eq!(decoder.read_str(buf.len()).unwrap(), s);
    }

    #[test]
    fn byte_view_random_access() {
        use super::ByteView;
        let bytes = [0xCA, 0xFE, 0xBA, 0xBE, 0x00, 0x34];
        let view = ByteView::new(&bytes);
        assert_eq!(view.u4(0).unwrap(), 0xCAFEBABE);
        assert_eq!(view.u2(4).unwrap(), 0x0034);
        assert!(view.u2(5).is_err());
    }
}
