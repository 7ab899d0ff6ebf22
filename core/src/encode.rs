//! Byte-level encoding: an append-only `Encoder` (ported from the
//! original `basic::writer::encode` module) extended with the
//! patch-back operations the assembler needs for forward references.

use byteorder::{BigEndian, ByteOrder};

/// A position previously returned by `Encoder::mark`.
pub type Mark = usize;

/// An append-only, big-endian byte buffer.
///
/// The only mutation permitted after a byte has been appended is a
/// same-width patch at a previously marked position; this is exactly
/// what the assembler needs to resolve a branch operand once its
/// target label is bound later in the same pass.
#[derive(Default)]
pub struct Encoder {
    bytes: Vec<u8>,
}

impl Encoder {
    pub fn new() -> Encoder {
        Encoder { bytes: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Encoder {
        Encoder {
            bytes: Vec::with_capacity(capacity),
        }
    }

    /// The number of bytes written so far.
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Returns the current end of the buffer as a mark, to be used with
    /// `patch_u2`/`patch_u4` once the patched value is known.
    pub fn mark(&self) -> Mark {
        self.bytes.len()
    }

    pub fn write_u8(&mut self, value: u8) {
        self.bytes.push(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        let mut buf = [0u8; 2];
        BigEndian::write_u16(&mut buf, value);
        self.bytes.extend_from_slice(&buf);
    }

    pub fn write_u32(&mut self, value: u32) {
        let mut buf = [0u8; 4];
        BigEndian::write_u32(&mut buf, value);
        self.bytes.extend_from_slice(&buf);
    }

    pub fn write_u64(&mut self, value: u64) {
        let mut buf = [0u8; 8];
        BigEndian::write_u64(&mut buf, value);
        self.bytes.extend_from_slice(&buf);
    }

    pub fn write_i8(&mut self, value: i8) {
        self.write_u8(value as u8);
    }

    pub fn write_i16(&mut self, value: i16) {
        self.write_u16(value as u16);
    }

    pub fn write_i32(&mut self, value: i32) {
        self.write_u32(value as u32);
    }

    pub fn write_i64(&mut self, value: i64) {
        self.write_u64(value as u64);
    }

    pub fn write_f32(&mut self, value: f32) {
        let mut buf = [0u8; 4];
        BigEndian::write_f32(&mut buf, value);
        self.bytes.extend_from_slice(&buf);
    }

    pub fn write_f64(&mut self, value: f64) {
        let mut buf = [0u8; 8];
        BigEndian::write_f64(&mut buf, value);
        self.bytes.extend_from_slice(&buf);
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }

    /// Writes a string as modified UTF-8 (without a length prefix).
    pub fn write_modified_utf8(&mut self, s: &str) {
        write_modified_utf8(s, &mut self.bytes);
    }

    /// Patches a previously written `u2` at `mark` in place.
    pub fn patch_u2(&mut self, mark: Mark, value: u16) {
        BigEndian::write_u16(&mut self.bytes[mark..mark + 2], value);
    }

    /// Patches a previously written `u4` at `mark` in place.
    pub fn patch_u4(&mut self, mark: Mark, value: u32) {
        BigEndian::write_u32(&mut self.bytes[mark..mark + 4], value);
    }

    /// Consumes the encoder, returning the final owned byte vector.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Encodes `s` as modified UTF-8 (JVMS §4.4.7) and appends it to `out`.
///
/// The null character is encoded as the two-byte sequence `C0 80`
/// rather than a single zero byte, and code points beyond the Basic
/// Multilingual Plane are encoded as a surrogate pair, each half
/// re-encoded as a three-byte sequence, matching what the JVM verifier
/// expects and what `Decoder::read_str` above decodes.
pub fn write_modified_utf8(s: &str, out: &mut Vec<u8>) {
    for ch in s.chars() {
        let cp = ch as u32;
        if cp == 0 {
            out.push(0xC0);
            out.push(0x80);
        } else if cp <= 0x7F {
            out.push(cp as u8);
        } else if cp <= 0x7FF {
            out.push(0xC0 | ((cp >> 6) as u8));
            out.push(0x80 | ((cp & 0x3F) as u8));
        } else if cp <= 0xFFFF {
            out.push(0xE0 | ((cp >> 12) as u8));
            out.push(0x80 | (((cp >> 6) & 0x3F) as u8));
            out.push(0x80 | ((cp & 0x3F) as u8));
        } else {
            // encode as a surrogate pair, each half as a 3-byte sequence
            let cp = cp - 0x1_0000;
            let high = 0xD800 + (cp >> 10);
            let low = 0xDC00 + (cp & 0x3FF);
            for surrogate in [high, low] {
                out.push(0xE0 | ((surrogate >> 12) as u8));
                out.push(0x80 | (((surrogate >> 6) & 0x3F) as u8));
                out.push(0x80 | ((surrogate & 0x3F) as u8));
            }
        }
    }
}

/// Returns the modified-UTF-8 encoded length of `s` in bytes, without
/// allocating, for the `u2` length prefix of a `Utf8` constant.
pub fn modified_utf8_len(s: &str) -> usize {
    s.chars()
        .map(|ch| {
            let cp = ch as u32;
            if cp == 0 {
                2
            } else if cp <= 0x7F {
                1
            } else if cp <= 0x7FF {
                2
            } else if cp <= 0xFFFF {
                3
            } else {
                6
            }
        })
        .sum()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::decode::Decoder;

    #[test]
    fn patch_u2_rewrites_in_place() {
        let mut enc = Encoder::new();
        enc.write_u8(0xAB);
        let mark = enc.mark();
        enc.write_u16(0);
        enc.write_u8(0xCD);
        enc.patch_u2(mark, 0x1234);
        assert_eq!(enc.bytes(), &[0xAB, 0x12, 0x34, 0xCD]);
    }

    #[test]
    fn modified_utf8_round_trip_ascii_and_null() {
        for s in ["", "hello", "java/lang/Object", "\u{0}"] {
            let mut buf = Vec::new();
            write_modified_utf8(s, &mut buf);
            assert_eq!(buf.len(), modified_utf8_len(s));
            let mut cursor = 0;
            let mut decoder = Decoder::new(&buf, &mut cursor);
            assert_eq!(decoder.read_str(buf.len()).unwrap(), s);
        }
        // the null character is encoded as two bytes, never a single 0x00
        let mut buf = Vec::new();
        write_modified_utf8("\u{0}", &mut buf);
        assert_eq!(buf, vec![0xC0, 0x80]);
    }

    #[test]
    fn modified_utf8_round_trip_supplementary() {
        let s = "a\u{1F600}b";
        let mut buf = Vec::new();
        write_modified_utf8(s, &mut buf);
        let mut cursor = 0;
        let mut decoder = Decoder::new(&buf, &mut cursor);
        assert_eq!(decoder.read_str(buf.len()).unwrap(), s);
    }
}
