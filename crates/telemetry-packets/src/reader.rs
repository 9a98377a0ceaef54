//! Bounds-checked little-endian readers and writers.
//!
//! Packets are never aliased as structs; every field is extracted at a fixed
//! offset after checking the remaining length.

use lapsync_errors::{DecodeError, DecodeResult};

/// Cursor-style byte reader for little-endian binary data.
#[derive(Debug)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn at(data: &'a [u8], offset: usize) -> Self {
        Self { data, pos: offset }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    fn take<const N: usize>(&mut self) -> DecodeResult<[u8; N]> {
        let end = self
            .pos
            .checked_add(N)
            .ok_or(DecodeError::OutOfBounds {
                offset: self.pos,
                width: N,
            })?;
        let slice = self.data.get(self.pos..end).ok_or(DecodeError::OutOfBounds {
            offset: self.pos,
            width: N,
        })?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        self.pos = end;
        Ok(out)
    }

    #[inline]
    pub fn u8(&mut self) -> DecodeResult<u8> {
        self.take::<1>().map(|[b]| b)
    }

    #[inline]
    pub fn i8(&mut self) -> DecodeResult<i8> {
        self.take::<1>().map(i8::from_le_bytes)
    }

    #[inline]
    pub fn bool(&mut self) -> DecodeResult<bool> {
        self.u8().map(|v| v != 0)
    }

    #[inline]
    pub fn u16_le(&mut self) -> DecodeResult<u16> {
        self.take::<2>().map(u16::from_le_bytes)
    }

    #[inline]
    pub fn u32_le(&mut self) -> DecodeResult<u32> {
        self.take::<4>().map(u32::from_le_bytes)
    }

    #[inline]
    pub fn u64_le(&mut self) -> DecodeResult<u64> {
        self.take::<8>().map(u64::from_le_bytes)
    }

    /// Non-finite values read as `0.0`.
    #[inline]
    pub fn f32_le(&mut self) -> DecodeResult<f32> {
        self.take::<4>()
            .map(f32::from_le_bytes)
            .map(|v| if v.is_finite() { v } else { 0.0 })
    }

    /// Non-finite values read as `0.0`.
    #[inline]
    pub fn f64_le(&mut self) -> DecodeResult<f64> {
        self.take::<8>()
            .map(f64::from_le_bytes)
            .map(|v| if v.is_finite() { v } else { 0.0 })
    }

    pub fn u8_array<const N: usize>(&mut self) -> DecodeResult<[u8; N]> {
        self.take::<N>()
    }

    pub fn f32_le_array<const N: usize>(&mut self) -> DecodeResult<[f32; N]> {
        let mut arr = [0.0f32; N];
        for item in arr.iter_mut() {
            *item = self.f32_le()?;
        }
        Ok(arr)
    }

    /// Read a fixed-width, NUL-padded UTF-8 name field.
    pub fn name<const N: usize>(&mut self) -> DecodeResult<String> {
        let raw = self.take::<N>()?;
        let len = raw.iter().position(|&b| b == 0).unwrap_or(N);
        let bytes = raw.get(..len).unwrap_or(&[]);
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    pub fn skip(&mut self, n: usize) -> DecodeResult<()> {
        let end = self.pos.checked_add(n).ok_or(DecodeError::OutOfBounds {
            offset: self.pos,
            width: n,
        })?;
        if end > self.data.len() {
            return Err(DecodeError::OutOfBounds {
                offset: self.pos,
                width: n,
            });
        }
        self.pos = end;
        Ok(())
    }
}

/// Fixed-size little-endian writer used to build packets.
///
/// Writes past the end of the buffer are dropped; the buffer length is fixed
/// at construction to the record size of the packet being built.
#[derive(Debug, Clone)]
pub struct ByteWriter {
    buf: Vec<u8>,
    pos: usize,
}

impl ByteWriter {
    /// Zero-filled buffer of `len` bytes.
    pub fn zeroed(len: usize) -> Self {
        Self {
            buf: vec![0u8; len],
            pos: 0,
        }
    }

    pub fn seek(&mut self, offset: usize) -> &mut Self {
        self.pos = offset;
        self
    }

    fn put(&mut self, bytes: &[u8]) -> &mut Self {
        let end = self.pos.saturating_add(bytes.len());
        if let Some(dst) = self.buf.get_mut(self.pos..end) {
            dst.copy_from_slice(bytes);
        }
        self.pos = end;
        self
    }

    /// Advance without writing; skipped bytes keep their current value.
    pub fn skip(&mut self, n: usize) -> &mut Self {
        self.pos = self.pos.saturating_add(n);
        self
    }

    pub fn u8(&mut self, v: u8) -> &mut Self {
        self.put(&[v])
    }

    pub fn i8(&mut self, v: i8) -> &mut Self {
        self.put(&v.to_le_bytes())
    }

    pub fn bool(&mut self, v: bool) -> &mut Self {
        self.u8(u8::from(v))
    }

    pub fn u16_le(&mut self, v: u16) -> &mut Self {
        self.put(&v.to_le_bytes())
    }

    pub fn u32_le(&mut self, v: u32) -> &mut Self {
        self.put(&v.to_le_bytes())
    }

    pub fn u64_le(&mut self, v: u64) -> &mut Self {
        self.put(&v.to_le_bytes())
    }

    pub fn f32_le(&mut self, v: f32) -> &mut Self {
        self.put(&v.to_le_bytes())
    }

    pub fn f64_le(&mut self, v: f64) -> &mut Self {
        self.put(&v.to_le_bytes())
    }

    pub fn bytes(&mut self, v: &[u8]) -> &mut Self {
        self.put(v)
    }

    /// Write `name` into an `N`-byte field, truncated to leave a NUL terminator.
    pub fn name<const N: usize>(&mut self, name: &str) -> &mut Self {
        let mut field = [0u8; N];
        let mut len = 0usize;
        for (i, ch) in name.char_indices() {
            let end = i.saturating_add(ch.len_utf8());
            if end >= N {
                break;
            }
            len = end;
        }
        let src = name.as_bytes().get(..len).unwrap_or(&[]);
        if let Some(dst) = field.get_mut(..len) {
            dst.copy_from_slice(src);
        }
        self.put(&field)
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn byte_reader_u16_le() -> TestResult {
        let data = [0x01u8, 0x00];
        let mut r = ByteReader::new(&data);
        assert_eq!(r.u16_le()?, 1);
        Ok(())
    }

    #[test]
    fn byte_reader_out_of_bounds_errors() {
        let data = [0x01u8];
        let mut r = ByteReader::new(&data);
        assert!(r.u16_le().is_err());
    }

    #[test]
    fn byte_reader_offset_past_end_errors() {
        let data = [0u8; 4];
        let mut r = ByteReader::at(&data, 10);
        assert_eq!(
            r.u8(),
            Err(DecodeError::OutOfBounds {
                offset: 10,
                width: 1
            })
        );
    }

    #[test]
    fn byte_reader_non_finite_float_reads_zero() -> TestResult {
        let bytes = f32::NAN.to_le_bytes();
        let mut r = ByteReader::new(&bytes);
        assert_eq!(r.f32_le()?.to_bits(), 0.0f32.to_bits());
        Ok(())
    }

    #[test]
    fn name_stops_at_nul() -> TestResult {
        let mut field = [0u8; 48];
        field[..6].copy_from_slice(b"HAMILT");
        let mut r = ByteReader::new(&field);
        assert_eq!(r.name::<48>()?, "HAMILT");
        assert_eq!(r.position(), 48);
        Ok(())
    }

    #[test]
    fn writer_drops_bytes_past_end() {
        let mut w = ByteWriter::zeroed(3);
        w.u16_le(0xBEEF).u16_le(0x1234);
        assert_eq!(w.into_inner(), vec![0xEF, 0xBE, 0x34]);
    }

    #[test]
    fn writer_name_truncates_on_char_boundary() -> TestResult {
        let mut w = ByteWriter::zeroed(4);
        w.name::<4>("Pérez");
        let buf = w.into_inner();
        let mut r = ByteReader::new(&buf);
        assert_eq!(r.name::<4>()?, "Pé");
        Ok(())
    }
}
