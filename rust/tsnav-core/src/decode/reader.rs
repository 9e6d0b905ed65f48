use byteorder::{ByteOrder, LittleEndian};

/// Fixed-point coordinates on disk are scaled by this divisor.
pub const FIXED_POINT_DIVISOR: f32 = 256.0;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("read of {len} bytes at offset {offset:#x} is out of bounds (buffer is {buf_len} bytes)")]
    OutOfBounds { offset: usize, len: usize, buf_len: usize },
    #[error("negative count {count} at offset {offset:#x}")]
    NegativeCount { count: i32, offset: usize },
    #[error("unsupported format version {0}")]
    UnsupportedVersion(i32),
}

/// Little-endian view over a sector or prefab buffer.
///
/// Every read takes an absolute offset and returns the value together with the
/// offset just past it, so layouts can be walked without a hidden cursor.
#[derive(Clone, Copy)]
pub struct ByteReader<'a> {
    bytes: &'a [u8],
}

impl<'a> ByteReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self { Self { bytes } }

    pub fn len(&self) -> usize { self.bytes.len() }
    pub fn is_empty(&self) -> bool { self.bytes.is_empty() }

    fn slice(&self, offset: usize, len: usize) -> Result<&'a [u8], DecodeError> {
        let end = offset.checked_add(len).filter(|&end| end <= self.bytes.len());
        match end {
            Some(end) => Ok(&self.bytes[offset..end]),
            None => Err(DecodeError::OutOfBounds { offset, len, buf_len: self.bytes.len() }),
        }
    }

    /// Checks that `len` bytes starting at `offset` exist and returns the offset past them.
    pub fn skip(&self, offset: usize, len: usize) -> Result<usize, DecodeError> {
        self.slice(offset, len)?;
        Ok(offset + len)
    }

    pub fn u8(&self, offset: usize) -> Result<(u8, usize), DecodeError> {
        Ok((self.slice(offset, 1)?[0], offset + 1))
    }

    pub fn i8(&self, offset: usize) -> Result<(i8, usize), DecodeError> {
        let (v, next) = self.u8(offset)?;
        Ok((v as i8, next))
    }

    pub fn u32(&self, offset: usize) -> Result<(u32, usize), DecodeError> {
        Ok((LittleEndian::read_u32(self.slice(offset, 4)?), offset + 4))
    }

    pub fn i32(&self, offset: usize) -> Result<(i32, usize), DecodeError> {
        Ok((LittleEndian::read_i32(self.slice(offset, 4)?), offset + 4))
    }

    pub fn u64(&self, offset: usize) -> Result<(u64, usize), DecodeError> {
        Ok((LittleEndian::read_u64(self.slice(offset, 8)?), offset + 8))
    }

    pub fn i64(&self, offset: usize) -> Result<(i64, usize), DecodeError> {
        Ok((LittleEndian::read_i64(self.slice(offset, 8)?), offset + 8))
    }

    pub fn f32(&self, offset: usize) -> Result<(f32, usize), DecodeError> {
        Ok((LittleEndian::read_f32(self.slice(offset, 4)?), offset + 4))
    }

    /// 32-bit fixed-point coordinate, scaled by 1/256.
    pub fn fixed(&self, offset: usize) -> Result<(f32, usize), DecodeError> {
        let (raw, next) = self.i32(offset)?;
        Ok((raw as f32 / FIXED_POINT_DIVISOR, next))
    }

    /// Reads an i32 element count; negative counts are rejected.
    pub fn count(&self, offset: usize) -> Result<(usize, usize), DecodeError> {
        let (raw, next) = self.i32(offset)?;
        if raw < 0 {
            return Err(DecodeError::NegativeCount { count: raw, offset });
        }
        Ok((raw as usize, next))
    }

    /// Reads `count` u64 values stored back to back.
    pub fn u64_array(&self, offset: usize, count: usize) -> Result<(Vec<u64>, usize), DecodeError> {
        let len = count.checked_mul(8).ok_or(DecodeError::OutOfBounds { offset, len: usize::MAX, buf_len: self.bytes.len() })?;
        let bytes = self.slice(offset, len)?;
        let out = bytes.chunks_exact(8).map(LittleEndian::read_u64).collect();
        Ok((out, offset + len))
    }

    /// Skips `count` records of `record_size` bytes.
    pub fn skip_records(&self, offset: usize, count: usize, record_size: usize) -> Result<usize, DecodeError> {
        let len = count.checked_mul(record_size).ok_or(DecodeError::OutOfBounds { offset, len: usize::MAX, buf_len: self.bytes.len() })?;
        self.skip(offset, len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_scalars_and_advances() {
        let mut buf = vec![0u8; 29];
        buf[0] = 0xFE;
        LittleEndian::write_u32(&mut buf[1..5], 0xDEADBEEF);
        LittleEndian::write_i32(&mut buf[5..9], -512);
        LittleEndian::write_u64(&mut buf[9..17], 0x0102_0304_0506_0708);
        LittleEndian::write_f32(&mut buf[17..21], 1.5);
        LittleEndian::write_i64(&mut buf[21..29], -7);
        let r = ByteReader::new(&buf);

        assert_eq!(r.u8(0).unwrap(), (0xFE, 1));
        assert_eq!(r.i8(0).unwrap(), (-2, 1));
        assert_eq!(r.u32(1).unwrap(), (0xDEADBEEF, 5));
        assert_eq!(r.i32(5).unwrap(), (-512, 9));
        assert_eq!(r.fixed(5).unwrap(), (-2.0, 9));
        assert_eq!(r.u64(9).unwrap(), (0x0102_0304_0506_0708, 17));
        assert_eq!(r.f32(17).unwrap(), (1.5, 21));
        assert_eq!(r.i64(21).unwrap(), (-7, 29));
    }

    #[test]
    fn out_of_range_reads_fail() {
        let buf = [0u8; 6];
        let r = ByteReader::new(&buf);
        assert_eq!(r.u32(3), Err(DecodeError::OutOfBounds { offset: 3, len: 4, buf_len: 6 }));
        assert!(r.u64(0).is_err());
        assert!(r.u8(6).is_err());
        assert!(r.skip(usize::MAX, 2).is_err());
        assert_eq!(r.skip(2, 4), Ok(6));
    }

    #[test]
    fn negative_counts_are_rejected() {
        let mut buf = [0u8; 4];
        LittleEndian::write_i32(&mut buf, -1);
        let r = ByteReader::new(&buf);
        assert_eq!(r.count(0), Err(DecodeError::NegativeCount { count: -1, offset: 0 }));
    }

    #[test]
    fn u64_array_reads_in_order() {
        let mut buf = vec![0u8; 24];
        for (i, v) in [7u64, 8, 9].iter().enumerate() {
            LittleEndian::write_u64(&mut buf[i * 8..i * 8 + 8], *v);
        }
        let r = ByteReader::new(&buf);
        assert_eq!(r.u64_array(0, 3).unwrap(), (vec![7, 8, 9], 24));
        assert!(r.u64_array(8, 3).is_err());
        assert_eq!(r.skip_records(0, 3, 8), Ok(24));
    }
}
