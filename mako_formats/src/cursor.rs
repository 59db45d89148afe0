use thiserror::Error;

/// Raised when a read would run past the end of the buffer. Truncated
/// archive entries are an expected input, so callers recover from this
/// per record rather than aborting the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CursorError {
    #[error("read of {need} byte(s) at offset {offset} exceeds buffer of {len} byte(s)")]
    OutOfRange {
        offset: usize,
        need: usize,
        len: usize,
    },
}

/// Bounds-checked little-endian reader over a byte buffer.
#[derive(Debug, Clone)]
pub struct BinaryCursor<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> BinaryCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        BinaryCursor { data, offset: 0 }
    }

    pub fn at(data: &'a [u8], offset: usize) -> Result<Self, CursorError> {
        let mut cursor = BinaryCursor::new(data);
        cursor.seek(offset)?;
        Ok(cursor)
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    pub fn seek(&mut self, offset: usize) -> Result<(), CursorError> {
        if offset > self.data.len() {
            return Err(CursorError::OutOfRange {
                offset,
                need: 0,
                len: self.data.len(),
            });
        }
        self.offset = offset;
        Ok(())
    }

    pub fn skip(&mut self, count: usize) -> Result<(), CursorError> {
        self.take(count).map(|_| ())
    }

    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8], CursorError> {
        self.take(count)
    }

    pub fn read_u8(&mut self) -> Result<u8, CursorError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8, CursorError> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_u16_le(&mut self) -> Result<u16, CursorError> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_i16_le(&mut self) -> Result<i16, CursorError> {
        Ok(self.read_u16_le()? as i16)
    }

    pub fn read_u32_le(&mut self) -> Result<u32, CursorError> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_i32_le(&mut self) -> Result<i32, CursorError> {
        Ok(self.read_u32_le()? as i32)
    }

    /// Random access without moving the cursor.
    pub fn peek_u8(&self, offset: usize) -> Result<u8, CursorError> {
        self.data
            .get(offset)
            .copied()
            .ok_or(CursorError::OutOfRange {
                offset,
                need: 1,
                len: self.data.len(),
            })
    }

    pub fn peek_u16_le(&self, offset: usize) -> Result<u16, CursorError> {
        match self.data.get(offset..offset + 2) {
            Some(bytes) => Ok(u16::from_le_bytes([bytes[0], bytes[1]])),
            None => Err(CursorError::OutOfRange {
                offset,
                need: 2,
                len: self.data.len(),
            }),
        }
    }

    fn take(&mut self, count: usize) -> Result<&'a [u8], CursorError> {
        let end = self.offset.checked_add(count).ok_or(CursorError::OutOfRange {
            offset: self.offset,
            need: count,
            len: self.data.len(),
        })?;
        if end > self.data.len() {
            return Err(CursorError::OutOfRange {
                offset: self.offset,
                need: count,
                len: self.data.len(),
            });
        }
        let bytes = &self.data[self.offset..end];
        self.offset = end;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_reads_advance_in_order() {
        let data = [0x01u8, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07];
        let mut cursor = BinaryCursor::new(&data);
        assert_eq!(cursor.read_u8().unwrap(), 0x01);
        assert_eq!(cursor.read_u16_le().unwrap(), 0x0302);
        assert_eq!(cursor.read_u32_le().unwrap(), 0x07060504);
        assert_eq!(cursor.offset(), 7);
        assert_eq!(cursor.remaining(), 0);
    }

    #[test]
    fn signed_reads_sign_extend() {
        let data = (-5i16).to_le_bytes();
        let mut cursor = BinaryCursor::new(&data);
        assert_eq!(cursor.read_i16_le().unwrap(), -5);
    }

    #[test]
    fn short_read_reports_out_of_range() {
        let data = [0xAAu8, 0xBB];
        let mut cursor = BinaryCursor::new(&data);
        cursor.read_u8().unwrap();
        let err = cursor.read_u32_le().unwrap_err();
        assert_eq!(
            err,
            CursorError::OutOfRange {
                offset: 1,
                need: 4,
                len: 2
            }
        );
        // The failed read must not move the cursor.
        assert_eq!(cursor.offset(), 1);
        assert_eq!(cursor.read_u8().unwrap(), 0xBB);
    }

    #[test]
    fn peek_does_not_advance() {
        let data = [0x10u8, 0x20, 0x30];
        let cursor = BinaryCursor::new(&data);
        assert_eq!(cursor.peek_u8(2).unwrap(), 0x30);
        assert_eq!(cursor.peek_u16_le(1).unwrap(), 0x3020);
        assert!(cursor.peek_u8(3).is_err());
        assert_eq!(cursor.offset(), 0);
    }

    #[test]
    fn seek_past_end_is_rejected() {
        let data = [0u8; 4];
        let mut cursor = BinaryCursor::new(&data);
        assert!(cursor.seek(4).is_ok());
        assert!(cursor.seek(5).is_err());
    }
}
