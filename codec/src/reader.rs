use crate::{CodecError, Result};

const U32_SIZE: usize = size_of::<u32>();

/// A cursor over a little endian record stream.
pub(crate) struct Reader<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, offset: 0 }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn is_empty(&self) -> bool {
        self.offset == self.buf.len()
    }

    /// Consumes the next `n` bytes.
    pub fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let available = self.buf.len() - self.offset;

        if n > available {
            return Err(CodecError::Truncated {
                offset: self.offset,
                needed: n,
                available,
            });
        }

        let bytes = &self.buf[self.offset..self.offset + n];
        self.offset += n;
        Ok(bytes)
    }

    pub fn u32(&mut self) -> Result<u32> {
        let bytes = self.take(U32_SIZE)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Reads `len` consecutive `u32`, checking the stream holds them before allocating.
    pub fn u32s(&mut self, len: usize) -> Result<Vec<u32>> {
        let needed = len.checked_mul(U32_SIZE).ok_or(CodecError::Truncated {
            offset: self.offset,
            needed: usize::MAX,
            available: self.buf.len() - self.offset,
        })?;

        let bytes = self.take(needed)?;
        Ok(bytes
            .chunks_exact(U32_SIZE)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian() {
        let buf = [1, 0, 0, 0, 0, 1, 0, 0, 7];
        let mut reader = Reader::new(&buf);

        assert_eq!(reader.u32(), Ok(1));
        assert_eq!(reader.u32(), Ok(256));
        assert_eq!(reader.offset(), 8);
        assert!(!reader.is_empty());

        assert_eq!(
            reader.u32(),
            Err(CodecError::Truncated {
                offset: 8,
                needed: 4,
                available: 1
            })
        );
    }

    #[test]
    fn huge_counts_fail_before_allocating() {
        let mut reader = Reader::new(&[0; 8]);
        assert!(matches!(
            reader.u32s(u32::MAX as usize),
            Err(CodecError::Truncated { .. })
        ));
    }
}
