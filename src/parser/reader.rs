use crate::{Error, Result};

/// Forward cursor over sequence bytes. Multi-byte reads are big-endian.
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let byte = *self
            .data
            .get(self.pos)
            .ok_or(Error::UnexpectedEof { offset: self.pos })?;
        self.pos += 1;
        Ok(byte)
    }

    pub fn read_bytes<const N: usize>(&mut self) -> Result<[u8; N]> {
        let end = self.pos + N;
        let slice = self
            .data
            .get(self.pos..end)
            .ok_or(Error::UnexpectedEof {
                offset: self.data.len(),
            })?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        self.pos = end;
        Ok(out)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        self.read_bytes::<2>().map(u16::from_be_bytes)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        self.read_bytes::<4>().map(u32::from_be_bytes)
    }

    /// MIDI variable-length quantity. At most four bytes are consumed; the
    /// fourth terminates the value even if its continuation bit is set.
    pub fn read_var_len(&mut self) -> Result<u32> {
        let mut value = 0u32;
        for _ in 0..4 {
            let byte = self.read_u8()?;
            value = (value << 7) | u32::from(byte & 0x7F);
            if byte & 0x80 == 0 {
                break;
            }
        }
        Ok(value)
    }

    pub fn skip(&mut self, count: usize) -> Result<()> {
        let end = self.pos + count;
        if end > self.data.len() {
            return Err(Error::UnexpectedEof {
                offset: self.data.len(),
            });
        }
        self.pos = end;
        Ok(())
    }

    /// Step back over the byte just read.
    pub fn rewind_one(&mut self) {
        self.pos = self.pos.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(bytes: &[u8]) -> (u32, usize) {
        let mut reader = ByteReader::new(bytes);
        let value = reader.read_var_len().unwrap();
        (value, reader.position())
    }

    #[test]
    fn test_var_len_boundaries() {
        assert_eq!(decode(&[0x00]), (0, 1));
        assert_eq!(decode(&[0x7F]), (127, 1));
        assert_eq!(decode(&[0x81, 0x00]), (128, 2));
        assert_eq!(decode(&[0xFF, 0x7F]), (16383, 2));
        assert_eq!(decode(&[0xFF, 0xFF, 0x7F]), (2_097_151, 3));
        assert_eq!(decode(&[0xFF, 0xFF, 0xFF, 0x7F]), (268_435_455, 4));
    }

    #[test]
    fn test_var_len_stops_after_four_bytes() {
        let mut reader = ByteReader::new(&[0x81, 0x80, 0x80, 0x80, 0x42]);
        assert_eq!(reader.read_var_len().unwrap(), 2_097_152);
        assert_eq!(reader.position(), 4);
        assert_eq!(reader.read_u8().unwrap(), 0x42);
    }

    #[test]
    fn test_big_endian_reads() {
        let mut reader = ByteReader::new(&[0x01, 0xE0, 0xDE, 0xAD, 0xBE, 0xEF]);
        assert_eq!(reader.read_u16().unwrap(), 480);
        assert_eq!(reader.read_u32().unwrap(), 0xDEAD_BEEF);
    }

    #[test]
    fn test_eof_reports_offset() {
        let mut reader = ByteReader::new(&[0x90]);
        reader.read_u8().unwrap();
        match reader.read_u8() {
            Err(Error::UnexpectedEof { offset }) => assert_eq!(offset, 1),
            other => panic!("expected eof, got {other:?}"),
        }
        assert!(reader.skip(1).is_err());
    }
}
