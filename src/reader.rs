use crate::error::{ClassError, Result};

/// Big-endian cursor over an immutable byte slice.
pub struct ClassReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ClassReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let slice = self
            .data
            .get(self.pos..self.pos + len)
            .ok_or(ClassError::Truncated {
                offset: self.pos,
                needed: len,
            })?;
        self.pos += len;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let slice = self.take(2)?;
        Ok(u16::from_be_bytes([slice[0], slice[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let slice = self.take(4)?;
        Ok(u32::from_be_bytes([slice[0], slice[1], slice[2], slice[3]]))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(self.read_u32()? as i32)
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_bits(self.read_u32()?))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        let high = self.read_u32()? as u64;
        let low = self.read_u32()? as u64;
        Ok(((high << 32) | low) as i64)
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_bits(self.read_i64()? as u64))
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        self.take(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_big_endian_primitives() {
        let data = [0xCA, 0xFE, 0xBA, 0xBE, 0x00, 0x32];
        let mut reader = ClassReader::new(&data);

        assert_eq!(reader.read_u32().expect("u32"), 0xCAFEBABE);
        assert_eq!(reader.position(), 4);
        assert_eq!(reader.read_u16().expect("u16"), 0x0032);
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn rejects_read_past_end() {
        let data = [0x00];
        let mut reader = ClassReader::new(&data);

        let err = reader.read_u16().expect_err("truncated");
        assert!(matches!(
            err,
            ClassError::Truncated {
                offset: 0,
                needed: 2
            }
        ));
        // Position is unchanged after a failed read.
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn reads_signed_and_float_values() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(-7i32).to_be_bytes());
        bytes.extend_from_slice(&2.5f32.to_bits().to_be_bytes());
        bytes.extend_from_slice(&(-1i64).to_be_bytes());
        let mut reader = ClassReader::new(&bytes);

        assert_eq!(reader.read_i32().expect("i32"), -7);
        assert_eq!(reader.read_f32().expect("f32"), 2.5);
        assert_eq!(reader.read_i64().expect("i64"), -1);
    }
}
