use thiserror::Error;

/// Errors raised by the fixed-width little-endian readers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ByteError {
    #[error("buffer underrun at offset {offset}: need {needed} bytes, have {len}")]
    Underrun {
        offset: usize,
        needed: usize,
        len: usize,
    },
}

pub type Result<T> = std::result::Result<T, ByteError>;

fn check(data: &[u8], offset: usize, needed: usize) -> Result<()> {
    if offset.checked_add(needed).map_or(true, |end| end > data.len()) {
        return Err(ByteError::Underrun {
            offset,
            needed,
            len: data.len(),
        });
    }
    Ok(())
}

pub fn read_u8(data: &[u8], offset: usize) -> Result<u8> {
    check(data, offset, 1)?;
    Ok(data[offset])
}

pub fn read_u16_le(data: &[u8], offset: usize) -> Result<u16> {
    check(data, offset, 2)?;
    Ok(u16::from_le_bytes([data[offset], data[offset + 1]]))
}

pub fn read_i16_le(data: &[u8], offset: usize) -> Result<i16> {
    check(data, offset, 2)?;
    Ok(i16::from_le_bytes([data[offset], data[offset + 1]]))
}

pub fn read_u32_le(data: &[u8], offset: usize) -> Result<u32> {
    check(data, offset, 4)?;
    Ok(u32::from_le_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ]))
}

pub fn put_u16_le(out: &mut Vec<u8>, value: u16) {
    out.extend_from_slice(&value.to_le_bytes());
}

pub fn put_i16_le(out: &mut Vec<u8>, value: i16) {
    out.extend_from_slice(&value.to_le_bytes());
}

pub fn put_u32_le(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian_values() {
        let data = [0x0A, 0x00, 0xFF, 0xFF, 0x78, 0x56, 0x34, 0x12];
        assert_eq!(read_u16_le(&data, 0).unwrap(), 0x000A);
        assert_eq!(read_i16_le(&data, 2).unwrap(), -1);
        assert_eq!(read_u32_le(&data, 4).unwrap(), 0x12345678);
    }

    #[test]
    fn underrun_reports_context() {
        let data = [0x01, 0x02];
        let err = read_u32_le(&data, 1).unwrap_err();
        assert_eq!(
            err,
            ByteError::Underrun {
                offset: 1,
                needed: 4,
                len: 2
            }
        );
    }

    #[test]
    fn writers_round_trip() {
        let mut out = Vec::new();
        put_u16_le(&mut out, 0x1234);
        put_i16_le(&mut out, -2);
        put_u32_le(&mut out, 0xDEADBEEF);
        assert_eq!(out, vec![0x34, 0x12, 0xFE, 0xFF, 0xEF, 0xBE, 0xAD, 0xDE]);
        assert_eq!(read_u16_le(&out, 0).unwrap(), 0x1234);
        assert_eq!(read_i16_le(&out, 2).unwrap(), -2);
        assert_eq!(read_u32_le(&out, 4).unwrap(), 0xDEADBEEF);
    }
}
