//! Field entrance table (`field.tbl`). 64 entries, each with a primary
//! and an alternate entrance, fixed at 0x600 bytes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bytes::{put_i16_le, put_u16_le, read_i16_le, read_u16_le, read_u8, ByteError};

pub const FIELD_TBL_SIZE: usize = 0x600;
pub const NUM_FIELD_ENTRIES: usize = 64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FieldTableError {
    #[error("field table must be {expected} bytes, got {actual}")]
    WrongSize { expected: usize, actual: usize },
    #[error("truncated field table: {0}")]
    Truncated(#[from] ByteError),
    #[error("field entry id {id} out of range 1-64")]
    IdOutOfRange { id: usize },
}

/// Where the player lands when leaving the world map for a field scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldEntrance {
    pub x: i16,
    pub y: i16,
    pub triangle: u16,
    pub field_id: u16,
    pub direction: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldEntry {
    pub primary: FieldEntrance,
    pub alternate: FieldEntrance,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldTable {
    pub entries: Vec<FieldEntry>,
}

fn parse_entrance(data: &[u8], pos: usize) -> Result<FieldEntrance, ByteError> {
    Ok(FieldEntrance {
        x: read_i16_le(data, pos)?,
        y: read_i16_le(data, pos + 2)?,
        triangle: read_u16_le(data, pos + 4)?,
        field_id: read_u16_le(data, pos + 6)?,
        direction: read_u8(data, pos + 8)?,
    })
}

fn write_entrance(out: &mut Vec<u8>, entrance: &FieldEntrance) {
    put_i16_le(out, entrance.x);
    put_i16_le(out, entrance.y);
    put_u16_le(out, entrance.triangle);
    put_u16_le(out, entrance.field_id);
    // The game reads any of the last four bytes as the facing value.
    for _ in 0..4 {
        out.push(entrance.direction);
    }
}

impl FieldTable {
    pub fn parse(data: &[u8]) -> Result<Self, FieldTableError> {
        if data.len() != FIELD_TBL_SIZE {
            return Err(FieldTableError::WrongSize {
                expected: FIELD_TBL_SIZE,
                actual: data.len(),
            });
        }
        let mut entries = Vec::with_capacity(NUM_FIELD_ENTRIES);
        let mut pos = 0;
        for _ in 0..NUM_FIELD_ENTRIES {
            let primary = parse_entrance(data, pos)?;
            let alternate = parse_entrance(data, pos + 12)?;
            pos += 24;
            entries.push(FieldEntry { primary, alternate });
        }
        Ok(FieldTable { entries })
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(FIELD_TBL_SIZE);
        for entry in &self.entries {
            write_entrance(&mut out, &entry.primary);
            write_entrance(&mut out, &entry.alternate);
        }
        out
    }

    /// Entries are addressed by the one-based id used in worldscript.
    pub fn entry(&self, id: usize) -> Result<&FieldEntry, FieldTableError> {
        if id == 0 || id > NUM_FIELD_ENTRIES {
            return Err(FieldTableError::IdOutOfRange { id });
        }
        Ok(&self.entries[id - 1])
    }

    pub fn entry_mut(&mut self, id: usize) -> Result<&mut FieldEntry, FieldTableError> {
        if id == 0 || id > NUM_FIELD_ENTRIES {
            return Err(FieldTableError::IdOutOfRange { id });
        }
        Ok(&mut self.entries[id - 1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bytes() -> Vec<u8> {
        let mut data = vec![0u8; FIELD_TBL_SIZE];
        // Entry 3 primary: x=-100, y=250, triangle 7, field 0x30, east.
        let base = 2 * 24;
        data[base..base + 2].copy_from_slice(&(-100i16).to_le_bytes());
        data[base + 2..base + 4].copy_from_slice(&250i16.to_le_bytes());
        data[base + 4] = 7;
        data[base + 6] = 0x30;
        for i in 0..4 {
            data[base + 8 + i] = 0x40;
        }
        data
    }

    #[test]
    fn parses_entries_by_one_based_id() {
        let table = FieldTable::parse(&sample_bytes()).unwrap();
        let entry = table.entry(3).unwrap();
        assert_eq!(
            entry.primary,
            FieldEntrance {
                x: -100,
                y: 250,
                triangle: 7,
                field_id: 0x30,
                direction: 0x40
            }
        );
    }

    #[test]
    fn round_trips_byte_exact() {
        let bytes = sample_bytes();
        let table = FieldTable::parse(&bytes).unwrap();
        assert_eq!(table.serialize(), bytes);
    }

    #[test]
    fn rejects_out_of_range_ids() {
        let table = FieldTable::parse(&sample_bytes()).unwrap();
        assert_eq!(
            table.entry(0).unwrap_err(),
            FieldTableError::IdOutOfRange { id: 0 }
        );
        assert_eq!(
            table.entry(65).unwrap_err(),
            FieldTableError::IdOutOfRange { id: 65 }
        );
    }

    #[test]
    fn rejects_wrong_size() {
        assert!(matches!(
            FieldTable::parse(&[0u8; 10]).unwrap_err(),
            FieldTableError::WrongSize { .. }
        ));
    }
}
