//! World map message file (`mes`). A u16 message count, a u16 offset
//! per message (file-relative), then the encoded texts. The file the
//! game loads is a fixed 0x1000-byte block.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bytes::{put_u16_le, read_u16_le, ByteError};
use crate::text::{self, EncodingError};

pub const MES_SIZE: usize = 0x1000;

#[derive(Debug, Error)]
pub enum MesError {
    #[error("truncated message file: {0}")]
    Truncated(#[from] ByteError),
    #[error("message {index} offset {offset:#06X} points outside the file")]
    BadOffset { index: usize, offset: usize },
    #[error("message {index}: {source}")]
    Text {
        index: usize,
        source: EncodingError,
    },
    #[error("messages total {actual} bytes, exceeding the {limit}-byte block")]
    TooLarge { actual: usize, limit: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MesFile {
    pub messages: Vec<String>,
}

impl MesFile {
    pub fn parse(data: &[u8]) -> Result<Self, MesError> {
        let count = read_u16_le(data, 0)? as usize;
        let mut messages = Vec::with_capacity(count);
        for index in 0..count {
            let offset = read_u16_le(data, 2 + index * 2)? as usize;
            if offset >= data.len() {
                return Err(MesError::BadOffset { index, offset });
            }
            let message =
                text::decode(&data[offset..]).map_err(|source| MesError::Text { index, source })?;
            messages.push(message);
        }
        Ok(MesFile { messages })
    }

    /// Serialize into the fixed-size block the game expects.
    pub fn serialize(&self) -> Result<Vec<u8>, MesError> {
        let mut bodies = Vec::with_capacity(self.messages.len());
        for (index, message) in self.messages.iter().enumerate() {
            let body =
                text::encode(message).map_err(|source| MesError::Text { index, source })?;
            bodies.push(body);
        }

        let header_len = 2 + self.messages.len() * 2;
        let total = header_len + bodies.iter().map(Vec::len).sum::<usize>();
        if total > MES_SIZE {
            return Err(MesError::TooLarge {
                actual: total,
                limit: MES_SIZE,
            });
        }

        let mut out = Vec::with_capacity(MES_SIZE);
        put_u16_le(&mut out, self.messages.len() as u16);
        let mut offset = header_len;
        for body in &bodies {
            put_u16_le(&mut out, offset as u16);
            offset += body.len();
        }
        for body in &bodies {
            out.extend_from_slice(body);
        }
        out.resize(MES_SIZE, 0);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_messages() {
        let file = MesFile {
            messages: vec![
                "Hello".to_string(),
                "Received \"Tiny Bronco\"!".to_string(),
                String::new(),
            ],
        };
        let bytes = file.serialize().unwrap();
        assert_eq!(bytes.len(), MES_SIZE);
        let reloaded = MesFile::parse(&bytes).unwrap();
        assert_eq!(reloaded.messages, file.messages);
    }

    #[test]
    fn offsets_are_file_relative_and_cumulative() {
        let file = MesFile {
            messages: vec!["AB".to_string(), "C".to_string()],
        };
        let bytes = file.serialize().unwrap();
        assert_eq!(read_u16_le(&bytes, 0).unwrap(), 2);
        // Header is 2 + 2*2 = 6 bytes; "AB" encodes to 3 bytes with
        // its terminator.
        assert_eq!(read_u16_le(&bytes, 2).unwrap(), 6);
        assert_eq!(read_u16_le(&bytes, 4).unwrap(), 9);
    }

    #[test]
    fn rejects_offsets_outside_the_file() {
        let mut bytes = vec![0u8; 16];
        bytes[0] = 1;
        bytes[2..4].copy_from_slice(&0x2000u16.to_le_bytes());
        assert!(matches!(
            MesFile::parse(&bytes).unwrap_err(),
            MesError::BadOffset { index: 0, .. }
        ));
    }

    #[test]
    fn rejects_oversized_content() {
        let file = MesFile {
            messages: vec!["A".repeat(0x1100)],
        };
        assert!(matches!(
            file.serialize().unwrap_err(),
            MesError::TooLarge { .. }
        ));
    }
}
