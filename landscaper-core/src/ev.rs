//! The world event function file (`wm0.ev`). A fixed 0x7000-byte blob
//! holding a 255-entry call table followed by a shared code region of
//! u16 opcode words. Each table entry names a function (system, model
//! or walkmesh) and points at its code; several entries may share one
//! code offset, in which case the later entries are aliases.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bytes::{put_u16_le, put_u32_le, read_u16_le, read_u32_le, ByteError};
use crate::worldscript::constants::{model_name, MODEL_SCRIPT_NAMES, SYSTEM_SCRIPT_NAMES};
use crate::worldscript::opcodes::{self, CALL_FN_BASE, CALL_FN_COUNT};

pub const EV_SIZE: usize = 0x7000;
const TABLE_ENTRIES: usize = 0xFF;
const CODE_BASE: usize = 0x400;
const RETURN_OPCODE: u16 = 0x203;
/// First word of the code region in retail data.
const CODE_LEAD_WORD: u16 = 0xCB;

#[derive(Debug, Error)]
pub enum EvError {
    #[error(transparent)]
    Truncated(#[from] ByteError),
    #[error("unknown opcode mnemonic '{mnemonic}' at line {line}")]
    UnknownOpcode { mnemonic: String, line: usize },
    #[error("call function index {id} out of range 0-43 at line {line}")]
    CallFnOutOfRange { id: u32, line: usize },
    #[error("{mnemonic} expects {expected} parameters, got {actual} at line {line}")]
    ParamCountMismatch {
        mnemonic: String,
        expected: usize,
        actual: usize,
        line: usize,
    },
    #[error("parameter '{param}' at line {line} must be 2 or 4 hex digits")]
    BadParameter { param: String, line: usize },
    #[error("more than {TABLE_ENTRIES} functions")]
    TooManyFunctions,
    #[error("code region exceeds the {EV_SIZE:#x}-byte file")]
    CodeOverflow,
}

/// Identity of a function in the call table. The u16 table header
/// packs the category in its top two bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FunctionKey {
    System { id: u8 },
    Model { model_id: u8, id: u8 },
    Mesh { x: u8, y: u8, id: u8 },
}

impl FunctionKey {
    fn from_header(header: u16) -> FunctionKey {
        match header >> 14 {
            0 => FunctionKey::System {
                id: (header & 0xFF) as u8,
            },
            1 => FunctionKey::Model {
                model_id: ((header >> 8) & 0x3F) as u8,
                id: (header & 0xFF) as u8,
            },
            _ => {
                let coords = (header >> 4) & 0x3FF;
                FunctionKey::Mesh {
                    x: (coords / 36) as u8,
                    y: (coords % 36) as u8,
                    id: (header & 0xF) as u8,
                }
            }
        }
    }

    /// Table header word; functions serialize sorted by this value.
    pub fn header(self) -> u16 {
        match self {
            FunctionKey::System { id } => id as u16,
            FunctionKey::Model { model_id, id } => {
                (1 << 14) | ((model_id as u16) << 8) | id as u16
            }
            FunctionKey::Mesh { x, y, id } => {
                let coords = x as u16 * 36 + y as u16;
                (2 << 14) | (coords << 4) | id as u16
            }
        }
    }

    pub fn describe(self) -> String {
        match self {
            FunctionKey::System { id } => {
                match SYSTEM_SCRIPT_NAMES.iter().find(|(i, _)| *i == id) {
                    Some((_, name)) => format!("system {id} ({name})"),
                    None => format!("system {id}"),
                }
            }
            FunctionKey::Model { model_id, id } => {
                let model = model_name(model_id as u32)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("model_{model_id}"));
                match MODEL_SCRIPT_NAMES.iter().find(|(i, _)| *i == id) {
                    Some((_, name)) => format!("{model} {id} ({name})"),
                    None => format!("{model} {id}"),
                }
            }
            FunctionKey::Mesh { x, y, id } => format!("mesh ({x}, {y}) {id}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvFunction {
    pub key: FunctionKey,
    /// Code position in u16 words relative to the code region.
    pub offset: u16,
    /// Opcode words including the terminating RETURN. Empty for
    /// aliases.
    pub opcodes: Vec<u16>,
    /// Index of the earlier function this one shares code with.
    pub alias_of: Option<usize>,
}

impl EvFunction {
    /// Mnemonic listing of this function's code.
    pub fn listing(&self) -> String {
        decode_opcodes(&self.opcodes)
    }

    pub fn set_listing(&mut self, listing: &str) -> Result<(), EvError> {
        self.opcodes = encode_opcodes(listing)?;
        self.alias_of = None;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvFile {
    lead: u32,
    pub functions: Vec<EvFunction>,
}

impl EvFile {
    pub fn parse(data: &[u8]) -> Result<EvFile, EvError> {
        let lead = read_u32_le(data, 0)?;
        let mut functions: Vec<EvFunction> = Vec::new();
        for slot in 0..TABLE_ENTRIES {
            let header = read_u16_le(data, 4 + slot * 4)?;
            if header == 0xFFFF {
                continue;
            }
            let offset = read_u16_le(data, 6 + slot * 4)?;
            let alias_of = functions.iter().position(|f| f.offset == offset);
            let opcodes = match alias_of {
                Some(_) => Vec::new(),
                None => {
                    let mut words = Vec::new();
                    let mut pos = CODE_BASE + offset as usize * 2;
                    loop {
                        let word = read_u16_le(data, pos)?;
                        words.push(word);
                        pos += 2;
                        if word == RETURN_OPCODE {
                            break;
                        }
                    }
                    words
                }
            };
            functions.push(EvFunction {
                key: FunctionKey::from_header(header),
                offset,
                opcodes,
                alias_of,
            });
        }
        Ok(EvFile { lead, functions })
    }

    /// Render the full 0x7000-byte file. Functions land in the call
    /// table sorted by header value; aliases reuse their target's
    /// code offset.
    pub fn serialize(&self) -> Result<Vec<u8>, EvError> {
        if self.functions.len() > TABLE_ENTRIES {
            return Err(EvError::TooManyFunctions);
        }
        let mut order: Vec<usize> = (0..self.functions.len()).collect();
        order.sort_by_key(|&i| self.functions[i].key.header());

        let mut offsets = vec![0u16; self.functions.len()];
        let mut code: Vec<u16> = vec![CODE_LEAD_WORD];
        for &i in &order {
            let function = &self.functions[i];
            if function.alias_of.is_some() {
                continue;
            }
            offsets[i] = code.len() as u16;
            if function.opcodes.is_empty() {
                code.push(RETURN_OPCODE);
            } else {
                code.extend_from_slice(&function.opcodes);
            }
        }
        for &i in &order {
            if let Some(target) = self.functions[i].alias_of {
                offsets[i] = offsets[target];
            }
        }
        if CODE_BASE + code.len() * 2 > EV_SIZE {
            return Err(EvError::CodeOverflow);
        }

        let mut buf = Vec::with_capacity(EV_SIZE);
        put_u32_le(&mut buf, self.lead);
        for slot in 0..TABLE_ENTRIES {
            match order.get(slot) {
                Some(&i) => {
                    put_u16_le(&mut buf, self.functions[i].key.header());
                    put_u16_le(&mut buf, offsets[i]);
                }
                None => {
                    put_u16_le(&mut buf, 0xFFFF);
                    put_u16_le(&mut buf, 0);
                }
            }
        }
        for &word in &code {
            put_u16_le(&mut buf, word);
        }
        buf.resize(EV_SIZE, 0);
        Ok(buf)
    }

    pub fn function(&self, index: usize) -> Option<&EvFunction> {
        self.functions.get(index)
    }

    pub fn function_mut(&mut self, index: usize) -> Option<&mut EvFunction> {
        self.functions.get_mut(index)
    }
}

/// Render opcode words as a mnemonic listing. Words with no table
/// entry are skipped, so a listing of retail data never fails.
pub fn decode_opcodes(words: &[u16]) -> String {
    let mut lines = Vec::new();
    let mut i = 0;
    while i < words.len() {
        let word = words[i];
        i += 1;
        if (CALL_FN_BASE..CALL_FN_BASE + CALL_FN_COUNT).contains(&word) {
            lines.push(format!("CALL_FN_{}", word - CALL_FN_BASE));
            continue;
        }
        let Some(def) = opcodes::by_code(word) else {
            continue;
        };
        if def.code_params == 0 {
            lines.push(def.mnemonic.to_string());
            continue;
        }
        let Some(&param) = words.get(i) else {
            break;
        };
        i += 1;
        let rendered = if param < 0x100 {
            format!("{param:02X}")
        } else {
            format!("{param:04X}")
        };
        lines.push(format!("{} {rendered}", def.mnemonic));
    }
    lines.join("\n")
}

/// Parse a mnemonic listing back to opcode words.
pub fn encode_opcodes(listing: &str) -> Result<Vec<u16>, EvError> {
    let mut words = Vec::new();
    for (index, raw) in listing.lines().enumerate() {
        let line = index + 1;
        let mut parts = raw.split_whitespace();
        let Some(mnemonic) = parts.next() else {
            continue;
        };
        let params: Vec<&str> = parts.collect();

        if let Some(suffix) = mnemonic.strip_prefix("CALL_FN_") {
            let id: u32 = suffix.parse().map_err(|_| EvError::UnknownOpcode {
                mnemonic: mnemonic.to_string(),
                line,
            })?;
            if id >= CALL_FN_COUNT as u32 {
                return Err(EvError::CallFnOutOfRange { id, line });
            }
            words.push(CALL_FN_BASE + id as u16);
            continue;
        }

        let def = opcodes::by_mnemonic(mnemonic).ok_or_else(|| EvError::UnknownOpcode {
            mnemonic: mnemonic.to_string(),
            line,
        })?;
        if params.len() != def.code_params as usize {
            return Err(EvError::ParamCountMismatch {
                mnemonic: mnemonic.to_string(),
                expected: def.code_params as usize,
                actual: params.len(),
                line,
            });
        }
        words.push(def.code);
        for param in params {
            if param.len() != 2 && param.len() != 4 {
                return Err(EvError::BadParameter {
                    param: param.to_string(),
                    line,
                });
            }
            let value = u16::from_str_radix(param, 16).map_err(|_| EvError::BadParameter {
                param: param.to_string(),
                line,
            })?;
            words.push(value);
        }
    }
    Ok(words)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_word(buf: &mut [u8], offset: usize, word: u16) {
        buf[offset..offset + 2].copy_from_slice(&word.to_le_bytes());
    }

    fn sample_file() -> Vec<u8> {
        let mut buf = vec![0u8; EV_SIZE];
        buf[0..4].copy_from_slice(&1u32.to_le_bytes());
        // Table sorted by header: system 0, system 2 and a model
        // function aliasing system 2's code.
        let model_header = (1 << 14) | (19 << 8) | 4;
        let entries = [(0u16, 1u16), (2, 7), (model_header, 7)];
        for (slot, (header, offset)) in entries.iter().enumerate() {
            write_word(&mut buf, 4 + slot * 4, *header);
            write_word(&mut buf, 6 + slot * 4, *offset);
        }
        for slot in entries.len()..TABLE_ENTRIES {
            write_word(&mut buf, 4 + slot * 4, 0xFFFF);
        }
        // Code: lead word, then the two function bodies.
        write_word(&mut buf, 0x400, 0xCB);
        let body = [0x100, 0x110, 0x1E, 0x305, 0x306, 0x203];
        for (i, word) in body.iter().enumerate() {
            write_word(&mut buf, 0x402 + i * 2, *word);
        }
        write_word(&mut buf, 0x40E, 0x203);
        buf
    }

    #[test]
    fn parses_functions_and_aliases() {
        let ev = EvFile::parse(&sample_file()).unwrap();
        assert_eq!(ev.functions.len(), 3);
        assert_eq!(ev.functions[0].key, FunctionKey::System { id: 0 });
        assert_eq!(
            ev.functions[0].opcodes,
            vec![0x100, 0x110, 0x1E, 0x305, 0x306, 0x203]
        );
        assert_eq!(ev.functions[1].key, FunctionKey::System { id: 2 });
        assert_eq!(ev.functions[1].opcodes, vec![0x203]);
        assert_eq!(
            ev.functions[2].key,
            FunctionKey::Model { model_id: 19, id: 4 }
        );
        assert_eq!(ev.functions[2].alias_of, Some(1));
        assert!(ev.functions[2].opcodes.is_empty());
    }

    #[test]
    fn serialize_round_trips_byte_identically() {
        let data = sample_file();
        let ev = EvFile::parse(&data).unwrap();
        assert_eq!(ev.serialize().unwrap(), data);
    }

    #[test]
    fn listing_round_trips() {
        let ev = EvFile::parse(&sample_file()).unwrap();
        let listing = ev.functions[0].listing();
        assert_eq!(
            listing,
            "RESET\nPUSH_CONSTANT 1E\nWAIT_FRAMES\nWAIT\nRETURN"
        );
        assert_eq!(encode_opcodes(&listing).unwrap(), ev.functions[0].opcodes);
    }

    #[test]
    fn replacing_a_listing_changes_serialized_code() {
        let mut ev = EvFile::parse(&sample_file()).unwrap();
        ev.functions[1]
            .set_listing("CALL_FN_9\nRETURN")
            .unwrap();
        assert_eq!(ev.functions[1].opcodes, vec![0x204 + 9, 0x203]);
        let reparsed = EvFile::parse(&ev.serialize().unwrap()).unwrap();
        assert_eq!(reparsed.functions[1].opcodes, vec![0x204 + 9, 0x203]);
    }

    #[test]
    fn call_fn_index_is_range_checked() {
        assert!(matches!(
            encode_opcodes("CALL_FN_44").unwrap_err(),
            EvError::CallFnOutOfRange { id: 44, line: 1 }
        ));
    }

    #[test]
    fn parameters_must_be_two_or_four_hex_digits() {
        assert!(matches!(
            encode_opcodes("PUSH_CONSTANT 1").unwrap_err(),
            EvError::BadParameter { line: 1, .. }
        ));
        assert!(matches!(
            encode_opcodes("PUSH_CONSTANT").unwrap_err(),
            EvError::ParamCountMismatch { line: 1, .. }
        ));
        assert!(matches!(
            encode_opcodes("FROBNICATE").unwrap_err(),
            EvError::UnknownOpcode { line: 1, .. }
        ));
    }

    #[test]
    fn function_keys_describe_themselves() {
        assert_eq!(FunctionKey::System { id: 0 }.describe(), "system 0 (init)");
        assert_eq!(
            FunctionKey::Model { model_id: 19, id: 4 }.describe(),
            "chocobo 4 (interact)"
        );
        assert_eq!(
            FunctionKey::Mesh { x: 5, y: 7, id: 2 }.describe(),
            "mesh (5, 7) 2"
        );
    }
}
