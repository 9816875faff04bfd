//! LGP archive container.
//!
//! Layout: 12-byte creator, u32 file count, 27-byte TOC entries, a
//! 900-slot two-letter lookup table, the conflict tables, then one
//! 24-byte header (name + size) and payload per file, and a trailing
//! terminator string.

use std::collections::HashMap;
use thiserror::Error;

use crate::bytes::{put_u16_le, put_u32_le, read_u16_le, read_u32_le, read_u8, ByteError};

const LOOKUP_VALUE_MAX: usize = 30;
const NUM_LOOKUP_ENTRIES: usize = LOOKUP_VALUE_MAX * LOOKUP_VALUE_MAX;
const TOC_NAME_LEN: usize = 20;
const DEFAULT_CREATOR: &str = "SQUARESOFT";
const DEFAULT_TERMINATOR: &str = "FINAL FANTASY7";

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("truncated archive: {0}")]
    Truncated(#[from] ByteError),
    #[error("file name '{name}' does not fit in a TOC entry")]
    NameTooLong { name: String },
    #[error("file name '{name}' contains character '{ch}' not allowed in archives")]
    BadLookupCharacter { name: String, ch: char },
    #[error("archive entry '{name}' points past the end of the data")]
    BadDataPointer { name: String },
}

#[derive(Debug)]
struct TocEntry {
    name: String,
    check: u8,
    conflict_index: u16,
    data: Vec<u8>,
}

#[derive(Debug)]
struct ConflictLocation {
    folder_name: String,
    toc_index: u16,
}

#[derive(Debug)]
struct Conflict {
    locations: Vec<ConflictLocation>,
}

#[derive(Debug)]
pub struct LgpArchive {
    creator: [u8; 12],
    entries: Vec<TocEntry>,
    conflicts: Vec<Conflict>,
}

fn read_fixed_string(data: &[u8], offset: usize, len: usize) -> Result<String, ArchiveError> {
    if offset + len > data.len() {
        return Err(ArchiveError::Truncated(ByteError::Underrun {
            offset,
            needed: len,
            len: data.len(),
        }));
    }
    let raw = &data[offset..offset + len];
    let end = raw.iter().position(|&b| b == 0).unwrap_or(len);
    Ok(String::from_utf8_lossy(&raw[..end]).into_owned())
}

/// Two-letter prefix bucket for the lookup table. `.` terminates a
/// prefix early.
fn char_lookup_value(name: &str, ch: char) -> Result<i32, ArchiveError> {
    match ch {
        '.' => Ok(-1),
        '_' => Ok(10),
        '-' => Ok(11),
        '0'..='9' => Ok(ch as i32 - '0' as i32),
        'a'..='z' => Ok(ch as i32 - 'a' as i32),
        'A'..='Z' => Ok(ch.to_ascii_lowercase() as i32 - 'a' as i32),
        _ => Err(ArchiveError::BadLookupCharacter {
            name: name.to_string(),
            ch,
        }),
    }
}

impl LgpArchive {
    pub fn new() -> Self {
        LgpArchive {
            creator: {
                let mut creator = [0u8; 12];
                let src = DEFAULT_CREATOR.as_bytes();
                creator[12 - src.len()..].copy_from_slice(src);
                creator
            },
            entries: Vec::new(),
            conflicts: Vec::new(),
        }
    }

    pub fn parse(data: &[u8]) -> Result<Self, ArchiveError> {
        let mut creator = [0u8; 12];
        if data.len() < 12 {
            return Err(ArchiveError::Truncated(ByteError::Underrun {
                offset: 0,
                needed: 12,
                len: data.len(),
            }));
        }
        creator.copy_from_slice(&data[..12]);

        let num_files = read_u32_le(data, 12)? as usize;
        let mut pos = 16;

        let mut raw_entries = Vec::with_capacity(num_files);
        for _ in 0..num_files {
            let name = read_fixed_string(data, pos, TOC_NAME_LEN)?;
            let offset = read_u32_le(data, pos + 20)? as usize;
            let check = read_u8(data, pos + 24)?;
            let conflict_index = read_u16_le(data, pos + 25)?;
            pos += 27;
            raw_entries.push((name, offset, check, conflict_index));
        }

        // The lookup table is redundant with the TOC; skip over it.
        pos += NUM_LOOKUP_ENTRIES * 4;

        let num_conflicts = read_u16_le(data, pos)? as usize;
        pos += 2;
        let mut conflicts = Vec::with_capacity(num_conflicts);
        for _ in 0..num_conflicts {
            let num_locations = read_u16_le(data, pos)? as usize;
            pos += 2;
            let mut locations = Vec::with_capacity(num_locations);
            for _ in 0..num_locations {
                let folder_name = read_fixed_string(data, pos, 128)?;
                let toc_index = read_u16_le(data, pos + 128)?;
                pos += 130;
                locations.push(ConflictLocation {
                    folder_name,
                    toc_index,
                });
            }
            conflicts.push(Conflict { locations });
        }

        let mut entries = Vec::with_capacity(num_files);
        for (name, offset, check, conflict_index) in raw_entries {
            // Each data record is a 20-byte name, a u32 size, then the
            // payload.
            let size = read_u32_le(data, offset + 20)? as usize;
            let start = offset + 24;
            if start + size > data.len() {
                return Err(ArchiveError::BadDataPointer { name });
            }
            entries.push(TocEntry {
                name,
                check,
                conflict_index,
                data: data[start..start + size].to_vec(),
            });
        }

        Ok(LgpArchive {
            creator,
            entries,
            conflicts,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry names and payload sizes in TOC order.
    pub fn list(&self) -> Vec<(&str, usize)> {
        self.entries
            .iter()
            .map(|e| (e.name.as_str(), e.data.len()))
            .collect()
    }

    pub fn get_file(&self, name: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.data.as_slice())
    }

    /// Replace an existing entry's payload, or append a new entry.
    pub fn set_file(&mut self, name: &str, data: Vec<u8>) -> Result<(), ArchiveError> {
        if name.len() >= TOC_NAME_LEN {
            return Err(ArchiveError::NameTooLong {
                name: name.to_string(),
            });
        }
        if let Some(entry) = self.entries.iter_mut().find(|e| e.name == name) {
            entry.data = data;
            return Ok(());
        }
        // Validate the prefix up front so serialization cannot fail on
        // a name we accepted here.
        self.lookup_index(name)?;
        self.entries.push(TocEntry {
            name: name.to_string(),
            check: 14,
            conflict_index: 0,
            data,
        });
        Ok(())
    }

    fn lookup_index(&self, name: &str) -> Result<usize, ArchiveError> {
        let mut chars = name.chars();
        let c1 = chars.next().unwrap_or('.');
        let c2 = chars.next().unwrap_or('.');
        let l1 = char_lookup_value(name, c1)?;
        let l2 = char_lookup_value(name, c2)?;
        // `.` only terminates the prefix in second position; a name
        // with no leading letter or digit has no lookup bucket.
        if l1 < 0 {
            return Err(ArchiveError::BadLookupCharacter {
                name: name.to_string(),
                ch: c1,
            });
        }
        Ok((l1 * LOOKUP_VALUE_MAX as i32 + l2 + 1) as usize)
    }

    fn build_lookup_table(&self) -> Result<Vec<(u16, u16)>, ArchiveError> {
        let mut table = vec![(0u16, 0u16); NUM_LOOKUP_ENTRIES];
        for (i, entry) in self.entries.iter().enumerate() {
            let index = self.lookup_index(&entry.name)?;
            table[index].1 += 1;
            if table[index].0 == 0 {
                table[index].0 = (i + 1) as u16;
            }
        }
        Ok(table)
    }

    fn tables_size(&self) -> usize {
        let mut size = 12 + 4;
        size += self.entries.len() * 27;
        size += NUM_LOOKUP_ENTRIES * 4;
        size += 2;
        for conflict in &self.conflicts {
            size += 2 + conflict.locations.len() * 130;
        }
        size
    }

    pub fn serialize(&self) -> Result<Vec<u8>, ArchiveError> {
        let data_start = self.tables_size();
        let mut total = data_start;
        for entry in &self.entries {
            total += 24 + entry.data.len();
        }
        total += DEFAULT_TERMINATOR.len();

        let mut out = Vec::with_capacity(total);
        out.extend_from_slice(&self.creator);
        put_u32_le(&mut out, self.entries.len() as u32);

        let mut data_offset = data_start;
        for entry in &self.entries {
            let mut name = [0u8; TOC_NAME_LEN];
            let src = entry.name.as_bytes();
            if src.len() >= TOC_NAME_LEN {
                return Err(ArchiveError::NameTooLong {
                    name: entry.name.clone(),
                });
            }
            name[..src.len()].copy_from_slice(src);
            out.extend_from_slice(&name);
            put_u32_le(&mut out, data_offset as u32);
            out.push(entry.check);
            put_u16_le(&mut out, entry.conflict_index);
            data_offset += 24 + entry.data.len();
        }

        for (toc_index, file_count) in self.build_lookup_table()? {
            put_u16_le(&mut out, toc_index);
            put_u16_le(&mut out, file_count);
        }

        put_u16_le(&mut out, self.conflicts.len() as u16);
        for conflict in &self.conflicts {
            put_u16_le(&mut out, conflict.locations.len() as u16);
            for location in &conflict.locations {
                let mut folder = [0u8; 128];
                let src = location.folder_name.as_bytes();
                let n = src.len().min(127);
                folder[..n].copy_from_slice(&src[..n]);
                out.extend_from_slice(&folder);
                put_u16_le(&mut out, location.toc_index);
            }
        }

        for entry in &self.entries {
            let mut name = [0u8; TOC_NAME_LEN];
            let src = entry.name.as_bytes();
            name[..src.len()].copy_from_slice(src);
            out.extend_from_slice(&name);
            put_u32_le(&mut out, entry.data.len() as u32);
            out.extend_from_slice(&entry.data);
        }

        out.extend_from_slice(DEFAULT_TERMINATOR.as_bytes());
        Ok(out)
    }
}

impl Default for LgpArchive {
    fn default() -> Self {
        Self::new()
    }
}

/// Sanity view of which lookup bucket each entry landed in; used by
/// diagnostics in the CLI.
pub fn lookup_histogram(archive: &LgpArchive) -> HashMap<usize, usize> {
    let mut histogram = HashMap::new();
    for (name, _) in archive.list() {
        let mut chars = name.chars();
        let c1 = chars.next().unwrap_or('.');
        let c2 = chars.next().unwrap_or('.');
        if let (Ok(l1 @ 0..), Ok(l2)) = (char_lookup_value(name, c1), char_lookup_value(name, c2)) {
            *histogram
                .entry((l1 * LOOKUP_VALUE_MAX as i32 + l2 + 1) as usize)
                .or_insert(0) += 1;
        }
    }
    histogram
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_sample() -> LgpArchive {
        let mut archive = LgpArchive::new();
        archive.set_file("world.txz", b"alpha".to_vec()).unwrap();
        archive.set_file("wm0.ev", b"bravo!".to_vec()).unwrap();
        archive.set_file("field.tbl", b"charlie".to_vec()).unwrap();
        archive
    }

    #[test]
    fn set_then_get_returns_payload() {
        let archive = build_sample();
        assert_eq!(archive.get_file("wm0.ev"), Some(b"bravo!".as_slice()));
        assert_eq!(archive.get_file("missing"), None);
    }

    #[test]
    fn serialize_then_parse_preserves_entries() {
        let archive = build_sample();
        let bytes = archive.serialize().unwrap();
        let reloaded = LgpArchive::parse(&bytes).unwrap();
        assert_eq!(reloaded.len(), 3);
        assert_eq!(reloaded.get_file("world.txz"), Some(b"alpha".as_slice()));
        assert_eq!(reloaded.get_file("wm0.ev"), Some(b"bravo!".as_slice()));
        assert_eq!(reloaded.get_file("field.tbl"), Some(b"charlie".as_slice()));
    }

    #[test]
    fn serialize_is_stable() {
        let archive = build_sample();
        let first = archive.serialize().unwrap();
        let reparsed = LgpArchive::parse(&first).unwrap();
        assert_eq!(reparsed.serialize().unwrap(), first);
    }

    #[test]
    fn replacing_a_file_changes_offsets_consistently() {
        let mut archive = build_sample();
        archive
            .set_file("world.txz", b"a much longer payload than before".to_vec())
            .unwrap();
        let bytes = archive.serialize().unwrap();
        let reloaded = LgpArchive::parse(&bytes).unwrap();
        assert_eq!(
            reloaded.get_file("world.txz"),
            Some(b"a much longer payload than before".as_slice())
        );
        assert_eq!(reloaded.get_file("field.tbl"), Some(b"charlie".as_slice()));
    }

    #[test]
    fn terminator_is_written() {
        let archive = build_sample();
        let bytes = archive.serialize().unwrap();
        assert!(bytes.ends_with(b"FINAL FANTASY7"));
    }

    #[test]
    fn rejects_overlong_names() {
        let mut archive = LgpArchive::new();
        let err = archive
            .set_file("a_very_long_file_name_indeed.dat", Vec::new())
            .unwrap_err();
        assert!(matches!(err, ArchiveError::NameTooLong { .. }));
    }

    #[test]
    fn rejects_names_with_a_leading_dot() {
        let mut archive = LgpArchive::new();
        let err = archive.set_file(".cfg", Vec::new()).unwrap_err();
        assert!(matches!(
            err,
            ArchiveError::BadLookupCharacter { ch: '.', .. }
        ));
    }

    #[test]
    fn rejects_names_outside_the_lookup_alphabet() {
        let mut archive = LgpArchive::new();
        let err = archive.set_file("bad name.txt", Vec::new()).unwrap_err();
        assert!(matches!(err, ArchiveError::BadLookupCharacter { .. }));
    }

    #[test]
    fn truncated_archive_is_rejected() {
        assert!(matches!(
            LgpArchive::parse(&[0u8; 8]).unwrap_err(),
            ArchiveError::Truncated(_)
        ));
    }
}
