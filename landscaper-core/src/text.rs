//! Codec for the game's variable-length text encoding.
//!
//! Bytes below 0xE0 index a fixed character table. 0xE0..0xFD are
//! special single-byte tokens (placeholders, punctuation ligatures,
//! controller glyphs). 0xFE escapes a two-byte control command, two of
//! which carry little-endian arguments: `{WAIT n}` and `{STR off len}`.
//! 0xFF terminates a message.

use std::collections::HashMap;
use std::sync::OnceLock;
use thiserror::Error;

use crate::bytes::{put_u16_le, read_u16_le, read_u8};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodingError {
    #[error("unencodable character '{ch}'")]
    UnknownCharacter { ch: char },
    #[error("unknown command {{{name}}}")]
    UnknownCommand { name: String },
    #[error("bad argument for {command}: '{argument}'")]
    BadCommandArgument {
        command: &'static str,
        argument: String,
    },
    #[error("spurious '\\' at end of string")]
    DanglingEscape,
    #[error("mismatched {{}} in string")]
    UnterminatedCommand,
    #[error("illegal control code 0x{code:02X}")]
    IllegalControlCode { code: u8 },
    #[error("illegal special code 0x{code:02X}")]
    IllegalSpecialCode { code: u8 },
    #[error("truncated text data at offset {offset}")]
    Truncated { offset: usize },
}

// 231 entries; bytes 0x00..0xDF index into this table.
const NORMAL: &str = concat!(
    " !\"#$%&'()*+,-./01234",
    "56789:;<=>?@ABCDEFGHI",
    "JKLMNOPQRSTUVWXYZ[\\]^",
    "_`abcdefghijklmnopqrs",
    "tuvwxyz{|}~ ÄÅÇÉÑÖÜáà",
    "âäãåçéèêëíìîïñóòôöõúù",
    "ûü♥°¢£↔→♪ßα  ´¨≠ÆØ∞±≤",
    "≥¥µ∂ΣΠπ⌡ªºΩæø¿¡¬√ƒ≈∆«",
    "»… ÀÃÕŒœ–—“”‘’÷◊ÿŸ⁄ ‹",
    "›ﬁﬂ■‧‚„‰ÂÊÁËÈÍÎÏÌÓÔ Ò",
    "ÚÛÙıˆ˜¯˘˙˚¸˝˛ˇ       ",
);

// Characters that need a backslash escape on decode so that encode can
// tell them apart from command syntax.
const ESCAPED: &str = "\\{}";

const SPECIAL: &[(u8, &str)] = &[
    (0xE0, "{CHOICE}"),
    (0xE1, "\t"),
    (0xE2, ", "),
    (0xE3, ".\""),
    (0xE4, "…\""),
    (0xE6, "⑬"),
    (0xE7, "\n"),
    (0xE8, "{NEWPAGE}"),
    (0xEA, "{CLOUD}"),
    (0xEB, "{BARRET}"),
    (0xEC, "{TIFA}"),
    (0xED, "{AERITH}"),
    (0xEE, "{RED XIII}"),
    (0xEF, "{YUFFIE}"),
    (0xF0, "{CAIT SITH}"),
    (0xF1, "{VINCENT}"),
    (0xF2, "{CID}"),
    (0xF3, "{PARTY #1}"),
    (0xF4, "{PARTY #2}"),
    (0xF5, "{PARTY #3}"),
    (0xF6, "〇"),
    (0xF7, "△"),
    (0xF8, "☐"),
    (0xF9, "✕"),
];

// Second byte of a 0xFE command sequence.
const CONTROL: &[(u8, &str)] = &[
    (0xD2, "{GRAY}"),
    (0xD3, "{BLUE}"),
    (0xD4, "{RED}"),
    (0xD5, "{PURPLE}"),
    (0xD6, "{GREEN}"),
    (0xD7, "{CYAN}"),
    (0xD8, "{YELLOW}"),
    (0xD9, "{WHITE}"),
    (0xDA, "{FLASH}"),
    (0xDB, "{RAINBOW}"),
    (0xDC, "{PAUSE}"),
    (0xDE, "{NUM}"),
    (0xDF, "{HEX}"),
    (0xE0, "{SCROLL}"),
    (0xE1, "{RNUM}"),
    (0xE9, "{FIXED}"),
];

fn normal_chars() -> &'static [char] {
    static CHARS: OnceLock<Vec<char>> = OnceLock::new();
    CHARS.get_or_init(|| NORMAL.chars().collect())
}

fn normal_index() -> &'static HashMap<char, u8> {
    static INDEX: OnceLock<HashMap<char, u8>> = OnceLock::new();
    INDEX.get_or_init(|| {
        let mut map = HashMap::new();
        for (i, ch) in NORMAL.chars().enumerate() {
            // Keep the first occurrence; the table repeats a few glyphs.
            map.entry(ch).or_insert(i as u8);
        }
        map
    })
}

fn special_code(token: &str) -> Option<u8> {
    SPECIAL
        .iter()
        .find(|(_, text)| *text == token)
        .map(|&(code, _)| code)
}

fn control_code(token: &str) -> Option<u8> {
    CONTROL
        .iter()
        .find(|(_, text)| *text == token)
        .map(|&(code, _)| code)
}

pub fn decode(buf: &[u8]) -> Result<String, EncodingError> {
    let chars = normal_chars();
    let mut text = String::new();
    let mut i = 0;

    while i < buf.len() {
        let c = buf[i];
        i += 1;

        if c == 0xFF {
            break;
        } else if c < 0xE0 {
            let ch = chars[c as usize];
            if ESCAPED.contains(ch) {
                text.push('\\');
            }
            text.push(ch);
        } else if c == 0xFE {
            let k = read_u8(buf, i).map_err(|_| EncodingError::Truncated { offset: i })?;
            i += 1;
            if k == 0xDD {
                let arg =
                    read_u16_le(buf, i).map_err(|_| EncodingError::Truncated { offset: i })?;
                i += 2;
                text.push_str(&format!("{{WAIT {arg}}}"));
            } else if k == 0xE2 {
                let offset =
                    read_u16_le(buf, i).map_err(|_| EncodingError::Truncated { offset: i })?;
                let length =
                    read_u16_le(buf, i + 2).map_err(|_| EncodingError::Truncated { offset: i })?;
                i += 4;
                text.push_str(&format!("{{STR {offset:04X} {length:04X}}}"));
            } else {
                match CONTROL.iter().find(|(code, _)| *code == k) {
                    Some((_, token)) => text.push_str(token),
                    None => return Err(EncodingError::IllegalControlCode { code: k }),
                }
            }
        } else {
            match SPECIAL.iter().find(|(code, _)| *code == c) {
                Some((_, token)) => text.push_str(token),
                None => return Err(EncodingError::IllegalSpecialCode { code: c }),
            }
            // A page break always renders with a following newline.
            if c == 0xE8 {
                text.push('\n');
            }
        }
    }

    Ok(text)
}

/// Encode editor text back into game bytes, appending the 0xFF
/// terminator. Multi-character special tokens are matched greedily so
/// that decoded text re-encodes to the original bytes.
pub fn encode(text: &str) -> Result<Vec<u8>, EncodingError> {
    let chars: Vec<char> = text.chars().collect();
    let index = normal_index();
    let mut data = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\\' {
            i += 1;
            let escaped = *chars.get(i).ok_or(EncodingError::DanglingEscape)?;
            let code = index
                .get(&escaped)
                .ok_or(EncodingError::UnknownCharacter { ch: escaped })?;
            data.push(*code);
            i += 1;
        } else if c == '{' {
            let rest: String = chars[i + 1..].iter().collect();
            let end = rest.find('}').ok_or(EncodingError::UnterminatedCommand)?;
            let command = &rest[..end];
            i += 1 + chars[i + 1..].iter().take_while(|&&ch| ch != '}').count() + 1;

            let keyword = command.split(' ').next().unwrap_or("");
            if keyword == "WAIT" {
                let arg = parse_wait_arg(command)?;
                data.push(0xFE);
                data.push(0xDD);
                put_u16_le(&mut data, arg);
            } else if keyword == "STR" {
                let (offset, length) = parse_str_args(command)?;
                data.push(0xFE);
                data.push(0xE2);
                put_u16_le(&mut data, offset);
                put_u16_le(&mut data, length);
            } else {
                let token = format!("{{{command}}}");
                if let Some(code) = control_code(&token) {
                    data.push(0xFE);
                    data.push(code);
                } else if let Some(code) = special_code(&token) {
                    data.push(code);
                    // {NEWPAGE} decodes with an extra newline; drop it.
                    if command == "NEWPAGE" && chars.get(i) == Some(&'\n') {
                        i += 1;
                    }
                } else {
                    return Err(EncodingError::UnknownCommand {
                        name: command.to_string(),
                    });
                }
            }
        } else if let Some((code, len)) = match_special(&chars[i..]) {
            data.push(code);
            i += len;
        } else if let Some(code) = index.get(&c) {
            data.push(*code);
            i += 1;
        } else {
            return Err(EncodingError::UnknownCharacter { ch: c });
        }
    }

    data.push(0xFF);
    Ok(data)
}

/// Longest-first match of the non-command special tokens.
fn match_special(rest: &[char]) -> Option<(u8, usize)> {
    let mut best: Option<(u8, usize)> = None;
    for &(code, token) in SPECIAL {
        if token.starts_with('{') {
            continue;
        }
        let token_chars: Vec<char> = token.chars().collect();
        if rest.len() >= token_chars.len() && rest[..token_chars.len()] == token_chars[..] {
            if best.map_or(true, |(_, len)| token_chars.len() > len) {
                best = Some((code, token_chars.len()));
            }
        }
    }
    best
}

fn parse_wait_arg(command: &str) -> Result<u16, EncodingError> {
    let arg = command.strip_prefix("WAIT ").and_then(|s| s.parse::<u32>().ok());
    match arg {
        Some(value) if value <= 0xFFFF => Ok(value as u16),
        _ => Err(EncodingError::BadCommandArgument {
            command: "WAIT",
            argument: command.to_string(),
        }),
    }
}

fn parse_str_args(command: &str) -> Result<(u16, u16), EncodingError> {
    let bad = || EncodingError::BadCommandArgument {
        command: "STR",
        argument: command.to_string(),
    };
    let mut parts = command.split(' ');
    let _ = parts.next();
    let offset = parts.next().ok_or_else(bad)?;
    let length = parts.next().ok_or_else(bad)?;
    if parts.next().is_some() || offset.len() != 4 || length.len() != 4 {
        return Err(bad());
    }
    let offset = u16::from_str_radix(offset, 16).map_err(|_| bad())?;
    let length = u16::from_str_radix(length, 16).map_err(|_| bad())?;
    Ok((offset, length))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_wait_command_little_endian() {
        let bytes = encode("A{WAIT 10}B").unwrap();
        assert_eq!(bytes, vec![0x21, 0xFE, 0xDD, 0x0A, 0x00, 0x22, 0xFF]);
    }

    #[test]
    fn decodes_wait_command() {
        let text = decode(&[0x21, 0xFE, 0xDD, 0x0A, 0x00, 0x22, 0xFF]).unwrap();
        assert_eq!(text, "A{WAIT 10}B");
    }

    #[test]
    fn round_trips_basic_text() {
        let bytes = encode("Hello, world!").unwrap();
        assert_eq!(decode(&bytes).unwrap(), "Hello, world!");
    }

    #[test]
    fn comma_space_uses_the_ligature_byte() {
        // 0xE2 decodes to ", " and must re-encode to the same byte.
        let bytes = [0x21, 0xE2, 0x22, 0xFF];
        let text = decode(&bytes).unwrap();
        assert_eq!(text, "A, B");
        assert_eq!(encode(&text).unwrap(), bytes);
    }

    #[test]
    fn str_command_round_trips() {
        let bytes = [0xFE, 0xE2, 0xA0, 0x01, 0x04, 0x00, 0xFF];
        let text = decode(&bytes).unwrap();
        assert_eq!(text, "{STR 01A0 0004}");
        assert_eq!(encode(&text).unwrap(), bytes);
    }

    #[test]
    fn newpage_round_trips_with_newline() {
        let bytes = [0x21, 0xE8, 0x22, 0xFF];
        let text = decode(&bytes).unwrap();
        assert_eq!(text, "A{NEWPAGE}\nB");
        assert_eq!(encode(&text).unwrap(), bytes);
    }

    #[test]
    fn control_codes_round_trip() {
        let bytes = [0xFE, 0xD4, 0x21, 0xFE, 0xD9, 0xFF];
        let text = decode(&bytes).unwrap();
        assert_eq!(text, "{RED}A{WHITE}");
        assert_eq!(encode(&text).unwrap(), bytes);
    }

    #[test]
    fn character_names_round_trip() {
        let bytes = [0xEA, 0xE2, 0xEC, 0xFF];
        let text = decode(&bytes).unwrap();
        assert_eq!(text, "{CLOUD}, {TIFA}");
        assert_eq!(encode(&text).unwrap(), bytes);
    }

    #[test]
    fn braces_are_escaped() {
        let bytes = encode("\\{\\}").unwrap();
        assert_eq!(decode(&bytes).unwrap(), "\\{\\}");
    }

    #[test]
    fn unknown_command_is_rejected() {
        assert_eq!(
            encode("{BOGUS}").unwrap_err(),
            EncodingError::UnknownCommand {
                name: "BOGUS".to_string()
            }
        );
    }

    #[test]
    fn unencodable_character_is_rejected() {
        assert!(matches!(
            encode("漢").unwrap_err(),
            EncodingError::UnknownCharacter { .. }
        ));
    }

    #[test]
    fn wait_argument_out_of_range_is_rejected() {
        assert!(matches!(
            encode("{WAIT 70000}").unwrap_err(),
            EncodingError::BadCommandArgument { command: "WAIT", .. }
        ));
    }

    #[test]
    fn truncated_control_code_is_rejected() {
        assert!(matches!(
            decode(&[0xFE]).unwrap_err(),
            EncodingError::Truncated { .. }
        ));
    }
}
