//! The LZSS variant used by the world map archives. References use a
//! 4 KiB window with a raw offset that is rotated by the 18-byte
//! priming region, so short back-references near the start of a stream
//! can point before the output and decode as zero bytes.

use thiserror::Error;

const MIN_REF_LEN: usize = 3;
const MAX_REF_LEN: usize = 18;
const WINDOW_MASK: usize = 0x0FFF;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LzssError {
    #[error("truncated back-reference at input offset {offset}")]
    TruncatedReference { offset: usize },
}

/// Map a raw stored offset to a position in the output stream, relative
/// to the current tail. Positions before the start of the output decode
/// as zeros.
fn correct_offset(raw: usize, tail: usize) -> isize {
    tail as isize - (tail.wrapping_sub(MAX_REF_LEN).wrapping_sub(raw) & WINDOW_MASK) as isize
}

pub fn decompress(data: &[u8]) -> Result<Vec<u8>, LzssError> {
    let mut out: Vec<u8> = Vec::with_capacity(data.len() * 2);
    let mut inpos = 0;

    while inpos < data.len() {
        let control = data[inpos];
        inpos += 1;
        for bit in 0..8 {
            if inpos >= data.len() {
                break;
            }
            if control & (1 << bit) != 0 {
                out.push(data[inpos]);
                inpos += 1;
            } else {
                if inpos + 2 > data.len() {
                    return Err(LzssError::TruncatedReference { offset: inpos });
                }
                let raw = (((data[inpos + 1] & 0xF0) as usize) << 4) | data[inpos] as usize;
                let length = (data[inpos + 1] & 0x0F) as usize + MIN_REF_LEN;
                inpos += 2;

                let pos = correct_offset(raw, out.len());
                // Copy byte by byte: the source may overlap the bytes
                // being appended, which repeats the copied run.
                for k in 0..length {
                    let p = pos + k as isize;
                    if p < 0 {
                        out.push(0);
                    } else {
                        out.push(out[p as usize]);
                    }
                }
            }
        }
    }

    Ok(out)
}

/// Greedy longest-match encoder. The stored offset is the match
/// position shifted by the priming region, masked to the window.
pub fn compress(data: &[u8]) -> Vec<u8> {
    let mut out: Vec<u8> = Vec::with_capacity(data.len());
    let mut i = 0;

    while i < data.len() {
        let mut flags = 0u8;
        let mut chunk: Vec<u8> = Vec::with_capacity(17);
        for bit in 0..8 {
            if i >= data.len() {
                break;
            }
            match find_match(data, i) {
                Some((pos, length)) => {
                    let raw = pos.wrapping_sub(MAX_REF_LEN) & WINDOW_MASK;
                    chunk.push((raw & 0xFF) as u8);
                    chunk.push((((raw >> 4) & 0xF0) | (length - MIN_REF_LEN)) as u8);
                    i += length;
                }
                None => {
                    flags |= 1 << bit;
                    chunk.push(data[i]);
                    i += 1;
                }
            }
        }
        out.push(flags);
        out.extend_from_slice(&chunk);
    }

    out
}

fn find_match(data: &[u8], i: usize) -> Option<(usize, usize)> {
    let max_len = MAX_REF_LEN.min(data.len() - i);
    if max_len < MIN_REF_LEN {
        return None;
    }
    let window_start = i.saturating_sub(WINDOW_MASK);
    let mut best: Option<(usize, usize)> = None;

    for pos in window_start..i {
        let mut length = 0;
        // Sources may run past the current position; the decoder
        // repeats the copied run in that case.
        while length < max_len && data[pos + length] == data[i + length] {
            length += 1;
        }
        if length >= MIN_REF_LEN && best.map_or(true, |(_, l)| length > l) {
            best = Some((pos, length));
            if length == max_len {
                break;
            }
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decompresses_literals() {
        // Control byte 0xFF: eight literal bytes follow.
        let data = [0xFF, 1, 2, 3, 4, 5, 6, 7, 8];
        assert_eq!(decompress(&data).unwrap(), vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn decompresses_simple_reference() {
        // Three literals then a reference back to the start of them.
        // raw = (0 - 18) & 0xFFF = 0xFEE.
        let data = [0b0000_0111, 0xAA, 0xBB, 0xCC, 0xEE, 0xF0];
        assert_eq!(
            decompress(&data).unwrap(),
            vec![0xAA, 0xBB, 0xCC, 0xAA, 0xBB, 0xCC]
        );
    }

    #[test]
    fn reference_before_start_yields_zeros() {
        // Reference into the priming region decodes as zero fill.
        let raw = (0usize.wrapping_sub(3).wrapping_sub(18)) & 0xFFF;
        let data = [
            0b0000_0000,
            (raw & 0xFF) as u8,
            (((raw >> 4) & 0xF0) | 0) as u8,
        ];
        assert_eq!(decompress(&data).unwrap(), vec![0, 0, 0]);
    }

    #[test]
    fn truncated_reference_is_an_error() {
        let data = [0b0000_0000, 0x10];
        assert_eq!(
            decompress(&data).unwrap_err(),
            LzssError::TruncatedReference { offset: 1 }
        );
    }

    #[test]
    fn round_trips_repetitive_data() {
        let mut data = Vec::new();
        for i in 0..2000u32 {
            data.push((i % 7) as u8);
            data.push((i % 13) as u8);
        }
        let packed = compress(&data);
        assert!(packed.len() < data.len());
        assert_eq!(decompress(&packed).unwrap(), data);
    }

    #[test]
    fn round_trips_incompressible_data() {
        // A de Bruijn-ish byte mix with no 3-byte repeats.
        let data: Vec<u8> = (0..=255u8).collect();
        let packed = compress(&data);
        assert_eq!(decompress(&packed).unwrap(), data);
    }

    #[test]
    fn round_trips_overlapping_runs() {
        let data = vec![0x42; 100];
        let packed = compress(&data);
        assert_eq!(decompress(&packed).unwrap(), data);
    }
}
