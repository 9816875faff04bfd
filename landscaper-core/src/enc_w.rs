//! Random encounter table (`enc_w.bin`). Fixed 0x8A0-byte layout:
//! eight Yuffie ambushes, thirty-two Chocobo ratings, then four
//! encounter sets for each of sixteen regions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bytes::{put_u16_le, read_u16_le, read_u8, ByteError};

pub const ENC_W_SIZE: usize = 0x8A0;
pub const NUM_YUFFIE_ENCOUNTERS: usize = 8;
pub const NUM_CHOCOBO_RATINGS: usize = 32;
pub const NUM_REGIONS: usize = 16;
pub const SETS_PER_REGION: usize = 4;

const NORMAL_SLOTS: usize = 6;
const BACK_SLOTS: usize = 2;
const CHOCOBO_SLOTS: usize = 4;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncounterTableError {
    #[error("encounter table must be {expected} bytes, got {actual}")]
    WrongSize { expected: usize, actual: usize },
    #[error("truncated encounter table: {0}")]
    Truncated(#[from] ByteError),
    #[error("{field} index {value} out of range {range}")]
    IndexOutOfRange {
        field: &'static str,
        value: usize,
        range: &'static str,
    },
}

/// Yuffie's forest ambush: the battle triggers once Cloud reaches the
/// given level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YuffieEncounter {
    pub cloud_level: u16,
    pub scene_id: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChocoboRating {
    pub battle_scene_id: u16,
    pub rating: u16,
}

/// One battle slot: a scene id and its roll weight out of 64.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterSlot {
    pub rate: u8,
    pub scene_id: u16,
}

impl EncounterSlot {
    fn parse(raw: u16) -> Self {
        EncounterSlot {
            rate: (raw >> 10) as u8,
            scene_id: raw & 0x3FF,
        }
    }

    fn pack(self) -> u16 {
        ((self.rate as u16) << 10) | (self.scene_id & 0x3FF)
    }
}

/// Battle roster for one terrain type within a region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterSet {
    pub active: bool,
    pub encounter_rate: u8,
    pub normal: [EncounterSlot; NORMAL_SLOTS],
    pub back_attack: [EncounterSlot; BACK_SLOTS],
    pub side_attack: EncounterSlot,
    pub pincer_attack: EncounterSlot,
    pub chocobo: [EncounterSlot; CHOCOBO_SLOTS],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub sets: Vec<EncounterSet>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterTable {
    pub yuffie_encounters: Vec<YuffieEncounter>,
    pub chocobo_ratings: Vec<ChocoboRating>,
    pub regions: Vec<Region>,
}

impl EncounterTable {
    pub fn parse(data: &[u8]) -> Result<Self, EncounterTableError> {
        if data.len() != ENC_W_SIZE {
            return Err(EncounterTableError::WrongSize {
                expected: ENC_W_SIZE,
                actual: data.len(),
            });
        }

        let mut pos = 0;
        let mut yuffie_encounters = Vec::with_capacity(NUM_YUFFIE_ENCOUNTERS);
        for _ in 0..NUM_YUFFIE_ENCOUNTERS {
            yuffie_encounters.push(YuffieEncounter {
                cloud_level: read_u16_le(data, pos)?,
                scene_id: read_u16_le(data, pos + 2)?,
            });
            pos += 4;
        }

        let mut chocobo_ratings = Vec::with_capacity(NUM_CHOCOBO_RATINGS);
        for _ in 0..NUM_CHOCOBO_RATINGS {
            chocobo_ratings.push(ChocoboRating {
                battle_scene_id: read_u16_le(data, pos)?,
                rating: read_u16_le(data, pos + 2)?,
            });
            pos += 4;
        }

        let mut regions = Vec::with_capacity(NUM_REGIONS);
        for _ in 0..NUM_REGIONS {
            let mut sets = Vec::with_capacity(SETS_PER_REGION);
            for _ in 0..SETS_PER_REGION {
                let active = read_u8(data, pos)? != 0;
                let encounter_rate = read_u8(data, pos + 1)?;
                pos += 2;

                let slot = |pos: &mut usize| -> Result<EncounterSlot, ByteError> {
                    let raw = read_u16_le(data, *pos)?;
                    *pos += 2;
                    Ok(EncounterSlot::parse(raw))
                };

                let mut normal = [EncounterSlot { rate: 0, scene_id: 0 }; NORMAL_SLOTS];
                for s in &mut normal {
                    *s = slot(&mut pos)?;
                }
                let mut back_attack = [EncounterSlot { rate: 0, scene_id: 0 }; BACK_SLOTS];
                for s in &mut back_attack {
                    *s = slot(&mut pos)?;
                }
                let side_attack = slot(&mut pos)?;
                let pincer_attack = slot(&mut pos)?;
                let mut chocobo = [EncounterSlot { rate: 0, scene_id: 0 }; CHOCOBO_SLOTS];
                for s in &mut chocobo {
                    *s = slot(&mut pos)?;
                }
                // Two bytes of padding close each set.
                pos += 2;

                sets.push(EncounterSet {
                    active,
                    encounter_rate,
                    normal,
                    back_attack,
                    side_attack,
                    pincer_attack,
                    chocobo,
                });
            }
            regions.push(Region { sets });
        }

        Ok(EncounterTable {
            yuffie_encounters,
            chocobo_ratings,
            regions,
        })
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(ENC_W_SIZE);
        for enc in &self.yuffie_encounters {
            put_u16_le(&mut out, enc.cloud_level);
            put_u16_le(&mut out, enc.scene_id);
        }
        for rating in &self.chocobo_ratings {
            put_u16_le(&mut out, rating.battle_scene_id);
            put_u16_le(&mut out, rating.rating);
        }
        for region in &self.regions {
            for set in &region.sets {
                out.push(set.active as u8);
                out.push(set.encounter_rate);
                for s in &set.normal {
                    put_u16_le(&mut out, s.pack());
                }
                for s in &set.back_attack {
                    put_u16_le(&mut out, s.pack());
                }
                put_u16_le(&mut out, set.side_attack.pack());
                put_u16_le(&mut out, set.pincer_attack.pack());
                for s in &set.chocobo {
                    put_u16_le(&mut out, s.pack());
                }
                put_u16_le(&mut out, 0);
            }
        }
        out
    }

    pub fn yuffie_encounter(&self, index: usize) -> Result<&YuffieEncounter, EncounterTableError> {
        self.yuffie_encounters
            .get(index)
            .ok_or(EncounterTableError::IndexOutOfRange {
                field: "yuffie encounter",
                value: index,
                range: "0-7",
            })
    }

    pub fn chocobo_rating(&self, index: usize) -> Result<&ChocoboRating, EncounterTableError> {
        self.chocobo_ratings
            .get(index)
            .ok_or(EncounterTableError::IndexOutOfRange {
                field: "chocobo rating",
                value: index,
                range: "0-31",
            })
    }

    pub fn encounter_set(
        &self,
        region: usize,
        set: usize,
    ) -> Result<&EncounterSet, EncounterTableError> {
        let region = self
            .regions
            .get(region)
            .ok_or(EncounterTableError::IndexOutOfRange {
                field: "region",
                value: region,
                range: "0-15",
            })?;
        region
            .sets
            .get(set)
            .ok_or(EncounterTableError::IndexOutOfRange {
                field: "encounter set",
                value: set,
                range: "0-3",
            })
    }

    pub fn encounter_set_mut(
        &mut self,
        region: usize,
        set: usize,
    ) -> Result<&mut EncounterSet, EncounterTableError> {
        let region = self
            .regions
            .get_mut(region)
            .ok_or(EncounterTableError::IndexOutOfRange {
                field: "region",
                value: region,
                range: "0-15",
            })?;
        region
            .sets
            .get_mut(set)
            .ok_or(EncounterTableError::IndexOutOfRange {
                field: "encounter set",
                value: set,
                range: "0-3",
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bytes() -> Vec<u8> {
        let mut data = vec![0u8; ENC_W_SIZE];
        // First ambush: level 20, scene 0x123.
        data[0] = 20;
        data[2] = 0x23;
        data[3] = 0x01;
        // First region, first set: active, rate 8, first normal slot
        // packed as rate 16 / scene 0x2A5.
        let base = NUM_YUFFIE_ENCOUNTERS * 4 + NUM_CHOCOBO_RATINGS * 4;
        data[base] = 1;
        data[base + 1] = 8;
        let packed = (16u16 << 10) | 0x2A5;
        data[base + 2..base + 4].copy_from_slice(&packed.to_le_bytes());
        data
    }

    #[test]
    fn parses_packed_slots() {
        let table = EncounterTable::parse(&sample_bytes()).unwrap();
        assert_eq!(table.yuffie_encounters[0].cloud_level, 20);
        assert_eq!(table.yuffie_encounters[0].scene_id, 0x123);
        let set = table.encounter_set(0, 0).unwrap();
        assert!(set.active);
        assert_eq!(set.encounter_rate, 8);
        assert_eq!(set.normal[0], EncounterSlot { rate: 16, scene_id: 0x2A5 });
    }

    #[test]
    fn round_trips_byte_exact() {
        let bytes = sample_bytes();
        let table = EncounterTable::parse(&bytes).unwrap();
        assert_eq!(table.serialize(), bytes);
    }

    #[test]
    fn rejects_wrong_size() {
        assert_eq!(
            EncounterTable::parse(&[0u8; 100]).unwrap_err(),
            EncounterTableError::WrongSize {
                expected: ENC_W_SIZE,
                actual: 100
            }
        );
    }

    #[test]
    fn index_errors_name_their_range() {
        let table = EncounterTable::parse(&sample_bytes()).unwrap();
        assert_eq!(
            table.encounter_set(16, 0).unwrap_err(),
            EncounterTableError::IndexOutOfRange {
                field: "region",
                value: 16,
                range: "0-15"
            }
        );
        assert_eq!(
            table.encounter_set(3, 4).unwrap_err(),
            EncounterTableError::IndexOutOfRange {
                field: "encounter set",
                value: 4,
                range: "0-3"
            }
        );
    }
}
