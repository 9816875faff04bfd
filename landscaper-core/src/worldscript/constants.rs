//! Name tables for the script notation: known savemap addresses,
//! entity models, special registers and field destinations.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarType {
    Byte,
    Word,
    Bit,
}

/// Savemap addresses with well-known meanings. Addresses are absolute;
/// the push opcodes store them relative to `SAVEMAP_BASE`.
pub const SAVEMAP_BASE: u32 = 0xBA4;

pub static SAVEMAP_VARS: &[(u32, &str, VarType)] = &[
    (0xBA4, "game_progress", VarType::Word),
    (0xBF9, "chocobo_rating_1", VarType::Byte),
    (0xBFA, "chocobo_rating_2", VarType::Byte),
    (0xBFB, "chocobo_rating_3", VarType::Byte),
    (0xBFC, "chocobo_rating_4", VarType::Byte),
    (0xC1F, "weapons_killed", VarType::Byte),
    (0xC21, "own_chocobo_stable", VarType::Byte),
    (0xC22, "chocobos_on_map", VarType::Byte),
    (0xC23, "vehicle_display", VarType::Byte),
    (0xD73, "yuffie_flags", VarType::Byte),
    (0xEF4, "submarine_color_flags", VarType::Byte),
    (0xF2A, "submarine_flags", VarType::Byte),
];

pub static MODELS: &[(u32, &str)] = &[
    (0, "cloud"),
    (1, "tifa"),
    (2, "cid"),
    (3, "highwind"),
    (4, "wild_chocobo"),
    (5, "tiny_bronco"),
    (6, "buggy"),
    (7, "junon_cannon"),
    (8, "cargo_ship"),
    (9, "highwind_propellers"),
    (10, "diamond_weapon"),
    (11, "ultima_weapon"),
    (12, "fort_condor"),
    (13, "submarine"),
    (14, "gold_saucer"),
    (15, "rocket_town_rocket"),
    (16, "rocket_town"),
    (17, "sunken_gelnika"),
    (18, "underwater_reactor"),
    (19, "chocobo"),
    (20, "midgar_cannon"),
    (21, "unknown_21"),
    (22, "unknown_22"),
    (23, "unknown_23"),
    (24, "north_crater_barrier"),
    (25, "ancient_forest"),
    (26, "key_of_the_ancients"),
    (27, "unknown_27"),
    (28, "red_submarine"),
    (29, "ruby_weapon"),
    (30, "emerald_weapon"),
    (65535, "system"),
];

/// Registers reachable under the `Special` namespace.
pub static SPECIAL_VARS: &[(u32, &str, VarType)] = &[
    (0, "entity_mesh_x_coord", VarType::Byte),
    (1, "entity_mesh_y_coord", VarType::Byte),
    (2, "entity_coord_in_mesh_x", VarType::Word),
    (3, "entity_coord_in_mesh_y", VarType::Word),
    (4, "entity_direction", VarType::Byte),
    (5, "unknown_5", VarType::Byte),
    (6, "last_field_id", VarType::Byte),
    (7, "map_options", VarType::Byte),
    (8, "player_entity_model_id", VarType::Byte),
    (9, "current_entity_model_id", VarType::Byte),
    (10, "check_if_riding_chocobo", VarType::Byte),
    (11, "battle_result", VarType::Bit),
    (12, "prompt_window_result", VarType::Byte),
    (13, "current_triangle_script_id", VarType::Byte),
    (14, "party_leader_model_id", VarType::Byte),
    (15, "unknown_15", VarType::Byte),
    (16, "random_8bit_number", VarType::Byte),
];

pub static FIELDS: &[(u32, &str)] = &[
    (0, "other_worldmap"),
    (1, "midgar_sector_5_gate"),
    (2, "kalm"),
    (3, "chocobo_farm"),
    (4, "mythril_mines_from_swamp"),
    (5, "mythril_mines_from_condor"),
    (6, "fort_condor"),
    (7, "junon"),
    (8, "temple_of_the_ancients"),
    (9, "old_mans_house"),
    (10, "weapon_seller"),
    (11, "mideel"),
    (12, "quadra_magic_cave"),
    (13, "costa_del_sol"),
    (14, "mt_corel"),
    (15, "north_corel"),
    (16, "corel_desert"),
    (17, "gongaga"),
    (18, "cosmo_canyon"),
    (19, "nibelheim_south"),
    (20, "rocket_town_south"),
    (21, "lucrecias_cave"),
    (22, "hp_mp_cave"),
    (23, "plains_outside_wutai"),
    (24, "mime_cave"),
    (25, "bone_village"),
    (26, "corral_valley_cave"),
    (27, "icicle_village_south"),
    (28, "chocobo_sage_house"),
    (29, "knights_of_the_round_cave"),
    (30, "underwater_reactor"),
    (31, "sunken_gelnika"),
    (32, "impaled_zolom"),
    (33, "yuffie_encounter"),
    (34, "plains_outside_wutai_2"),
    (35, "plains_outside_wutai_3"),
    (36, "cargo_ship"),
    (37, "costa_del_sol_harbor"),
    (38, "costa_del_sol_harbor_2"),
    (39, "junon_dock"),
    (40, "unused_40"),
    (41, "unused_41"),
    (42, "unused_42"),
    (43, "nibelheim_north"),
    (44, "mt_nibel_from_rocket_town"),
    (45, "unused_45"),
    (46, "mt_nibel_from_nibelheim"),
    (47, "icicle_village_north"),
    (48, "great_glacier"),
    (49, "unused_49"),
    (50, "highwind_bridge_3"),
    (51, "highwind_bridge_4"),
    (52, "highwind_bridge_5"),
    (53, "diamond_weapon_encounter"),
    (54, "unused_54"),
    (55, "ancient_forest"),
    (56, "submarine_bridge_3"),
    (57, "corral_valley"),
    (58, "forgotten_capital"),
    (59, "highwind_deck"),
    (60, "gaeas_cliff_base"),
    (61, "great_glacier_2"),
    (62, "great_glacier_3"),
    (63, "great_glacier_4"),
    (64, "great_glacier_5"),
];

/// System function ids with conventional names, used when listing an
/// event file's contents.
pub static SYSTEM_SCRIPT_NAMES: &[(u8, &str)] = &[
    (0, "init"),
    (2, "update"),
    (6, "highwind_menu"),
    (7, "zolom_touched"),
    (9, "crater_landing"),
];

pub static MODEL_SCRIPT_NAMES: &[(u8, &str)] = &[
    (0, "init"),
    (1, "unload"),
    (2, "update"),
    (3, "touch"),
    (4, "interact"),
    (5, "disembark"),
];

pub fn savemap_var(address: u32) -> Option<(&'static str, VarType)> {
    SAVEMAP_VARS
        .iter()
        .find(|(a, _, _)| *a == address)
        .map(|(_, n, t)| (*n, *t))
}

pub fn savemap_var_by_name(name: &str) -> Option<(u32, VarType)> {
    SAVEMAP_VARS
        .iter()
        .find(|(_, n, _)| *n == name)
        .map(|(a, _, t)| (*a, *t))
}

pub fn special_var(value: u32) -> Option<(&'static str, VarType)> {
    SPECIAL_VARS
        .iter()
        .find(|(v, _, _)| *v == value)
        .map(|(_, n, t)| (*n, *t))
}

pub fn special_var_by_name(name: &str) -> Option<(u32, VarType)> {
    SPECIAL_VARS
        .iter()
        .find(|(_, n, _)| *n == name)
        .map(|(v, _, t)| (*v, *t))
}

pub fn model_name(id: u32) -> Option<&'static str> {
    MODELS.iter().find(|(i, _)| *i == id).map(|(_, n)| *n)
}

pub fn model_id(name: &str) -> Option<u32> {
    MODELS.iter().find(|(_, n)| *n == name).map(|(i, _)| *i)
}

pub fn field_name(id: u32) -> Option<&'static str> {
    FIELDS.iter().find(|(i, _)| *i == id).map(|(_, n)| *n)
}

pub fn field_id(name: &str) -> Option<u32> {
    FIELDS.iter().find(|(_, n)| *n == name).map(|(i, _)| *i)
}
