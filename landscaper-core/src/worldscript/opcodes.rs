//! The world event opcode set. Every opcode is a u16 word; operands
//! come from a shared value stack, with a handful of opcodes carrying
//! one inline code parameter word.

/// Script namespace an opcode's method form lives under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    System,
    Math,
    Entity,
    Point,
    Camera,
    Sound,
    Memory,
    Window,
    Player,
    Savemap,
    Special,
    Temp,
}

impl Namespace {
    pub fn as_str(self) -> &'static str {
        match self {
            Namespace::System => "System",
            Namespace::Math => "Math",
            Namespace::Entity => "Entity",
            Namespace::Point => "Point",
            Namespace::Camera => "Camera",
            Namespace::Sound => "Sound",
            Namespace::Memory => "Memory",
            Namespace::Window => "Window",
            Namespace::Player => "Player",
            Namespace::Savemap => "Savemap",
            Namespace::Special => "Special",
            Namespace::Temp => "Temp",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "System" => Namespace::System,
            "Math" => Namespace::Math,
            "Entity" => Namespace::Entity,
            "Point" => Namespace::Point,
            "Camera" => Namespace::Camera,
            "Sound" => Namespace::Sound,
            "Memory" => Namespace::Memory,
            "Window" => Namespace::Window,
            "Player" => Namespace::Player,
            "Savemap" => Namespace::Savemap,
            "Special" => Namespace::Special,
            "Temp" => Namespace::Temp,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpcodeDef {
    pub code: u16,
    pub mnemonic: &'static str,
    pub namespace: Namespace,
    pub method: &'static str,
    pub stack_params: u8,
    pub code_params: u8,
    pub pushes_result: bool,
}

/// First of the 44 function-call opcodes; `CALL_FN_n` encodes as
/// `CALL_FN_BASE + n`.
pub const CALL_FN_BASE: u16 = 0x204;
pub const CALL_FN_COUNT: u16 = 44;

const fn op(
    code: u16,
    mnemonic: &'static str,
    namespace: Namespace,
    method: &'static str,
    stack_params: u8,
    code_params: u8,
) -> OpcodeDef {
    OpcodeDef {
        code,
        mnemonic,
        namespace,
        method,
        stack_params,
        code_params,
        pushes_result: false,
    }
}

const fn push_op(
    code: u16,
    mnemonic: &'static str,
    namespace: Namespace,
    method: &'static str,
    stack_params: u8,
    code_params: u8,
) -> OpcodeDef {
    OpcodeDef {
        code,
        mnemonic,
        namespace,
        method,
        stack_params,
        code_params,
        pushes_result: true,
    }
}

use Namespace::*;

pub static OPCODES: &[OpcodeDef] = &[
    op(0x00, "NOP", System, "noop", 0, 0),
    push_op(0x15, "NEG", Math, "negate", 1, 0),
    push_op(0x17, "NOT", Math, "not", 1, 0),
    push_op(0x18, "DIST_POINT", Entity, "distance_to_point", 1, 0),
    push_op(0x19, "DIST_MODEL", Entity, "distance_to_entity", 1, 0),
    push_op(0x1b, "DIR_POINT", Entity, "direction_to_point", 1, 0),
    push_op(0x30, "MUL", Math, "multiply", 2, 0),
    push_op(0x40, "ADD", Math, "add", 2, 0),
    push_op(0x41, "SUB", Math, "subtract", 2, 0),
    push_op(0x50, "SHL", Math, "shift_left", 2, 0),
    push_op(0x51, "SHR", Math, "shift_right", 2, 0),
    push_op(0x60, "LT", Math, "less_than", 2, 0),
    push_op(0x61, "GT", Math, "greater_than", 2, 0),
    push_op(0x62, "LE", Math, "less_equal", 2, 0),
    push_op(0x63, "GE", Math, "greater_equal", 2, 0),
    push_op(0x70, "EQ", Math, "equal", 2, 0),
    push_op(0x80, "AND", Math, "bitwise_and", 2, 0),
    push_op(0xa0, "OR", Math, "bitwise_or", 2, 0),
    push_op(0xb0, "LAND", Math, "logical_and", 2, 0),
    push_op(0xc0, "LOR", Math, "logical_or", 2, 0),
    op(0xe0, "WRITE", Memory, "write_bank", 2, 0),
    op(0x100, "RESET", System, "reset_stack", 0, 0),
    push_op(0x110, "PUSH_CONSTANT", Memory, "push_constant", 0, 1),
    push_op(0x114, "PUSH_SAVEMAP_BIT", Savemap, "bit", 0, 1),
    push_op(0x117, "PUSH_SPECIAL_BIT", Special, "bit", 0, 1),
    push_op(0x118, "PUSH_SAVEMAP_BYTE", Savemap, "byte", 0, 1),
    push_op(0x119, "PUSH_TEMP_BYTE", Temp, "byte", 0, 1),
    push_op(0x11b, "PUSH_SPECIAL_BYTE", Special, "byte", 0, 1),
    push_op(0x11c, "PUSH_SAVEMAP_WORD", Savemap, "word", 0, 1),
    push_op(0x11d, "PUSH_TEMP_WORD", Temp, "word", 0, 1),
    push_op(0x11f, "PUSH_SPECIAL_WORD", Special, "word", 0, 1),
    op(0x200, "GOTO", System, "goto", 0, 1),
    op(0x201, "GOTO_IF_FALSE", System, "goto_if_false", 1, 1),
    op(0x203, "RETURN", System, "return", 0, 0),
    op(0x204, "CALL_FN_", System, "call_function", 1, 0),
    op(0x300, "LOAD_MODEL", Entity, "load_model", 1, 0),
    op(0x302, "SET_PLAYER", Entity, "set_player_model", 0, 0),
    op(0x303, "SET_SPEED", Entity, "set_movespeed", 1, 0),
    op(0x304, "SET_DIR", Entity, "set_direction_facing", 1, 0),
    push_op(0x305, "WAIT_FRAMES", System, "wait_frames", 1, 0),
    op(0x306, "WAIT", System, "wait", 1, 0),
    op(0x307, "SET_CONTROLS", System, "set_control_lock", 1, 0),
    op(0x308, "SET_MESH_POS", Entity, "set_mesh_coords", 2, 0),
    op(0x309, "SET_LOCAL_POS", Entity, "set_coords_in_mesh", 2, 0),
    op(0x30a, "SET_VERT_SPEED", Entity, "set_vertical_speed", 1, 0),
    op(0x30b, "SET_Y_OFFSET", Entity, "set_y_offset", 1, 0),
    op(0x30c, "ENTER_VEHICLE", Entity, "enter_vehicle", 0, 0),
    op(0x30d, "STOP", Entity, "stop", 0, 0),
    op(0x30e, "PLAY_ANIM", Entity, "play_animation", 2, 0),
    op(0x310, "SET_POINT", Point, "set_active", 2, 0),
    op(0x311, "SET_POINT_MESH", Point, "set_mesh_coords", 2, 0),
    op(0x312, "SET_POINT_LOCAL", Point, "set_coords_in_mesh", 2, 0),
    op(0x313, "SET_TERRAIN_COLOR", Point, "set_terrain_color", 3, 0),
    op(0x314, "SET_LIGHT_DROPOFF", Point, "set_dropoff_params", 2, 0),
    op(0x315, "SET_SKY_TOP", Point, "set_sky_top_color", 3, 0),
    op(0x316, "SET_SKY_BOTTOM", Point, "set_sky_bottom_color", 3, 0),
    op(0x317, "BATTLE", System, "trigger_battle", 1, 0),
    op(0x318, "ENTER_FIELD", System, "enter_field", 2, 0),
    op(0x319, "SET_MAP_OPTIONS", System, "set_map_options", 1, 0),
    op(0x31b, "NOP", System, "noop", 1, 0),
    op(0x31c, "SET_CAM_LOCK", Camera, "set_tilt_zoom_status", 1, 0),
    op(0x31d, "PLAY_SFX", Sound, "play_sfx", 1, 0),
    op(0x31f, "SET_CAM_SPEED", Camera, "set_rotation_speed", 1, 0),
    op(0x320, "RESET_ZOLOM", System, "reset_zolom", 0, 0),
    op(0x321, "FACE_POINT", Entity, "face_point", 1, 0),
    op(0x324, "SET_WINDOW_SIZE", Window, "set_dimensions", 4, 0),
    op(0x325, "SET_MESSAGE", Window, "set_message", 1, 0),
    op(0x326, "SET_PROMPT", Window, "set_prompt", 3, 0),
    op(0x327, "WAIT_PROMPT", Window, "wait_for_prompt_ack", 0, 0),
    op(0x328, "SET_MOVE_DIR", Entity, "set_movement_direction", 1, 0),
    op(0x329, "SET_CAM_TILT", Camera, "set_tilt_speed", 1, 0),
    op(0x32a, "SET_CAM_ZOOM", Camera, "set_zoom_speed", 1, 0),
    op(0x32b, "SET_ENCOUNTERS", System, "set_encounters", 1, 0),
    op(0x32c, "SET_WINDOW_STYLE", Window, "set_params", 2, 0),
    op(0x32d, "WAIT_WINDOW", Window, "wait_until_ready", 0, 0),
    op(0x32e, "WAIT_DISMISS", Window, "wait_for_acknowledge", 0, 0),
    op(0x32f, "SET_PLAYER_DIR", Player, "set_direction", 1, 0),
    op(0x330, "SET_ENTITY", Player, "set_active_entity", 1, 0),
    op(0x331, "EXIT_VEHICLE", Player, "exit_vehicle", 0, 0),
    op(0x332, "CHOCOBO_RUN", Player, "chocobo_run_away", 0, 0),
    op(0x333, "FACE_MODEL", Entity, "rotate_to_model", 2, 0),
    op(0x334, "WAIT_FUNC", System, "wait_for_function", 0, 0),
    op(0x336, "SET_WALK_SPEED", Entity, "set_walk_speed", 1, 0),
    op(0x339, "HIDE_MODEL", Entity, "hide_model", 0, 0),
    op(0x33a, "SET_VERT_SPEED2", Entity, "set_vertical_speed_2", 1, 0),
    op(0x33b, "FADE_OUT", System, "fade_out", 2, 0),
    op(0x33c, "SET_FIELD_ENTRY", System, "set_field_entry", 0, 0),
    op(0x33d, "SET_FIELD_ENTRY_ID", System, "set_field_entry_by_id", 1, 0),
    op(0x33e, "PLAY_MUSIC", Sound, "play_music", 1, 0),
    op(0x347, "MOVE_TO_MODEL", Entity, "move_to_entity", 1, 0),
    op(0x348, "FADE_IN", System, "fade_in", 2, 0),
    op(0x349, "SET_PROGRESS", System, "set_world_progress", 1, 0),
    op(0x34a, "PLAY_LAYER_ANIM", System, "play_layer_animation", 1, 0),
    op(0x34b, "SET_CHOCOBO", Player, "set_chocobo_type", 1, 0),
    op(0x34c, "SET_SUBMARINE", Player, "set_submarine_color", 1, 0),
    op(0x34d, "SHOW_LAYER", System, "show_layer", 3, 0),
    op(0x34e, "HIDE_LAYER", System, "hide_layer", 1, 0),
    op(0x34f, "SET_Y_POS", Entity, "set_y_position", 1, 0),
    op(0x350, "SHOW_METEOR", System, "show_meteor", 1, 0),
    op(0x351, "SET_MUSIC_VOL", Sound, "set_music_volume", 1, 0),
    op(0x352, "SHAKE_CAM", Camera, "shake", 1, 0),
    op(0x353, "ADJUST_POS", Entity, "adjust_position_outside_vehicle", 2, 0),
    op(0x354, "SET_VEHICLE_USABLE", System, "set_vehicle_usable", 1, 0),
    op(0x355, "SET_BATTLE_TIMER", System, "set_battle_timer", 1, 0),
];

/// Methods whose literal arguments name entity models.
pub static MODEL_METHODS: &[&str] = &[
    "distance_to_entity",
    "load_model",
    "set_active_entity",
    "rotate_to_model",
    "move_to_entity",
];

pub fn by_code(code: u16) -> Option<&'static OpcodeDef> {
    OPCODES.iter().find(|o| o.code == code)
}

/// Mnemonic lookup; the duplicate NOP entry resolves to opcode 0x00.
pub fn by_mnemonic(mnemonic: &str) -> Option<&'static OpcodeDef> {
    OPCODES.iter().find(|o| o.mnemonic == mnemonic)
}

pub fn by_method(namespace: Namespace, method: &str) -> Option<&'static OpcodeDef> {
    // The bank accessors share method names across namespaces;
    // Savemap resolves to its own push opcodes.
    if namespace == Namespace::Savemap {
        let code = match method {
            "bit" => Some(0x114),
            "byte" => Some(0x118),
            "word" => Some(0x11c),
            _ => None,
        };
        if let Some(code) = code {
            return by_code(code);
        }
    }
    OPCODES
        .iter()
        .find(|o| o.namespace == namespace && o.method == method)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_are_consistent() {
        for def in OPCODES {
            assert_eq!(by_code(def.code).map(|o| o.code), Some(def.code));
        }
        assert_eq!(by_mnemonic("NOP").map(|o| o.code), Some(0x00));
        assert_eq!(by_mnemonic("SET_TERRAIN_COLOR").map(|o| o.code), Some(0x313));
        assert!(by_mnemonic("BOGUS").is_none());
    }

    #[test]
    fn method_lookup_prefers_savemap_accessors() {
        assert_eq!(
            by_method(Namespace::Savemap, "word").map(|o| o.code),
            Some(0x11c)
        );
        assert_eq!(
            by_method(Namespace::Temp, "byte").map(|o| o.code),
            Some(0x119)
        );
        assert_eq!(
            by_method(Namespace::System, "noop").map(|o| o.code),
            Some(0x00)
        );
    }
}
