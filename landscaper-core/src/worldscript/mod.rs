//! Worldscript: the stack-machine event language. Two textual layers
//! sit above the raw u16 opcode words. The instruction layer is a
//! line-per-opcode mnemonic listing; this module translates between
//! that listing and a readable script form with `if`/`goto`,
//! namespace.method calls and named savemap variables.
//!
//! ```text
//! PUSH_SAVEMAP_BYTE 7E          Savemap.chocobos_on_map == 2
//! PUSH_CONSTANT 02        <->   ...
//! EQ
//! ```

pub mod ast;
pub mod constants;
pub mod opcodes;

mod compiler;
mod decompiler;
mod parser;

use thiserror::Error;

pub use compiler::compile;
pub use decompiler::decompile;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecompileError {
    #[error("unknown mnemonic '{mnemonic}' at line {line}")]
    UnknownMnemonic { mnemonic: String, line: usize },
    #[error("{mnemonic} expects {expected} code parameters, got {actual} at line {line}")]
    ParamCountMismatch {
        mnemonic: String,
        expected: usize,
        actual: usize,
        line: usize,
    },
    #[error("bad parameter '{param}' at line {line}")]
    BadParameter { param: String, line: usize },
    #[error("stack underflow for {mnemonic} at line {line}")]
    StackUnderflow { mnemonic: String, line: usize },
    #[error("jump target {target:#x} not found at line {line}")]
    MissingJumpTarget { target: u32, line: usize },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CompileError {
    #[error("unknown token '{token}'")]
    UnknownToken { token: String },
    #[error("unexpected end of input")]
    UnexpectedEnd,
    #[error("expected {expected}, got {found}")]
    UnexpectedToken { expected: String, found: String },
    #[error("unknown function {namespace}.{method}")]
    UnknownFunction { namespace: String, method: String },
    #[error("{function} expects {expected} arguments, got {actual}")]
    ArityMismatch {
        function: String,
        expected: usize,
        actual: usize,
    },
    #[error("unknown variable {namespace}.{name}")]
    UnknownVariable { namespace: String, name: String },
    #[error("{function} pushes a result and cannot be used as a statement")]
    ResultDiscarded { function: String },
    #[error("{function} does not push a result")]
    NoResult { function: String },
    #[error("argument to {function} must be a numeric literal")]
    LiteralRequired { function: String },
    #[error("bare identifier '{name}' is not a value")]
    BareIdentifier { name: String },
    #[error("operator '{op}' has no opcode")]
    UnsupportedOperator { op: String },
    #[error("address {address:#x} is outside the {namespace} bank")]
    AddressOutOfRange { namespace: String, address: i64 },
    #[error("bit index {bit} out of range 0-7")]
    BitOutOfRange { bit: i64 },
    #[error("label '{label}' is not defined")]
    UnknownLabel { label: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    // Listing exercising every memory access form, based at 0x1000.
    const MEMORY_OPS: &str = "RESET\n\
PUSH_SAVEMAP_WORD 00\n\
PUSH_CONSTANT 01\n\
WRITE\n\
RESET\n\
PUSH_SAVEMAP_BYTE 55\n\
PUSH_SAVEMAP_BYTE 56\n\
WRITE\n\
RESET\n\
PUSH_SAVEMAP_BYTE 54\n\
PUSH_SPECIAL_BYTE 07\n\
WRITE\n\
RESET\n\
PUSH_SAVEMAP_BIT 03F1\n\
PUSH_CONSTANT 01\n\
WRITE\n\
RESET\n\
PUSH_SAVEMAP_BIT 03F2\n\
PUSH_TEMP_BYTE 03\n\
WRITE\n\
RESET\n\
PUSH_SAVEMAP_WORD 0388\n\
PUSH_CONSTANT 02\n\
WRITE\n\
RESET\n\
PUSH_TEMP_WORD 04\n\
PUSH_TEMP_WORD 06\n\
WRITE\n\
RESET\n\
PUSH_SAVEMAP_BYTE 7E\n\
PUSH_CONSTANT 02\n\
EQ\n\
GOTO_IF_FALSE 1033\n\
STOP\n\
RESET\n\
PUSH_SAVEMAP_BIT 08E1\n\
GOTO_IF_FALSE 1039\n\
SET_PLAYER\n\
RETURN";

    // A `\` line continuation would strip the leading indentation on
    // the `if` bodies, so this literal keeps its real newlines.
    const MEMORY_OPS_SCRIPT: &str = "\
Savemap.game_progress = 1
Savemap.chocobo_rating_1 = Savemap.chocobo_rating_2
Savemap[0xBF8].byte = Special.map_options
Savemap.chocobos_on_map.bit[1] = 1
Savemap.chocobos_on_map.bit[2] = Temp[3].byte
Savemap[0xF2C].word = 2
Temp[4].word = Temp[6].word
if Savemap.chocobos_on_map == 2 then
  Entity.stop()
end
if Savemap[0xCC0].bit[1] then
  Entity.set_player_model()
end
return";

    #[test]
    fn decompiles_every_memory_access_form() {
        assert_eq!(decompile(MEMORY_OPS, 0x1000).unwrap(), MEMORY_OPS_SCRIPT);
    }

    #[test]
    fn compile_inverts_decompile() {
        assert_eq!(compile(MEMORY_OPS_SCRIPT, 0x1000).unwrap(), MEMORY_OPS);
    }

    #[test]
    fn compiles_a_conditional() {
        let source = "if Savemap[0xC22].byte == 2 then\n  Entity.stop()\nend\nreturn";
        let listing = compile(source, 0x1000).unwrap();
        assert_eq!(
            listing,
            "RESET\n\
PUSH_SAVEMAP_BYTE 7E\n\
PUSH_CONSTANT 02\n\
EQ\n\
GOTO_IF_FALSE 1009\n\
STOP\n\
RETURN"
        );
    }

    #[test]
    fn compiles_stack_arguments_in_order() {
        let listing = compile("Point.set_terrain_color(10, 20, 30)", 0).unwrap();
        assert_eq!(
            listing,
            "RESET\n\
PUSH_CONSTANT 0A\n\
PUSH_CONSTANT 14\n\
PUSH_CONSTANT 1E\n\
SET_TERRAIN_COLOR"
        );
    }

    #[test]
    fn wait_round_trips_through_both_opcodes() {
        let listing = compile("System.wait(30)", 0).unwrap();
        assert_eq!(listing, "RESET\nPUSH_CONSTANT 1E\nWAIT_FRAMES\nWAIT");
        let script = decompile(&listing, 0).unwrap();
        assert_eq!(script, "System.wait(30)");
    }

    #[test]
    fn unary_operators_compile() {
        let listing = compile(
            "if !Temp[0].word and -Temp[1].word then\n  Entity.stop()\nend",
            0,
        )
        .unwrap();
        assert!(listing.contains("PUSH_TEMP_WORD 00\nNOT"));
        assert!(listing.contains("PUSH_TEMP_WORD 01\nNEG"));
    }

    #[test]
    fn comments_are_stripped() {
        let listing = compile("# setup\nEntity.stop() # halt movement", 0).unwrap();
        assert_eq!(listing, "STOP");
    }

    #[test]
    fn call_function_uses_entity_names() {
        let listing = compile("System.call_function(9, Entities.cloud)", 0).unwrap();
        assert_eq!(listing, "RESET\nPUSH_CONSTANT 00\nCALL_FN_9");
        let script = decompile(&listing, 0).unwrap();
        assert_eq!(script, "System.call_function(9, Entities.cloud)");
    }

    #[test]
    fn model_opcodes_round_trip_entity_names() {
        let listing = "RESET\n\
PUSH_CONSTANT 13\n\
LOAD_MODEL\n\
RESET\n\
PUSH_CONSTANT 0D\n\
SET_ENTITY\n\
RETURN";
        let script = decompile(listing, 0x2BD2).unwrap();
        assert!(script.contains("Entity.load_model(Entities.chocobo)"));
        assert!(script.contains("Player.set_active_entity(Entities.submarine)"));
        assert_eq!(compile(&script, 0x2BD2).unwrap(), listing);
    }

    #[test]
    fn enter_field_uses_field_names() {
        let listing = "RESET\nPUSH_CONSTANT 02\nPUSH_CONSTANT 00\nENTER_FIELD";
        let script = decompile(listing, 0).unwrap();
        assert_eq!(script, "System.enter_field(Fields.kalm, 0)");
        assert_eq!(compile(&script, 0).unwrap(), listing);
    }

    #[test]
    fn goto_targets_become_labels() {
        let listing = "RESET\n\
PUSH_SPECIAL_BYTE 08\n\
PUSH_CONSTANT 0D\n\
EQ\n\
GOTO_IF_FALSE 0A\n\
GOTO 00\n\
RETURN";
        let script = decompile(listing, 0).unwrap();
        assert!(script.starts_with("::label_0::"));
        assert!(script.contains("goto label_0"));
        // The comparison against the player model renders as an entity.
        assert!(script
            .contains("Special.player_entity_model_id == Entities.submarine"));
    }

    #[test]
    fn backward_conditional_jumps_keep_their_target() {
        let listing = "STOP\nRESET\nPUSH_TEMP_BYTE 00\nGOTO_IF_FALSE 00\nRETURN";
        let script = decompile(listing, 0).unwrap();
        assert_eq!(
            script,
            "::label_0::\nEntity.stop()\nif !Temp[0].byte goto label_0\nreturn"
        );
        assert_eq!(compile(&script, 0).unwrap(), listing);
    }

    #[test]
    fn backward_conditional_jumps_parenthesize_the_condition() {
        let listing = "RESET\n\
PUSH_TEMP_BYTE 00\n\
PUSH_CONSTANT 01\n\
EQ\n\
GOTO_IF_FALSE 00\n\
RETURN";
        let script = decompile(listing, 0).unwrap();
        assert_eq!(
            script,
            "::label_0::\nif !(Temp[0].byte == 1) goto label_0\nreturn"
        );
        assert_eq!(compile(&script, 0).unwrap(), listing);
    }

    #[test]
    fn unknown_function_is_reported() {
        assert_eq!(
            compile("Entity.warp(1)", 0).unwrap_err(),
            CompileError::UnknownFunction {
                namespace: "Entity".to_string(),
                method: "warp".to_string()
            }
        );
    }

    #[test]
    fn arity_is_checked() {
        assert_eq!(
            compile("Point.set_terrain_color(10, 20)", 0).unwrap_err(),
            CompileError::ArityMismatch {
                function: "Point.set_terrain_color".to_string(),
                expected: 3,
                actual: 2
            }
        );
    }

    #[test]
    fn value_functions_cannot_be_statements() {
        assert_eq!(
            compile("Math.add(1, 2)", 0).unwrap_err(),
            CompileError::ResultDiscarded {
                function: "Math.add".to_string()
            }
        );
    }

    #[test]
    fn decompile_rejects_unknown_mnemonics() {
        assert_eq!(
            decompile("FROBNICATE 01", 0).unwrap_err(),
            DecompileError::UnknownMnemonic {
                mnemonic: "FROBNICATE".to_string(),
                line: 1
            }
        );
    }

    #[test]
    fn assignments_compile_to_write() {
        let listing = compile("Savemap[0xBA5].byte = 3", 0).unwrap();
        assert_eq!(listing, "RESET\nPUSH_SAVEMAP_BYTE 01\nPUSH_CONSTANT 03\nWRITE");
        let script = decompile(&listing, 0).unwrap();
        assert_eq!(script, "Savemap[0xBA5].byte = 3");
    }
}
