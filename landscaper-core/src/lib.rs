//! Codecs and compilers for the 1997 world map data set: the LGP
//! archive container, the fixed-layout encounter and field-entry
//! tables, encoded message text, the terrain mesh file and the world
//! event scripts.
//!
//! Every component parses a byte buffer into an editable model and
//! serializes the model back to the exact on-disk layout. File I/O
//! stays with the caller; the core operates on in-memory buffers only.

use thiserror::Error;

pub mod bytes;
pub mod enc_w;
pub mod ev;
pub mod field_tbl;
pub mod lgp;
pub mod lzss;
pub mod map;
pub mod mes;
pub mod text;
pub mod worldscript;

pub use enc_w::EncounterTable;
pub use ev::EvFile;
pub use field_tbl::FieldTable;
pub use lgp::LgpArchive;
pub use map::{MapFile, Mesh, SectionResolver, WorldMapKind};
pub use mes::MesFile;

/// Umbrella error for callers that work across several codecs.
#[derive(Debug, Error)]
pub enum LandscaperError {
    #[error(transparent)]
    Bytes(#[from] bytes::ByteError),
    #[error(transparent)]
    Text(#[from] text::EncodingError),
    #[error(transparent)]
    Archive(#[from] lgp::ArchiveError),
    #[error(transparent)]
    Encounters(#[from] enc_w::EncounterTableError),
    #[error(transparent)]
    FieldTable(#[from] field_tbl::FieldTableError),
    #[error(transparent)]
    Messages(#[from] mes::MesError),
    #[error(transparent)]
    Map(#[from] map::MapError),
    #[error(transparent)]
    Lzss(#[from] lzss::LzssError),
    #[error(transparent)]
    Ev(#[from] ev::EvError),
    #[error(transparent)]
    Compile(#[from] worldscript::CompileError),
    #[error(transparent)]
    Decompile(#[from] worldscript::DecompileError),
}

pub type Result<T> = std::result::Result<T, LandscaperError>;
