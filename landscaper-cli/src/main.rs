use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use landscaper_core::{
    worldscript, EncounterTable, EvFile, FieldTable, LgpArchive, MapFile, MesFile,
    SectionResolver, WorldMapKind,
};

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// World units spanned by one mesh cell.
const MESH_SPAN: i32 = 0x2000;

#[derive(Debug, Parser)]
#[command(name = "landscaper", version, about = "FF7 world map data tool")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Inspect and edit LGP archives.
    Archive {
        #[command(subcommand)]
        command: ArchiveCommand,
    },
    /// Dump record tables as JSON.
    Table {
        #[command(subcommand)]
        command: TableCommand,
    },
    /// Decompile and compile world event scripts.
    Script {
        #[command(subcommand)]
        command: ScriptCommand,
    },
    /// Export and import terrain meshes.
    Mesh {
        #[command(subcommand)]
        command: MeshCommand,
    },
}

#[derive(Debug, Subcommand)]
enum ArchiveCommand {
    /// List the entries of an archive.
    List { archive: PathBuf },
    /// Extract one entry.
    Extract {
        archive: PathBuf,
        name: String,
        /// Output path; defaults to the entry name in the current
        /// directory.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Replace or append one entry and rewrite the archive.
    Replace {
        archive: PathBuf,
        name: String,
        file: PathBuf,
        /// Rewritten archive path; defaults to overwriting in place.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TableKind {
    /// Random encounter table (enc_w.bin).
    EncW,
    /// Field entrance table (field.tbl).
    FieldTbl,
    /// Message file (mes).
    Mes,
}

#[derive(Debug, Subcommand)]
enum TableCommand {
    /// Parse a table file and print it as JSON.
    Dump {
        #[arg(value_enum)]
        kind: TableKind,
        file: PathBuf,
    },
}

#[derive(Debug, Subcommand)]
enum ScriptCommand {
    /// List the functions in an event file.
    List { ev: PathBuf },
    /// Decompile one function to script text.
    Decompile {
        ev: PathBuf,
        /// Function index as shown by `script list`.
        #[arg(long)]
        function: usize,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Compile script text into one function and rewrite the event
    /// file.
    Compile {
        ev: PathBuf,
        #[arg(long)]
        function: usize,
        script: PathBuf,
        /// Rewritten event file path; defaults to overwriting in
        /// place.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum MapKindArg {
    Overworld,
    Underwater,
    Glacier,
}

impl From<MapKindArg> for WorldMapKind {
    fn from(kind: MapKindArg) -> WorldMapKind {
        match kind {
            MapKindArg::Overworld => WorldMapKind::Overworld,
            MapKindArg::Underwater => WorldMapKind::Underwater,
            MapKindArg::Glacier => WorldMapKind::Glacier,
        }
    }
}

#[derive(Debug, Subcommand)]
enum MeshCommand {
    /// Export one mesh cell as Wavefront OBJ.
    ExportObj {
        map: PathBuf,
        #[arg(long, value_enum)]
        kind: MapKindArg,
        /// Mesh row on the full grid.
        #[arg(long)]
        row: usize,
        /// Mesh column on the full grid.
        #[arg(long)]
        col: usize,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Import an OBJ back into one mesh cell and rewrite the map.
    ImportObj {
        map: PathBuf,
        #[arg(long, value_enum)]
        kind: MapKindArg,
        #[arg(long)]
        row: usize,
        #[arg(long)]
        col: usize,
        obj: PathBuf,
        /// Rewritten map path; defaults to overwriting in place.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn run(args: Args) -> Result<()> {
    match args.command {
        Command::Archive { command } => run_archive(command),
        Command::Table { command } => run_table(command),
        Command::Script { command } => run_script(command),
        Command::Mesh { command } => run_mesh(command),
    }
}

fn run_archive(command: ArchiveCommand) -> Result<()> {
    match command {
        ArchiveCommand::List { archive } => {
            let lgp = LgpArchive::parse(&fs::read(&archive)?)?;
            for (name, size) in lgp.list() {
                println!("{size:>10}  {name}");
            }
        }
        ArchiveCommand::Extract { archive, name, out } => {
            let lgp = LgpArchive::parse(&fs::read(&archive)?)?;
            let data = lgp
                .get_file(&name)
                .ok_or_else(|| format!("no entry named '{name}' in {}", archive.display()))?;
            let out = out.unwrap_or_else(|| PathBuf::from(&name));
            fs::write(&out, data)?;
            println!("wrote {} ({} bytes)", out.display(), data.len());
        }
        ArchiveCommand::Replace {
            archive,
            name,
            file,
            out,
        } => {
            let mut lgp = LgpArchive::parse(&fs::read(&archive)?)?;
            lgp.set_file(&name, fs::read(&file)?)?;
            let out = out.unwrap_or(archive);
            fs::write(&out, lgp.serialize()?)?;
            println!("wrote {}", out.display());
        }
    }
    Ok(())
}

fn run_table(command: TableCommand) -> Result<()> {
    let TableCommand::Dump { kind, file } = command;
    let data = fs::read(&file)?;
    let json = match kind {
        TableKind::EncW => serde_json::to_string_pretty(&EncounterTable::parse(&data)?)?,
        TableKind::FieldTbl => serde_json::to_string_pretty(&FieldTable::parse(&data)?)?,
        TableKind::Mes => serde_json::to_string_pretty(&MesFile::parse(&data)?)?,
    };
    println!("{json}");
    Ok(())
}

fn run_script(command: ScriptCommand) -> Result<()> {
    match command {
        ScriptCommand::List { ev } => {
            let file = EvFile::parse(&fs::read(&ev)?)?;
            for (index, function) in file.functions.iter().enumerate() {
                let alias = match function.alias_of {
                    Some(target) => format!(" (alias of {target})"),
                    None => String::new(),
                };
                println!("{index:>3}  {}{alias}", function.key.describe());
            }
        }
        ScriptCommand::Decompile { ev, function, out } => {
            let file = EvFile::parse(&fs::read(&ev)?)?;
            let selected = file
                .function(function)
                .ok_or_else(|| format!("no function with index {function}"))?;
            // Aliases decompile as their target's code.
            let source = match selected.alias_of {
                Some(target) => file
                    .function(target)
                    .ok_or_else(|| format!("alias target {target} missing"))?,
                None => selected,
            };
            let script = worldscript::decompile(&source.listing(), source.offset as u32)?;
            match out {
                Some(path) => fs::write(path, script)?,
                None => println!("{script}"),
            }
        }
        ScriptCommand::Compile {
            ev,
            function,
            script,
            out,
        } => {
            let mut file = EvFile::parse(&fs::read(&ev)?)?;
            let selected = file
                .function_mut(function)
                .ok_or_else(|| format!("no function with index {function}"))?;
            let source = fs::read_to_string(&script)?;
            let listing = worldscript::compile(&source, selected.offset as u32)?;
            selected.set_listing(&listing)?;
            let out = out.unwrap_or(ev);
            fs::write(&out, file.serialize()?)?;
            println!("wrote {}", out.display());
        }
    }
    Ok(())
}

fn run_mesh(command: MeshCommand) -> Result<()> {
    match command {
        MeshCommand::ExportObj {
            map,
            kind,
            row,
            col,
            out,
        } => {
            let file = MapFile::parse(&fs::read(&map)?)?;
            let resolver = SectionResolver::new(kind.into());
            let (section, mesh_index) = resolver.resolve_cell(row, col)?;
            let mesh = file.read_mesh(section, mesh_index)?;
            let obj = mesh.to_obj(col as i32 * MESH_SPAN, row as i32 * MESH_SPAN);
            match out {
                Some(path) => fs::write(path, obj)?,
                None => println!("{obj}"),
            }
        }
        MeshCommand::ImportObj {
            map,
            kind,
            row,
            col,
            obj,
            out,
        } => {
            let mut file = MapFile::parse(&fs::read(&map)?)?;
            let resolver = SectionResolver::new(kind.into());
            let (section, mesh_index) = resolver.resolve_cell(row, col)?;
            let original = file.read_mesh(section, mesh_index)?;
            let text = fs::read_to_string(&obj)?;
            let imported =
                original.from_obj(&text, col as i32 * MESH_SPAN, row as i32 * MESH_SPAN)?;
            file.write_mesh(section, mesh_index, &imported)?;
            let out = out.unwrap_or(map);
            fs::write(&out, file.serialize())?;
            println!("wrote {}", out.display());
        }
    }
    Ok(())
}

fn main() {
    let args = Args::parse();
    if let Err(err) = run(args) {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}
