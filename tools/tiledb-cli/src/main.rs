//! Operational CLI for the storage engine: create an array
//! from a schema file, plan+apply consolidation and vacuum, and dump a
//! fragment directory's structured view. Everything here is a thin shell
//! around `tiledb-core`; no algorithm lives in this crate.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use tiledb_core::array::Array;
use tiledb_core::consolidate;
use tiledb_core::error::Error as CoreError;
use tiledb_core::fragment::directory::FragmentDirectory;
use tiledb_core::schema::Schema;
use tiledb_core::vfs::LocalVfs;
use tiledb_pod::array::schema::SchemaData;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "tiledb", version, about = "Storage engine operational tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Array lifecycle operations.
    Array {
        #[command(subcommand)]
        command: ArrayCommand,
    },
    /// Fragment directory inspection.
    Fragment {
        #[command(subcommand)]
        command: FragmentCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ArrayCommand {
    /// Creates a new array directory from a JSON-encoded schema.
    Create {
        #[arg(long)]
        uri: String,
        #[arg(long)]
        schema: PathBuf,
    },
    /// Plans (and, for `fragments` mode, applies) consolidation over the
    /// array's full fragment history. Producing the consolidated
    /// fragment's tile bytes is orchestration this tool doesn't perform;
    /// `fragment_meta` mode writes the merged metadata shape, `fragments`
    /// mode only reports the plan.
    Consolidate {
        #[arg(long)]
        uri: String,
        #[arg(long, value_enum, default_value_t = ConsolidateMode::Fragments)]
        mode: ConsolidateMode,
    },
    /// Applies any vacuum logs already written for the array, deleting
    /// the fragments they mark as subsumed.
    Vacuum {
        #[arg(long)]
        uri: String,
        #[arg(long, value_enum, default_value_t = ConsolidateMode::Fragments)]
        mode: ConsolidateMode,
    },
}

#[derive(Subcommand, Debug)]
enum FragmentCommand {
    /// Dumps the fragment directory's structured view.
    Info {
        #[arg(long)]
        uri: String,
    },
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ConsolidateMode {
    Fragments,
    FragmentMeta,
}

impl std::fmt::Display for ConsolidateMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConsolidateMode::Fragments => write!(f, "fragments"),
            ConsolidateMode::FragmentMeta => write!(f, "fragment_meta"),
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::from(0),
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(exit_code(&err))
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Array { command } => run_array(command),
        Command::Fragment { command } => run_fragment(command),
    }
}

fn run_array(command: ArrayCommand) -> anyhow::Result<()> {
    match command {
        ArrayCommand::Create { uri, schema } => {
            let bytes = std::fs::read(&schema)
                .map_err(|e| anyhow::anyhow!(CliError::BadArgs(format!(
                    "cannot read schema file {}: {e}",
                    schema.display()
                ))))?;
            let data: SchemaData = serde_json::from_slice(&bytes)
                .map_err(|e| anyhow::anyhow!(CliError::BadArgs(format!("invalid schema JSON: {e}"))))?;
            let vfs = LocalVfs::new();
            Array::create(&vfs, uri.as_str(), Schema::new(data)).map_err(wrap)?;
            info!(%uri, "created array");
            println!("created array {uri}");
            Ok(())
        }
        ArrayCommand::Consolidate { uri, mode } => {
            let vfs = LocalVfs::new();
            let dir = FragmentDirectory::new(&vfs, uri.as_str());
            let fragments = dir.list().map_err(wrap)?;
            let plan = consolidate::plan_consolidation(&fragments, (0, u64::MAX));
            match (mode, plan) {
                (_, None) => {
                    println!("nothing to consolidate: fewer than two fragments in window");
                    Ok(())
                }
                (ConsolidateMode::Fragments, Some(plan)) => {
                    println!(
                        "consolidation plan: {} input(s), output timestamp range {:?}",
                        plan.input_uris.len(),
                        plan.output_timestamp_range
                    );
                    for uri in &plan.input_uris {
                        println!("  {uri}");
                    }
                    Ok(())
                }
                (ConsolidateMode::FragmentMeta, Some(plan)) => {
                    let inputs: Vec<_> = fragments
                        .iter()
                        .filter(|f| plan.input_uris.contains(&f.uri().to_string()))
                        .collect();
                    let output_uri = format!("{uri}/__fragment_meta/consolidated");
                    let merged = consolidate::merge_fragment_metadata(
                        &output_uri,
                        &inputs,
                        plan.output_timestamp_range,
                    );
                    let merged = tiledb_core::fragment::metadata::FragmentMetadata::new(merged);
                    dir.write_consolidated_metadata(&merged).map_err(wrap)?;
                    println!("wrote consolidated metadata for {} fragment(s)", inputs.len());
                    Ok(())
                }
            }
        }
        ArrayCommand::Vacuum { uri, mode } => {
            let vfs = LocalVfs::new();
            let dir = FragmentDirectory::new(&vfs, uri.as_str());
            match mode {
                ConsolidateMode::Fragments => {
                    let logs = dir.vacuum_logs().map_err(wrap)?;
                    if logs.is_empty() {
                        println!("nothing to vacuum");
                        return Ok(());
                    }
                    for log in &logs {
                        for fragment_uri in &log.subsumed_uris {
                            println!("vacuuming {fragment_uri}");
                        }
                        consolidate::apply_vacuum_log(&dir, log).map_err(wrap)?;
                        info!(subsumed = log.subsumed_uris.len(), "vacuum log applied");
                    }
                    Ok(())
                }
                ConsolidateMode::FragmentMeta => {
                    println!(
                        "consolidated_metadata present: {}",
                        dir.consolidated_metadata()
                    );
                    Ok(())
                }
            }
        }
    }
}

fn run_fragment(command: FragmentCommand) -> anyhow::Result<()> {
    match command {
        FragmentCommand::Info { uri } => {
            let vfs = LocalVfs::new();
            let dir = FragmentDirectory::new(&vfs, uri.as_str());
            let fragments = dir.list().map_err(wrap)?;
            for f in &fragments {
                let (t0, t1) = f.timestamp_range();
                println!(
                    "{}  tiles={}  timestamp=({t0}, {t1})  non_empty_domain={:?}",
                    f.uri(),
                    f.num_tiles(),
                    f.non_empty_domain(),
                );
            }
            println!("consolidated_metadata: {}", dir.consolidated_metadata());
            Ok(())
        }
    }
}

fn wrap(err: CoreError) -> anyhow::Error {
    anyhow::anyhow!(err)
}

/// A CLI-local variant used for argument/file problems that never reach
/// `tiledb-core` (bad path, unparsable schema JSON) -- both map to exit
/// code 1.
#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("{0}")]
    BadArgs(String),
}

/// Maps an error to its exit code. `CliError` and
/// any `anyhow` context wrapping one of `tiledb-core`'s own variants are
/// both inspected via `downcast_ref`, since `run` threads everything
/// through `anyhow::Result` for `?`-ergonomics.
fn exit_code(err: &anyhow::Error) -> u8 {
    if err.downcast_ref::<CliError>().is_some() {
        return 1;
    }
    match err.downcast_ref::<CoreError>() {
        Some(CoreError::IOError { .. }) => 2,
        Some(CoreError::FormatError(_)) | Some(CoreError::MetadataError { .. }) => 3,
        Some(CoreError::OOBError { .. }) => 4,
        Some(CoreError::UnsplittableOverflow { .. }) => 5,
        Some(
            CoreError::InvalidRange { .. }
            | CoreError::InvalidLayout(_)
            | CoreError::BoundsError { .. }
            | CoreError::UnknownName(_)
            | CoreError::BufferOverflow { .. }
            | CoreError::IncompleteWrite { .. },
        ) => 1,
        Some(CoreError::CodecError(_)) | Some(CoreError::DatatypeMismatch { .. }) | Some(CoreError::Other(_)) => 64,
        None => 64,
    }
}
