//! dwinpack CLI
//!
//! Inspect and edit DWIN display asset containers from the command line.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use dwin_pack::{screen_class, sniff_kind, Container, KindDescriptor};

#[derive(Parser, Debug)]
#[command(name = "dwinpack")]
#[command(about = "Inspect and edit DWIN LCD firmware asset containers")]
struct Args {
    /// Screen class (T5UIC1, T5L). Sniffed from the container magic
    /// when omitted.
    #[arg(short = 'c', long, global = true)]
    class: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the entries of a container
    List {
        /// Path to container file
        container: PathBuf,

        /// Emit machine-readable JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Write one entry's payload bytes to a file
    Extract {
        /// Path to container file
        container: PathBuf,

        /// Entry label (name for icon packs, decimal id for libraries)
        label: String,

        /// Output path [default: the label, as a filename]
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
    },

    /// Replace one entry's payload and rewrite the container
    Replace {
        /// Path to container file
        container: PathBuf,

        /// Entry label (name for icon packs, decimal id for libraries)
        label: String,

        /// Replacement payload file
        payload: PathBuf,

        /// Write the result here instead of rewriting in place
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
    },
}

fn resolve_class(class: &Option<String>, bytes: &[u8]) -> Result<&'static KindDescriptor> {
    match class {
        Some(name) => {
            screen_class(name).ok_or_else(|| anyhow!("unknown screen class '{}'", name))
        }
        None => sniff_kind(bytes)
            .ok_or_else(|| anyhow!("unrecognized container magic; pass --class")),
    }
}

fn open(path: &PathBuf, class: &Option<String>) -> Result<Container> {
    let bytes =
        std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let desc = resolve_class(class, &bytes)?;
    info!(class = desc.name, path = %path.display(), "opening container");
    Ok(Container::open(bytes, desc)?)
}

fn run(args: Args) -> Result<()> {
    match args.command {
        Command::List { container, json } => {
            let opened = open(&container, &args.class)?;
            let infos = opened.list();
            if json {
                println!("{}", serde_json::to_string_pretty(&infos)?);
            } else {
                println!(
                    "{} ({}, {} entries)",
                    container.display(),
                    opened.descriptor().kind,
                    infos.len()
                );
                for info in infos {
                    let dims = if info.width > 0 {
                        format!("{}x{}", info.width, info.height)
                    } else {
                        "-".to_string()
                    };
                    let sector = info
                        .start_sector
                        .map(|s| format!("  sector {}", s))
                        .unwrap_or_default();
                    println!(
                        "  {:<20} {:?}  {:>9}  {} bytes{}",
                        info.label, info.kind, dims, info.length, sector
                    );
                }
            }
        }
        Command::Extract {
            container,
            label,
            output,
        } => {
            let opened = open(&container, &args.class)?;
            let blob = opened.extract(&label)?;
            let out = output.unwrap_or_else(|| PathBuf::from(&label));
            std::fs::write(&out, blob)
                .with_context(|| format!("writing {}", out.display()))?;
            eprintln!("wrote {} bytes to {}", blob.len(), out.display());
        }
        Command::Replace {
            container,
            label,
            payload,
            output,
        } => {
            let opened = open(&container, &args.class)?;
            let blob = std::fs::read(&payload)
                .with_context(|| format!("reading {}", payload.display()))?;
            let updated = opened.replace_all(BTreeMap::from([(label, blob)]))?;
            let out = output.unwrap_or(container);
            std::fs::write(&out, updated.serialize())
                .with_context(|| format!("writing {}", out.display()))?;
            eprintln!(
                "wrote {} bytes to {}",
                updated.serialize().len(),
                out.display()
            );
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {:#}", error);
            ExitCode::FAILURE
        }
    }
}
