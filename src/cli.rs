use crate::config::load_config;
use crate::ir::Direction;
use crate::layout_dump::{LayoutDump, write_layout_dump};
use crate::parser::parse_definition;
use crate::session::DiagramSession;
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "asl-layout", version, about = "Lay out Amazon States Language workflows")]
pub struct Args {
    /// Input definition (.json / .asl.json) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file. Defaults to stdout.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Layout config JSON file
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Flow direction: TB, LR, top-to-bottom or left-to-right
    #[arg(short = 'd', long = "direction")]
    pub direction: Option<String>,

    /// Expand a Parallel or Map state (repeatable)
    #[arg(short = 'x', long = "expand")]
    pub expand: Vec<String>,

    /// Output format
    #[arg(short = 'f', long = "format", value_enum, default_value = "json")]
    pub format: OutputFormat,

    /// Also write a flat layout dump to this path
    #[arg(long = "dump")]
    pub dump: Option<PathBuf>,

    /// More logging (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Full layout: nodes with their definitions, edges, canvas size
    Json,
    /// Flat per-node geometry
    Dump,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut config = load_config(args.config.as_deref())?;
    if let Some(token) = args.direction.as_deref() {
        config.layout.direction = Direction::from_token(token)
            .ok_or_else(|| anyhow::anyhow!("unknown direction `{token}`"))?;
    }

    let input = read_input(args.input.as_deref())?;
    let definition = parse_definition(&input)?;
    let mut session = DiagramSession::new(definition, config.layout);
    for id in &args.expand {
        session.expand(id)?;
    }

    let layout = session.layout();
    let direction = session.direction();
    let rendered = match args.format {
        OutputFormat::Json => serde_json::to_string_pretty(&layout)?,
        OutputFormat::Dump => serde_json::to_string_pretty(&LayoutDump::from_layout(&layout, direction))?,
    };
    write_output(&rendered, args.output.as_deref())?;

    if let Some(path) = args.dump.as_deref() {
        write_layout_dump(path, &layout, direction)
            .with_context(|| format!("writing layout dump to {}", path.display()))?;
    }
    Ok(())
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn read_input(path: Option<&Path>) -> Result<String> {
    if let Some(path) = path {
        if path == Path::new("-") {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            return Ok(buf);
        }
        return std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()));
    }

    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn write_output(contents: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => std::fs::write(path, contents)
            .with_context(|| format!("writing {}", path.display()))?,
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(contents.as_bytes())?;
            stdout.write_all(b"\n")?;
        }
    }
    Ok(())
}
