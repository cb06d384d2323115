//! # lumpdump
//!
//! Loads WAD files the way the engine does and reports what it sees.
//!
//! ```bash
//! lumpdump doom2.wad mymod.wad
//! lumpdump --mmap --cache PLAYPAL --heap doom2.wad
//! lumpdump --config revenant.toml
//! RUST_LOG=debug lumpdump doom2.wad
//! ```
//!
//! Exits with status 1 on a fatal error and 2 on a usage or config error.

use std::io::{self, Write};
use std::process;

use revenant::core::PurgeTag;
use revenant::{ContextError, ResourceContext, RevenantConfig};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Failures of one `lumpdump` run.
#[derive(Error, Debug)]
enum DumpError {
    #[error(transparent)]
    Context(#[from] ContextError),

    #[error("couldn't write output: {0}")]
    Output(#[from] io::Error),
}

impl DumpError {
    fn is_fatal(&self) -> bool {
        match self {
            Self::Context(inner) => inner.is_fatal(),
            Self::Output(_) => true,
        }
    }
}

/// Parsed command line.
struct Options {
    config: Option<String>,
    mmap: bool,
    cache: Vec<String>,
    heap: bool,
    files: Vec<String>,
}

fn usage() {
    println!("Usage: lumpdump [options] <file.wad>...");
    println!();
    println!("Options:");
    println!("  --config <file>   Load zone size, backends and files from TOML");
    println!("  --mmap            Map files instead of reading them");
    println!("  --cache <name>    Cache a lump and print its size (repeatable)");
    println!("  --heap            Dump the zone after loading");
}

fn parse_args(args: &[String]) -> Option<Options> {
    let mut options = Options {
        config: None,
        mmap: false,
        cache: Vec::new(),
        heap: false,
        files: Vec::new(),
    };

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => options.config = Some(iter.next()?.clone()),
            "--cache" => options.cache.push(iter.next()?.clone()),
            "--mmap" => options.mmap = true,
            "--heap" => options.heap = true,
            "--help" | "-h" => return None,
            _ => options.files.push(arg.clone()),
        }
    }

    if options.config.is_none() && options.files.is_empty() {
        return None;
    }
    Some(options)
}

/// Drops a write error caused by the reader going away (`| head`).
fn ignore_broken_pipe(result: io::Result<()>) -> io::Result<()> {
    match result {
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        other => other,
    }
}

fn run(options: &Options) -> Result<(), DumpError> {
    let mut config = match &options.config {
        Some(path) => RevenantConfig::from_toml_file(path)?,
        None => RevenantConfig::default(),
    };
    config.files.extend(options.files.iter().map(Into::into));
    config.wad.use_mmap |= options.mmap;

    let mut context = ResourceContext::startup(&config)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    ignore_broken_pipe(context.wads().print_directory(&mut out))?;
    ignore_broken_pipe(writeln!(out, "directory checksum: {:08x}", context.wads().checksum()))?;

    for name in &options.cache {
        let bytes = context.cache_lump_name(name, PurgeTag::Static)?;
        let preview: Vec<String> = bytes.iter().take(16).map(|b| format!("{b:02x}")).collect();
        ignore_broken_pipe(writeln!(out, "{name}: {} bytes [{}]", bytes.len(), preview.join(" ")))?;
        context.release_lump_name(name)?;
    }

    if options.heap {
        ignore_broken_pipe(context.zone().write_heap_dump(&mut out))?;
    }

    context.check_heap().map_err(ContextError::from)?;
    context.shutdown();
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(options) = parse_args(&args) else {
        usage();
        process::exit(2);
    };

    if let Err(e) = run(&options) {
        eprintln!("lumpdump: {e}");
        process::exit(if e.is_fatal() { 1 } else { 2 });
    }
}
