//! strata - Inspect and produce schema-driven binary buffers
//!
//! This tool wraps buffer files with a descriptor given on the command line
//! and prints their fields, or builds new buffer files from textual values.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::any::Any;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use strata_core::{BufferBuilder, BuilderConfig, Descriptor, Registry, Values, Wrapper};
use tracing::{debug, info, trace, warn, Level};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// Extension of buffer files picked up when walking a directory
const BUFFER_EXTENSION: &str = "bin";

/// Inspect and produce schema-driven binary buffers
#[derive(Parser, Debug)]
#[command(name = "strata")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the fields of one or more buffer files
    Inspect(InspectArgs),
    /// Build a buffer file from field values
    Encode(EncodeArgs),
    /// List the built-in type registry
    Types,
}

#[derive(Args, Debug)]
struct InspectArgs {
    #[command(flatten)]
    input: InputMode,

    /// Field schema, e.g. `age:int8,name:string`
    #[arg(short, long)]
    schema: String,

    /// Print a BLAKE3 hash of each buffer
    #[arg(long)]
    hash: bool,

    /// Expected registry fingerprint (hex); refuse to decode on mismatch
    #[arg(long)]
    fingerprint: Option<String>,
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct InputMode {
    /// Path to a single buffer file
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Path to a directory of `.bin` buffer files
    #[arg(short, long)]
    directory: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct EncodeArgs {
    /// Field schema, e.g. `age:int8,name:string`
    #[arg(short, long)]
    schema: String,

    /// Field value as `name=value`; arrays separate elements with `;`
    #[arg(long = "set", value_name = "NAME=VALUE")]
    values: Vec<String>,

    /// Output file
    #[arg(short, long)]
    output: PathBuf,

    /// Data region capacity in bytes
    #[arg(long, default_value_t = strata_core::DEFAULT_CAPACITY)]
    capacity: usize,

    /// Drop unused capacity from the written file
    #[arg(long)]
    trim: bool,

    /// Overwrite existing files
    #[arg(long)]
    force: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .init();

    match &cli.command {
        Command::Inspect(args) => inspect(args),
        Command::Encode(args) => encode(args),
        Command::Types => {
            print!("{}", describe_registry(&Registry::with_builtins())?);
            Ok(())
        }
    }
}

/// Parse `name:type,name:type` into a descriptor
fn parse_schema(schema: &str) -> Result<Descriptor> {
    let mut descriptor = Descriptor::new();
    for entry in schema.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let Some((name, type_name)) = entry.split_once(':') else {
            bail!("Invalid schema entry '{}': expected name:type", entry);
        };
        let (name, type_name) = (name.trim(), type_name.trim());
        if name.is_empty() || type_name.is_empty() {
            bail!("Invalid schema entry '{}': empty name or type", entry);
        }
        descriptor.insert(name, type_name);
    }

    if descriptor.is_empty() {
        bail!("Schema declares no fields");
    }
    Ok(descriptor)
}

fn describe_registry(registry: &Registry) -> Result<String> {
    let mut out = String::new();
    for (id, name) in registry.names().enumerate() {
        writeln!(out, "{:>3}  {}", id, name)?;
    }
    writeln!(out, "fingerprint {}", registry.fingerprint().to_hex())?;
    Ok(out)
}

/// Fail unless `registry` hashes to the `expected` hex fingerprint
fn check_fingerprint(registry: &Registry, expected: &str) -> Result<()> {
    let actual = registry.fingerprint().to_hex();
    if !actual.as_str().eq_ignore_ascii_case(expected.trim()) {
        bail!(
            "Registry fingerprint mismatch: buffers expect {}, this build has {}",
            expected,
            actual
        );
    }
    Ok(())
}

fn inspect(args: &InspectArgs) -> Result<()> {
    let descriptor = parse_schema(&args.schema)?;
    let registry = Registry::with_builtins();

    if let Some(expected) = &args.fingerprint {
        check_fingerprint(&registry, expected)?;
    }

    let builder = BufferBuilder::new(registry);
    let wrapper = builder
        .create_wrapper(&descriptor)
        .context("Schema references an unknown type")?;

    if let Some(ref file) = args.input.file {
        if !file.is_file() {
            bail!("Input path is not a file: {}", file.display());
        }
        print!("{}", inspect_file(&wrapper, file, args.hash)?);
        Ok(())
    } else if let Some(ref directory) = args.input.directory {
        inspect_directory(&wrapper, directory, args.hash)
    } else {
        bail!("Either --file or --directory must be specified")
    }
}

/// Walk a directory and inspect every buffer file in it
fn inspect_directory(wrapper: &Wrapper, directory: &Path, hash: bool) -> Result<()> {
    if !directory.is_dir() {
        bail!("Path is not a directory: {}", directory.display());
    }

    info!("Scanning directory: {}", directory.display());
    let mut inspected = 0;

    for path in buffer_files(directory) {
        debug!("Inspecting {}", path.display());
        match inspect_file(wrapper, &path, hash) {
            Ok(report) => {
                print!("{}", report);
                inspected += 1;
            }
            // Log error but continue with other files
            Err(e) => warn!("Error inspecting {}: {:#}", path.display(), e),
        }
    }

    info!("Inspected {} buffers", inspected);
    Ok(())
}

/// Buffer files below `directory`, skipping hidden files
fn buffer_files(directory: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(directory)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|path| path.is_file())
        .filter(|path| {
            !path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.starts_with('.'))
                .unwrap_or(false)
        })
        .filter(|path| {
            let keep = path.extension().and_then(|e| e.to_str()) == Some(BUFFER_EXTENSION);
            if !keep {
                trace!("Skipping non-buffer: {}", path.display());
            }
            keep
        })
        .collect();
    files.sort();
    files
}

/// Wrap one file and render its fields
fn inspect_file(wrapper: &Wrapper, path: &Path, hash: bool) -> Result<String> {
    let data =
        fs::read(path).with_context(|| format!("Failed to read buffer: {}", path.display()))?;
    trace!("Read {} bytes from {}", data.len(), path.display());

    let content_hash = blake3::hash(&data).to_hex();
    let buffer = wrapper
        .wrap(data)
        .with_context(|| format!("Failed to wrap buffer: {}", path.display()))?;

    let mut out = String::new();
    writeln!(out, "{}", path.display())?;
    if hash {
        writeln!(out, "  blake3 {}", content_hash)?;
    }
    for accessor in buffer.accessors() {
        let rendered = if buffer.is_set(accessor.name()) {
            buffer
                .render(accessor.name())
                .with_context(|| format!("Failed to decode field '{}'", accessor.name()))?
        } else {
            "<unset>".to_string()
        };
        writeln!(
            out,
            "  {} ({}) = {}",
            accessor.name(),
            accessor.type_name(),
            rendered
        )?;
    }
    writeln!(
        out,
        "  {} of {} data bytes used",
        buffer.cursor().position(),
        buffer.cursor().capacity()
    )?;
    Ok(out)
}

fn encode(args: &EncodeArgs) -> Result<()> {
    let descriptor = parse_schema(&args.schema)?;
    let builder = BufferBuilder::with_config(
        Registry::with_builtins(),
        BuilderConfig::new().capacity(args.capacity),
    );
    let build = builder
        .create_build(&descriptor)
        .context("Schema references an unknown type")?;

    let mut values = Values::new();
    for assignment in &args.values {
        let Some((name, text)) = assignment.split_once('=') else {
            bail!("Invalid value '{}': expected name=value", assignment);
        };
        let Some(type_name) = descriptor.type_of(name) else {
            bail!("Field '{}' is not in the schema", name);
        };
        let (value, value_type) = parse_value(type_name, text)
            .with_context(|| format!("Invalid value for '{}' ({})", name, type_name))?;
        values.insert_boxed(name, value, value_type);
    }

    let buffer = build.build(&values).context("Failed to build buffer")?;
    let bytes = if args.trim {
        &buffer.as_bytes()[..buffer.header().len() + buffer.cursor().position()]
    } else {
        buffer.as_bytes()
    };

    write_buffer_file(&args.output, bytes, args.force)?;
    println!("Wrote {} ({} bytes)", args.output.display(), bytes.len());
    Ok(())
}

/// Write a buffer file, refusing to clobber unless forced
fn write_buffer_file(output_path: &Path, bytes: &[u8], force: bool) -> Result<()> {
    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    if output_path.exists() && !force {
        bail!(
            "File already exists: {} (use --force to overwrite)",
            output_path.display()
        );
    }

    fs::write(output_path, bytes)
        .with_context(|| format!("Failed to write file: {}", output_path.display()))
}

type Parsed = (Box<dyn Any>, &'static str);

fn scalar<T>(text: &str) -> Result<Parsed>
where
    T: FromStr + Any,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value: T = text.trim().parse()?;
    Ok((Box::new(value), std::any::type_name::<T>()))
}

fn list<T>(text: &str) -> Result<Parsed>
where
    T: FromStr + Any,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let values = text
        .split(';')
        .filter(|s| !s.is_empty())
        .map(|s| s.trim().parse::<T>())
        .collect::<std::result::Result<Vec<T>, _>>()?;
    Ok((Box::new(values), std::any::type_name::<Vec<T>>()))
}

/// Parse a textual value for one of the built-in types
fn parse_value(type_name: &str, text: &str) -> Result<Parsed> {
    match type_name {
        "uint8" => scalar::<u8>(text),
        "int8" => scalar::<i8>(text),
        "uint16" => scalar::<u16>(text),
        "int16" => scalar::<i16>(text),
        "uint32" => scalar::<u32>(text),
        "int32" => scalar::<i32>(text),
        "float32" => scalar::<f32>(text),
        "float64" => scalar::<f64>(text),
        "boolean" => scalar::<bool>(text),
        "string" => Ok((Box::new(text.to_string()), std::any::type_name::<String>())),
        "array<uint8>" => list::<u8>(text),
        "array<int8>" => list::<i8>(text),
        "array<uint16>" => list::<u16>(text),
        "array<int16>" => list::<i16>(text),
        "array<uint32>" => list::<u32>(text),
        "array<int32>" => list::<i32>(text),
        "array<float32>" => list::<f32>(text),
        "array<float64>" => list::<f64>(text),
        "array<boolean>" => list::<bool>(text),
        "array<string>" => list::<String>(text),
        other => bail!("Type '{}' has no textual form", other),
    }
}
