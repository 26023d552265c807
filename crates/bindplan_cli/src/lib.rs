//! Command-line front end for bindplan.
//!
//! Reads a JSON translation unit, runs the generation pipeline, and writes
//! the emission records as JSON or MessagePack. Argument parsing and
//! execution live here so they can be tested without spawning a process;
//! the `bindplan` binary only wires them to the process environment.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::str::FromStr;

use bindplan_ast::TranslationUnit;
use bindplan_engine::{DumpStage, Generator, GeneratorConfig, dump_graph};
use bindplan_foundation::{Diagnostic, Failure};
use thiserror::Error;

/// Exit code for generation failures.
pub const EXIT_FAILURE: u8 = 1;
/// Exit code for invalid command lines.
pub const EXIT_USAGE: u8 = 2;

// =============================================================================
// Configuration
// =============================================================================

/// Record encoding.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Pretty-printed JSON.
    #[default]
    Json,
    /// MessagePack with named fields.
    MsgPack,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(Self::Json),
            "msgpack" => Ok(Self::MsgPack),
            other => Err(format!(
                "unknown format '{other}' (expected 'json' or 'msgpack')"
            )),
        }
    }
}

/// CLI configuration parsed from arguments.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CliConfig {
    /// Input file; `-` reads standard input.
    pub input: Option<PathBuf>,
    /// Output file; standard output when absent.
    pub output: Option<PathBuf>,
    /// Module name used by `only_expose_in`.
    pub module_name: Option<String>,
    /// Record encoding.
    pub format: OutputFormat,
    /// Graph view printed to standard error before synthesis.
    pub dump_graph: Option<DumpStage>,
    /// Raise the default log level to `debug`.
    pub verbose: bool,
    /// Print usage and exit.
    pub show_help: bool,
    /// Print the version and exit.
    pub show_version: bool,
}

impl CliConfig {
    /// Builds the generator configuration.
    #[must_use]
    pub fn generator_config(&self) -> GeneratorConfig {
        let config = GeneratorConfig::default();
        match &self.module_name {
            Some(name) => config.with_module_name(name.clone()),
            None => config,
        }
    }
}

/// Everything that can stop the CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// The command line is invalid.
    #[error("{0}")]
    Usage(String),

    /// Reading or writing a file failed.
    #[error("{path}: {source}")]
    Io {
        /// The file, or `-` for a standard stream.
        path: String,
        /// The underlying error.
        source: io::Error,
    },

    /// The input is not a valid translation unit.
    #[error(transparent)]
    Input(#[from] bindplan_foundation::Error),

    /// Generation failed.
    #[error(transparent)]
    Generation(#[from] Failure),

    /// The records could not be encoded.
    #[error("cannot encode records: {0}")]
    Encode(String),
}

impl CliError {
    /// Returns the process exit code for this error.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Usage(_) => EXIT_USAGE,
            _ => EXIT_FAILURE,
        }
    }

    /// Returns the lines to print on standard error.
    #[must_use]
    pub fn report(&self) -> Vec<String> {
        match self {
            Self::Generation(failure) => failure
                .diagnostics()
                .iter()
                .map(ToString::to_string)
                .collect(),
            Self::Input(error) => vec![Diagnostic::from_error(error).to_string()],
            other => vec![format!("error: {other}")],
        }
    }
}

/// Parses command-line arguments; `args[0]` is the program name.
///
/// # Errors
/// Returns `CliError::Usage` for unknown options, missing values, or a
/// missing input file.
pub fn parse_args(args: &[String]) -> Result<CliConfig, CliError> {
    let mut config = CliConfig::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => config.show_help = true,
            "-V" | "--version" => config.show_version = true,
            "-v" | "--verbose" => config.verbose = true,
            "-m" | "--module" => config.module_name = Some(value(args, &mut i)?.to_string()),
            "-o" | "--output" => config.output = Some(PathBuf::from(value(args, &mut i)?)),
            "--format" => config.format = value(args, &mut i)?.parse().map_err(CliError::Usage)?,
            "--dump-graph" => {
                config.dump_graph = Some(value(args, &mut i)?.parse().map_err(CliError::Usage)?);
            }
            "-" => set_input(&mut config, "-")?,
            arg if arg.starts_with('-') => {
                return Err(CliError::Usage(format!("unknown option: {arg}")));
            }
            path => set_input(&mut config, path)?,
        }
        i += 1;
    }

    if config.input.is_none() && !config.show_help && !config.show_version {
        return Err(CliError::Usage("missing input file".to_string()));
    }
    Ok(config)
}

fn value<'a>(args: &'a [String], i: &mut usize) -> Result<&'a str, CliError> {
    let option = &args[*i];
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .ok_or_else(|| CliError::Usage(format!("{option} requires a value")))
}

fn set_input(config: &mut CliConfig, path: &str) -> Result<(), CliError> {
    if config.input.is_some() {
        return Err(CliError::Usage(format!("unexpected extra input: {path}")));
    }
    config.input = Some(PathBuf::from(path));
    Ok(())
}

// =============================================================================
// Execution
// =============================================================================

/// The result of a successful run, before anything is written.
#[derive(Debug)]
pub struct Execution {
    /// Encoded records.
    pub output: Vec<u8>,
    /// Non-fatal diagnostics.
    pub warnings: Vec<Diagnostic>,
    /// Rendered graph, when requested.
    pub graph_dump: Option<String>,
}

/// Runs the pipeline over a JSON translation unit.
///
/// # Errors
/// Returns `CliError::Input` for malformed JSON, `CliError::Generation`
/// when the pipeline fails, and `CliError::Encode` if encoding fails.
pub fn execute(config: &CliConfig, input: &str) -> Result<Execution, CliError> {
    let unit = TranslationUnit::from_json(input)?;
    log::debug!("loaded {} declarations", unit.len());

    let generator = Generator::new(config.generator_config());
    let analysis = generator.analyze(&unit)?;
    let graph_dump = config
        .dump_graph
        .map(|stage| dump_graph(&analysis.graph, &analysis.visibility, stage));
    let generation = generator.finish(analysis);

    let output = match config.format {
        OutputFormat::Json => generation
            .to_json()
            .map(|mut text| {
                text.push('\n');
                text.into_bytes()
            })
            .map_err(|e| CliError::Encode(e.to_string()))?,
        OutputFormat::MsgPack => generation
            .to_msgpack()
            .map_err(|e| CliError::Encode(e.to_string()))?,
    };
    Ok(Execution {
        output,
        warnings: generation.warnings,
        graph_dump,
    })
}

/// Reads the input, runs the pipeline, and writes the records.
///
/// Warnings and the graph dump go to standard error.
///
/// # Errors
/// Returns every error of [`execute`], plus I/O errors.
pub fn run(config: &CliConfig) -> Result<(), CliError> {
    let input = read_input(config)?;
    let execution = execute(config, &input)?;

    if let Some(dump) = &execution.graph_dump {
        eprint!("{dump}");
    }
    for warning in &execution.warnings {
        eprintln!("{warning}");
    }

    match &config.output {
        Some(path) => fs::write(path, &execution.output).map_err(|source| CliError::Io {
            path: path.display().to_string(),
            source,
        }),
        None => io::stdout()
            .lock()
            .write_all(&execution.output)
            .map_err(|source| CliError::Io {
                path: "-".to_string(),
                source,
            }),
    }
}

fn read_input(config: &CliConfig) -> Result<String, CliError> {
    match config.input.as_deref() {
        Some(path) if path.as_os_str() != "-" => {
            fs::read_to_string(path).map_err(|source| CliError::Io {
                path: path.display().to_string(),
                source,
            })
        }
        _ => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .map_err(|source| CliError::Io {
                    path: "-".to_string(),
                    source,
                })?;
            Ok(text)
        }
    }
}

/// Usage text.
#[must_use]
pub fn help_text() -> String {
    format!(
        "bindplan {} - plan C++ binding registrations from an annotated translation unit

USAGE:
    bindplan [OPTIONS] <INPUT.json>

ARGUMENTS:
    <INPUT.json>    Translation unit produced by the front end (`-` for stdin)

OPTIONS:
    -m, --module <NAME>       Module name matched by only_expose_in (default: module)
    -o, --output <FILE>       Write records to FILE instead of stdout
        --format <FORMAT>     json (default) or msgpack
        --dump-graph <STAGE>  Print the exposure graph to stderr: visibility or pruned
    -v, --verbose             Debug logging (RUST_LOG overrides)
    -h, --help                Print help information
    -V, --version             Print version information

EXIT STATUS:
    0    records written
    1    generation failed; diagnostics are printed to stderr
    2    invalid command line",
        env!("CARGO_PKG_VERSION")
    )
}
