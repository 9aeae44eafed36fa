//! Tova Front End CLI
//!
//! # Usage
//!
//! ```text
//! tovac [OPTIONS] <COMMAND>
//!
//! Commands:
//!   lex    Tokenize source and display token stream
//!   parse  Parse source and display AST
//!   check  Parse source and report diagnostics only
//!
//! Options:
//!   -v, --verbose           Increase verbosity (can be repeated)
//!   -q, --quiet             Suppress non-error output
//!       --config <FILE>     Read parser limits from a TOML file
//!       --max-errors <N>    Stop after N errors
//!       --color <WHEN>      Control color output [default: auto]
//!   -h, --help              Print help information
//!   -V, --version           Print version information
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use tovac::config::ParserConfig;
use tovac::diagnostics::{Diagnostic, DiagnosticEmitter, ParseFailure};
use tovac::{DialectRegistry, Lexer, Program, TokenKind};

/// Front end of the Tova compiler.
#[derive(Parser)]
#[command(name = "tovac")]
#[command(version)]
#[command(about = "Parse Tova source files", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase verbosity (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Read parser limits from the `[parser]` table of a TOML file
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Stop after this many errors
    #[arg(long, value_name = "N", global = true)]
    max_errors: Option<usize>,

    /// Control when to use colored output
    #[arg(long, value_enum, default_value_t = ColorChoice::Auto, global = true)]
    color: ColorChoice,
}

#[derive(Subcommand)]
enum Commands {
    /// Tokenize source file and display token stream
    ///
    /// Prints each token with its position, kind, and text.
    Lex(FileArgs),

    /// Parse source file and display AST
    Parse(ParseArgs),

    /// Parse source file and report diagnostics only
    Check(FileArgs),
}

#[derive(Args)]
struct FileArgs {
    /// Source file to process
    #[arg(value_name = "FILE")]
    file: PathBuf,
}

#[derive(Args)]
struct ParseArgs {
    #[command(flatten)]
    input: FileArgs,

    /// How to print the AST
    #[arg(long, value_enum, default_value_t = OutputFormat::Debug)]
    format: OutputFormat,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Rust debug format
    Debug,
    /// JSON (serde)
    Json,
}

/// When to use colored output
#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

impl ColorChoice {
    fn enabled(self) -> bool {
        match self {
            ColorChoice::Auto => std::env::var_os("NO_COLOR").is_none(),
            ColorChoice::Always => true,
            ColorChoice::Never => false,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let verbosity = if cli.quiet { 0 } else { cli.verbose + 1 };
    init_tracing(verbosity);

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(code) => return code,
    };

    match &cli.command {
        Commands::Lex(args) => cmd_lex(args, verbosity),
        Commands::Parse(args) => cmd_parse(args, config, cli.color, verbosity),
        Commands::Check(args) => cmd_check(args, config, cli.color, verbosity),
    }
}

/// `RUST_LOG` wins; otherwise each `-v` raises the default level.
fn init_tracing(verbosity: u8) {
    let default = match verbosity {
        0 | 1 => "warn",
        2 => "info",
        3 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

/// Environment, then the config file, then command-line flags.
fn load_config(cli: &Cli) -> Result<ParserConfig, ExitCode> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = fs::read_to_string(path).map_err(|e| {
                eprintln!("Error reading config '{}': {}", path.display(), e);
                ExitCode::from(1)
            })?;
            ParserConfig::from_toml_str(&text).map_err(|e| {
                eprintln!("Invalid config '{}': {}", path.display(), e);
                ExitCode::from(1)
            })?
        }
        None => ParserConfig::from_env(),
    };

    if let Some(max_errors) = cli.max_errors {
        config.max_errors = max_errors;
    }
    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {}", e);
        return Err(ExitCode::from(1));
    }
    Ok(config)
}

/// Read source file and return contents
fn read_source(path: &Path) -> Result<String, ExitCode> {
    match fs::read_to_string(path) {
        Ok(s) => Ok(s),
        Err(e) => {
            eprintln!("Error reading file '{}': {}", path.display(), e);
            Err(ExitCode::from(1))
        }
    }
}

/// Lexer command - tokenize and display token stream
fn cmd_lex(args: &FileArgs, verbosity: u8) -> ExitCode {
    let source = match read_source(&args.file) {
        Ok(s) => s,
        Err(code) => return code,
    };

    let mut has_errors = false;
    let mut token_count = 0;

    for token in Lexer::new(&source) {
        token_count += 1;
        match token.kind {
            TokenKind::Error => {
                has_errors = true;
                eprintln!(
                    "error: {} at {}:{}",
                    token.value,
                    token.line(),
                    token.column()
                );
            }
            TokenKind::Eof => {}
            _ => println!(
                "{:4}:{:<3} {:?} '{}'",
                token.line(),
                token.column(),
                token.kind,
                token.value
            ),
        }
    }

    if verbosity > 1 && !has_errors {
        eprintln!("Lexed {} tokens successfully.", token_count);
    }

    if has_errors {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}

fn parse_file(path: &Path, source: &str, mut config: ParserConfig) -> Result<Program, ParseFailure> {
    config.file = Arc::from(path.to_string_lossy().as_ref());
    debug!(file = %config.file, bytes = source.len(), "parsing");
    tovac::parse_with(source, config, Arc::new(DialectRegistry::standard()))
}

/// Print every error of a failed parse.
fn report_failure(path: &Path, source: &str, failure: &ParseFailure, color: ColorChoice) {
    let path_str = path.to_string_lossy();
    let mut emitter = DiagnosticEmitter::new(&path_str, source);
    if !color.enabled() {
        emitter = emitter.without_color();
    }
    for error in &failure.errors {
        if let Err(e) = emitter.emit(&Diagnostic::from(error)) {
            eprintln!("{}:{}:{}: {} ({})", path_str, error.line(), error.column(), error, e);
        }
    }
    if let (true, Some(last)) = (failure.truncated, failure.errors.last()) {
        let warning = Diagnostic::warning(
            format!("error limit of {} reached", failure.errors.len()),
            last.span,
        )
        .with_suggestion("raise the limit with --max-errors or TOVA_MAX_ERRORS");
        if let Err(e) = emitter.emit(&warning) {
            eprintln!("{}: warning: {} ({})", path_str, warning.message, e);
        }
    }
    if failure.truncated {
        eprintln!(
            "Parsing failed with {} error(s); further errors were not reported.",
            failure.errors.len()
        );
    } else {
        eprintln!("Parsing failed with {} error(s).", failure.errors.len());
    }
}

/// Parse command - parse and display AST
fn cmd_parse(args: &ParseArgs, config: ParserConfig, color: ColorChoice, verbosity: u8) -> ExitCode {
    let path = &args.input.file;
    let source = match read_source(path) {
        Ok(s) => s,
        Err(code) => return code,
    };

    match parse_file(path, &source, config) {
        Ok(program) => {
            match args.format {
                OutputFormat::Debug => println!("{:#?}", program),
                OutputFormat::Json => match serde_json::to_string_pretty(&program) {
                    Ok(json) => println!("{}", json),
                    Err(e) => {
                        eprintln!("Error serializing AST: {}", e);
                        return ExitCode::from(1);
                    }
                },
            }
            if verbosity > 1 {
                eprintln!("Parsed {} statements successfully.", program.body.len());
            }
            ExitCode::SUCCESS
        }
        Err(failure) => {
            report_failure(path, &source, &failure, color);
            ExitCode::from(1)
        }
    }
}

/// Check command - parse and report diagnostics
fn cmd_check(args: &FileArgs, config: ParserConfig, color: ColorChoice, verbosity: u8) -> ExitCode {
    let source = match read_source(&args.file) {
        Ok(s) => s,
        Err(code) => return code,
    };

    match parse_file(&args.file, &source, config) {
        Ok(program) => {
            if verbosity > 0 {
                eprintln!(
                    "{}: ok ({} statements)",
                    args.file.display(),
                    program.body.len()
                );
            }
            ExitCode::SUCCESS
        }
        Err(failure) => {
            report_failure(&args.file, &source, &failure, color);
            ExitCode::from(1)
        }
    }
}
