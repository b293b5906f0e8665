//! # vellum CLI
//!
//! Command-line interface for the vellum document language.

mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "vellum")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a document to an output format
    Compile {
        /// Input document
        input: PathBuf,

        /// Output directory (defaults to the input's directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Html)]
        format: Format,

        /// Abort on the first failing function call instead of rendering
        /// inline error boxes
        #[arg(long)]
        strict: bool,

        /// Emit the bare body without the standalone HTML template
        #[arg(long)]
        no_wrap: bool,
    },

    /// Check a document for errors without emitting output
    Check {
        /// Input document
        input: PathBuf,

        /// Return diagnostics as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Html,
    Text,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .init();

    let result = match cli.command {
        Commands::Compile {
            input,
            output,
            format,
            strict,
            no_wrap,
        } => commands::compile(&input, output.as_deref(), format.into(), strict, !no_wrap),
        Commands::Check { input, json } => commands::check(&input, json),
    };

    match result {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {:#}", error);
            ExitCode::FAILURE
        }
    }
}

impl From<Format> for vellum_core::OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Html => vellum_core::OutputFormat::Html,
            Format::Text => vellum_core::OutputFormat::PlainText,
        }
    }
}
