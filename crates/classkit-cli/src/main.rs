//! classkit command-line tool
//!
//! Loads class declarations through a `classkit.toml` manifest and answers
//! questions about them: which names an expression selects, what an alias
//! resolves to, where a class would be loaded from, and what a class is
//! made of.

mod commands;
mod output;
mod session;

use clap::{Parser, Subcommand};
use session::{Session, SessionOptions};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "classkit")]
#[command(about = "Inspect classkit class declarations", long_about = None)]
#[command(version)]
struct Cli {
    /// Loader manifest (defaults to ./classkit.toml when present)
    #[arg(long, global = true)]
    manifest: Option<PathBuf>,

    /// Define every declaration below this directory before running
    #[arg(long = "load", global = true)]
    load: Vec<PathBuf>,

    /// Color output: auto, always or never
    #[arg(long, global = true, default_value = "auto")]
    color: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List class names matching name expressions (`*` wildcards)
    Query {
        /// Names, aliases or wildcard expressions
        #[arg(required = true)]
        patterns: Vec<String>,
        /// Expressions whose matches are left out
        #[arg(short, long)]
        exclude: Vec<String>,
    },

    /// Resolve a name, alias or alternate name to its class
    Resolve {
        /// Name to resolve
        name: String,
    },

    /// Show the declaration path a class would be loaded from
    Path {
        /// Class name
        class: String,
    },

    /// Describe a class: chain, aliases, mixins, configs and members
    Inspect {
        /// Class name, alias or alternate name
        class: String,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Report failed and pending definitions
    Check,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("CLASSKIT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut session = Session::open(&SessionOptions {
        manifest: cli.manifest,
        load: cli.load,
    })?;
    let mut out = output::StyledOutput::new(output::resolve_color_choice(&cli.color));

    match cli.command {
        Commands::Query { patterns, exclude } => {
            commands::query::execute(&session, &patterns, &exclude)
        }
        Commands::Resolve { name } => commands::resolve::execute(&mut session, &name),
        Commands::Path { class } => commands::path::execute(&session, &class),
        Commands::Inspect { class, json } => {
            commands::inspect::execute(&mut session, &class, json, &mut out)
        }
        Commands::Check => commands::check::execute(&session, &mut out),
    }
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
