//! featgraph CLI - Build, validate, merge and inspect feature computation graphs
//!
//! Graphs are assembled from declarative plans and exchanged as JSON files.

use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod output;
mod plan;

use config::FeatgraphConfig;
use output::OutputFormat;

/// Build feature computation graphs.
///
/// featgraph assembles graphs of data sources, transformations, aggregations,
/// lookups and external feature references, checks their structure and merges
/// graphs built separately.
#[derive(Parser)]
#[command(name = "featgraph")]
#[command(author, version)]
#[command(about = "Build, validate and merge feature computation graphs")]
#[command(propagate_version = true)]
#[command(after_help = "Examples:
  featgraph build plan.json -o graph.json   Assemble and validate a graph
  featgraph validate graph.json             Check a graph file
  featgraph merge a.json b.json -o all.json Merge graphs, resolving externals
  featgraph inspect graph.json -f clicks    Show the lineage of a feature")]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format (overrides config default)
    #[arg(long, global = true, value_enum)]
    format: Option<OutputFormat>,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble a compute graph from a JSON or TOML plan
    #[command(visible_alias = "b")]
    Build {
        /// Plan file (.json or .toml)
        plan: PathBuf,

        /// Write the built graph as JSON to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Skip graph validation
        #[arg(long)]
        no_validate: bool,
    },

    /// Check the structure of a graph file
    #[command(visible_alias = "v")]
    Validate {
        /// Graph file (.json)
        graph: PathBuf,
    },

    /// Merge graphs and resolve external references between them
    #[command(visible_alias = "m")]
    Merge {
        /// Graph files (.json), in merge order
        #[arg(required = true, num_args = 1..)]
        graphs: Vec<PathBuf>,

        /// Write the merged graph as JSON to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List the nodes of a graph file
    #[command(visible_alias = "i")]
    Inspect {
        /// Graph file (.json)
        graph: PathBuf,

        /// Only show this feature's node and its upstream dependencies
        #[arg(short, long)]
        feature: Option<String>,
    },
}

fn setup_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "warn"
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    // Load configuration from .featgraph.toml
    let config = FeatgraphConfig::load(std::path::Path::new("."));

    // Resolve output format: CLI flag > config default > Table
    let format = cli.format.unwrap_or_else(|| {
        config
            .default_format()
            .and_then(|f| f.parse().ok())
            .unwrap_or(OutputFormat::Table)
    });

    if let Some(use_color) = config.use_color() {
        colored::control::set_override(use_color);
    }

    let command = match cli.command {
        Some(cmd) => cmd,
        None => {
            let _ = Cli::command().print_help();
            println!();
            return Ok(());
        }
    };

    match command {
        Commands::Build {
            plan,
            output,
            no_validate,
        } => {
            let validate = config.validate_on_build() && !no_validate;
            commands::build::run(&plan, validate, output.as_deref(), format)
        }
        Commands::Validate { graph } => commands::validate::run(&graph, format),
        Commands::Merge { graphs, output } => {
            commands::merge::run(&graphs, output.as_deref(), format)
        }
        Commands::Inspect { graph, feature } => {
            commands::inspect::run(&graph, feature.as_deref(), format)
        }
    }
}
