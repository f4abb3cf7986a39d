//! Guide CLI
//!
//! Command-line interface for the guide link catalog.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;

use guide_core::{Catalog, Config, LinkId, PersonaId};

mod commands;
mod logging;
mod output;

use commands::link::{CreateArgs, UpdateArgs};
use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "guide")]
#[command(about = "Guide - curated link catalog with version lineage")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to an alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage links
    Link {
        #[command(subcommand)]
        command: LinkCommands,
    },
    /// List the topic reference table
    Topics,
    /// List the persona reference table
    Personas,
    /// Show where each superseded link leads
    Successors,
    /// Export the catalog as JSON
    Export {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Import an export into an empty catalog
    Import {
        /// Export file to read
        path: PathBuf,
    },
    /// Show catalog status
    Status,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand)]
enum LinkCommands {
    /// List links
    #[command(alias = "ls")]
    List {
        /// Include invalid (superseded or retired) links
        #[arg(short, long)]
        all: bool,
    },
    /// Show link details
    Show {
        /// Link ID
        id: LinkId,
        /// Show the link even if it is invalid
        #[arg(short, long)]
        all: bool,
        /// Follow successors to the live version
        #[arg(short, long, conflicts_with = "all")]
        live: bool,
    },
    /// Create a new link
    #[command(alias = "add")]
    Create {
        /// Link URL
        url: String,
        /// Display name (must be unique)
        name: String,
        /// Mark the link as certified
        #[arg(long)]
        certified: bool,
        /// Store the link as invalid (retired)
        #[arg(long)]
        invalid: bool,
        /// Existing successor of the new link
        #[arg(long)]
        successor: Option<LinkId>,
        /// Link this one supersedes
        #[arg(short, long)]
        predecessor: Option<LinkId>,
        /// Topic keys (comma-separated or repeated)
        #[arg(short, long, value_delimiter = ',')]
        topics: Vec<String>,
        /// Persona ids (comma-separated or repeated)
        #[arg(long, value_delimiter = ',')]
        personas: Vec<PersonaId>,
    },
    /// Update a link
    #[command(alias = "edit")]
    Update {
        /// Link ID
        id: LinkId,
        /// New URL
        #[arg(long)]
        url: Option<String>,
        /// New display name
        #[arg(long)]
        name: Option<String>,
        /// Set certification
        #[arg(long)]
        certified: Option<bool>,
        /// Set validity
        #[arg(long)]
        valid: Option<bool>,
        /// Successor id, or `none` to clear
        #[arg(long)]
        successor: Option<String>,
        /// Replace topics (comma-separated)
        #[arg(short, long, value_delimiter = ',', conflicts_with = "clear_topics")]
        topics: Option<Vec<String>>,
        /// Replace personas (comma-separated)
        #[arg(long, value_delimiter = ',', conflicts_with = "clear_personas")]
        personas: Option<Vec<PersonaId>>,
        /// Remove all topics
        #[arg(long)]
        clear_topics: bool,
        /// Remove all personas
        #[arg(long)]
        clear_personas: bool,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, database, log_file, version_copy)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    // Config commands work on the file itself, not the catalog
    if let Commands::Config { command } = &cli.command {
        return handle_config_command(command.clone(), cli.config.as_ref(), &output);
    }

    let config = Config::load_with_cli_override(cli.config.as_ref())
        .context("Failed to load configuration")?;
    logging::init(&config, cli.verbose);

    let catalog = Catalog::with_config(&config);
    debug!("Using database {:?}", catalog.database_path());

    match cli.command {
        Commands::Link { command } => handle_link_command(command, &catalog, &output).await,
        Commands::Topics => commands::reference::topics(&catalog, &output).await,
        Commands::Personas => commands::reference::personas(&catalog, &output).await,
        Commands::Successors => commands::reference::successors(&catalog, &output).await,
        Commands::Export { output: path } => {
            commands::export::export(&catalog, path, &output).await
        }
        Commands::Import { path } => commands::export::import(&catalog, path, &output).await,
        Commands::Status => commands::status::show(&catalog, &output).await,
        Commands::Config { .. } => unreachable!(), // Handled above
    }
}

async fn handle_link_command(
    command: LinkCommands,
    catalog: &Catalog,
    output: &Output,
) -> Result<()> {
    match command {
        LinkCommands::List { all } => commands::link::list(catalog, all, output).await,
        LinkCommands::Show { id, all, live } => {
            commands::link::show(catalog, id, all, live, output).await
        }
        LinkCommands::Create {
            url,
            name,
            certified,
            invalid,
            successor,
            predecessor,
            topics,
            personas,
        } => {
            let args = CreateArgs {
                url,
                name,
                certified,
                valid: !invalid,
                successor,
                predecessor,
                topics,
                personas,
            };
            commands::link::create(catalog, args, output).await
        }
        LinkCommands::Update {
            id,
            url,
            name,
            certified,
            valid,
            successor,
            topics,
            personas,
            clear_topics,
            clear_personas,
        } => {
            let args = UpdateArgs {
                url,
                name,
                certified,
                valid,
                successor,
                topics,
                personas,
                clear_topics,
                clear_personas,
            };
            commands::link::update(catalog, id, args, output).await
        }
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}
