//! # Quakebook CLI Module
//!
//! ## Available Commands
//!
//! - `bulletin` - Plain-text bulletin of an origin
//! - `mt` - Moment tensor sheet of a focal mechanism
//! - `cube` - CUBE event line, optionally with a summary
//! - `dump` - Write the resolved graph as JSON or binary
//! - `import` - Load a graph file into the store
//! - `status` - Show store contents
//! - `sacpz` - Write SAC pole-zero files for channel responses
//!
//! Every graph command reads either a graph file (`--input`) or resolves an
//! event from the store (`--event`).

mod commands;

use clap::{Args, Parser, Subcommand};
use quakebook_core::{PublicId, QuakeError, ResolveOptions};
use std::path::PathBuf;

use crate::config::Config;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Quakebook - seismic event bulletins, moment tensor sheets and CUBE lines
#[derive(Parser, Debug)]
#[command(name = "quakebook")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (default: ./quakebook.toml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the event database
    #[arg(short = 'D', long, global = true, default_value = "quakebook.redb")]
    pub database: PathBuf,

    /// Output in JSON format (status only)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Where the event graph comes from.
#[derive(Args, Debug, Clone, Default)]
pub struct GraphSource {
    /// Graph file (JSON document or binary)
    #[arg(short, long, conflicts_with = "event")]
    pub input: Option<PathBuf>,

    /// Event ID to resolve from the database
    #[arg(short, long)]
    pub event: Option<String>,
}

/// Resolver overrides on top of the `[resolve]` config section.
#[derive(Args, Debug, Clone, Default)]
pub struct ResolveArgs {
    /// Include every magnitude of every origin
    #[arg(long)]
    pub all_magnitudes: bool,

    /// Include comments
    #[arg(long)]
    pub comments: bool,

    /// Include picks and amplitudes
    #[arg(long)]
    pub picks: bool,

    /// Keep author names in creation info
    #[arg(long)]
    pub full_creation_info: bool,

    /// Keep moment tensor station and phase contributions
    #[arg(long)]
    pub mt_contributions: bool,

    /// Override the event's preferred origin
    #[arg(long)]
    pub preferred_origin: Option<String>,

    /// Override the event's preferred magnitude
    #[arg(long)]
    pub preferred_magnitude: Option<String>,

    /// Override the event's preferred focal mechanism
    #[arg(long)]
    pub preferred_focal_mechanism: Option<String>,
}

impl ResolveArgs {
    /// Flags only switch options on; IDs replace configured ones.
    pub fn apply(&self, options: &mut ResolveOptions) {
        options.include_all_magnitudes |= self.all_magnitudes;
        options.include_comments |= self.comments;
        options.include_picks_and_amplitudes |= self.picks;
        options.include_full_creation_info |= self.full_creation_info;
        options.include_moment_tensor_contributions |= self.mt_contributions;
        if let Some(id) = &self.preferred_origin {
            options.preferred_origin_id = Some(PublicId::new(id.as_str()));
        }
        if let Some(id) = &self.preferred_magnitude {
            options.preferred_magnitude_id = Some(PublicId::new(id.as_str()));
        }
        if let Some(id) = &self.preferred_focal_mechanism {
            options.preferred_focal_mechanism_id = Some(PublicId::new(id.as_str()));
        }
    }
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print a bulletin
    Bulletin {
        #[command(flatten)]
        source: GraphSource,

        #[command(flatten)]
        resolve: ResolveArgs,

        /// Origin to print instead of the preferred one
        #[arg(long)]
        origin: Option<String>,

        /// Extra output (IDs, authors, creation times)
        #[arg(short = 'x', long)]
        extra: bool,

        /// Higher precision for times and coordinates
        #[arg(long)]
        enhanced: bool,

        /// Print pick polarities
        #[arg(short, long)]
        polarities: bool,

        /// Distances in km instead of degrees
        #[arg(short = 'k', long)]
        dist_in_km: bool,

        /// Print the event's agency instead of the origin's
        #[arg(long)]
        event_agency_id: bool,

        /// Minimum arrival weight for the phase table
        #[arg(short, long)]
        weight: Option<f64>,
    },

    /// Print the moment tensor sheet
    Mt {
        #[command(flatten)]
        source: GraphSource,

        #[command(flatten)]
        resolve: ResolveArgs,

        /// Focal mechanism to print instead of the preferred one
        #[arg(long)]
        focal_mechanism: Option<String>,
    },

    /// Print the CUBE event line
    Cube {
        #[command(flatten)]
        source: GraphSource,

        #[command(flatten)]
        resolve: ResolveArgs,

        /// Also print the event summary
        #[arg(short, long)]
        verbose: bool,

        /// Two-letter network code
        #[arg(long)]
        network: Option<String>,

        /// Event version character
        #[arg(long)]
        event_version: Option<char>,
    },

    /// Write the resolved graph
    Dump {
        #[command(flatten)]
        source: GraphSource,

        #[command(flatten)]
        resolve: ResolveArgs,

        /// Output format (json, binary)
        #[arg(short = 't', long, default_value = "json")]
        format: String,

        /// Output file path (stdout for json when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Load a graph file into the database
    Import {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Show database contents
    Status,

    /// Write SAC pole-zero files
    Sacpz {
        /// JSON list of channel responses
        #[arg(short, long)]
        input: PathBuf,

        /// Directory receiving one file per channel
        #[arg(short, long, default_value = ".")]
        output_dir: PathBuf,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), QuakeError> {
    let config = Config::load(cli.config.as_deref())?;
    let database = cli.database.as_path();

    match cli.command {
        Some(Commands::Bulletin {
            source,
            resolve,
            origin,
            extra,
            enhanced,
            polarities,
            dist_in_km,
            event_agency_id,
            weight,
        }) => {
            let mut bulletin = config.bulletin.clone();
            bulletin.extra |= extra;
            bulletin.enhanced |= enhanced;
            bulletin.polarities |= polarities;
            bulletin.dist_in_km |= dist_in_km;
            bulletin.use_event_agency_id |= event_agency_id;
            if let Some(weight) = weight {
                bulletin.min_arrival_weight = weight;
            }
            cmd_bulletin(
                &config,
                database,
                &source,
                &resolve,
                &bulletin,
                origin.as_deref(),
            )
        }
        Some(Commands::Mt {
            source,
            resolve,
            focal_mechanism,
        }) => cmd_mt(
            &config,
            database,
            &source,
            &resolve,
            focal_mechanism.as_deref(),
        ),
        Some(Commands::Cube {
            source,
            resolve,
            verbose,
            network,
            event_version,
        }) => {
            let mut cube = config.cube.clone();
            if let Some(network) = network {
                cube.network_code = network;
            }
            if let Some(version) = event_version {
                cube.event_version = version;
            }
            cmd_cube(&config, database, &source, &resolve, &cube, verbose)
        }
        Some(Commands::Dump {
            source,
            resolve,
            format,
            output,
        }) => cmd_dump(
            &config,
            database,
            &source,
            &resolve,
            &format,
            output.as_deref(),
        ),
        Some(Commands::Import { input }) => cmd_import(database, &input),
        Some(Commands::Status) => cmd_status(database, cli.json_mode),
        Some(Commands::Sacpz { input, output_dir }) => cmd_sacpz(&input, &output_dir),
        None => {
            // No subcommand - show status by default
            cmd_status(database, cli.json_mode)
        }
    }
}
