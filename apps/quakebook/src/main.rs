//! # Quakebook
//!
//! Renders seismic event parameters as bulletins, moment tensor sheets and
//! CUBE lines, from graph files or from a redb event database.
//!
//! ## Usage
//!
//! ```bash
//! # Load a resolved event into the database
//! quakebook import -i gfz2021gmyq.json
//!
//! # Render from the database
//! quakebook bulletin -e gfz2021gmyq --extra
//! quakebook mt -e gfz2021gmyq
//! quakebook cube -e gfz2021gmyq --verbose
//!
//! # Render straight from a file
//! quakebook dump -i gfz2021gmyq.json -t binary -o gfz2021gmyq.bin
//! ```
//!
//! Logging goes to stderr and is controlled by `QUAKEBOOK_LOG` (or
//! `RUST_LOG`); `QUAKEBOOK_LOG_FORMAT=json` switches to JSON lines.

use clap::Parser;
use quakebook::cli;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    let log_format = std::env::var("QUAKEBOOK_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = EnvFilter::try_from_env("QUAKEBOOK_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| "quakebook=info,quakebook_core=warn".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if let Err(e) = cli::execute(cli) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}
