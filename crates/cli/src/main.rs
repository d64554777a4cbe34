//! iQmetrix dropship CLI - run hub operations against the iQmetrix API.
//!
//! # Usage
//!
//! ```bash
//! # List the operation names
//! dropship-cli operations
//!
//! # Check a channel profile
//! dropship-cli validate-profile --profile profile.json
//!
//! # Run an operation with a query document from a file
//! dropship-cli run getCustomerById --profile profile.json --input query.json
//!
//! # Run an operation with a payload from stdin
//! echo '{"doc": {...}}' | dropship-cli run insertCustomer
//! ```
//!
//! # Environment Variables
//!
//! - `DROPSHIP_CHANNEL_PROFILE` - Profile path when `--profile` is omitted
//! - `DROPSHIP_LOG_JSON` - Emit JSON logs when set
//! - `SENTRY_DSN` - Report errors to Sentry when set
//! - `RUST_LOG` - Log filter (default: `iqmetrix_dropship_channel=info`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "dropship-cli")]
#[command(author, version, about = "iQmetrix dropship channel tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a hub operation and print its envelope
    Run {
        /// Operation name, e.g. `getProductSimpleById`
        operation: String,

        /// Query document or payload JSON file (`-` for stdin)
        #[arg(short, long, default_value = "-")]
        input: String,

        /// Channel profile JSON file (default: `DROPSHIP_CHANNEL_PROFILE`)
        #[arg(short, long)]
        profile: Option<PathBuf>,
    },
    /// List every supported operation
    Operations,
    /// Validate a channel profile
    ValidateProfile {
        /// Channel profile JSON file (default: `DROPSHIP_CHANNEL_PROFILE`)
        #[arg(short, long)]
        profile: Option<PathBuf>,
    },
}

/// Initialize Sentry when `SENTRY_DSN` is set.
fn init_sentry() -> Option<sentry::ClientInitGuard> {
    let dsn = std::env::var("SENTRY_DSN").ok().filter(|dsn| !dsn.trim().is_empty())?;

    let guard = sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));
    Some(guard)
}

/// Map tracing levels to Sentry events and breadcrumbs.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR => sentry_tracing::EventFilter::Event,
        tracing::Level::WARN | tracing::Level::INFO => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "iqmetrix_dropship_channel=info,iqmetrix_dropship_cli=info".into());

    // Logs go to stderr; stdout carries the envelope
    let json = std::env::var("DROPSHIP_LOG_JSON").is_ok();
    let json_layer = json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_writer(std::io::stderr)
    });
    let text_layer = (!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let _sentry_guard = init_sentry();
    init_tracing();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            operation,
            input,
            profile,
        } => commands::run::execute(&operation, &input, profile.as_deref()).await,
        Commands::Operations => {
            commands::operations::list();
            Ok(())
        }
        Commands::ValidateProfile { profile } => commands::profile::validate(profile.as_deref()),
    };

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}
