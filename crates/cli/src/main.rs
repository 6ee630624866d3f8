//! Bazaar CLI - the buyer's cart from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Show the cart (server cart, or the local fallback when the server is down)
//! bazaar cart show
//!
//! # Add two units of a product
//! bazaar cart add 64f1c2 -q 2
//!
//! # Change or remove a line (IDs as printed by `cart show`)
//! bazaar cart inc e17
//! bazaar cart dec e17
//! bazaar cart remove e17
//!
//! # Start payment and print the checkout URL
//! bazaar cart checkout
//!
//! # Show the signed-in user
//! bazaar whoami
//! ```
//!
//! # Environment Variables
//!
//! See [`bazaar_client::config`]. `BAZAAR_API_TOKEN` must hold the bearer
//! token of a buyer account for the cart commands.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::process::ExitCode;

use bazaar_client::ClientConfig;
use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod render;

#[derive(Parser)]
#[command(name = "bazaar")]
#[command(author, version, about = "Bazaar marketplace cart")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// View and change the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Show the signed-in user
    Whoami,
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart
    Show,
    /// Add a product to the cart
    Add {
        /// Product ID
        product_id: String,

        /// Number of units to add
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Increase a line's quantity by one
    Inc {
        /// Line ID as shown by `cart show`
        item_id: String,
    },
    /// Decrease a line's quantity by one
    Dec {
        /// Line ID as shown by `cart show`
        item_id: String,
    },
    /// Remove a line from the cart
    Remove {
        /// Line ID as shown by `cart show`
        item_id: String,
    },
    /// Create a checkout session and print the payment URL
    Checkout,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing() {
    // Logs go to stderr so command output stays clean
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "bazaar_client=info,bazaar_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            init_tracing();
            tracing::error!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = init_sentry(&config);
    init_tracing();

    match run(cli, &config).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("Command failed: {e}");
            render::print_error(&e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, config: &ClientConfig) -> Result<ExitCode, commands::CommandError> {
    match cli.command {
        Commands::Whoami => commands::whoami::run(config).await,
        Commands::Cart { action } => match action {
            CartAction::Show => commands::cart::show(config).await,
            CartAction::Add {
                product_id,
                quantity,
            } => commands::cart::add(config, &product_id, quantity).await,
            CartAction::Inc { item_id } => commands::cart::adjust(config, &item_id, 1).await,
            CartAction::Dec { item_id } => commands::cart::adjust(config, &item_id, -1).await,
            CartAction::Remove { item_id } => commands::cart::remove(config, &item_id).await,
            CartAction::Checkout => commands::cart::checkout(config).await,
        },
    }
}
