//! Rocket Cart CLI - browse products and edit the cart from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # List the catalog with in-cart quantities
//! rc-cli products
//!
//! # Show the cart
//! rc-cli cart
//!
//! # Add one unit of product 1
//! rc-cli add 1
//!
//! # Set product 1 to 3 units
//! rc-cli update 1 3
//!
//! # Remove product 1
//! rc-cli remove 1
//! ```
//!
//! # Commands
//!
//! - `products` - List products with price and in-cart quantity
//! - `cart` - List cart lines and the total
//! - `add`, `remove`, `update` - Cart mutations, validated against stock
//!
//! Configuration comes from the environment; see `rocket_cart::config`.

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use rocket_cart::CartConfig;
use rocket_cart_core::ProductId;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "rc-cli")]
#[command(author, version, about = "Rocket Cart CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List products with price and in-cart quantity
    Products,
    /// Show the cart contents and total
    Cart,
    /// Add one unit of a product
    Add {
        /// Product ID
        id: ProductId,
    },
    /// Remove a product from the cart
    Remove {
        /// Product ID
        id: ProductId,
    },
    /// Set the amount of a product already in the cart
    Update {
        /// Product ID
        id: ProductId,

        /// New amount (zero or less is ignored)
        #[arg(allow_negative_numbers = true)]
        amount: i32,
    },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &CartConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    if metadata.target() == "notification" {
        return sentry_tracing::EventFilter::Breadcrumb;
    }
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Configuration is needed before tracing for Sentry init
    let config = CartConfig::from_env();
    let _sentry_guard = config.as_ref().ok().and_then(init_sentry);

    // Defaults keep engine chatter quiet but always show notifications
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "rocket_cart=warn,rocket_cart_cli=info,notification=warn".into()
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let result = match config {
        Ok(config) => run(cli, &config).await,
        Err(e) => Err(e.into()),
    };

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: &CartConfig) -> Result<(), commands::CommandError> {
    let mut engine = commands::open_engine(config)?;

    match cli.command {
        Commands::Products => commands::products::list(&engine, config.currency).await?,
        Commands::Cart => commands::cart::show(&engine, config.currency),
        Commands::Add { id } => commands::cart::add(&mut engine, id, config.currency).await?,
        Commands::Remove { id } => commands::cart::remove(&mut engine, id, config.currency)?,
        Commands::Update { id, amount } => {
            commands::cart::update(&mut engine, id, amount, config.currency).await?;
        }
    }
    Ok(())
}
