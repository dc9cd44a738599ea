//! CLI command implementations.

pub mod catalog;
pub mod checkout;
pub mod config;

use std::fs;

use anyhow::{Context as _, Result};
use clap::{Args, Subcommand};
use larek_core::api::FixtureApi;
use larek_core::{EventBus, Handler, StoreContext};
use tracing::info;

use crate::context::Context;

/// Arguments for the catalog command.
#[derive(Args)]
pub struct CatalogArgs {
    /// Catalog file (default: `store.catalog` from config).
    #[arg(long)]
    pub catalog: Option<String>,

    /// Only list products that can be ordered.
    #[arg(long)]
    pub for_sale: bool,
}

/// Arguments for the checkout command.
#[derive(Args)]
pub struct CheckoutArgs {
    /// Product ids to put in the basket.
    #[arg(short, long, value_delimiter = ',', required = true)]
    pub items: Vec<String>,

    /// Payment method (`card` or `cash`).
    #[arg(short, long, default_value = "")]
    pub payment: String,

    /// Delivery address.
    #[arg(short, long, default_value = "")]
    pub address: String,

    /// Contact email.
    #[arg(short, long, default_value = "")]
    pub email: String,

    /// Contact phone.
    #[arg(long, default_value = "")]
    pub phone: String,

    /// Catalog file (default: `store.catalog` from config).
    #[arg(long)]
    pub catalog: Option<String>,
}

/// Arguments for the config command.
#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration.
    Show,
    /// Initialize a new config file.
    Init {
        /// Force overwrite existing config.
        #[arg(short, long)]
        force: bool,
    },
    /// Validate the config file.
    Validate,
}

/// Open the store backed by the catalog file.
pub(crate) fn open_store(catalog: Option<&str>, ctx: &Context) -> Result<FixtureApi> {
    let path = match catalog {
        Some(path) => ctx.cwd.join(path),
        None => ctx.resolve(&ctx.config.store.catalog),
    };
    ctx.output.debug(&format!("Catalog: {}", path.display()));

    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read catalog: {}", path.display()))?;
    let api = FixtureApi::from_json(&content)
        .with_context(|| format!("Failed to parse catalog: {}", path.display()))?;

    Ok(api.with_cdn(ctx.config.store.cdn_url.as_str()))
}

/// Start a storefront session, with the audit trail attached when enabled.
pub(crate) fn open_session(ctx: &Context) -> StoreContext {
    let session = StoreContext::new();
    if ctx.config.log.audit {
        audit(&session.bus);
    }
    session
}

/// Log every event that flows through the bus.
fn audit(bus: &EventBus) {
    bus.subscribe_all(&Handler::new(|event, payload| {
        info!(target: "larek::audit", event, %payload, "Event");
        Ok(())
    }));
}
