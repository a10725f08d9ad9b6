pub mod commands;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::Router;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::{self, AppState};
use crate::config::AppConfig;
use crate::database::{DatabaseManager, GraphStore};
use crate::services::bootstrap::Bootstrap;
use crate::services::registrar::AuthorityRegistrar;

#[derive(Parser)]
#[command(name = "authority-api")]
#[command(about = "Authority API - route-derived permissions, role graph and menu resolution")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Register authorities, seed defaults and serve the API (default)")]
    Serve,

    #[command(about = "Print the permission catalog derived from the route table")]
    Catalog,

    #[command(about = "Development helper: print a bearer token carrying a user's grant")]
    Token {
        #[arg(long, help = "Email of the user to issue the token for")]
        email: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let config = Arc::new(crate::config::config().clone());

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => commands::serve::handle(config).await,
        Commands::Catalog => commands::catalog::handle(config, output_format),
        Commands::Token { email } => commands::token::handle(config, &email, output_format).await,
    }
}

/// Opens the store, builds the router and runs the startup passes: authority
/// registration, then bootstrap seeding. Any failure aborts startup.
pub async fn prepare(config: Arc<AppConfig>) -> anyhow::Result<(Router, AppState)> {
    let store = DatabaseManager::open(&config.database)
        .await
        .context("opening the store")?;
    prepare_with_store(config, store).await
}

pub async fn prepare_with_store(
    config: Arc<AppConfig>,
    store: Arc<dyn GraphStore>,
) -> anyhow::Result<(Router, AppState)> {
    let (router, state) = api::build(config.clone(), store.clone());
    info!("Permission catalog holds {} route requirements", state.catalog.len());

    AuthorityRegistrar::new(
        store.clone(),
        state.catalog.clone(),
        config.service.service_name.clone(),
        Duration::from_secs(config.registrar.timeout_secs),
    )
    .run()
    .await
    .context("registering authorities")?;

    Bootstrap::new(store, config)
        .run()
        .await
        .context("bootstrap seeding")?;

    Ok((router, state))
}
