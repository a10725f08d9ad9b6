use std::sync::Arc;

use anyhow::Context;
use serde_json::json;

use crate::auth::{generate_jwt, Claims};
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::services::session::SessionService;

/// Computes the user's grant and signs it. Runs the same startup passes as
/// `serve`, so it also works against a fresh in-memory store.
pub async fn handle(config: Arc<AppConfig>, email: &str, output_format: OutputFormat) -> anyhow::Result<()> {
    let (_, state) = crate::cli::prepare(config.clone()).await?;

    let grant = SessionService::new(state.store.clone())
        .grant_for_email(email)
        .await
        .with_context(|| format!("computing grant for {}", email))?;
    let token = generate_jwt(&Claims::for_grant(&grant, &config.security), &config.security)?;

    match output_format {
        OutputFormat::Json => {
            let response = json!({
                "success": true,
                "data": { "token": token, "grant": grant }
            });
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("{} authorities, {} menu nodes", grant.authorities.len(), grant.menus.len());
            println!("{}", token);
        }
    }
    Ok(())
}
