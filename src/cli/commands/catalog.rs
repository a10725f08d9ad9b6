use std::sync::Arc;

use serde_json::json;

use crate::cli::OutputFormat;
use crate::config::AppConfig;

/// Prints the authorities the registrar would seed; touches no store
pub fn handle(config: Arc<AppConfig>, output_format: OutputFormat) -> anyhow::Result<()> {
    let catalog = crate::api::catalog(&config);

    match output_format {
        OutputFormat::Json => {
            let response = json!({
                "success": true,
                "data": {
                    "prefix": catalog.prefix(),
                    "authorities": catalog.registrable(),
                }
            });
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            for required in catalog.registrable() {
                println!("{:<32} {:<8} {}", required.name, required.method_label, required.description);
            }
            println!("{} authorities", catalog.registrable().len());
        }
    }
    Ok(())
}
