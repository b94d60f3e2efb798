//! Print the effective configuration.

use clipexport_common::{config_file_path, AppConfig};

pub fn run(config: &AppConfig, save: bool) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(config)?);

    if save {
        config
            .save()
            .map_err(|e| anyhow::anyhow!("Failed to save config: {e}"))?;
        println!("Saved to {}", config_file_path().display());
    }
    Ok(())
}
