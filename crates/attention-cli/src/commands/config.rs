//! Config command - print the effective configuration.

use anyhow::Result;

use crate::config::AppConfig;

/// Prints `config` with every default filled in.
pub fn run(config: &AppConfig) -> Result<()> {
    let rendered = toml::to_string(&config.effective())?;
    print!("{rendered}");
    Ok(())
}
