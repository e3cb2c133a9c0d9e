//! `switchboard config`: configuration management commands.

use std::path::Path;
use switchboard_config::AppConfig;

pub fn show() -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    println!("{}", render_redacted(&config)?);
    Ok(())
}

pub fn init(force: bool) -> Result<(), Box<dyn std::error::Error>> {
    let path = AppConfig::config_path();
    init_at(&path, force)?;
    println!("Wrote {}", path.display());
    Ok(())
}

pub fn path() {
    println!("{}", AppConfig::config_path().display());
}

fn render_redacted(config: &AppConfig) -> Result<String, toml::ser::Error> {
    let mut config = config.clone();
    if config.api_key.is_some() {
        config.api_key = Some("***".into());
    }
    toml::to_string_pretty(&config)
}

fn init_at(path: &Path, force: bool) -> Result<(), Box<dyn std::error::Error>> {
    if path.exists() && !force {
        return Err(format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        )
        .into());
    }
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(path, AppConfig::default_toml())?;
    Ok(())
}
