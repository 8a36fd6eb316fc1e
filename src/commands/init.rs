use anyhow::{bail, Result};
use ragcore::config::Config;
use std::path::PathBuf;

pub fn init_config(path: PathBuf, force: bool) -> Result<()> {
    let config_path = path.join("ragcore.toml");
    if config_path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        );
    }

    std::fs::create_dir_all(&path)?;
    let toml_content = format!("# ragcore configuration\n\n{}", Config::default().to_toml()?);
    std::fs::write(&config_path, toml_content)?;

    println!("Created configuration at {}", config_path.display());
    println!("Set [embedding] backend = \"http\" to use a real embedding model.");
    Ok(())
}
