//! `travelers-map config` — show, locate or create the config file.

use crate::cli::output::{self, Styled};
use crate::cli::ConfigAction;
use crate::config::MapConfig;
use anyhow::{bail, Result};
use std::path::Path;

pub fn run(action: ConfigAction, config: &MapConfig, path: Option<&Path>) -> Result<()> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(MapConfig::default_path);

    match action {
        ConfigAction::Show => {
            output::print_json(&serde_json::to_value(config.redacted())?);
            Ok(())
        }
        ConfigAction::Path => {
            if output::is_json() {
                output::print_json(&serde_json::json!({
                    "path": path,
                    "exists": path.exists(),
                }));
            } else {
                println!("{}", path.display());
            }
            Ok(())
        }
        ConfigAction::Init { force } => init(&path, force),
    }
}

fn init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    MapConfig::default().save(path)?;

    if !output::is_quiet() {
        let s = Styled::new();
        eprintln!("  {} Wrote {}", s.ok_sym(), path.display());
        eprintln!("  Set api_key there or export TRAVELERS_MAPS_API_KEY.");
    }
    Ok(())
}
