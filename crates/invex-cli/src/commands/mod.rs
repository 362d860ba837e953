pub mod config;
pub mod extract;
pub mod records;
pub mod serve;

use std::path::{Path, PathBuf};

use tracing::debug;

use invex_core::models::config::InvexConfig;
use invex_core::store::AppendOutcome;

/// Per-user configuration file.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("invex")
        .join("config.json")
}

/// The file commands read and write: `--config` if given, else the per-user file.
pub fn config_path(explicit: Option<&str>) -> PathBuf {
    explicit.map(PathBuf::from).unwrap_or_else(default_config_path)
}

/// Load configuration. An explicit path must exist; the per-user file is optional.
pub fn load_config(explicit: Option<&str>) -> anyhow::Result<InvexConfig> {
    if let Some(path) = explicit {
        return read_config(Path::new(path));
    }
    let path = default_config_path();
    if path.exists() {
        read_config(&path)
    } else {
        debug!("No config file at {}, using defaults", path.display());
        Ok(InvexConfig::default())
    }
}

fn read_config(path: &Path) -> anyhow::Result<InvexConfig> {
    debug!("Loading config from {}", path.display());
    InvexConfig::from_file(path)
        .map_err(|e| anyhow::anyhow!("Failed to read config {}: {}", path.display(), e))
}

/// One-line summary of a save for the terminal and the web shell.
pub fn describe_save(outcome: &AppendOutcome) -> String {
    if outcome.created {
        format!("Created {} with the first record", outcome.path.display())
    } else {
        format!("Saved to {} ({} rows)", outcome.path.display(), outcome.rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_describe_save() {
        let mut outcome = AppendOutcome {
            path: PathBuf::from("out/invoice_data.xlsx"),
            rows: 1,
            created: true,
        };
        assert_eq!(describe_save(&outcome), "Created out/invoice_data.xlsx with the first record");

        outcome.rows = 4;
        outcome.created = false;
        assert_eq!(describe_save(&outcome), "Saved to out/invoice_data.xlsx (4 rows)");
    }
}
