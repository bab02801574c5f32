use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{env_subst::substitute_env, schema::CourierConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "courier.toml",
    "courier.yaml",
    "courier.yml",
    "courier.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<CourierConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    parse_config(&substitute_env(&raw), path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./courier.{toml,yaml,yml,json}` (project-local)
/// 2. `<user config dir>/courier/courier.{toml,yaml,yml,json}`
///
/// Returns `CourierConfig::default()` if no config file is found or the one
/// found cannot be parsed.
pub fn discover_and_load() -> CourierConfig {
    let Some(path) = find_config_file() else {
        debug!("no config file found, using defaults");
        return CourierConfig::default();
    };
    debug!(path = %path.display(), "loading config");
    load_config(&path).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
        CourierConfig::default()
    })
}

/// Find the first config file in standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    let local = CONFIG_FILENAMES.iter().map(PathBuf::from);
    let global = config_dir()
        .into_iter()
        .flat_map(|dir| CONFIG_FILENAMES.iter().map(move |name| dir.join(name)));
    local.chain(global).find(|p| p.exists())
}

/// Returns the user-global config directory (e.g. `~/.config/courier/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "courier").map(|d| d.config_dir().to_path_buf())
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<CourierConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn loads_each_format() {
        let dir = tempfile::tempdir().unwrap();

        let toml_path = dir.path().join("courier.toml");
        std::fs::write(&toml_path, "prefix = \"#\"\n[pacing]\nmin_ms = 0\nmax_ms = 10\n").unwrap();
        let cfg = load_config(&toml_path).unwrap();
        assert_eq!(cfg.prefix, "#");
        assert_eq!(cfg.pacing.max_ms, 10);

        let yaml_path = dir.path().join("courier.yaml");
        std::fs::write(&yaml_path, "access:\n  admin_only: true\n  admin_allowlist: [\"7\"]\n")
            .unwrap();
        let cfg = load_config(&yaml_path).unwrap();
        assert!(cfg.access.admin_only);
        assert_eq!(cfg.access.admin_allowlist, vec!["7"]);

        let json_path = dir.path().join("courier.json");
        std::fs::write(&json_path, r#"{"logging": {"message_objects": true}}"#).unwrap();
        let cfg = load_config(&json_path).unwrap();
        assert!(cfg.logging.message_objects);
    }

    #[test]
    fn rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("courier.ini");
        std::fs::write(&path, "prefix=!").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("unsupported config format"));
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(&dir.path().join("absent.toml")).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }
}
