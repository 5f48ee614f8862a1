//! User settings (`SPEC_FULL.md` §6): a small YAML-backed configuration
//! struct loaded once at process start, mirroring `original_source/codeon/settings.py`'s
//! self-bootstrapping `user_settings_path`.
//!
//! Unlike the source, which injects loaded settings into module-level
//! globals, this crate returns one immutable [`Settings`] value that the
//! CLI threads into every other crate via `Context` (`spec.md` §9 Design
//! Notes: "Global mutable settings").

use crengine_error::{CrError, CrResult};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

const SETTINGS_FILE_NAME: &str = "settings.yml";
const DEFAULT_MODEL_IP: &str = "127.0.0.1";
const DEFAULT_MODEL_PORT: u16 = 9005;

/// Process-wide configuration, loaded once from `~/.<package_name>/settings.yml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub package_name: String,
    #[serde(default = "default_model_ip")]
    pub model_ip: String,
    #[serde(default = "default_model_port")]
    pub model_default_port: u16,
}

fn default_model_ip() -> String {
    DEFAULT_MODEL_IP.to_string()
}

fn default_model_port() -> u16 {
    DEFAULT_MODEL_PORT
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            package_name: "crengine".to_string(),
            model_ip: default_model_ip(),
            model_default_port: default_model_port(),
        }
    }
}

impl Settings {
    /// `http://{model_ip}:{model_default_port}`, the oracle endpoint
    /// (`spec.md` §6's "single environment override").
    pub fn oracle_endpoint(&self) -> String {
        format!("http://{}:{}", self.model_ip, self.model_default_port)
    }

    /// The per-user resources directory this package's on-disk artifacts
    /// live under: `~/.<package_name>`.
    pub fn resources_dir(&self) -> CrResult<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| {
            CrError::io(PathBuf::from("~"), std::io::Error::other("no home directory"))
        })?;
        Ok(home.join(format!(".{}", self.package_name)))
    }

    /// Loads settings from `<resources_dir>/settings.yml`, bootstrapping the
    /// file with defaults (an atomic temp-file + rename write) if it does
    /// not yet exist — mirroring `settings.py`'s self-bootstrap on import.
    pub fn load(package_name: &str) -> CrResult<Settings> {
        let home = dirs::home_dir().ok_or_else(|| {
            CrError::io(PathBuf::from("~"), std::io::Error::other("no home directory"))
        })?;
        let resources_dir = home.join(format!(".{package_name}"));
        Self::load_from(&resources_dir, package_name)
    }

    /// Same as [`Settings::load`] but rooted at an explicit directory,
    /// exercised directly by tests to avoid touching the real home dir.
    pub fn load_from(resources_dir: &Path, package_name: &str) -> CrResult<Settings> {
        std::fs::create_dir_all(resources_dir).map_err(|e| CrError::io(resources_dir, e))?;
        let path = resources_dir.join(SETTINGS_FILE_NAME);
        if !path.exists() {
            let defaults = Settings { package_name: package_name.to_string(), ..Settings::default() };
            write_atomic(&path, &defaults)?;
            return Ok(defaults);
        }
        let text = std::fs::read_to_string(&path).map_err(|e| CrError::io(&path, e))?;
        let settings: Settings = serde_yaml::from_str(&text)
            .map_err(|e| CrError::parse(&path, format!("invalid settings.yml: {e}")))?;
        Ok(settings)
    }
}

fn write_atomic(path: &Path, settings: &Settings) -> CrResult<()> {
    let yaml = serde_yaml::to_string(settings)
        .map_err(|e| CrError::parse(path, format!("failed to serialize settings: {e}")))?;
    let tmp_path = path.with_extension("yml.tmp");
    {
        let mut tmp = std::fs::File::create(&tmp_path).map_err(|e| CrError::io(&tmp_path, e))?;
        tmp.write_all(yaml.as_bytes()).map_err(|e| CrError::io(&tmp_path, e))?;
    }
    std::fs::rename(&tmp_path, path).map_err(|e| CrError::io(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bootstraps_defaults_on_first_load() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(dir.path(), "crengine").unwrap();
        assert_eq!(settings.package_name, "crengine");
        assert_eq!(settings.model_ip, DEFAULT_MODEL_IP);
        assert_eq!(settings.model_default_port, DEFAULT_MODEL_PORT);
        assert!(dir.path().join("settings.yml").exists());
    }

    #[test]
    fn reloads_a_persisted_override() {
        let dir = tempfile::tempdir().unwrap();
        let _ = Settings::load_from(dir.path(), "crengine").unwrap();
        std::fs::write(dir.path().join("settings.yml"), "package_name: crengine\nmodel_ip: 10.0.0.5\nmodel_default_port: 9100\n").unwrap();
        let settings = Settings::load_from(dir.path(), "crengine").unwrap();
        assert_eq!(settings.model_ip, "10.0.0.5");
        assert_eq!(settings.model_default_port, 9100);
    }

    #[test]
    fn oracle_endpoint_formats_host_and_port() {
        let settings = Settings::default();
        assert_eq!(settings.oracle_endpoint(), "http://127.0.0.1:9005");
    }

    #[test]
    fn rejects_malformed_yaml() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("settings.yml"), "not: [valid: yaml").unwrap();
        assert!(Settings::load_from(dir.path(), "crengine").is_err());
    }
}
