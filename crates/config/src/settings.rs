// Settings file: where the source folders live, where reports go, which
// markets exist. Every field has a default so an absent file is valid.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Project-local settings file, looked up in the working directory.
pub const LOCAL_FILE: &str = "sourcematrix.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings in {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("invalid settings: {0}")]
    Invalid(String),

    #[error("invalid date '{0}': expected DDMM (e.g. 2302)")]
    InvalidDate(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Folder holding CT/, JEEVES/ and STIBO/.
    pub data_root: PathBuf,
    /// Reports are written under `{output_dir}/{date}/`.
    pub output_dir: PathBuf,
    /// DDMM snapshot used when no date is given.
    pub default_date: String,
    /// Market names as they appear in CT file names and report names.
    pub markets: Vec<String>,
    /// Optional TOML source catalog replacing the built-in one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("."),
            output_dir: PathBuf::from("output"),
            default_date: "2302".to_string(),
            markets: vec!["Ekofisk".into(), "Fresh".into(), "Classic".into()],
            catalog: None,
        }
    }
}

/// Settings plus the file they came from (`None` = built-in defaults).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedSettings {
    pub settings: Settings,
    pub origin: Option<PathBuf>,
}

impl Settings {
    /// User-level settings file.
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("sourcematrix").join("settings.toml"))
    }

    /// Load settings. An explicit path must exist; otherwise the local file,
    /// then the user file, then defaults.
    pub fn load(explicit: Option<&Path>) -> Result<LoadedSettings, ConfigError> {
        if let Some(path) = explicit {
            return Self::load_file(path);
        }

        let candidates = [Some(PathBuf::from(LOCAL_FILE)), Self::config_path()];
        for path in candidates.into_iter().flatten() {
            if path.is_file() {
                return Self::load_file(&path);
            }
        }

        log::debug!("no settings file found, using defaults");
        Ok(LoadedSettings {
            settings: Self::default(),
            origin: None,
        })
    }

    pub fn load_file(path: &Path) -> Result<LoadedSettings, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::from_toml(&contents).map_err(|e| match e {
            ConfigError::Invalid(message) | ConfigError::InvalidDate(message) => ConfigError::Parse {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })?;
        log::debug!("settings loaded from {}", path.display());
        Ok(LoadedSettings {
            settings,
            origin: Some(path.to_path_buf()),
        })
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let settings: Settings = toml::from_str(contents).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_date(&self.default_date)
            .map_err(|_| ConfigError::Invalid(format!("default_date '{}' is not DDMM", self.default_date)))?;

        if self.markets.is_empty() {
            return Err(ConfigError::Invalid("markets must not be empty".into()));
        }
        for (i, market) in self.markets.iter().enumerate() {
            if market.trim().is_empty() {
                return Err(ConfigError::Invalid("market names must not be blank".into()));
            }
            if self.markets[..i].iter().any(|m| m.eq_ignore_ascii_case(market)) {
                return Err(ConfigError::Invalid(format!("market '{market}' listed twice")));
            }
        }
        Ok(())
    }

    /// Configured spelling of a market, matched case-insensitively.
    pub fn market(&self, name: &str) -> Option<&str> {
        self.markets
            .iter()
            .find(|m| m.eq_ignore_ascii_case(name.trim()))
            .map(String::as_str)
    }
}

/// Check a DDMM date token: four digits, day 01-31, month 01-12.
pub fn validate_date(token: &str) -> Result<(), ConfigError> {
    let invalid = || ConfigError::InvalidDate(token.to_string());
    if token.len() != 4 || !token.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let day: u32 = token[..2].parse().map_err(|_| invalid())?;
    let month: u32 = token[2..].parse().map_err(|_| invalid())?;
    if !(1..=31).contains(&day) || !(1..=12).contains(&month) {
        return Err(invalid());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults() {
        let s = Settings::default();
        assert_eq!(s.data_root, PathBuf::from("."));
        assert_eq!(s.output_dir, PathBuf::from("output"));
        assert_eq!(s.default_date, "2302");
        assert_eq!(s.markets, ["Ekofisk", "Fresh", "Classic"]);
        assert!(s.catalog.is_none());
        assert!(s.validate().is_ok());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let s = Settings::from_toml("data_root = \"/srv/recon\"\ndefault_date = \"0103\"\n").unwrap();
        assert_eq!(s.data_root, PathBuf::from("/srv/recon"));
        assert_eq!(s.default_date, "0103");
        assert_eq!(s.output_dir, PathBuf::from("output"));
        assert_eq!(s.markets.len(), 3);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(Settings::from_toml("default_date = \"3202\"").is_err());
        assert!(Settings::from_toml("markets = []").is_err());
        assert!(Settings::from_toml("markets = [\"Fresh\", \"fresh\"]").is_err());
        assert!(Settings::from_toml("markets = \"Fresh\"").is_err());
        assert!(Settings::from_toml("unknown_key = 1").is_ok());
    }

    #[test]
    fn market_lookup_is_case_insensitive() {
        let s = Settings::default();
        assert_eq!(s.market("ekofisk"), Some("Ekofisk"));
        assert_eq!(s.market(" CLASSIC "), Some("Classic"));
        assert_eq!(s.market("Nordic"), None);
    }

    #[test]
    fn date_tokens() {
        for ok in ["2302", "0101", "3112"] {
            assert!(validate_date(ok).is_ok(), "{ok}");
        }
        for bad in ["", "232", "23022", "0013", "0012x", "3200", "00 1", "ab12"] {
            assert!(validate_date(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn explicit_file_is_loaded_or_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(&path, "output_dir = \"reports\"\nmarkets = [\"Fresh\"]\n").unwrap();

        let loaded = Settings::load(Some(&path)).unwrap();
        assert_eq!(loaded.origin.as_deref(), Some(path.as_path()));
        assert_eq!(loaded.settings.output_dir, PathBuf::from("reports"));
        assert_eq!(loaded.settings.markets, ["Fresh"]);

        let missing = Settings::load(Some(&dir.path().join("nope.toml")));
        assert!(matches!(missing, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn parse_errors_name_the_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        fs::write(&path, "default_date = 2302\n").unwrap();

        match Settings::load_file(&path).unwrap_err() {
            ConfigError::Parse { path: p, .. } => assert_eq!(p, path),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
