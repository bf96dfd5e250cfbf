use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::command::{CookieSource, FormatPreset};
use crate::error::Result;

/// Default maximum log lines kept per download
pub const DEFAULT_MAX_LOG_LINES: usize = 10000;

fn default_download_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn default_max_log_lines() -> usize {
    DEFAULT_MAX_LOG_LINES
}

/// Persisted user settings
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Settings {
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,
    #[serde(default)]
    pub format: FormatPreset,
    #[serde(default)]
    pub cookie_source: CookieSource,
    #[serde(default = "default_max_log_lines")]
    pub max_log_lines: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            format: FormatPreset::default(),
            cookie_source: CookieSource::default(),
            max_log_lines: DEFAULT_MAX_LOG_LINES,
        }
    }
}

/// Load settings, honoring the VIDGRAB_CONFIG_PATH override
pub fn load_settings() -> Result<Settings> {
    let settings = if let Ok(config_path) = std::env::var("VIDGRAB_CONFIG_PATH") {
        confy::load_path(&config_path)?
    } else {
        confy::load("vidgrab", "config")?
    };
    Ok(settings)
}

/// Load settings, falling back to defaults on any error
pub fn load_settings_or_default() -> Settings {
    match load_settings() {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!(error = %e, "failed to load config, using defaults");
            Settings::default()
        }
    }
}

/// Persist settings to the same location they were loaded from
pub fn store_settings(settings: &Settings) -> Result<()> {
    if let Ok(config_path) = std::env::var("VIDGRAB_CONFIG_PATH") {
        confy::store_path(&config_path, settings)?;
    } else {
        confy::store("vidgrab", "config", settings)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_default_has_sane_values() {
        let settings = Settings::default();

        assert_eq!(settings.format, FormatPreset::BestMp4);
        assert_eq!(settings.cookie_source, CookieSource::File);
        assert_eq!(settings.max_log_lines, DEFAULT_MAX_LOG_LINES);
        assert!(!settings.download_dir.as_os_str().is_empty());
    }

    #[test]
    fn settings_roundtrip_through_toml() {
        let settings = Settings {
            download_dir: PathBuf::from("/tmp/videos"),
            format: FormatPreset::AudioMp3,
            cookie_source: CookieSource::Browser("firefox".into()),
            max_log_lines: 500,
        };

        let serialized = toml::to_string(&settings).unwrap();
        let parsed: Settings = toml::from_str(&serialized).unwrap();

        assert_eq!(parsed.download_dir, settings.download_dir);
        assert_eq!(parsed.format, settings.format);
        assert_eq!(parsed.cookie_source, settings.cookie_source);
        assert_eq!(parsed.max_log_lines, settings.max_log_lines);
    }

    #[test]
    fn settings_missing_fields_fill_with_defaults() {
        let parsed: Settings = toml::from_str("max_log_lines = 42\n").unwrap();

        assert_eq!(parsed.max_log_lines, 42);
        assert_eq!(parsed.format, FormatPreset::BestMp4);
        assert_eq!(parsed.cookie_source, CookieSource::File);
    }
}
