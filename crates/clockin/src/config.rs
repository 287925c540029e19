//! Configuration management for clockin.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;

use chrono::format::{Item, StrftimeItems};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::stamp::GLYPH_SIZE;

/// Prefix of environment overrides.
const ENV_PREFIX: &str = "CLOCKIN_";

/// Environment key of the gallery passcode, after the prefix.
const PASSCODE_ENV_KEY: &str = "GALLERY__PASSCODE";

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "clockin";

/// Default image directory name inside the data directory.
const IMAGES_DIR_NAME: &str = "images";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `CLOCKIN_`)
/// 2. TOML config file at `~/.config/clockin/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Image store configuration.
    pub store: StoreConfig,
    /// Stamping configuration.
    pub stamp: StampConfig,
    /// Photo library export configuration.
    pub library: LibraryConfig,
    /// Gallery access configuration.
    pub gallery: GalleryConfig,
}

/// Image store configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding the stamped photos.
    /// Defaults to `~/.local/share/clockin/images`
    pub directory: Option<PathBuf>,
    /// JPEG quality, 1 to 100.
    pub jpeg_quality: u8,
    /// Write a JSON capture record next to every stamped photo.
    pub write_records: bool,
    /// Keep at most this many photos after each capture.
    /// Set to 0 for unlimited.
    pub max_images: usize,
}

/// Stamping configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StampConfig {
    /// Width of the bounding box photos are scaled into.
    pub max_width: u32,
    /// Height of the bounding box photos are scaled into.
    pub max_height: u32,
    /// Glyph scale of the `IN`/`Out` label (1 = 8 pixels tall).
    pub label_scale: u32,
    /// Glyph scale of the timestamp.
    pub timestamp_scale: u32,
    /// `chrono` strftime format of the timestamp, rendered in local time.
    pub timestamp_format: String,
}

/// Photo library configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Directory that receives a copy of every stamped photo.
    /// When unset, exports are skipped.
    pub export_directory: Option<PathBuf>,
}

/// Gallery access configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GalleryConfig {
    /// Numeric code required to browse or delete photos.
    pub passcode: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            directory: None, // Resolved to the data directory at runtime
            jpeg_quality: 100,
            write_records: true,
            max_images: 0,
        }
    }
}

impl Default for StampConfig {
    fn default() -> Self {
        Self {
            max_width: 800,
            max_height: 800,
            label_scale: 6,
            timestamp_scale: 3,
            timestamp_format: "%H:%M %p, %d-%m-%Y".to_string(),
        }
    }
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            passcode: "1234".to_string(),
        }
    }
}

impl Config {
    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let mut figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file).nested())
            .merge(
                Env::prefixed(ENV_PREFIX)
                    .ignore(&[PASSCODE_ENV_KEY])
                    .split("__"),
            );

        // Env values are parsed, so "0000" would arrive as an integer.
        if let Ok(code) = std::env::var(format!("{ENV_PREFIX}{PASSCODE_ENV_KEY}")) {
            figment = figment.merge(Serialized::default("gallery.passcode", code));
        }

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.store.jpeg_quality) {
            return Err(invalid(format!(
                "jpeg_quality must be between 1 and 100, got {}",
                self.store.jpeg_quality
            )));
        }

        if self.stamp.max_width == 0 || self.stamp.max_height == 0 {
            return Err(invalid(format!(
                "stamp bounding box must be non-empty, got {}x{}",
                self.stamp.max_width, self.stamp.max_height
            )));
        }

        if self.stamp.label_scale == 0 || self.stamp.timestamp_scale == 0 {
            return Err(invalid("label_scale and timestamp_scale must be greater than 0"));
        }

        let max_scale = self.stamp.max_width.max(self.stamp.max_height) / GLYPH_SIZE;
        if self.stamp.label_scale > max_scale || self.stamp.timestamp_scale > max_scale {
            return Err(invalid(format!(
                "label_scale and timestamp_scale must be at most {max_scale} for a {}x{} bounding box",
                self.stamp.max_width, self.stamp.max_height
            )));
        }

        if StrftimeItems::new(&self.stamp.timestamp_format).any(|item| matches!(item, Item::Error)) {
            return Err(invalid(format!(
                "invalid timestamp_format: {}",
                self.stamp.timestamp_format
            )));
        }

        let passcode = &self.gallery.passcode;
        if passcode.is_empty() || !passcode.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("gallery passcode must be one or more digits"));
        }

        Ok(())
    }

    /// Get the image directory, resolving defaults if not set.
    #[must_use]
    pub fn image_directory(&self) -> PathBuf {
        self.store
            .directory
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(IMAGES_DIR_NAME))
    }

    /// Get the retention limit, if any.
    #[must_use]
    pub fn max_images(&self) -> Option<usize> {
        match self.store.max_images {
            0 => None,
            n => Some(n),
        }
    }
}

fn invalid(message: impl Into<String>) -> Error {
    Error::ConfigValidation {
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.store.jpeg_quality, 100);
        assert!(config.store.write_records);
        assert_eq!(config.stamp.max_width, 800);
        assert_eq!(config.stamp.max_height, 800);
        assert!(config.library.export_directory.is_none());
        assert_eq!(config.gallery.passcode, "1234");
    }

    #[test]
    fn test_default_stamp_config() {
        let stamp = StampConfig::default();

        assert_eq!(stamp.label_scale, 6);
        assert_eq!(stamp.timestamp_scale, 3);
        assert!(stamp.label_scale > stamp.timestamp_scale);
        assert!(stamp.timestamp_format.contains("%H:%M"));
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_quality_out_of_range() {
        let mut config = Config::default();
        config.store.jpeg_quality = 0;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("jpeg_quality"));

        config.store.jpeg_quality = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_empty_bounding_box() {
        let mut config = Config::default();
        config.stamp.max_height = 0;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("bounding box"));
    }

    #[test]
    fn test_validate_zero_scale() {
        let mut config = Config::default();
        config.stamp.timestamp_scale = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_bad_timestamp_format() {
        let mut config = Config::default();
        config.stamp.timestamp_format = "%H:%Q".to_string();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("timestamp_format"));
    }

    #[test]
    fn test_validate_non_numeric_passcode() {
        let mut config = Config::default();
        config.gallery.passcode = "abcd".to_string();
        assert!(config.validate().is_err());

        config.gallery.passcode = String::new();
        assert!(config.validate().is_err());

        config.gallery.passcode = "0000".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_image_directory_default() {
        let path = Config::default().image_directory();
        assert!(path.ends_with("clockin/images"));
    }

    #[test]
    fn test_image_directory_custom() {
        let mut config = Config::default();
        config.store.directory = Some(PathBuf::from("/srv/attendance"));
        assert_eq!(config.image_directory(), PathBuf::from("/srv/attendance"));
    }

    #[test]
    fn test_max_images() {
        let mut config = Config::default();
        assert_eq!(config.max_images(), None);

        config.store.max_images = 50;
        assert_eq!(config.max_images(), Some(50));
    }

    #[test]
    fn test_default_config_path() {
        let path = Config::default_config_path();
        assert!(path.ends_with("clockin/config.toml"));
    }

    #[test]
    fn test_load_nonexistent_config() {
        Jail::expect_with(|_jail| {
            let config = Config::load_from(Some(PathBuf::from("/nonexistent/config.toml"))).unwrap();
            assert_eq!(config, Config::default());
            Ok(())
        });
    }

    #[test]
    fn test_load_from_toml_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                "[store]\njpeg_quality = 85\nmax_images = 10\n\n[gallery]\npasscode = \"9876\"\n",
            )?;

            let config = Config::load_from(Some(jail.directory().join("config.toml"))).unwrap();
            assert_eq!(config.store.jpeg_quality, 85);
            assert_eq!(config.store.max_images, 10);
            assert_eq!(config.gallery.passcode, "9876");
            assert_eq!(config.stamp, StampConfig::default());
            Ok(())
        });
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", "[stamp]\nlabel_scale = 0\n")?;

            let err = Config::load_from(Some(jail.directory().join("config.toml"))).unwrap_err();
            assert!(matches!(err, Error::ConfigValidation { .. }));
            Ok(())
        });
    }

    #[test]
    fn test_env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", "[store]\njpeg_quality = 85\n")?;
            jail.set_env("CLOCKIN_STORE__JPEG_QUALITY", "70");

            let config = Config::load_from(Some(jail.directory().join("config.toml"))).unwrap();
            assert_eq!(config.store.jpeg_quality, 70);
            Ok(())
        });
    }

    #[test]
    fn test_env_passcode_keeps_leading_zeros() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", "[gallery]\npasscode = \"9876\"\n")?;
            jail.set_env("CLOCKIN_GALLERY__PASSCODE", "0042");

            let config = Config::load_from(Some(jail.directory().join("config.toml"))).unwrap();
            assert_eq!(config.gallery.passcode, "0042");
            Ok(())
        });
    }

    #[test]
    fn test_validate_scale_too_large() {
        let mut config = Config::default();
        config.stamp.label_scale = 100_000;
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("at most 100"));

        config.stamp.label_scale = 100;
        assert!(config.validate().is_ok());

        config.stamp.max_width = 80;
        config.stamp.max_height = 40;
        config.stamp.label_scale = 6;
        config.stamp.timestamp_scale = 11;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_store_config_deserialize() {
        let json = r#"{"jpeg_quality": 90, "write_records": false}"#;
        let store: StoreConfig = serde_json::from_str(json).unwrap();
        assert_eq!(store.jpeg_quality, 90);
        assert!(!store.write_records);
        assert_eq!(store.max_images, 0);
    }

    #[test]
    fn test_config_serialize() {
        let json = serde_json::to_string(&Config::default()).unwrap();
        assert!(json.contains("timestamp_format"));
        assert!(json.contains("export_directory"));
    }
}
