//! Runtime configuration.
//!
//! [`Config::default`] matches the course layout (`shaders/`, `assets/models/`,
//! `assets/textures/`). [`Config::from_env`] applies `COURSE_*` overrides on top.

use std::path::PathBuf;

use crate::error::{Error, Result};

/// Window creation parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Vulkan course".to_string(),
            width: 1366,
            height: 768,
        }
    }
}

/// Renderer and application configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub window: WindowConfig,
    /// Enable `VK_LAYER_KHRONOS_validation` and the debug messenger.
    pub validation: bool,
    /// Directory holding the compiled `*.spv` shader binaries.
    pub shader_dir: PathBuf,
    pub model_dir: PathBuf,
    pub texture_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            window: WindowConfig::default(),
            validation: cfg!(debug_assertions),
            shader_dir: PathBuf::from("shaders"),
            model_dir: PathBuf::from("assets/models"),
            texture_dir: PathBuf::from("assets/textures"),
        }
    }
}

impl Config {
    /// Defaults overridden by `COURSE_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when a variable is present but malformed.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each `COURSE_*` key.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(value) = lookup("COURSE_VALIDATION") {
            config.validation = parse_bool("COURSE_VALIDATION", &value)?;
        }
        if let Some(dir) = lookup("COURSE_SHADER_DIR") {
            config.shader_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("COURSE_ASSET_DIR") {
            let root = PathBuf::from(dir);
            config.model_dir = root.join("models");
            config.texture_dir = root.join("textures");
        }
        if let Some(value) = lookup("COURSE_WINDOW_WIDTH") {
            config.window.width = parse_dimension("COURSE_WINDOW_WIDTH", &value)?;
        }
        if let Some(value) = lookup("COURSE_WINDOW_HEIGHT") {
            config.window.height = parse_dimension("COURSE_WINDOW_HEIGHT", &value)?;
        }

        Ok(config)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        other => Err(Error::Config(format!("{key}: expected a boolean, got '{other}'"))),
    }
}

fn parse_dimension(key: &str, value: &str) -> Result<u32> {
    match value.trim().parse::<u32>() {
        Ok(0) => Err(Error::Config(format!("{key}: dimension must be non-zero"))),
        Ok(v) => Ok(v),
        Err(e) => Err(Error::Config(format!("{key}: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_overrides() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.window.width, 1366);
        assert_eq!(config.window.height, 768);
        assert_eq!(config.shader_dir, PathBuf::from("shaders"));
    }

    #[test]
    fn test_asset_dir_sets_model_and_texture_dirs() {
        let config = Config::from_lookup(lookup_from(&[("COURSE_ASSET_DIR", "/data")])).unwrap();
        assert_eq!(config.model_dir, PathBuf::from("/data/models"));
        assert_eq!(config.texture_dir, PathBuf::from("/data/textures"));
    }

    #[test]
    fn test_validation_override() {
        let on = Config::from_lookup(lookup_from(&[("COURSE_VALIDATION", "TRUE")])).unwrap();
        assert!(on.validation);
        let off = Config::from_lookup(lookup_from(&[("COURSE_VALIDATION", "0")])).unwrap();
        assert!(!off.validation);
    }

    #[test]
    fn test_malformed_values_are_config_errors() {
        let bad_bool = Config::from_lookup(lookup_from(&[("COURSE_VALIDATION", "maybe")]));
        assert!(matches!(bad_bool, Err(Error::Config(_))));

        let bad_width = Config::from_lookup(lookup_from(&[("COURSE_WINDOW_WIDTH", "wide")]));
        assert!(matches!(bad_width, Err(Error::Config(_))));

        let zero_height = Config::from_lookup(lookup_from(&[("COURSE_WINDOW_HEIGHT", "0")]));
        assert!(matches!(zero_height, Err(Error::Config(_))));
    }
}
