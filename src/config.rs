// =============================================================================
// CONFIGURATION - Load settings from config.toml
// =============================================================================
//
// Shader locations, retranslation policy, descriptor budgets and debug
// switches. Every field has a default, so a missing or partial file works.

use crate::cache::RetranslatePolicy;
use crate::descriptor_pool::{
    DescriptorPoolSpec, MAX_DESC_IMAGE_SAMPLERS, MAX_DESC_SETS, MAX_DESC_UNIFORM_BUFFERS, NUM_FRAME_DATA,
};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub shaders: ShaderConfig,
    pub graphics: GraphicsConfig,
    pub debug: DebugConfig,
}

/// Shader source and output locations
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ShaderConfig {
    /// Directory holding `renderprogs/*.hlsl`
    pub source_root: PathBuf,
    /// Directory that receives stripped, translated and manifest output
    pub save_root: PathBuf,
    pub retranslate: RetranslatePolicy,
    /// Retranslate even when the policy would reuse cached output
    pub force_export: bool,
    /// Compiler used by the Vulkan backend
    pub glslc: String,
}

impl Default for ShaderConfig {
    fn default() -> Self {
        Self {
            source_root: PathBuf::from("."),
            save_root: PathBuf::from("."),
            retranslate: RetranslatePolicy::Always,
            force_export: false,
            glslc: "glslc".to_string(),
        }
    }
}

/// Graphics settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GraphicsConfig {
    pub max_frames_in_flight: usize,
    pub max_uniform_buffers: u32,
    pub max_image_samplers: u32,
    pub max_descriptor_sets: u32,
    /// Bytes of uniform storage per frame in flight
    pub uniform_ring_size: u64,
}

impl Default for GraphicsConfig {
    fn default() -> Self {
        Self {
            max_frames_in_flight: NUM_FRAME_DATA,
            max_uniform_buffers: MAX_DESC_UNIFORM_BUFFERS,
            max_image_samplers: MAX_DESC_IMAGE_SAMPLERS,
            max_descriptor_sets: MAX_DESC_SETS,
            uniform_ring_size: 1024 * 1024,
        }
    }
}

/// Debug settings
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    pub validation_layers: bool,
    pub log_level: String,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            validation_layers: true,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Missing file yields defaults; unreadable or malformed file is an error
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            log::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        log::info!("Loaded configuration from {:?}", path);
        log::debug!("Config: {:?}", config);

        Ok(config)
    }

    pub fn descriptor_pool_spec(&self) -> DescriptorPoolSpec {
        DescriptorPoolSpec {
            max_uniform_buffers: self.graphics.max_uniform_buffers,
            max_image_samplers: self.graphics.max_image_samplers,
            max_sets: self.graphics.max_descriptor_sets,
        }
    }

    /// Log filter from `debug.log_level`
    pub fn log_level(&self) -> log::LevelFilter {
        match self.debug.log_level.to_lowercase().as_str() {
            "off" => log::LevelFilter::Off,
            "error" => log::LevelFilter::Error,
            "warn" => log::LevelFilter::Warn,
            "info" => log::LevelFilter::Info,
            "debug" => log::LevelFilter::Debug,
            "trace" => log::LevelFilter::Trace,
            _ => {
                log::warn!("Unknown log level '{}', defaulting to info", self.debug.log_level);
                log::LevelFilter::Info
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_pool_constants() {
        let config = Config::default();
        assert_eq!(config.graphics.max_frames_in_flight, 2);
        assert_eq!(config.descriptor_pool_spec(), DescriptorPoolSpec::default());
        assert_eq!(config.shaders.retranslate, RetranslatePolicy::Always);
    }

    #[test]
    fn test_partial_file() {
        let config: Config = toml::from_str(
            "[shaders]\nretranslate = \"when_stale\"\nsave_root = \"out\"\n\n[debug]\nlog_level = \"trace\"\n",
        )
        .unwrap();
        assert_eq!(config.shaders.retranslate, RetranslatePolicy::WhenStale);
        assert_eq!(config.shaders.save_root, PathBuf::from("out"));
        assert_eq!(config.shaders.glslc, "glslc");
        assert_eq!(config.log_level(), log::LevelFilter::Trace);
        assert_eq!(config.graphics.max_descriptor_sets, 16384);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = Config::load_from_path("definitely/not/here.toml").unwrap();
        assert_eq!(config.graphics.uniform_ring_size, 1024 * 1024);
    }
}
