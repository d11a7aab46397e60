// Shader source cache
//
// Resolves a shader's logical name to its source and output paths, decides
// whether the translated output has to be regenerated, and writes fresh
// output back through the storage provider (best effort).

use crate::error::{RenderProgError, Result};
use crate::params::{ShaderFeatures, ShaderStage};
use crate::storage::AssetStorage;
use crate::transpile::{convert_to_glsl, strip_dead_code, Translation};
use serde::Deserialize;
use std::time::SystemTime;

/// When to regenerate translated output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetranslatePolicy {
    /// Translate on every load
    #[default]
    Always,
    /// Reuse cached output unless it is missing or older than the source
    WhenStale,
}

/// Storage paths derived from a shader's logical name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderPaths {
    pub source: String,
    pub stripped: String,
    pub translated: String,
    pub layout: String,
}

impl ShaderPaths {
    pub fn derive(name: &str, suffix: &str, stage: ShaderStage) -> Self {
        let base = strip_extension(name);
        let source_ext = stage.source_suffix();
        let target_ext = stage.target_extension();
        let translated = format!("renderprogs/vkglsl/{base}{suffix}.{target_ext}");
        Self {
            source: format!("renderprogs/{base}.{source_ext}.hlsl"),
            stripped: format!("renderprogs/hlsl/{base}{suffix}.{source_ext}.hlsl"),
            layout: format!("{translated}.layout"),
            translated,
        }
    }
}

pub fn strip_extension(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((base, _)) if !base.is_empty() && !base.ends_with('/') => base,
        _ => name,
    }
}

/// Identity of one shader variant
#[derive(Debug, Clone, Copy)]
pub struct ShaderKey<'a> {
    pub name: &'a str,
    pub suffix: &'a str,
    pub stage: ShaderStage,
    pub features: ShaderFeatures,
    pub builtin: bool,
}

pub struct ShaderCache {
    storage: Box<dyn AssetStorage>,
    policy: RetranslatePolicy,
    force: bool,
}

impl ShaderCache {
    pub fn new(storage: Box<dyn AssetStorage>, policy: RetranslatePolicy) -> Self {
        Self {
            storage,
            policy,
            force: false,
        }
    }

    /// Retranslate regardless of policy
    pub fn set_force(&mut self, force: bool) {
        self.force = force;
    }

    pub fn policy(&self) -> RetranslatePolicy {
        self.policy
    }

    pub fn storage(&self) -> &dyn AssetStorage {
        self.storage.as_ref()
    }

    /// Produce the translated source and manifest text for `key`.
    ///
    /// Returns `Ok(None)` when the source or its translation is empty.
    pub fn translate(&self, key: &ShaderKey<'_>) -> Result<Option<Translation>> {
        let paths = ShaderPaths::derive(key.name, key.suffix, key.stage);

        if self.policy == RetranslatePolicy::WhenStale && !self.force {
            let source_time = self.storage.timestamp(&paths.source);
            if let Some(cached) = self.read_cached(&paths, source_time) {
                log::debug!("Using cached {}", paths.translated);
                return Ok(Some(cached));
            }
        }

        let source = self.read_source(&paths.source)?;
        if source.is_empty() {
            log::warn!("{} is empty, skipping", paths.source);
            return Ok(None);
        }

        let macros = key.features.macro_names();
        let stripped = strip_dead_code(&source, &paths.source, &macros, key.builtin);
        let translation = convert_to_glsl(&stripped, &paths.source, key.stage);
        if translation.is_empty() {
            log::warn!("{} translated to nothing, skipping", paths.source);
            return Ok(None);
        }

        self.persist(&paths.stripped, &stripped);
        self.persist(&paths.translated, &translation.source);
        self.persist(&paths.layout, &translation.manifest);

        Ok(Some(translation))
    }

    /// Cached output, if present and not older than the source. A source that
    /// only exists embedded has no timestamp and never invalidates the cache.
    fn read_cached(&self, paths: &ShaderPaths, source_time: Option<SystemTime>) -> Option<Translation> {
        let translated = self.storage.read(&paths.translated)?;
        if source_time.is_some_and(|source| source > translated.modified) {
            log::debug!("{} is newer than {}", paths.source, paths.translated);
            return None;
        }
        let manifest = self.storage.read(&paths.layout)?;
        Some(Translation {
            source: translated.text(),
            manifest: manifest.text(),
        })
    }

    fn read_source(&self, path: &str) -> Result<String> {
        if let Some(asset) = self.storage.read(path) {
            return Ok(asset.text());
        }
        match self.storage.read_embedded(path) {
            Some(source) => {
                log::debug!("Using embedded copy of {}", path);
                Ok(source.to_string())
            }
            None => Err(RenderProgError::MissingSource {
                path: path.to_string(),
            }),
        }
    }

    fn persist(&self, path: &str, contents: &str) {
        if let Err(e) = self.storage.write(path, contents.as_bytes()) {
            log::warn!("Failed to write {}: {:#}", path, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    const FRAGMENT: &str = "\
uniform sampler2D samp0 : register(s0);
in float2 texcoord;
out float4 color;
void main() {
#ifdef USE_FOG
	color = tex2D( samp0, texcoord ) * rpColor;
#else
	color = tex2D( samp0, texcoord );
#endif
}
";

    fn key(features: ShaderFeatures) -> ShaderKey<'static> {
        ShaderKey {
            name: "example.ps",
            suffix: "",
            stage: ShaderStage::Fragment,
            features,
            builtin: false,
        }
    }

    #[test]
    fn test_path_derivation() {
        let paths = ShaderPaths::derive("example.ps", "_fog", ShaderStage::Fragment);
        assert_eq!(paths.source, "renderprogs/example.ps.hlsl");
        assert_eq!(paths.stripped, "renderprogs/hlsl/example_fog.ps.hlsl");
        assert_eq!(paths.translated, "renderprogs/vkglsl/example_fog.frag");
        assert_eq!(paths.layout, "renderprogs/vkglsl/example_fog.frag.layout");

        let paths = ShaderPaths::derive("interaction", "", ShaderStage::Vertex);
        assert_eq!(paths.source, "renderprogs/interaction.vs.hlsl");
        assert_eq!(paths.translated, "renderprogs/vkglsl/interaction.vert");
    }

    #[test]
    fn test_translate_and_persist() {
        let storage = MemoryStorage::new();
        storage.insert("renderprogs/example.ps.hlsl", FRAGMENT);
        let cache = ShaderCache::new(Box::new(storage.clone()), RetranslatePolicy::Always);

        let translation = cache.translate(&key(ShaderFeatures::FOG)).unwrap().unwrap();
        assert_eq!(translation.manifest, "uniforms [ rpColor ]\nbindings [ ubo sampler ]\n");
        assert_eq!(storage.write_count(), 3);
        assert_eq!(
            storage.contents("renderprogs/vkglsl/example.frag.layout").as_deref(),
            Some(translation.manifest.as_str())
        );
        assert!(!storage
            .contents("renderprogs/hlsl/example.ps.hlsl")
            .unwrap()
            .contains("#ifdef"));

        let translation = cache.translate(&key(ShaderFeatures::empty())).unwrap().unwrap();
        assert_eq!(translation.manifest, "uniforms [ ]\nbindings [ sampler ]\n");
    }

    #[test]
    fn test_always_policy_ignores_fresh_cache() {
        let storage = MemoryStorage::new();
        storage.insert("renderprogs/example.ps.hlsl", FRAGMENT);
        let cache = ShaderCache::new(Box::new(storage.clone()), RetranslatePolicy::Always);

        cache.translate(&key(ShaderFeatures::FOG)).unwrap();
        cache.translate(&key(ShaderFeatures::FOG)).unwrap();
        assert_eq!(storage.write_count(), 6);
    }

    #[test]
    fn test_when_stale_policy() {
        let storage = MemoryStorage::new();
        storage.insert("renderprogs/example.ps.hlsl", FRAGMENT);
        let mut cache = ShaderCache::new(Box::new(storage.clone()), RetranslatePolicy::WhenStale);

        let first = cache.translate(&key(ShaderFeatures::FOG)).unwrap().unwrap();
        assert_eq!(storage.write_count(), 3);

        // fresh: served from the cache
        let second = cache.translate(&key(ShaderFeatures::FOG)).unwrap().unwrap();
        assert_eq!(first, second);
        assert_eq!(storage.write_count(), 3);

        // source edited after the output was written
        storage.touch("renderprogs/example.ps.hlsl");
        cache.translate(&key(ShaderFeatures::FOG)).unwrap();
        assert_eq!(storage.write_count(), 6);

        cache.set_force(true);
        cache.translate(&key(ShaderFeatures::FOG)).unwrap();
        assert_eq!(storage.write_count(), 9);
    }

    #[test]
    fn test_when_stale_missing_manifest_retranslates() {
        let storage = MemoryStorage::new();
        storage.insert("renderprogs/example.ps.hlsl", FRAGMENT);
        let cache = ShaderCache::new(Box::new(storage.clone()), RetranslatePolicy::WhenStale);

        cache.translate(&key(ShaderFeatures::FOG)).unwrap();
        storage.remove("renderprogs/vkglsl/example.frag.layout");
        cache.translate(&key(ShaderFeatures::FOG)).unwrap();
        assert_eq!(storage.write_count(), 6);
    }

    #[test]
    fn test_embedded_fallback() {
        let storage = MemoryStorage::new();
        storage.insert_embedded("renderprogs/example.ps.hlsl", FRAGMENT);
        let cache = ShaderCache::new(Box::new(storage.clone()), RetranslatePolicy::WhenStale);

        cache.translate(&key(ShaderFeatures::FOG)).unwrap().unwrap();
        assert_eq!(storage.write_count(), 3);

        // embedded source has no timestamp, so existing output stays valid
        cache.translate(&key(ShaderFeatures::FOG)).unwrap().unwrap();
        assert_eq!(storage.write_count(), 3);
    }

    #[test]
    fn test_missing_source() {
        let cache = ShaderCache::new(Box::new(MemoryStorage::new()), RetranslatePolicy::Always);
        match cache.translate(&key(ShaderFeatures::empty())) {
            Err(RenderProgError::MissingSource { path }) => assert_eq!(path, "renderprogs/example.ps.hlsl"),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_empty_source_is_skipped() {
        let storage = MemoryStorage::new();
        storage.insert("renderprogs/example.ps.hlsl", "");
        let cache = ShaderCache::new(Box::new(storage.clone()), RetranslatePolicy::Always);
        assert!(cache.translate(&key(ShaderFeatures::empty())).unwrap().is_none());
        assert_eq!(storage.write_count(), 0);
    }

    #[test]
    fn test_write_failure_is_not_fatal() {
        let storage = MemoryStorage::new();
        storage.insert("renderprogs/example.ps.hlsl", FRAGMENT);
        storage.set_fail_writes(true);
        let cache = ShaderCache::new(Box::new(storage.clone()), RetranslatePolicy::WhenStale);
        assert!(cache.translate(&key(ShaderFeatures::FOG)).unwrap().is_some());
        assert!(storage.contents("renderprogs/vkglsl/example.frag").is_none());
    }
}
