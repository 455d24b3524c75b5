//! CLI configuration and settings management

use crate::{CliError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use vulpes_pipeline::{DebugOptions, PipelineOptions};
use vulpes_transpile::{EffectKind, ExternalCompiler, ModSemantics, PropagationMode, TranspileOptions};

pub const CONFIG_FILE_NAME: &str = "vulpes-shader.toml";

/// CLI configuration loaded from config files
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Transpile settings
    pub transpile: TranspileConfig,

    /// Offline compiler used by `check --compile`
    pub compiler: ExternalCompiler,

    /// Custom shader per effect kind
    pub effects: BTreeMap<EffectKind, PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranspileConfig {
    /// Generated fragment function name
    pub entry_symbol: Option<String>,

    /// `single-hop` or `transitive`
    pub propagation: PropagationMode,

    /// `approximate` maps `mod` to `fmod`, `exact` emits a floor-based helper
    pub mod_semantics: ModSemantics,

    /// Stage names to skip
    pub disabled_stages: Vec<String>,

    /// Log each stage's output at trace level
    pub print_stages: bool,

    /// Render diagnostics without symbols
    pub plain_diagnostics: bool,
}

impl TranspileConfig {
    pub fn to_options(&self) -> TranspileOptions {
        TranspileOptions {
            entry_symbol: self.entry_symbol.clone(),
            propagation: self.propagation,
            mod_semantics: self.mod_semantics,
            pipeline: PipelineOptions {
                debug: DebugOptions {
                    print_stages: self.print_stages,
                    verbose: false,
                    plain_diagnostics: self.plain_diagnostics,
                },
                disabled_stages: self.disabled_stages.clone(),
            },
        }
    }
}

impl CliConfig {
    /// Load configuration from file, falling back to defaults
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        // Later locations take precedence: system, then home, then the working directory.
        let mut candidates = Vec::new();
        if let Some(config_dir) = dirs::config_dir() {
            candidates.push(config_dir.join("vulpes-shader").join("config.toml"));
        }
        if let Some(home_dir) = dirs::home_dir() {
            candidates.push(home_dir.join(format!(".{}", CONFIG_FILE_NAME)));
        }
        candidates.push(PathBuf::from(CONFIG_FILE_NAME));

        let mut config = Self::default();
        for path in candidates.iter().filter(|path| path.is_file()) {
            let found = Self::load_from_file(path)?;
            tracing::debug!(path = %path.display(), "loaded configuration");
            config = config.merge(found);
        }
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CliError::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        toml::from_str(&content).map_err(|e| {
            CliError::Config(format!("Failed to parse config file {}: {}", path.display(), e))
        })
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| CliError::Config(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| CliError::Config(format!("Failed to create config directory: {}", e)))?;
        }

        std::fs::write(path, content)
            .map_err(|e| CliError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Merge another configuration over this one. Effect paths are merged per kind; the other
    /// sections are replaced when they differ from the defaults.
    pub fn merge(mut self, other: Self) -> Self {
        if other.transpile != TranspileConfig::default() {
            self.transpile = other.transpile;
        }
        if other.compiler != ExternalCompiler::default() {
            self.compiler = other.compiler;
        }
        self.effects.extend(other.effects);
        self
    }

    /// Get the default config file path for the current user
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("vulpes-shader").join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = CliConfig::default();
        assert_eq!(config.transpile.propagation, PropagationMode::SingleHop);
        assert_eq!(config.compiler.program, "xcrun");
        assert!(config.effects.is_empty());
    }

    #[test]
    fn test_parse_sections() {
        let config: CliConfig = toml::from_str(
            r#"
[transpile]
entry_symbol = "my_fx"
propagation = "transitive"
mod_semantics = "exact"
disabled_stages = ["address-space"]

[compiler]
program = "metal"
args = ["-c", "{input}", "-o", "{output}"]

[effects]
bloom = "shaders/bloom.glsl"
http-error = "shaders/error.glsl"
"#,
        )
        .unwrap();
        let options = config.transpile.to_options();
        assert_eq!(options.entry_symbol(), "my_fx");
        assert_eq!(options.propagation, PropagationMode::Transitive);
        assert_eq!(options.mod_semantics, ModSemantics::Exact);
        assert!(!options.pipeline.stage_enabled("address-space"));
        assert_eq!(config.compiler.program, "metal");
        assert_eq!(
            config.effects.get(&EffectKind::HttpError),
            Some(&PathBuf::from("shaders/error.glsl"))
        );
    }

    #[test]
    fn test_config_file_operations() {
        let mut config = CliConfig::default();
        config.effects.insert(EffectKind::Bloom, PathBuf::from("bloom.glsl"));
        let temp_file = NamedTempFile::new().unwrap();

        config.save_to_file(temp_file.path()).unwrap();
        let loaded_config = CliConfig::load_from_file(temp_file.path()).unwrap();

        assert_eq!(config, loaded_config);
    }

    #[test]
    fn test_merge_keeps_effects_from_both() {
        let mut base = CliConfig::default();
        base.effects.insert(EffectKind::Bloom, PathBuf::from("a.glsl"));
        let mut other = CliConfig::default();
        other.effects.insert(EffectKind::PageTransition, PathBuf::from("b.glsl"));
        other.transpile.propagation = PropagationMode::Transitive;

        let merged = base.merge(other);
        assert_eq!(merged.effects.len(), 2);
        assert_eq!(merged.transpile.propagation, PropagationMode::Transitive);
    }
}
