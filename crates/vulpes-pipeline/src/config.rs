use serde::{Deserialize, Serialize};

/// Configuration for pipeline execution
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineOptions {
    /// Debug options
    pub debug: DebugOptions,
    /// Stage names to skip; only stages that preserve their context type can be skipped
    pub disabled_stages: Vec<String>,
}

/// Debug options
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugOptions {
    /// Log the program text produced by every stage at trace level
    pub print_stages: bool,
    /// Show info-level diagnostics
    pub verbose: bool,
    /// Render diagnostics with the plain template instead of the pretty one
    pub plain_diagnostics: bool,
}

impl PipelineOptions {
    pub fn stage_enabled(&self, stage: &str) -> bool {
        !self.disabled_stages.iter().any(|s| s == stage)
    }
}
