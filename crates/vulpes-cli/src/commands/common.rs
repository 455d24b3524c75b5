//! Option handling shared by the transpiling commands.

use crate::{cli::CliConfig, CliError, Result};
use clap::{ArgAction, Args};
use std::path::Path;
use vulpes_transpile::{ModSemantics, PropagationMode, TranspileError, TranspileOptions};

/// Transpile flags that override the `[transpile]` config section.
#[derive(Debug, Clone, Default, Args)]
pub struct TranspileFlags {
    /// Name of the generated fragment function
    #[arg(long)]
    pub entry: Option<String>,

    /// Ambient value propagation (single-hop, transitive)
    #[arg(long)]
    pub propagation: Option<PropagationMode>,

    /// Emit floor-based `glsl_mod` instead of mapping `mod` to `fmod`
    #[arg(long)]
    pub exact_mod: bool,

    /// Disable pipeline stages by name (repeatable).
    #[arg(long = "disable-stage", action = ArgAction::Append)]
    pub disable_stage: Vec<String>,

    /// Log the program text after every stage at trace level
    #[arg(long)]
    pub print_stages: bool,

    /// Render diagnostics without symbols or colors
    #[arg(long)]
    pub plain: bool,
}

impl TranspileFlags {
    pub fn resolve(&self, config: &CliConfig) -> TranspileOptions {
        let mut options = config.transpile.to_options();
        if let Some(entry) = &self.entry {
            options.entry_symbol = Some(entry.clone());
        }
        if let Some(propagation) = self.propagation {
            options.propagation = propagation;
        }
        if self.exact_mod {
            options.mod_semantics = ModSemantics::Exact;
        }
        options
            .pipeline
            .disabled_stages
            .extend(self.disable_stage.iter().cloned());
        options.pipeline.debug.print_stages |= self.print_stages;
        options.pipeline.debug.plain_diagnostics |= self.plain;
        options
    }
}

pub async fn read_shader(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path).await.map_err(|error| {
        CliError::Transpile(TranspileError::SourceUnavailable {
            path: path.to_path_buf(),
            error,
        })
    })
}
