//! Per-effect pipelines for user-supplied post-processing shaders.
//!
//! A [`ShaderSession`] is an explicit value owned by the renderer. Each effect slot holds
//! either a pipeline built from a custom shader or the reason it fell back to the default.

use crate::backend::{build_pipeline, BuiltPipeline, PipelineFactory, ShaderCompiler};
use crate::error::TranspileError;
use crate::options::TranspileOptions;
use crate::stages::assemble::AssembledProgram;
use crate::transpiler::{read_source, Transpiler};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EffectKind {
    Bloom,
    PageTransition,
    HttpError,
}

impl EffectKind {
    pub const ALL: [EffectKind; 3] = [
        EffectKind::Bloom,
        EffectKind::PageTransition,
        EffectKind::HttpError,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EffectKind::Bloom => "bloom",
            EffectKind::PageTransition => "page-transition",
            EffectKind::HttpError => "http-error",
        }
    }

    /// Distinct per kind so several custom fragments can live in one library.
    pub fn entry_symbol(self) -> &'static str {
        match self {
            EffectKind::Bloom => "vulpes_bloom_fragment",
            EffectKind::PageTransition => "vulpes_page_transition_fragment",
            EffectKind::HttpError => "vulpes_http_error_fragment",
        }
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for EffectKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EffectKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| format!("unknown effect `{}`", s))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum EffectStatus {
    /// Nothing installed; the default pipeline is used.
    Default,
    Custom,
    Fallback { reason: String },
}

enum EffectSlot<P> {
    Custom(BuiltPipeline<P>),
    Failed(String),
}

pub struct ShaderSession<C, F>
where
    F: PipelineFactory,
{
    compiler: C,
    factory: F,
    vertex: F::VertexFunction,
    format: F::PixelFormat,
    fallback: F::Pipeline,
    transpilers: BTreeMap<EffectKind, Transpiler>,
    slots: BTreeMap<EffectKind, EffectSlot<F::Pipeline>>,
}

impl<C, F> ShaderSession<C, F>
where
    C: ShaderCompiler,
    F: PipelineFactory<Function = C::Function>,
{
    /// `options.entry_symbol` is ignored; every effect kind uses its own symbol.
    pub fn new(
        options: TranspileOptions,
        compiler: C,
        factory: F,
        vertex: F::VertexFunction,
        format: F::PixelFormat,
        fallback: F::Pipeline,
    ) -> Result<Self, TranspileError> {
        let mut transpilers = BTreeMap::new();
        for kind in EffectKind::ALL {
            let options = options.clone().with_entry_symbol(kind.entry_symbol());
            transpilers.insert(kind, Transpiler::new(options)?);
        }
        Ok(Self {
            compiler,
            factory,
            vertex,
            format,
            fallback,
            transpilers,
            slots: BTreeMap::new(),
        })
    }

    /// Build `source` for `kind`, replacing whatever the slot held.
    pub fn install(&mut self, kind: EffectKind, source: &str) -> EffectStatus {
        let Some(transpiler) = self.transpilers.get(&kind) else {
            return self.fail(kind, "no transpiler for effect".to_string());
        };
        match build_pipeline(
            transpiler,
            &self.compiler,
            &self.factory,
            source,
            &self.vertex,
            self.format,
        ) {
            Ok(built) => {
                info!(effect = %kind, entry_symbol = %built.assembled.entry_symbol, "custom effect installed");
                self.slots.insert(kind, EffectSlot::Custom(built));
                EffectStatus::Custom
            }
            Err(err) => self.fail(kind, err.to_string()),
        }
    }

    pub fn install_file(&mut self, kind: EffectKind, path: &Path) -> EffectStatus {
        match read_source(path) {
            Ok(source) => self.install(kind, &source),
            Err(err) => {
                warn!(effect = %kind, path = %path.display(), "transpile skipped: {}", err);
                self.fail(kind, err.to_string())
            }
        }
    }

    fn fail(&mut self, kind: EffectKind, reason: String) -> EffectStatus {
        warn!(effect = %kind, %reason, "using default pipeline");
        self.slots.insert(kind, EffectSlot::Failed(reason.clone()));
        EffectStatus::Fallback { reason }
    }

    pub fn clear(&mut self, kind: EffectKind) {
        self.slots.remove(&kind);
    }

    /// The custom pipeline for `kind` when one is installed, otherwise the default.
    pub fn pipeline(&self, kind: EffectKind) -> &F::Pipeline {
        match self.slots.get(&kind) {
            Some(EffectSlot::Custom(built)) => &built.pipeline,
            _ => &self.fallback,
        }
    }

    pub fn status(&self, kind: EffectKind) -> EffectStatus {
        match self.slots.get(&kind) {
            None => EffectStatus::Default,
            Some(EffectSlot::Custom(_)) => EffectStatus::Custom,
            Some(EffectSlot::Failed(reason)) => EffectStatus::Fallback {
                reason: reason.clone(),
            },
        }
    }

    pub fn assembled(&self, kind: EffectKind) -> Option<&AssembledProgram> {
        match self.slots.get(&kind) {
            Some(EffectSlot::Custom(built)) => Some(&built.assembled),
            _ => None,
        }
    }
}
