//! Stage wiring and the public transpile entry points.

use crate::error::{Result, TranspileError};
use crate::options::TranspileOptions;
use crate::program::SourceProgram;
use crate::stages::address_space::AddressSpaceNormalizer;
use crate::stages::assemble::{AssembledProgram, ProgramAssembler};
use crate::stages::builtins::BuiltinFunctionMapper;
use crate::stages::directives::DirectiveStripper;
use crate::stages::entry::EntryPointExtractor;
use crate::stages::qualifiers::ParameterQualifierRewriter;
use crate::stages::textures::TextureCallRewriter;
use crate::stages::types::TypeMapper;
use crate::stages::uniforms::UniformUsagePropagator;
use std::path::Path;
use tracing::{debug, info_span};
use vulpes_core::diagnostics::{Diagnostic, DiagnosticLevel};
use vulpes_core::scan;
use vulpes_pipeline::{Pipeline, PipelineBuilder, PipelineDiagnostics};

#[derive(Debug, Clone)]
pub struct TranspileOutput {
    pub assembled: AssembledProgram,
    pub diagnostics: Vec<Diagnostic>,
}

impl TranspileOutput {
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.level == DiagnosticLevel::Warning)
    }

    /// No entry point matched and the passthrough body was used.
    pub fn used_fallback(&self) -> bool {
        self.assembled.fallback_body
    }
}

/// A configured stage sequence. Holds no per-call state, so one instance can serve any
/// number of shaders.
pub struct Transpiler {
    options: TranspileOptions,
    pipeline: Pipeline<SourceProgram, AssembledProgram>,
}

impl Transpiler {
    pub fn new(options: TranspileOptions) -> Result<Self> {
        let symbol = scan::ensure_identifier(options.entry_symbol())
            .map_err(|_| TranspileError::InvalidEntrySymbol(options.entry_symbol().to_string()))?;
        if MSL_RESERVED.contains(&symbol) {
            return Err(TranspileError::InvalidEntrySymbol(symbol.to_string()));
        }

        let pipeline = PipelineBuilder::new()
            .add_optional_stage(DirectiveStripper)
            .add_optional_stage(TypeMapper)
            .add_optional_stage(TextureCallRewriter)
            .add_optional_stage(BuiltinFunctionMapper::new(options.mod_semantics))
            .add_optional_stage(AddressSpaceNormalizer)
            .add_optional_stage(ParameterQualifierRewriter)
            .add_optional_stage(UniformUsagePropagator::new(options.propagation))
            .add_stage(EntryPointExtractor)
            .add_stage(ProgramAssembler::new(symbol, options.mod_semantics))
            .build();

        Ok(Self { options, pipeline })
    }

    pub fn options(&self) -> &TranspileOptions {
        &self.options
    }

    /// Stage names in execution order.
    pub fn stages(&self) -> &[&'static str] {
        self.pipeline.stages()
    }

    pub fn transpile(&self, source: &str) -> Result<TranspileOutput> {
        let _span = info_span!("transpile", entry_symbol = self.options.entry_symbol()).entered();
        let mut diagnostics = PipelineDiagnostics::default();
        let assembled = self.pipeline.run(
            SourceProgram::new(source),
            &mut diagnostics,
            &self.options.pipeline,
        )?;
        debug!(
            diagnostics = diagnostics.items.len(),
            fallback_body = assembled.fallback_body,
            "transpile finished"
        );
        Ok(TranspileOutput {
            assembled,
            diagnostics: diagnostics.into_vec(),
        })
    }

    pub fn transpile_file(&self, path: &Path) -> Result<TranspileOutput> {
        let source = read_source(path)?;
        self.transpile(&source)
    }
}

/// Transpile with default options.
pub fn transpile(source: &str) -> Result<TranspileOutput> {
    Transpiler::new(TranspileOptions::default())?.transpile(source)
}

pub fn read_source(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|error| TranspileError::SourceUnavailable {
        path: path.to_path_buf(),
        error,
    })
}

/// Words that would collide with the generated scaffold or MSL itself.
const MSL_RESERVED: &[&str] = &[
    "fragment", "vertex", "kernel", "constant", "device", "thread", "threadgroup", "struct",
    "return", "void", "float", "float2", "float4", "half", "int", "uint", "bool", "sampler",
    "texture2d", "metal", "using", "namespace", "template", "Uniforms", "VertexOut",
    "textureSampler", "uniforms", "vulpes_in", "iChannel0", "iResolution", "iTime",
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stages;
    use pretty_assertions::assert_eq;

    #[test]
    fn stage_order_is_fixed() {
        let transpiler = Transpiler::new(TranspileOptions::default()).unwrap();
        assert_eq!(
            transpiler.stages(),
            &[
                stages::STAGE_DIRECTIVES,
                stages::STAGE_TYPES,
                stages::STAGE_TEXTURES,
                stages::STAGE_BUILTINS,
                stages::STAGE_ADDRESS_SPACE,
                stages::STAGE_QUALIFIERS,
                stages::STAGE_UNIFORMS,
                stages::STAGE_ENTRY,
                stages::STAGE_ASSEMBLE,
            ]
        );
    }

    #[test]
    fn rejects_invalid_entry_symbols() {
        for symbol in ["", "1effect", "my-effect", "fragment", "iTime"] {
            let result = Transpiler::new(TranspileOptions::default().with_entry_symbol(symbol));
            assert!(
                matches!(result, Err(TranspileError::InvalidEntrySymbol(ref s)) if s == symbol),
                "{symbol:?} should be rejected"
            );
        }
        assert!(Transpiler::new(TranspileOptions::default().with_entry_symbol("bloom_2")).is_ok());
    }

    #[test]
    fn missing_file_is_source_unavailable() {
        let err = read_source(Path::new("/nonexistent/shader.glsl")).unwrap_err();
        assert!(matches!(err, TranspileError::SourceUnavailable { .. }));
    }
}
