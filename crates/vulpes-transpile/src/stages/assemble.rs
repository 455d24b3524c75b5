//! Wraps an extracted program in the fixed MSL boilerplate and fragment scaffold.

use super::builtins::GLSL_MOD_HELPER;
use super::entry::ExtractedProgram;
use super::textures::SAMPLER_NAME;
use super::STAGE_ASSEMBLE;
use crate::ambient::AMBIENT_VALUES;
use crate::options::{ModSemantics, DEFAULT_ENTRY_SYMBOL};
use serde::Serialize;
use std::fmt::Write;
use tracing::debug;
use vulpes_pipeline::{PipelineDiagnostics, PipelineError, PipelineStage};

/// Stage-in parameter name of the generated fragment function.
pub const STAGE_IN: &str = "vulpes_in";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssembledProgram {
    pub source: String,
    /// Function name the host compiler looks up.
    pub entry_symbol: String,
    /// The passthrough body stands in for a missing entry point.
    pub fallback_body: bool,
}

#[derive(Debug, Clone)]
pub struct ProgramAssembler {
    pub entry_symbol: String,
    pub mod_semantics: ModSemantics,
}

impl Default for ProgramAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_ENTRY_SYMBOL, ModSemantics::default())
    }
}

impl ProgramAssembler {
    pub fn new(entry_symbol: impl Into<String>, mod_semantics: ModSemantics) -> Self {
        Self {
            entry_symbol: entry_symbol.into(),
            mod_semantics,
        }
    }

    pub fn assemble(&self, program: &ExtractedProgram) -> AssembledProgram {
        let mut out = String::with_capacity(program.preamble.len() + program.body.len() + 1024);
        out.push_str("#include <metal_stdlib>\nusing namespace metal;\n\n");

        out.push_str("struct Uniforms {\n");
        for ambient in &AMBIENT_VALUES {
            let _ = writeln!(out, "    {};", ambient.parameter());
        }
        out.push_str("};\n\n");
        out.push_str("struct VertexOut {\n    float4 position [[position]];\n    float2 uv;\n};\n\n");
        let _ = writeln!(
            out,
            "constexpr sampler {}(coord::normalized, address::clamp_to_edge, filter::linear);\n",
            SAMPLER_NAME
        );

        if self.mod_semantics == ModSemantics::Exact {
            out.push_str(GLSL_MOD_HELPER);
            out.push('\n');
        }

        if !program.preamble.is_empty() {
            out.push_str(&program.preamble);
            out.push_str("\n\n");
        }

        let _ = writeln!(
            out,
            "fragment float4 {}(VertexOut {} [[stage_in]], constant Uniforms& uniforms [[buffer(0)]], texture2d<float> iChannel0 [[texture(0)]]) {{",
            self.entry_symbol, STAGE_IN
        );
        for ambient in &AMBIENT_VALUES {
            let _ = writeln!(out, "    {} = uniforms.{};", ambient.parameter(), ambient.name);
        }
        let _ = writeln!(out, "    float2 {} = {}.position.xy;", program.coord_ident, STAGE_IN);
        let _ = writeln!(out, "    float4 {} = float4(0.0);", program.output_ident);
        let body = program.body.trim_matches('\n');
        if !body.trim().is_empty() {
            out.push_str(body);
            out.push('\n');
        }
        let _ = writeln!(out, "    return {};", program.output_ident);
        out.push_str("}\n");

        debug!(entry_symbol = %self.entry_symbol, bytes = out.len(), "assembled program");
        AssembledProgram {
            source: out,
            entry_symbol: self.entry_symbol.clone(),
            fallback_body: program.used_fallback,
        }
    }
}

impl PipelineStage for ProgramAssembler {
    type SrcCtx = ExtractedProgram;
    type DstCtx = AssembledProgram;

    fn name(&self) -> &'static str {
        STAGE_ASSEMBLE
    }

    fn run(
        &self,
        context: ExtractedProgram,
        _diagnostics: &mut PipelineDiagnostics,
    ) -> Result<AssembledProgram, PipelineError> {
        Ok(self.assemble(&context))
    }

    fn snapshot(&self, output: &AssembledProgram) -> Option<String> {
        Some(output.source.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn extracted(body: &str) -> ExtractedProgram {
        ExtractedProgram {
            preamble: "float k(float t) { return t; }".to_string(),
            body: body.to_string(),
            entry: None,
            output_ident: "color".to_string(),
            coord_ident: "px".to_string(),
            used_fallback: false,
        }
    }

    #[test]
    fn emits_boilerplate_preamble_and_scaffold() {
        let assembled = ProgramAssembler::new("my_effect", ModSemantics::Approximate)
            .assemble(&extracted("\n    color = float4(k(px.x));\n"));
        let expected = "\
#include <metal_stdlib>
using namespace metal;

struct Uniforms {
    float2 iResolution;
    float iTime;
};

struct VertexOut {
    float4 position [[position]];
    float2 uv;
};

constexpr sampler textureSampler(coord::normalized, address::clamp_to_edge, filter::linear);

float k(float t) { return t; }

fragment float4 my_effect(VertexOut vulpes_in [[stage_in]], constant Uniforms& uniforms [[buffer(0)]], texture2d<float> iChannel0 [[texture(0)]]) {
    float2 iResolution = uniforms.iResolution;
    float iTime = uniforms.iTime;
    float2 px = vulpes_in.position.xy;
    float4 color = float4(0.0);
    color = float4(k(px.x));
    return color;
}
";
        assert_eq!(assembled.source, expected);
        assert_eq!(assembled.entry_symbol, "my_effect");
    }

    #[test]
    fn exact_mod_emits_helper() {
        let exact = ProgramAssembler::new("e", ModSemantics::Exact).assemble(&extracted(""));
        let approx = ProgramAssembler::new("e", ModSemantics::Approximate).assemble(&extracted(""));
        assert!(exact.source.contains("inline T glsl_mod(T x, U y)"));
        assert!(!approx.source.contains("glsl_mod"));
    }
}
