//! Locates the entry point and splits the program around it.

use super::STAGE_ENTRY;
use crate::program::SourceProgram;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};
use vulpes_core::diagnostics::Diagnostic;
use vulpes_core::scan::TextEdits;
use vulpes_pipeline::{PipelineDiagnostics, PipelineError, PipelineStage};

static BARE_RETURN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\breturn\s*;").expect("bare return pattern"));

pub const FALLBACK_OUTPUT: &str = "fragColor";
pub const FALLBACK_COORD: &str = "fragCoord";
/// Body used when no function matches the entry contract: show the input surface unchanged.
pub const FALLBACK_BODY: &str =
    "fragColor = iChannel0.sample(textureSampler, fragCoord / iResolution);";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryPoint {
    pub name: String,
    pub output_param: String,
    pub coord_param: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedProgram {
    /// Everything except the entry definition, helpers defined after it included.
    pub preamble: String,
    /// Entry body without its braces, bare returns already rewritten.
    pub body: String,
    pub entry: Option<EntryPoint>,
    pub output_ident: String,
    pub coord_ident: String,
    pub used_fallback: bool,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct EntryPointExtractor;

impl EntryPointExtractor {
    pub fn extract(
        &self,
        program: &SourceProgram,
        diagnostics: &mut PipelineDiagnostics,
    ) -> ExtractedProgram {
        let text = program.text();
        let found = program.entry_point().and_then(|function| {
            let (color, coord) = function.entry_contract()?;
            let body = function.body.clone()?;
            Some((function, color.to_string(), coord.to_string(), body))
        });

        let Some((function, color, coord, body)) = found else {
            warn!("no entry point found, using passthrough body");
            diagnostics.push(
                Diagnostic::warning("no `void f(out vec4, in vec2)` entry point found; using passthrough body")
                    .with_suggestion("declare `void mainImage(out vec4 fragColor, in vec2 fragCoord)`")
                    .with_code("entry-point-missing")
                    .with_source_context(STAGE_ENTRY),
            );
            return ExtractedProgram {
                preamble: text.trim().to_string(),
                body: FALLBACK_BODY.to_string(),
                entry: None,
                output_ident: FALLBACK_OUTPUT.to_string(),
                coord_ident: FALLBACK_COORD.to_string(),
                used_fallback: true,
            };
        };

        let mut preamble = text[..function.span.start].trim_end().to_string();
        let trailing = text[function.span.end..].trim();
        if !trailing.is_empty() {
            if !preamble.is_empty() {
                preamble.push_str("\n\n");
            }
            preamble.push_str(trailing);
        }

        let masked_body = &program.masked()[body.clone()];
        let mut edits = TextEdits::new();
        for bare in BARE_RETURN.find_iter(masked_body) {
            edits.replace(bare.range(), format!("return {};", color));
        }
        let rewritten_returns = edits.len();
        let body_text = edits.apply(&text[body]);

        debug!(
            entry = %function.name,
            output = %color,
            coord = %coord,
            rewritten_returns,
            "extracted entry point"
        );

        ExtractedProgram {
            preamble,
            body: body_text,
            entry: Some(EntryPoint {
                name: function.name.clone(),
                output_param: color.clone(),
                coord_param: coord.clone(),
            }),
            output_ident: color,
            coord_ident: coord,
            used_fallback: false,
        }
    }
}

impl PipelineStage for EntryPointExtractor {
    type SrcCtx = SourceProgram;
    type DstCtx = ExtractedProgram;

    fn name(&self) -> &'static str {
        STAGE_ENTRY
    }

    fn run(
        &self,
        context: SourceProgram,
        diagnostics: &mut PipelineDiagnostics,
    ) -> Result<ExtractedProgram, PipelineError> {
        Ok(self.extract(&context, diagnostics))
    }

    fn snapshot(&self, output: &ExtractedProgram) -> Option<String> {
        Some(format!(
            "// preamble\n{}\n// body ({} -> {})\n{}",
            output.preamble, output.coord_ident, output.output_ident, output.body
        ))
    }
}
