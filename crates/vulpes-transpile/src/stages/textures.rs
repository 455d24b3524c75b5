//! Rewrites GLSL sampling calls into MSL texture method calls.
//!
//! `texture(s, uv)` and `texture2D(s, uv)` become `s.sample(textureSampler, uv)`;
//! `textureLod(s, uv, l)` becomes `s.sample(textureSampler, uv, level(l))`. `textureSampler` is
//! the single sampler the assembler declares. Arguments are split with balanced-parenthesis
//! scanning, so coordinate expressions may nest calls. A call whose texture argument is not a
//! plain identifier is reported and left as written.

use super::STAGE_TEXTURES;
use crate::program::SourceProgram;
use tracing::debug;
use vulpes_core::diagnostics::Diagnostic;
use vulpes_core::scan::{self, TextEdits};
use vulpes_core::Span;
use vulpes_pipeline::PipelineDiagnostics;

pub const SAMPLER_NAME: &str = "textureSampler";

const SAMPLE_CALLS: &[&str] = &["texture", "texture2D", "textureLod"];

// Nested sampling calls are rewritten one level per pass.
const MAX_PASSES: usize = 8;

#[derive(Debug, Default, Clone, Copy)]
pub struct TextureCallRewriter;

impl TextureCallRewriter {
    pub fn rewrite(
        &self,
        program: &SourceProgram,
        diagnostics: &mut PipelineDiagnostics,
    ) -> SourceProgram {
        let mut current = program.clone();
        let mut total = 0;
        for pass in 0..MAX_PASSES {
            let (edits, skipped) = collect_edits(&current);
            if pass == 0 {
                for span in skipped {
                    diagnostics.push(
                        Diagnostic::warning(format!(
                            "unsupported sampling call `{}` left unchanged",
                            &current.text()[span.range()]
                        ))
                        .with_span(span)
                        .with_code("unsupported-texture-call")
                        .with_source_context(STAGE_TEXTURES),
                    );
                }
            }
            if edits.is_empty() {
                break;
            }
            total += edits.len();
            current = SourceProgram::new(edits.apply(current.text()));
        }
        debug!(rewritten = total, "rewrote sampling calls");
        current
    }
}

fn collect_edits(program: &SourceProgram) -> (TextEdits, Vec<Span>) {
    let text = program.text();
    let masked = program.masked();
    let bytes = masked.as_bytes();
    let mut edits = TextEdits::new();
    let mut skipped = Vec::new();

    for &call in SAMPLE_CALLS {
        for pos in scan::find_identifier(masked, call) {
            if pos > 0 && bytes[pos - 1] == b'.' {
                continue;
            }
            let Some(open) = scan::next_non_space(masked, pos + call.len()) else {
                continue;
            };
            if bytes[open] != b'(' {
                continue;
            }
            let Some(close) = scan::find_matching(masked, open) else {
                continue;
            };
            let args: Vec<&str> = scan::split_args(masked, open, close)
                .into_iter()
                .map(|range| text[range].trim())
                .collect();

            let replacement = match (call, args.as_slice()) {
                (_, [surface, ..]) if !scan::is_identifier(surface) => None,
                ("texture" | "texture2D", [surface, coord]) => {
                    Some(format!("{}.sample({}, {})", surface, SAMPLER_NAME, coord))
                }
                ("texture" | "texture2D", [surface, coord, bias]) => Some(format!(
                    "{}.sample({}, {}, bias({}))",
                    surface, SAMPLER_NAME, coord, bias
                )),
                ("textureLod", [surface, coord, lod]) => Some(format!(
                    "{}.sample({}, {}, level({}))",
                    surface, SAMPLER_NAME, coord, lod
                )),
                _ => None,
            };

            match replacement {
                Some(replacement) => edits.replace(pos..close + 1, replacement),
                None => skipped.push(Span::from_range(pos..close + 1)),
            }
        }
    }
    (edits, skipped)
}

super::text_stage!(TextureCallRewriter, super::STAGE_TEXTURES);

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rewrite(source: &str) -> (String, PipelineDiagnostics) {
        let mut diagnostics = PipelineDiagnostics::default();
        let text = TextureCallRewriter
            .rewrite(&SourceProgram::new(source), &mut diagnostics)
            .into_text();
        (text, diagnostics)
    }

    #[test]
    fn rewrites_simple_sampling_call() {
        let (text, _) = rewrite("fragColor = texture(iChannel0, fragCoord/iResolution);");
        assert_eq!(
            text,
            "fragColor = iChannel0.sample(textureSampler, fragCoord/iResolution);"
        );
    }

    #[test]
    fn supports_nested_coordinates_and_lod() {
        let (text, _) = rewrite(
            "c = texture2D(iChannel0, uv + float2(sin(t), 0.0)); d = textureLod(iChannel0, uv, 2.0);",
        );
        assert_eq!(
            text,
            "c = iChannel0.sample(textureSampler, uv + float2(sin(t), 0.0)); d = iChannel0.sample(textureSampler, uv, level(2.0));"
        );
    }

    #[test]
    fn rewrites_sampling_inside_coordinates() {
        let (text, _) = rewrite("c = texture(iChannel0, texture(iChannel0, uv).xy);");
        assert_eq!(
            text,
            "c = iChannel0.sample(textureSampler, iChannel0.sample(textureSampler, uv).xy);"
        );
    }

    #[test]
    fn reports_non_identifier_surface() {
        let source = "c = texture(channels[0], uv);";
        let (text, diagnostics) = rewrite(source);
        assert_eq!(text, source);
        assert_eq!(diagnostics.with_code("unsupported-texture-call").count(), 1);
    }

    #[test]
    fn leaves_identifiers_and_methods_alone() {
        let source = "float texture = 1.0; float3 c = t.texture(x); int textureSize = 2;";
        let (text, _) = rewrite(source);
        assert_eq!(text, source);
    }
}
