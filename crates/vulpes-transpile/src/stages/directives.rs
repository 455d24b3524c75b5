//! Removes GLSL version and compiler directives that have no MSL meaning.

use super::{rewrite_code, STAGE_DIRECTIVES};
use crate::program::SourceProgram;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;
use vulpes_core::diagnostics::Diagnostic;
use vulpes_pipeline::PipelineDiagnostics;

static DIRECTIVE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^[ \t]*#[ \t]*(?:version|extension|pragma)\b[^\n]*(?:\n|$)")
        .expect("directive pattern")
});
static PRECISION_STATEMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\bprecision\s+(?:highp|mediump|lowp)\s+\w+\s*;[ \t]*\n?")
        .expect("precision pattern")
});
static PRECISION_QUALIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:highp|mediump|lowp)\b[ \t]*").expect("qualifier pattern"));

#[derive(Debug, Default, Clone, Copy)]
pub struct DirectiveStripper;

impl DirectiveStripper {
    pub fn rewrite(
        &self,
        program: &SourceProgram,
        diagnostics: &mut PipelineDiagnostics,
    ) -> SourceProgram {
        let mut removed = 0;
        let mut current = program.clone();
        for pattern in [&*DIRECTIVE_LINE, &*PRECISION_STATEMENT, &*PRECISION_QUALIFIER] {
            let (text, count) = rewrite_code(&current, pattern, |_| Some(String::new()));
            if count > 0 {
                current = SourceProgram::new(text);
                removed += count;
            }
        }
        if removed > 0 {
            debug!(removed, "stripped directives");
            diagnostics.push(
                Diagnostic::info(format!("removed {} directive(s) and precision qualifier(s)", removed))
                    .with_source_context(STAGE_DIRECTIVES),
            );
        }
        current
    }
}

super::text_stage!(DirectiveStripper, super::STAGE_DIRECTIVES);

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn strip(source: &str) -> String {
        DirectiveStripper
            .rewrite(&SourceProgram::new(source), &mut PipelineDiagnostics::default())
            .into_text()
    }

    #[test]
    fn removes_version_extension_and_precision() {
        let source = "#version 300 es\n#extension GL_OES_standard_derivatives : enable\nprecision highp float;\nhighp vec2 p;\n#define SCALE 2.0\n";
        assert_eq!(strip(source), "vec2 p;\n#define SCALE 2.0\n");
    }

    #[test]
    fn leaves_commented_directives_alone() {
        let source = "// #version 330\nfloat a;\n";
        assert_eq!(strip(source), source);
    }
}
