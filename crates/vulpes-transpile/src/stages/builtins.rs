//! Renames GLSL builtins whose MSL spelling differs.

use super::STAGE_BUILTINS;
use crate::options::ModSemantics;
use crate::program::SourceProgram;
use tracing::debug;
use vulpes_core::diagnostics::Diagnostic;
use vulpes_core::scan::{self, TextEdits};
use vulpes_core::Span;
use vulpes_pipeline::PipelineDiagnostics;

/// MSL definition of `glsl_mod`, emitted by the assembler in exact mode.
///
/// Templated so scalar and vector operands share one overload set.
pub const GLSL_MOD_HELPER: &str = "\
template <typename T, typename U>
inline T glsl_mod(T x, U y) { return x - y * floor(x / y); }
";

const RENAMES: &[(&str, &str)] = &[
    ("dFdx", "dfdx"),
    ("dFdy", "dfdy"),
    ("inversesqrt", "rsqrt"),
];

#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinFunctionMapper {
    pub mod_semantics: ModSemantics,
}

impl BuiltinFunctionMapper {
    pub fn new(mod_semantics: ModSemantics) -> Self {
        Self { mod_semantics }
    }

    pub fn rewrite(
        &self,
        program: &SourceProgram,
        diagnostics: &mut PipelineDiagnostics,
    ) -> SourceProgram {
        let masked = program.masked();
        let mut edits = TextEdits::new();

        let mod_name = self.mod_semantics.function_name();
        let mod_calls = call_sites(masked, "mod");
        for &pos in &mod_calls {
            edits.replace(pos..pos + 3, mod_name);
        }
        if !mod_calls.is_empty() && self.mod_semantics == ModSemantics::Approximate {
            diagnostics.push(
                Diagnostic::info(format!(
                    "`mod` mapped to `fmod` at {} site(s); results differ when operands have opposite signs",
                    mod_calls.len()
                ))
                .with_span(Span::from_range(mod_calls[0]..mod_calls[0] + 3))
                .with_suggestion("set mod semantics to `exact` for GLSL floor-based results")
                .with_code("approximate-mod")
                .with_source_context(STAGE_BUILTINS),
            );
        }

        for &(from, to) in RENAMES {
            for pos in call_sites(masked, from) {
                edits.replace(pos..pos + from.len(), to);
            }
        }

        for pos in call_sites(masked, "atan") {
            let Some(open) = scan::next_non_space(masked, pos + 4) else {
                continue;
            };
            let Some(close) = scan::find_matching(masked, open) else {
                continue;
            };
            if scan::split_args(masked, open, close).len() == 2 {
                edits.replace(pos..pos + 4, "atan2");
            }
        }

        if edits.is_empty() {
            return program.clone();
        }
        debug!(renamed = edits.len(), "mapped builtin calls");
        SourceProgram::new(edits.apply(program.text()))
    }
}

/// Whole-identifier occurrences of `name` followed by `(` and not used as a member.
fn call_sites(masked: &str, name: &str) -> Vec<usize> {
    let bytes = masked.as_bytes();
    scan::find_identifier(masked, name)
        .into_iter()
        .filter(|&pos| pos == 0 || bytes[pos - 1] != b'.')
        .filter(|&pos| {
            scan::next_non_space(masked, pos + name.len()).is_some_and(|next| bytes[next] == b'(')
        })
        .collect()
}

super::text_stage!(BuiltinFunctionMapper, super::STAGE_BUILTINS);

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn map(source: &str, semantics: ModSemantics) -> (String, PipelineDiagnostics) {
        let mut diagnostics = PipelineDiagnostics::default();
        let text = BuiltinFunctionMapper::new(semantics)
            .rewrite(&SourceProgram::new(source), &mut diagnostics)
            .into_text();
        (text, diagnostics)
    }

    #[test]
    fn renames_builtins() {
        let (text, _) = map(
            "float a = mod(x, 2.0) + dFdx(p) + dFdy(p) + inversesqrt(d);",
            ModSemantics::Approximate,
        );
        assert_eq!(
            text,
            "float a = fmod(x, 2.0) + dfdx(p) + dfdy(p) + rsqrt(d);"
        );
    }

    #[test]
    fn only_two_argument_atan_becomes_atan2() {
        let (text, _) = map(
            "float a = atan(p.y, p.x); float b = atan(t); float c = atan(f(1, 2));",
            ModSemantics::Approximate,
        );
        assert_eq!(
            text,
            "float a = atan2(p.y, p.x); float b = atan(t); float c = atan(f(1, 2));"
        );
    }

    #[test]
    fn exact_mode_uses_helper_name() {
        let (text, diagnostics) = map("float a = mod(-1.0, 3.0);", ModSemantics::Exact);
        assert_eq!(text, "float a = glsl_mod(-1.0, 3.0);");
        assert_eq!(diagnostics.with_code("approximate-mod").count(), 0);
    }

    #[test]
    fn approximate_mode_diverges_for_negative_operands() {
        let (_, diagnostics) = map("float a = mod(-1.0, 3.0);", ModSemantics::Approximate);
        assert_eq!(diagnostics.with_code("approximate-mod").count(), 1);
        assert_eq!(ModSemantics::Approximate.evaluate(-1.0, 3.0), -1.0);
        assert_eq!(ModSemantics::Exact.evaluate(-1.0, 3.0), 2.0);
        assert_eq!(ModSemantics::Approximate.evaluate(4.0, 3.0), ModSemantics::Exact.evaluate(4.0, 3.0));
    }

    #[test]
    fn mapping_is_idempotent() {
        let (once, _) = map("float a = mod(x, y) + atan(y, x) + dFdx(p);", ModSemantics::Exact);
        let (twice, _) = map(&once, ModSemantics::Exact);
        assert_eq!(once, twice);
    }

    #[test]
    fn leaves_lookalike_identifiers() {
        let source = "float modulate = fmod(a, b) + s.mod(x) + my_atan(a, b);";
        let (text, _) = map(source, ModSemantics::Approximate);
        assert_eq!(text, source);
    }
}
