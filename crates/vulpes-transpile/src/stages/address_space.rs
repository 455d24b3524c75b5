//! Moves top-level initialized declarations into the `constant` address space.
//!
//! MSL rejects program-scope variables outside `constant`. `const` globals map directly.
//! Initialized globals without `const` are promoted as well, which drops their mutability, so
//! each promotion is reported as a warning.

use super::STAGE_ADDRESS_SPACE;
use crate::program::SourceProgram;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};
use vulpes_core::diagnostics::Diagnostic;
use vulpes_core::scan::{self, ItemKind, TextEdits};
use vulpes_core::Span;
use vulpes_pipeline::PipelineDiagnostics;

static DECLARATION_HEAD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<const>const\s+)?(?P<ty>[A-Za-z_]\w*(?:<[^>]*>)?)\s*(?P<tarr>\[\s*\d*\s*\])?\s+(?P<name>[A-Za-z_]\w*)\s*(?P<narr>\[\s*\d*\s*\])?$",
    )
    .expect("declaration head pattern")
});

static ARRAY_CONSTRUCTOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_]\w*\s*\[\s*\d*\s*\]\s*\(").expect("array constructor pattern"));

/// Leading words that already fix the storage of a declaration, or that mark something other
/// than a plain variable.
const STORAGE_WORDS: &[&str] = &[
    "constant", "constexpr", "static", "uniform", "in", "out", "varying", "attribute", "layout",
    "struct", "thread", "device", "threadgroup", "using", "typedef", "return",
];

#[derive(Debug, Default, Clone, Copy)]
pub struct AddressSpaceNormalizer;

impl AddressSpaceNormalizer {
    pub fn rewrite(
        &self,
        program: &SourceProgram,
        diagnostics: &mut PipelineDiagnostics,
    ) -> SourceProgram {
        let text = program.text();
        let masked = program.masked();
        let mut edits = TextEdits::new();

        for item in program.items() {
            if item.kind != ItemKind::Statement {
                continue;
            }
            let statement = item.range.start..item.range.end - 1;
            let Some(eq) = masked[statement.clone()].find('=') else {
                continue;
            };
            let head = scan::trim_range(masked, statement.start..statement.start + eq);
            let Some(caps) = DECLARATION_HEAD.captures(&masked[head.clone()]) else {
                continue;
            };
            let ty = &caps["ty"];
            let name = &caps["name"];
            if STORAGE_WORDS.contains(&ty) {
                continue;
            }
            let dims = match (caps.name("tarr"), caps.name("narr")) {
                (Some(_), Some(_)) => continue,
                (Some(dims), None) | (None, Some(dims)) => {
                    let dims: String = dims.as_str().split_whitespace().collect();
                    if dims == "[]" {
                        debug!(name, "unsized global array left unchanged");
                        continue;
                    }
                    dims
                }
                (None, None) => String::new(),
            };

            let is_const = caps.name("const").is_some();
            edits.replace(head.clone(), format!("constant {} {}{}", ty, name, dims));

            let init = scan::trim_range(masked, statement.start + eq + 1..statement.end);
            if ARRAY_CONSTRUCTOR.is_match(&masked[init.clone()]) {
                let open = init.start + masked[init.clone()].find('(').unwrap_or_default();
                if let Some(close) = scan::find_matching(masked, open) {
                    if close + 1 == init.end {
                        edits.replace(init.clone(), format!("{{{}}}", &text[open + 1..close]));
                    }
                }
            }

            if !is_const {
                warn!(name, "promoting mutable global to constant");
                diagnostics.push(
                    Diagnostic::warning(format!(
                        "global `{}` has an initializer but no `const`; promoted to `constant`, writes to it will not compile",
                        name
                    ))
                    .with_span(Span::from_range(item.range.clone()))
                    .with_suggestion(format!("declare `{}` as `const` or move it into a function", name))
                    .with_code("mutable-global-promoted")
                    .with_source_context(STAGE_ADDRESS_SPACE),
                );
            }
        }

        if edits.is_empty() {
            return program.clone();
        }
        debug!(declarations = edits.len(), "normalized global address spaces");
        SourceProgram::new(edits.apply(text))
    }
}

super::text_stage!(AddressSpaceNormalizer, super::STAGE_ADDRESS_SPACE);

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn normalize(source: &str) -> (String, PipelineDiagnostics) {
        let mut diagnostics = PipelineDiagnostics::default();
        let text = AddressSpaceNormalizer
            .rewrite(&SourceProgram::new(source), &mut diagnostics)
            .into_text();
        (text, diagnostics)
    }

    #[test]
    fn const_arrays_move_dimensions_to_the_name() {
        let (text, diagnostics) = normalize(
            "const float3[3] palette = {float3(1.0), float3(0.5), float3(0.0)};\n",
        );
        assert_eq!(
            text,
            "constant float3 palette[3] = {float3(1.0), float3(0.5), float3(0.0)};\n"
        );
        assert!(diagnostics.items.is_empty());
    }

    #[test]
    fn array_constructors_become_brace_lists() {
        let (text, _) = normalize("const float weights[3] = float[3](0.25, 0.5, 0.25);");
        assert_eq!(text, "constant float weights[3] = {0.25, 0.5, 0.25};");
    }

    #[test]
    fn scalar_const_is_rewritten() {
        let (text, _) = normalize("const float PI = 3.14159;");
        assert_eq!(text, "constant float PI = 3.14159;");
    }

    #[test]
    fn mutable_global_is_promoted_with_warning() {
        let (text, diagnostics) = normalize("float speed = 2.0;\nvoid f() { float local = 1.0; }");
        assert_eq!(text, "constant float speed = 2.0;\nvoid f() { float local = 1.0; }");
        let promoted: Vec<_> = diagnostics.with_code("mutable-global-promoted").collect();
        assert_eq!(promoted.len(), 1);
        assert!(promoted[0].message.contains("`speed`"));
    }

    #[test]
    fn passes_through_other_top_level_items() {
        let source = "constant float A = 1.0;\nconst float B[] = {1.0};\n#define C 2.0\nfloat f(float x);\nstruct S { float v; };\nfloat g;\n";
        let (text, diagnostics) = normalize(source);
        assert_eq!(text, source);
        assert!(diagnostics.items.is_empty());
    }

    #[test]
    fn normalization_is_idempotent() {
        let (once, _) = normalize("const float2[2] o = float2[2](float2(0.0), float2(1.0));");
        let (twice, _) = normalize(&once);
        assert_eq!(once, twice);
    }
}
