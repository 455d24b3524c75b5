// Each submodule holds one transpile stage. Text stages map `SourceProgram` to
// `SourceProgram`; extraction and assembly change the context type.

/// Implements [`vulpes_pipeline::PipelineStage`] for a `SourceProgram -> SourceProgram` stage
/// whose work lives in an inherent `rewrite` method.
macro_rules! text_stage {
    ($stage:ty, $name:expr) => {
        impl vulpes_pipeline::PipelineStage for $stage {
            type SrcCtx = $crate::program::SourceProgram;
            type DstCtx = $crate::program::SourceProgram;

            fn name(&self) -> &'static str {
                $name
            }

            fn run(
                &self,
                context: Self::SrcCtx,
                diagnostics: &mut vulpes_pipeline::PipelineDiagnostics,
            ) -> Result<Self::DstCtx, vulpes_pipeline::PipelineError> {
                Ok(self.rewrite(&context, diagnostics))
            }

            fn snapshot(&self, output: &Self::DstCtx) -> Option<String> {
                Some(output.text().to_string())
            }
        }
    };
}

pub(crate) use text_stage;

pub mod address_space;
pub mod assemble;
pub mod builtins;
pub mod directives;
pub mod entry;
pub mod qualifiers;
pub mod textures;
pub mod types;
pub mod uniforms;

use crate::program::SourceProgram;
use regex::{Captures, Regex};
use vulpes_core::scan::TextEdits;

pub const STAGE_DIRECTIVES: &str = "strip-directives";
pub const STAGE_TYPES: &str = "map-types";
pub const STAGE_TEXTURES: &str = "rewrite-textures";
pub const STAGE_BUILTINS: &str = "map-builtins";
pub const STAGE_ADDRESS_SPACE: &str = "address-space";
pub const STAGE_QUALIFIERS: &str = "param-qualifiers";
pub const STAGE_UNIFORMS: &str = "propagate-uniforms";
pub const STAGE_ENTRY: &str = "extract-entry";
pub const STAGE_ASSEMBLE: &str = "assemble";

/// Replace regex matches found in the code (comments excluded) of `program`.
///
/// `replace` returns `None` to keep a match as written. Returns the new text and the number
/// of replacements made.
pub(crate) fn rewrite_code(
    program: &SourceProgram,
    re: &Regex,
    mut replace: impl FnMut(&Captures<'_>) -> Option<String>,
) -> (String, usize) {
    let mut edits = TextEdits::new();
    for caps in re.captures_iter(program.masked()) {
        let Some(whole) = caps.get(0) else { continue };
        if let Some(replacement) = replace(&caps) {
            edits.replace(whole.range(), replacement);
        }
    }
    let count = edits.len();
    (edits.apply(program.text()), count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{ModSemantics, PropagationMode};
    use pretty_assertions::assert_eq;
    use vulpes_pipeline::{PipelineDiagnostics, PipelineStage};

    fn run_text_stage<S>(stage: &S, source: &str) -> (&'static str, Option<String>)
    where
        S: PipelineStage<SrcCtx = SourceProgram, DstCtx = SourceProgram>,
    {
        let out = stage
            .run(SourceProgram::new(source), &mut PipelineDiagnostics::default())
            .unwrap();
        (stage.name(), stage.snapshot(&out))
    }

    #[test]
    fn text_stages_run_through_the_pipeline_trait() {
        let source = "vec2 f() { return vec2(iTime); }";
        let names = [
            run_text_stage(&directives::DirectiveStripper, source).0,
            run_text_stage(&types::TypeMapper, source).0,
            run_text_stage(&textures::TextureCallRewriter, source).0,
            run_text_stage(&builtins::BuiltinFunctionMapper::new(ModSemantics::Exact), source).0,
            run_text_stage(&address_space::AddressSpaceNormalizer, source).0,
            run_text_stage(&qualifiers::ParameterQualifierRewriter, source).0,
            run_text_stage(&uniforms::UniformUsagePropagator::new(PropagationMode::SingleHop), source).0,
        ];
        assert_eq!(
            names,
            [
                STAGE_DIRECTIVES,
                STAGE_TYPES,
                STAGE_TEXTURES,
                STAGE_BUILTINS,
                STAGE_ADDRESS_SPACE,
                STAGE_QUALIFIERS,
                STAGE_UNIFORMS,
            ]
        );
        assert_eq!(
            run_text_stage(&types::TypeMapper, source).1.as_deref(),
            Some("float2 f() { return float2(iTime); }")
        );
    }
}
