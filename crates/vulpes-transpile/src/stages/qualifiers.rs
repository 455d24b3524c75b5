//! Parameter qualifiers: `out`/`inout` become `thread` references, `in` is dropped.

use super::STAGE_QUALIFIERS;
use crate::program::{ParamQualifier, Parameter, SourceProgram};
use tracing::debug;
use vulpes_core::diagnostics::Diagnostic;
use vulpes_core::scan::TextEdits;
use vulpes_core::Span;
use vulpes_pipeline::PipelineDiagnostics;

#[derive(Debug, Default, Clone, Copy)]
pub struct ParameterQualifierRewriter;

impl ParameterQualifierRewriter {
    pub fn rewrite(
        &self,
        program: &SourceProgram,
        diagnostics: &mut PipelineDiagnostics,
    ) -> SourceProgram {
        let mut edits = TextEdits::new();
        for function in program.functions() {
            for param in &function.params {
                match param.qualifier {
                    ParamQualifier::Out | ParamQualifier::InOut if param.array_suffix.is_some() => {
                        diagnostics.push(
                            Diagnostic::warning(format!(
                                "array output parameter `{}` of `{}` left unchanged",
                                param.name, function.name
                            ))
                            .with_span(Span::from_range(param.span.clone()))
                            .with_code("array-out-parameter")
                            .with_source_context(STAGE_QUALIFIERS),
                        );
                    }
                    ParamQualifier::Out | ParamQualifier::InOut => {
                        edits.replace(
                            param.span.clone(),
                            format!("thread {}& {}", param.ty, param.name),
                        );
                    }
                    ParamQualifier::In => {
                        edits.replace(param.span.clone(), by_value(param));
                    }
                    ParamQualifier::None | ParamQualifier::Thread => {}
                }
            }
        }
        if edits.is_empty() {
            return program.clone();
        }
        debug!(parameters = edits.len(), "rewrote parameter qualifiers");
        SourceProgram::new(edits.apply(program.text()))
    }
}

fn by_value(param: &Parameter) -> String {
    let mut out = String::new();
    if param.is_const {
        out.push_str("const ");
    }
    out.push_str(&param.ty);
    if !param.name.is_empty() {
        out.push(' ');
        out.push_str(&param.name);
    }
    if let Some(suffix) = &param.array_suffix {
        out.push_str(suffix);
    }
    out
}

super::text_stage!(ParameterQualifierRewriter, super::STAGE_QUALIFIERS);
