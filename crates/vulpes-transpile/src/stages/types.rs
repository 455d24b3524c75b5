use super::rewrite_code;
use crate::program::SourceProgram;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::debug;
use vulpes_pipeline::PipelineDiagnostics;

static TYPE_TOKEN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:(?P<vec>[iub]?vec)(?P<n>[234])|mat(?P<cols>[234])(?:x(?P<rows>[234]))?|(?P<sampler>sampler2D))\b")
        .expect("type pattern")
});

/// Whole-token replacement of GLSL type spellings with their MSL equivalents.
#[derive(Debug, Default, Clone, Copy)]
pub struct TypeMapper;

impl TypeMapper {
    pub fn rewrite(
        &self,
        program: &SourceProgram,
        _diagnostics: &mut PipelineDiagnostics,
    ) -> SourceProgram {
        let (text, count) = rewrite_code(program, &TYPE_TOKEN, |caps| Some(target_type(caps)));
        debug!(count, "mapped type tokens");
        SourceProgram::new(text)
    }
}

fn target_type(caps: &Captures<'_>) -> String {
    if let (Some(vec), Some(n)) = (caps.name("vec"), caps.name("n")) {
        let scalar = match vec.as_str() {
            "ivec" => "int",
            "uvec" => "uint",
            "bvec" => "bool",
            _ => "float",
        };
        return format!("{}{}", scalar, n.as_str());
    }
    if let Some(cols) = caps.name("cols") {
        let rows = caps.name("rows").unwrap_or(cols);
        return format!("float{}x{}", cols.as_str(), rows.as_str());
    }
    "texture2d<float>".to_string()
}

super::text_stage!(TypeMapper, super::STAGE_TYPES);

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn map(source: &str) -> String {
        TypeMapper
            .rewrite(&SourceProgram::new(source), &mut PipelineDiagnostics::default())
            .into_text()
    }

    #[test]
    fn maps_vectors_matrices_and_samplers() {
        assert_eq!(
            map("vec3 a; ivec2 b; uvec4 c; bvec3 d; mat3 m; mat2x4 n; uniform sampler2D s;"),
            "float3 a; int2 b; uint4 c; bool3 d; float3x3 m; float2x4 n; uniform texture2d<float> s;"
        );
    }

    #[test]
    fn never_touches_longer_identifiers() {
        let source = "float myvec2 = vec2_len + mat3x + xvec4 + sampler2DArray;";
        assert_eq!(map(source), source);
    }

    #[test]
    fn mapping_is_idempotent() {
        let once = map("vec2 uv = vec2(1.0); mat4 m; sampler2D t;");
        assert_eq!(map(&once), once);
    }
}
