//! Pipeline construction and effect sessions against an in-memory backend.

use pretty_assertions::assert_eq;
use std::io::Write;
use vulpes_transpile::{
    BuildError, EffectKind, EffectStatus, PipelineFactory, RenderPipelineBuilder, ShaderCompiler,
    ShaderSession, TranspileError, TranspileOptions,
};

/// Rejects any source containing `#error`; the "function" is the entry symbol.
#[derive(Default)]
struct FakeCompiler;

impl ShaderCompiler for FakeCompiler {
    type Function = String;

    fn compile(&self, source: &str, entry_symbol: &str) -> Result<String, String> {
        if source.contains("#error") {
            return Err("program_source:12:1: error: #error directive".to_string());
        }
        if !source.contains(&format!("fragment float4 {}(", entry_symbol)) {
            return Err(format!("function `{}` not found", entry_symbol));
        }
        Ok(entry_symbol.to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
struct FakePipeline {
    vertex: &'static str,
    fragment: String,
    format: u32,
}

struct FakeFactory {
    reject: bool,
}

impl PipelineFactory for FakeFactory {
    type Function = String;
    type VertexFunction = &'static str;
    type PixelFormat = u32;
    type Pipeline = FakePipeline;

    fn build(
        &self,
        vertex: &&'static str,
        fragment: String,
        format: u32,
    ) -> Result<FakePipeline, String> {
        if self.reject {
            return Err("pixel format mismatch".to_string());
        }
        Ok(FakePipeline {
            vertex: *vertex,
            fragment,
            format,
        })
    }
}

const SHADER: &str = "void mainImage(out vec4 c, in vec2 p) { c = texture(iChannel0, p / iResolution); }";

fn default_pipeline() -> FakePipeline {
    FakePipeline {
        vertex: "fullscreen_vertex",
        fragment: "builtin_fragment".to_string(),
        format: 80,
    }
}

#[test]
fn builds_pipeline_from_source() {
    let builder = RenderPipelineBuilder::new(
        TranspileOptions::default().with_entry_symbol("custom_fx"),
        FakeCompiler::default(),
        FakeFactory { reject: false },
    )
    .unwrap();
    let built = builder.build(SHADER, &"fullscreen_vertex", 80).unwrap();
    assert_eq!(
        built.pipeline,
        FakePipeline {
            vertex: "fullscreen_vertex",
            fragment: "custom_fx".to_string(),
            format: 80,
        }
    );
    assert_eq!(built.assembled.entry_symbol, "custom_fx");
    assert!(built.assembled.source.contains("iChannel0.sample(textureSampler, p / iResolution)"));
}

#[test]
fn compile_failure_carries_message_and_source() {
    let builder = RenderPipelineBuilder::new(
        TranspileOptions::default(),
        FakeCompiler::default(),
        FakeFactory { reject: false },
    )
    .unwrap();
    let err = builder
        .build(&format!("#error nope\n{}", SHADER), &"v", 80)
        .unwrap_err();
    match err {
        BuildError::Compile {
            entry_symbol,
            message,
            assembled,
        } => {
            assert_eq!(entry_symbol, "vulpes_custom_fragment");
            assert!(message.contains("#error directive"));
            assert!(assembled.contains("#error nope"));
            assert!(assembled.contains("fragment float4 vulpes_custom_fragment("));
        }
        other => panic!("expected compile failure, got {other:?}"),
    }
}

#[test]
fn pipeline_failure_is_distinct() {
    let builder = RenderPipelineBuilder::new(
        TranspileOptions::default(),
        FakeCompiler::default(),
        FakeFactory { reject: true },
    )
    .unwrap();
    let err = builder.build(SHADER, &"v", 80).unwrap_err();
    assert!(matches!(err, BuildError::Pipeline { ref message, .. } if message == "pixel format mismatch"));
}

#[test]
fn invalid_entry_symbol_is_a_transpile_error() {
    let result = RenderPipelineBuilder::new(
        TranspileOptions::default().with_entry_symbol("not valid"),
        FakeCompiler::default(),
        FakeFactory { reject: false },
    );
    assert!(matches!(
        result,
        Err(BuildError::Transpile(TranspileError::InvalidEntrySymbol(_)))
    ));
}

fn session() -> ShaderSession<FakeCompiler, FakeFactory> {
    ShaderSession::new(
        TranspileOptions::default(),
        FakeCompiler::default(),
        FakeFactory { reject: false },
        "fullscreen_vertex",
        80,
        default_pipeline(),
    )
    .unwrap()
}

#[test]
fn session_uses_custom_pipeline_per_effect() {
    let mut session = session();
    assert_eq!(session.status(EffectKind::Bloom), EffectStatus::Default);
    assert_eq!(session.install(EffectKind::Bloom, SHADER), EffectStatus::Custom);

    assert_eq!(session.pipeline(EffectKind::Bloom).fragment, "vulpes_bloom_fragment");
    assert_eq!(session.pipeline(EffectKind::HttpError), &default_pipeline());
    assert_eq!(
        session.assembled(EffectKind::Bloom).map(|a| a.entry_symbol.as_str()),
        Some("vulpes_bloom_fragment")
    );
}

#[test]
fn session_falls_back_when_compilation_fails() {
    let mut session = session();
    session.install(EffectKind::PageTransition, SHADER);
    let status = session.install(EffectKind::PageTransition, "#error broken\nvoid f() {}");
    match status {
        EffectStatus::Fallback { reason } => assert!(reason.contains("#error directive")),
        other => panic!("expected fallback, got {other:?}"),
    }
    assert_eq!(session.pipeline(EffectKind::PageTransition), &default_pipeline());
    assert!(session.assembled(EffectKind::PageTransition).is_none());

    session.clear(EffectKind::PageTransition);
    assert_eq!(session.status(EffectKind::PageTransition), EffectStatus::Default);
}

#[test]
fn session_reports_unavailable_source() {
    let mut session = session();
    let status = session.install_file(
        EffectKind::HttpError,
        std::path::Path::new("/nonexistent/http-error.glsl"),
    );
    assert!(matches!(status, EffectStatus::Fallback { ref reason } if reason.contains("unavailable")));
    assert_eq!(session.pipeline(EffectKind::HttpError), &default_pipeline());
}

#[test]
fn session_loads_shader_files() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(SHADER.as_bytes()).unwrap();
    let mut session = session();
    assert_eq!(
        session.install_file(EffectKind::HttpError, file.path()),
        EffectStatus::Custom
    );
    assert_eq!(session.pipeline(EffectKind::HttpError).fragment, "vulpes_http_error_fragment");
}
