//! Host compilation and render-pipeline construction.
//!
//! Compiling MSL and creating the pipeline object belong to the host graphics stack, so both
//! are traits the caller implements. [`ExternalCompiler`] covers the common case of an offline
//! command-line compiler.

use crate::error::TranspileError;
use crate::options::TranspileOptions;
use crate::stages::assemble::AssembledProgram;
use crate::transpiler::Transpiler;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Command;
use thiserror::Error;
use tracing::{debug, info, info_span};
use vulpes_core::diagnostics;

/// Compiles assembled MSL text and looks up the fragment function by symbol.
pub trait ShaderCompiler {
    type Function;

    fn compile(&self, source: &str, entry_symbol: &str) -> Result<Self::Function, String>;
}

/// Builds a render pipeline from a caller-supplied vertex function and a compiled fragment
/// function.
pub trait PipelineFactory {
    type Function;
    type VertexFunction;
    type PixelFormat: Copy;
    type Pipeline;

    fn build(
        &self,
        vertex: &Self::VertexFunction,
        fragment: Self::Function,
        format: Self::PixelFormat,
    ) -> Result<Self::Pipeline, String>;
}

#[derive(Error, Debug, Diagnostic)]
pub enum BuildError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Transpile(#[from] TranspileError),

    #[error("shader compilation failed for `{entry_symbol}`: {message}")]
    #[diagnostic(
        code(vulpes::compile_failed),
        help("the generated source is attached; compiler messages refer to its lines")
    )]
    Compile {
        entry_symbol: String,
        message: String,
        #[source_code]
        assembled: String,
    },

    #[error("render pipeline creation failed for `{entry_symbol}`: {message}")]
    #[diagnostic(code(vulpes::pipeline_failed))]
    Pipeline {
        entry_symbol: String,
        message: String,
        #[source_code]
        assembled: String,
    },
}

#[derive(Debug)]
pub struct BuiltPipeline<P> {
    pub pipeline: P,
    pub assembled: AssembledProgram,
    pub diagnostics: Vec<diagnostics::Diagnostic>,
}

/// Transpile, compile and build in one call.
pub struct RenderPipelineBuilder<C, F> {
    transpiler: Transpiler,
    compiler: C,
    factory: F,
}

impl<C, F> RenderPipelineBuilder<C, F>
where
    C: ShaderCompiler,
    F: PipelineFactory<Function = C::Function>,
{
    pub fn new(options: TranspileOptions, compiler: C, factory: F) -> Result<Self, BuildError> {
        Ok(Self {
            transpiler: Transpiler::new(options)?,
            compiler,
            factory,
        })
    }

    pub fn transpiler(&self) -> &Transpiler {
        &self.transpiler
    }

    pub fn build(
        &self,
        source: &str,
        vertex: &F::VertexFunction,
        format: F::PixelFormat,
    ) -> Result<BuiltPipeline<F::Pipeline>, BuildError> {
        build_pipeline(
            &self.transpiler,
            &self.compiler,
            &self.factory,
            source,
            vertex,
            format,
        )
    }
}

/// The steps behind [`RenderPipelineBuilder::build`], for callers that keep several
/// transpilers around one compiler and factory.
pub fn build_pipeline<C, F>(
    transpiler: &Transpiler,
    compiler: &C,
    factory: &F,
    source: &str,
    vertex: &F::VertexFunction,
    format: F::PixelFormat,
) -> Result<BuiltPipeline<F::Pipeline>, BuildError>
where
    C: ShaderCompiler,
    F: PipelineFactory<Function = C::Function>,
{
    let output = transpiler.transpile(source)?;
    let assembled = output.assembled;
    let _span = info_span!("build_pipeline", entry_symbol = %assembled.entry_symbol).entered();

    let function = compiler
        .compile(&assembled.source, &assembled.entry_symbol)
        .map_err(|message| BuildError::Compile {
            entry_symbol: assembled.entry_symbol.clone(),
            message,
            assembled: assembled.source.clone(),
        })?;
    debug!("fragment function compiled");

    let pipeline = factory
        .build(vertex, function, format)
        .map_err(|message| BuildError::Pipeline {
            entry_symbol: assembled.entry_symbol.clone(),
            message,
            assembled: assembled.source.clone(),
        })?;
    info!("render pipeline built");

    Ok(BuiltPipeline {
        pipeline,
        assembled,
        diagnostics: output.diagnostics,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledArtifact {
    pub entry_symbol: String,
    pub bytes: Vec<u8>,
}

/// Runs a command-line compiler on a temporary copy of the source.
///
/// `{input}` and `{output}` in `args` are replaced with the temporary source and artifact
/// paths. Without an `{output}` placeholder the artifact is whatever the command writes to
/// stdout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalCompiler {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for ExternalCompiler {
    fn default() -> Self {
        Self {
            program: "xcrun".to_string(),
            args: ["-sdk", "macosx", "metal", "-c", "{input}", "-o", "{output}"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl ExternalCompiler {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    fn expand_args(&self, input: &Path, output: &Path) -> Vec<String> {
        let input = input.to_string_lossy();
        let output = output.to_string_lossy();
        self.args
            .iter()
            .map(|arg| arg.replace("{input}", &input).replace("{output}", &output))
            .collect()
    }
}

impl ShaderCompiler for ExternalCompiler {
    type Function = CompiledArtifact;

    fn compile(&self, source: &str, entry_symbol: &str) -> Result<CompiledArtifact, String> {
        let dir = tempfile::tempdir().map_err(|e| format!("failed to create temp dir: {}", e))?;
        let input = dir.path().join(format!("{}.metal", entry_symbol));
        let output = dir.path().join(format!("{}.air", entry_symbol));
        std::fs::write(&input, source)
            .map_err(|e| format!("failed to write {}: {}", input.display(), e))?;

        let args = self.expand_args(&input, &output);
        debug!(program = %self.program, ?args, "running shader compiler");
        let result = Command::new(&self.program)
            .args(&args)
            .output()
            .map_err(|e| format!("failed to run `{}`: {}", self.program, e))?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr).trim().to_string();
            return Err(if stderr.is_empty() {
                format!("`{}` exited with {}", self.program, result.status)
            } else {
                stderr
            });
        }

        let bytes = if self.args.iter().any(|arg| arg.contains("{output}")) {
            std::fs::read(&output).map_err(|e| format!("failed to read {}: {}", output.display(), e))?
        } else {
            result.stdout
        };
        Ok(CompiledArtifact {
            entry_symbol: entry_symbol.to_string(),
            bytes,
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sh(script: &str) -> ExternalCompiler {
        ExternalCompiler::new("sh", vec!["-c".to_string(), script.to_string()])
    }

    #[test]
    fn default_targets_the_metal_toolchain() {
        let compiler = ExternalCompiler::default();
        assert_eq!(compiler.program, "xcrun");
        assert!(compiler.args.contains(&"{input}".to_string()));
    }

    #[test]
    fn copies_output_file() {
        let artifact = sh("cat {input} > {output}")
            .compile("fragment float4 f() {}", "f")
            .unwrap();
        assert_eq!(artifact.entry_symbol, "f");
        assert_eq!(artifact.bytes, b"fragment float4 f() {}".to_vec());
    }

    #[test]
    fn captures_stdout_without_output_placeholder() {
        let artifact = sh("printf ok").compile("", "f").unwrap();
        assert_eq!(artifact.bytes, b"ok".to_vec());
    }

    #[test]
    fn reports_stderr_on_failure() {
        let err = sh("echo 'error: use of undeclared identifier' >&2; exit 1")
            .compile("", "f")
            .unwrap_err();
        assert_eq!(err, "error: use of undeclared identifier");
    }
}
