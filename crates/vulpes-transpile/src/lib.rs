//! Shadertoy-flavoured GLSL to Metal Shading Language transpiler.
//!
//! The transpiler is a fixed sequence of text stages run through a
//! [`vulpes_pipeline::Pipeline`]. Recognition is structural (balanced delimiters,
//! identifier boundaries, top-level statements), never grammar-based: constructs no stage
//! targets pass through untouched and the host compiler has the final word.
//!
//! ```no_run
//! use vulpes_transpile::{Transpiler, TranspileOptions};
//!
//! let transpiler = Transpiler::new(TranspileOptions::default())?;
//! let output = transpiler.transpile(
//!     "void mainImage(out vec4 c, in vec2 p) { c = texture(iChannel0, p / iResolution); }",
//! )?;
//! println!("{}", output.assembled.source);
//! # Ok::<(), vulpes_transpile::TranspileError>(())
//! ```

pub mod ambient;
pub mod backend;
pub mod error;
pub mod options;
pub mod program;
pub mod session;
pub mod stages;
pub mod transpiler;

pub use ambient::{AmbientValue, AMBIENT_VALUES, I_RESOLUTION, I_TIME};
pub use backend::{
    build_pipeline, BuildError, BuiltPipeline, CompiledArtifact, ExternalCompiler,
    PipelineFactory, RenderPipelineBuilder, ShaderCompiler,
};
pub use error::{Result, TranspileError};
pub use options::{ModSemantics, PropagationMode, TranspileOptions, DEFAULT_ENTRY_SYMBOL};
pub use program::{FunctionSignature, ParamQualifier, Parameter, SourceProgram};
pub use session::{EffectKind, EffectStatus, ShaderSession};
pub use stages::assemble::AssembledProgram;
pub use stages::entry::{EntryPoint, ExtractedProgram};
pub use stages::uniforms::UniformUsageSet;
pub use transpiler::{read_source, transpile, TranspileOutput, Transpiler};
