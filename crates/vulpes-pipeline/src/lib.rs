pub mod config;
pub mod error;
pub mod pipeline;

pub use config::{DebugOptions, PipelineOptions};
pub use error::{PipelineDiagnostics, PipelineError};
pub use pipeline::{Pipeline, PipelineBuilder, PipelineStage};
