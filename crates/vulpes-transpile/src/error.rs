use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;
use vulpes_pipeline::PipelineError;

#[derive(Error, Debug, Diagnostic)]
pub enum TranspileError {
    #[error("invalid entry symbol `{0}`")]
    #[diagnostic(
        code(vulpes::invalid_entry_symbol),
        help("entry symbols must start with a letter or `_` and contain only letters, digits and `_`")
    )]
    InvalidEntrySymbol(String),

    #[error("shader source unavailable: {}", path.display())]
    #[diagnostic(code(vulpes::source_unavailable))]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    #[error(transparent)]
    #[diagnostic(code(vulpes::stage_failed))]
    Stage(#[from] PipelineError),
}

pub type Result<T> = std::result::Result<T, TranspileError>;
