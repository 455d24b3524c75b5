//! Vulpes Shader CLI Library
//!
//! Command implementations, configuration and error reporting behind the `vulpes-shader`
//! binary.

pub mod cli;
pub mod commands;
pub mod diagnostics;

pub mod error {
    use thiserror::Error;
    use vulpes_transpile::{BuildError, TranspileError};

    #[derive(Error, Debug)]
    pub enum CliError {
        #[error("IO error: {0}")]
        Io(#[from] std::io::Error),

        #[error("Configuration error: {0}")]
        Config(String),

        #[error(transparent)]
        Transpile(#[from] TranspileError),

        #[error(transparent)]
        Build(#[from] BuildError),

        #[error("Invalid input: {0}")]
        InvalidInput(String),

        #[error("{failed} of {total} shader(s) failed")]
        CheckFailed { failed: usize, total: usize },
    }

    pub type Result<T> = std::result::Result<T, CliError>;
}

pub use error::{CliError, Result};
