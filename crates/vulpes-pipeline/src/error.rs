use crate::config::PipelineOptions;
use vulpes_core::diagnostics::{Diagnostic, DiagnosticDisplayOptions, DiagnosticManager};
use std::error::Error;
use std::fmt;

/// Diagnostics collected while stages run.
///
/// `pending` holds what the current stage produced and is flushed to the log after the stage
/// finishes; `items` keeps every diagnostic for the caller.
#[derive(Debug, Default, Clone)]
pub struct PipelineDiagnostics {
    pub items: Vec<Diagnostic>,
    pending: usize,
}

impl PipelineDiagnostics {
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
        self.pending += 1;
    }

    pub fn emit_stage(&mut self, stage: &'static str, options: &PipelineOptions) {
        if self.pending == 0 {
            return;
        }
        let opts = if options.debug.plain_diagnostics {
            DiagnosticDisplayOptions::plain(options.debug.verbose)
        } else {
            DiagnosticDisplayOptions::pretty(options.debug.verbose)
        };
        let fresh = &self.items[self.items.len() - self.pending..];
        DiagnosticManager::emit(fresh, Some(stage), &opts);
        self.pending = 0;
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(Diagnostic::is_error)
    }

    pub fn with_code<'a>(&'a self, code: &'a str) -> impl Iterator<Item = &'a Diagnostic> + 'a {
        self.items
            .iter()
            .filter(move |d| d.code.as_deref() == Some(code))
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

#[derive(Debug)]
pub struct PipelineError {
    pub stage: &'static str,
    pub message: String,
}

impl PipelineError {
    pub fn new(stage: &'static str, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.stage, self.message)
    }
}

impl Error for PipelineError {}
