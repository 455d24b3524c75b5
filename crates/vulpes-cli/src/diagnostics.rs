//! Diagnostic and error reporting utilities

use crate::{CliError, Result};
use console::style;
use miette::{Diagnostic, GraphicalReportHandler};
use std::path::Path;
use vulpes_core::diagnostics::{
    Diagnostic as ShaderDiagnostic, DiagnosticDisplayOptions, DiagnosticLevel, DiagnosticManager,
};

/// Set up enhanced error reporting with miette
pub fn setup_error_reporting() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .map_err(|e| CliError::Config(format!("Failed to setup error reporting: {}", e)))?;

    Ok(())
}

/// Render errors that carry a miette report. Returns `false` when the caller should log the
/// error itself.
pub fn render_cli_error(error: &CliError) -> bool {
    let report: &dyn Diagnostic = match error {
        CliError::Transpile(err) => err,
        CliError::Build(err) => err,
        _ => return false,
    };
    let mut out = String::new();
    if GraphicalReportHandler::new()
        .render_report(&mut out, report)
        .is_err()
    {
        return false;
    }
    eprintln!("{}", out);
    true
}

/// Print collected shader diagnostics for one input to stderr, with line and column for spans.
pub fn print_shader_diagnostics(
    path: &Path,
    source: &str,
    diagnostics: &[ShaderDiagnostic],
    plain: bool,
    verbose: bool,
) {
    let options = if plain {
        DiagnosticDisplayOptions::plain(verbose)
    } else {
        DiagnosticDisplayOptions::pretty(verbose)
    };
    for diagnostic in diagnostics {
        let lines = DiagnosticManager::render(std::slice::from_ref(diagnostic), None, &options);
        let Some((header, rest)) = lines.split_first() else {
            continue;
        };
        let location = match &diagnostic.span {
            Some(span) => {
                let (line, col) = span.line_col(source);
                format!("{}:{}:{}", path.display(), line, col)
            }
            None => path.display().to_string(),
        };
        let header = match diagnostic.level {
            DiagnosticLevel::Error => style(header).red().to_string(),
            DiagnosticLevel::Warning => style(header).yellow().to_string(),
            DiagnosticLevel::Info => style(header).dim().to_string(),
        };
        eprintln!("{} {}", style(location).bold(), header);
        for line in rest.iter().filter(|line| !line.trim_start().starts_with("at ")) {
            eprintln!("{}", line);
        }
    }
}

pub fn count_warnings(diagnostics: &[ShaderDiagnostic]) -> usize {
    diagnostics
        .iter()
        .filter(|d| d.level == DiagnosticLevel::Warning)
        .count()
}
