use crate::span::Span;
use std::fmt::{Display, Formatter};

/// Context handed to the line renderers.
struct DiagnosticRenderContext<'a> {
    context: &'a str,
    verbose_info: bool,
}

/// Built-in templates supported when emitting diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiagnosticTemplate {
    #[default]
    Pretty,
    Plain,
}

impl DiagnosticTemplate {
    fn render(
        self,
        diagnostic: &Diagnostic,
        ctx: &DiagnosticRenderContext<'_>,
    ) -> Option<Vec<String>> {
        match self {
            DiagnosticTemplate::Pretty => render_pretty(diagnostic, ctx),
            DiagnosticTemplate::Plain => render_plain(diagnostic, ctx),
        }
    }
}

/// Runtime configuration for emitting diagnostics.
#[derive(Debug, Clone)]
pub struct DiagnosticDisplayOptions {
    pub template: DiagnosticTemplate,
    pub verbose_info: bool,
}

impl DiagnosticDisplayOptions {
    pub fn with_template(template: DiagnosticTemplate, verbose_info: bool) -> Self {
        Self {
            template,
            verbose_info,
        }
    }

    pub fn pretty(verbose_info: bool) -> Self {
        Self::with_template(DiagnosticTemplate::Pretty, verbose_info)
    }

    pub fn plain(verbose_info: bool) -> Self {
        Self::with_template(DiagnosticTemplate::Plain, verbose_info)
    }
}

impl Default for DiagnosticDisplayOptions {
    fn default() -> Self {
        DiagnosticDisplayOptions::pretty(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DiagnosticLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub message: String,
    pub span: Option<Span>,
    pub suggestions: Vec<String>,
    pub source_context: Option<String>,
    pub code: Option<String>,
}

impl Diagnostic {
    fn with_level(level: DiagnosticLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            span: None,
            suggestions: Vec::new(),
            source_context: None,
            code: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::with_level(DiagnosticLevel::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::with_level(DiagnosticLevel::Warning, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::with_level(DiagnosticLevel::Info, message)
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_source_context(mut self, context: impl Into<String>) -> Self {
        self.source_context = Some(context.into());
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.level == DiagnosticLevel::Error
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(code) = &self.code {
            write!(f, " [{}]", code)?;
        }

        if !self.suggestions.is_empty() {
            let hints = self.suggestions.join("; ");
            write!(f, " (hints: {})", hints)?;
        }

        Ok(())
    }
}

/// Stateless sink that renders diagnostics into the `tracing` stream.
pub struct DiagnosticManager;

impl DiagnosticManager {
    /// Emit diagnostics using the provided template and options. The fallback context is used
    /// when a diagnostic does not specify a source context.
    pub fn emit(
        diagnostics: &[Diagnostic],
        fallback_context: Option<&str>,
        options: &DiagnosticDisplayOptions,
    ) {
        for diagnostic in diagnostics {
            let context = diagnostic
                .source_context
                .as_deref()
                .or(fallback_context)
                .unwrap_or("transpile");

            let render_ctx = DiagnosticRenderContext {
                context,
                verbose_info: options.verbose_info,
            };

            let Some(lines) = options.template.render(diagnostic, &render_ctx) else {
                continue;
            };
            for line in lines {
                match diagnostic.level {
                    DiagnosticLevel::Error => tracing::error!("{}", line),
                    DiagnosticLevel::Warning => tracing::warn!("{}", line),
                    DiagnosticLevel::Info => tracing::info!("{}", line),
                }
            }
        }
    }

    /// Render diagnostics to plain lines without logging them.
    pub fn render(
        diagnostics: &[Diagnostic],
        fallback_context: Option<&str>,
        options: &DiagnosticDisplayOptions,
    ) -> Vec<String> {
        diagnostics
            .iter()
            .filter_map(|diagnostic| {
                let context = diagnostic
                    .source_context
                    .as_deref()
                    .or(fallback_context)
                    .unwrap_or("transpile");
                let ctx = DiagnosticRenderContext {
                    context,
                    verbose_info: options.verbose_info,
                };
                options.template.render(diagnostic, &ctx)
            })
            .flatten()
            .collect()
    }
}

fn render_pretty(diagnostic: &Diagnostic, ctx: &DiagnosticRenderContext<'_>) -> Option<Vec<String>> {
    if matches!(diagnostic.level, DiagnosticLevel::Info) && !ctx.verbose_info {
        return None;
    }

    let prefix = match diagnostic.level {
        DiagnosticLevel::Error => "✖",
        DiagnosticLevel::Warning => "⚠",
        DiagnosticLevel::Info => "ℹ",
    };

    let header = match diagnostic.code.as_ref() {
        Some(code) => format!("{} [{}] {} ({})", prefix, ctx.context, diagnostic.message, code),
        None => format!("{} [{}] {}", prefix, ctx.context, diagnostic.message),
    };

    let mut lines = vec![header];

    if let Some(span) = &diagnostic.span {
        lines.push(format!("   at {}", span));
    }

    for suggestion in &diagnostic.suggestions {
        lines.push(format!("   → {}", suggestion));
    }

    Some(lines)
}

fn render_plain(diagnostic: &Diagnostic, ctx: &DiagnosticRenderContext<'_>) -> Option<Vec<String>> {
    if matches!(diagnostic.level, DiagnosticLevel::Info) && !ctx.verbose_info {
        return None;
    }

    let level = match diagnostic.level {
        DiagnosticLevel::Error => "ERROR",
        DiagnosticLevel::Warning => "WARNING",
        DiagnosticLevel::Info => "INFO",
    };

    let header = match diagnostic.code.as_ref() {
        Some(code) => format!("[{}] {}: {} ({})", ctx.context, level, diagnostic.message, code),
        None => format!("[{}] {}: {}", ctx.context, level, diagnostic.message),
    };

    let mut lines = vec![header];

    if let Some(span) = &diagnostic.span {
        lines.push(format!("   at {}", span));
    }

    for suggestion in &diagnostic.suggestions {
        lines.push(format!("   suggestion: {}", suggestion));
    }

    Some(lines)
}
