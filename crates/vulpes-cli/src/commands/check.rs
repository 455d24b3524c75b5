//! Shader checking command implementation

use super::common::{read_shader, TranspileFlags};
use crate::{
    cli::CliConfig,
    diagnostics::{count_warnings, print_shader_diagnostics},
    CliError, Result,
};
use clap::Args;
use console::style;
use std::path::PathBuf;
use tracing::{info, warn};
use vulpes_transpile::{BuildError, EffectKind, ShaderCompiler, Transpiler};

/// Arguments for the check command
#[derive(Debug, Clone, Args)]
pub struct CheckArgs {
    /// Shader files to check (defaults to the `[effects]` paths from the config)
    pub paths: Vec<PathBuf>,

    /// Also run the configured offline compiler on the assembled source
    #[arg(long)]
    pub compile: bool,

    /// Treat warnings as failures
    #[arg(long)]
    pub strict: bool,

    #[command(flatten)]
    pub flags: TranspileFlags,
}

struct Target {
    path: PathBuf,
    effect: Option<EffectKind>,
}

/// Execute the check command
pub async fn check_command(args: CheckArgs, config: &CliConfig) -> Result<()> {
    let targets: Vec<Target> = if args.paths.is_empty() {
        config
            .effects
            .iter()
            .map(|(kind, path)| Target {
                path: path.clone(),
                effect: Some(*kind),
            })
            .collect()
    } else {
        args.paths
            .iter()
            .map(|path| Target {
                path: path.clone(),
                effect: None,
            })
            .collect()
    };
    if targets.is_empty() {
        return Err(CliError::InvalidInput(
            "no shader paths given and no [effects] configured".to_string(),
        ));
    }

    println!("{} Checking {} shader(s)...", style("🔍").cyan(), targets.len());
    let mut failed = 0;
    for target in &targets {
        match check_one(target, &args, config).await {
            Ok(warnings) if args.strict && warnings > 0 => {
                failed += 1;
                println!(
                    "{} {} ({} warning(s), strict)",
                    style("✖").red(),
                    target.path.display(),
                    warnings
                );
            }
            Ok(warnings) => {
                println!(
                    "{} {} ({} warning(s))",
                    style("✔").green(),
                    target.path.display(),
                    warnings
                );
            }
            Err(err) => {
                failed += 1;
                warn!(path = %target.path.display(), "check failed");
                if !crate::diagnostics::render_cli_error(&err) {
                    eprintln!("{}", err);
                }
                println!("{} {}", style("✖").red(), target.path.display());
            }
        }
    }

    if failed > 0 {
        return Err(CliError::CheckFailed {
            failed,
            total: targets.len(),
        });
    }
    info!(checked = targets.len(), "all shaders passed");
    Ok(())
}

async fn check_one(target: &Target, args: &CheckArgs, config: &CliConfig) -> Result<usize> {
    let mut options = args.flags.resolve(config);
    if let (Some(kind), None) = (target.effect, &args.flags.entry) {
        options.entry_symbol = Some(kind.entry_symbol().to_string());
    }
    let transpiler = Transpiler::new(options)?;
    let source = read_shader(&target.path).await?;
    let output = transpiler.transpile(&source)?;
    print_shader_diagnostics(&target.path, &source, &output.diagnostics, args.flags.plain, false);

    if args.compile {
        let compiler = config.compiler.clone();
        let assembled = output.assembled.clone();
        let compiled = tokio::task::spawn_blocking(move || {
            compiler.compile(&assembled.source, &assembled.entry_symbol)
        })
        .await
        .map_err(|e| CliError::InvalidInput(format!("compiler task failed: {}", e)))?;
        if let Err(message) = compiled {
            return Err(CliError::Build(BuildError::Compile {
                entry_symbol: output.assembled.entry_symbol.clone(),
                message,
                assembled: output.assembled.source.clone(),
            }));
        }
        info!(path = %target.path.display(), "compiled");
    }

    Ok(count_warnings(&output.diagnostics))
}
