//! Transpile command implementation

use super::common::{read_shader, TranspileFlags};
use crate::{cli::CliConfig, diagnostics::print_shader_diagnostics, CliError, Result};
use clap::Args;
use console::style;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use vulpes_transpile::Transpiler;

/// Arguments for the transpile command
#[derive(Debug, Clone, Args)]
pub struct TranspileArgs {
    /// Shader file(s) to transpile
    #[arg(required = true)]
    pub input: Vec<PathBuf>,

    /// Output file, or directory when several inputs are given (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub flags: TranspileFlags,
}

/// Execute the transpile command
pub async fn transpile_command(args: TranspileArgs, config: &CliConfig) -> Result<()> {
    let options = args.flags.resolve(config);
    let transpiler = Transpiler::new(options)?;
    let to_directory = args.input.len() > 1 || args.output.as_deref().is_some_and(Path::is_dir);

    if to_directory {
        let Some(dir) = &args.output else {
            return Err(CliError::InvalidInput(
                "--output <DIR> is required when transpiling several files".to_string(),
            ));
        };
        tokio::fs::create_dir_all(dir).await?;
    }

    for input in &args.input {
        let source = read_shader(input).await?;
        let output = transpiler.transpile(&source)?;
        print_shader_diagnostics(input, &source, &output.diagnostics, args.flags.plain, false);

        let destination = match &args.output {
            Some(dir) if to_directory => Some(dir.join(metal_file_name(input))),
            Some(file) => Some(file.clone()),
            None => None,
        };
        match destination {
            Some(path) => {
                tokio::fs::write(&path, &output.assembled.source).await?;
                info!(
                    input = %input.display(),
                    output = %path.display(),
                    entry_symbol = %output.assembled.entry_symbol,
                    "transpiled shader"
                );
                eprintln!(
                    "{} {} -> {}",
                    style("✔").green(),
                    input.display(),
                    path.display()
                );
            }
            None => {
                debug!(input = %input.display(), "writing transpiled shader to stdout");
                print!("{}", output.assembled.source);
            }
        }
    }

    Ok(())
}

fn metal_file_name(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "shader".to_string());
    PathBuf::from(format!("{}.metal", stem))
}
