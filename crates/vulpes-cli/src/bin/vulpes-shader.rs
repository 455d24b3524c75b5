//! `vulpes-shader`: turn Shadertoy-style post-processing shaders into Metal Shading Language.
//!
//! ```bash
//! vulpes-shader transpile crt.glsl                          # MSL on stdout
//! vulpes-shader transpile bloom.glsl glitch.glsl -o out/ --propagation transitive
//! vulpes-shader check --compile                             # configured effect shaders
//! vulpes-shader info --all
//! ```

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::{debug, error};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};
use vulpes_cli::{
    cli::CliConfig,
    commands::{self, check::CheckArgs, info::InfoArgs, transpile::TranspileArgs},
    diagnostics::{render_cli_error, setup_error_reporting},
    CliError, Result,
};

#[derive(Parser)]
#[command(
    name = "vulpes-shader",
    version,
    about = "Vulpes Shader: GLSL post-processing shaders to Metal Shading Language",
    long_about = r#"
Vulpes Shader rewrites Shadertoy-flavoured GLSL (mainImage, iResolution, iTime,
iChannel0) into a self-contained Metal Shading Language fragment program.

Settings are read from vulpes-shader.toml; flags on the command line win.

    vulpes-shader transpile crt.glsl -o crt.metal
    vulpes-shader check shaders/*.glsl --compile
    vulpes-shader info --stages
"#
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    logging: LoggingArgs,

    /// Read settings from this file instead of the default locations
    #[arg(short, long, global = true, env = "VULPES_SHADER_CONFIG")]
    config: Option<PathBuf>,

    /// Change to this directory before resolving any path
    #[arg(short = 'C', long = "directory", global = true)]
    directory: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Write MSL for one or more shaders
    Transpile(TranspileArgs),

    /// Transpile shaders and report diagnostics, optionally running the offline compiler
    Check(CheckArgs),

    /// Print stages, ambient values and effect slots
    Info(InfoArgs),
}

#[derive(Args)]
struct LoggingArgs {
    /// Raise log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Explicit log level; takes precedence over -v and -q
    #[arg(long = "log", global = true, value_enum)]
    level: Option<LogLevel>,

    /// Log line format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

impl LoggingArgs {
    fn directive(&self) -> &'static str {
        match (self.level, self.quiet, self.verbose) {
            (Some(LogLevel::Error), ..) | (None, true, _) => "error",
            (Some(LogLevel::Warn), ..) | (None, false, 0) => "warn",
            (Some(LogLevel::Info), ..) | (None, false, 1) => "info",
            (Some(LogLevel::Debug), ..) | (None, false, 2) => "debug",
            (Some(LogLevel::Trace), ..) | (None, false, _) => "trace",
        }
    }

    /// Logs go to stderr; stdout is reserved for transpiled source.
    fn init(&self) {
        let fmt = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_timer(tracing_subscriber::fmt::time::uptime());
        let layer = match self.log_format {
            LogFormat::Pretty => fmt.boxed(),
            LogFormat::Json => fmt.json().boxed(),
        };
        tracing_subscriber::registry()
            .with(layer)
            .with(EnvFilter::new(self.directive()))
            .init();
    }
}

async fn dispatch(command: Command, config: &CliConfig) -> Result<()> {
    match command {
        Command::Transpile(args) => commands::transpile_command(args, config).await,
        Command::Check(args) => commands::check_command(args, config).await,
        Command::Info(args) => commands::info_command(args, config).await,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_error_reporting()?;
    cli.logging.init();

    if let Some(dir) = &cli.directory {
        std::env::set_current_dir(dir).map_err(CliError::Io)?;
    }
    let config = CliConfig::load(cli.config.as_deref())?;
    debug!(?config, "resolved configuration");

    if let Err(err) = dispatch(cli.command, &config).await {
        if !render_cli_error(&err) {
            error!("{}", err);
        }
        std::process::exit(1);
    }
    Ok(())
}
