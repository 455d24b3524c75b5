//! Information command implementation

use crate::{cli::CliConfig, Result};
use clap::Args;
use console::style;
use vulpes_transpile::{EffectKind, Transpiler, AMBIENT_VALUES, DEFAULT_ENTRY_SYMBOL};

/// Arguments for the info command
#[derive(Debug, Clone, Default, Args)]
pub struct InfoArgs {
    /// Show the transpile stages
    #[arg(long)]
    pub stages: bool,

    /// Show effect kinds and configured shaders
    #[arg(long)]
    pub effects: bool,

    /// Show everything
    #[arg(long)]
    pub all: bool,
}

/// Execute the info command
pub async fn info_command(args: InfoArgs, config: &CliConfig) -> Result<()> {
    print_version_info();

    if args.all || args.stages {
        print_stage_info(config)?;
    }

    if args.all || args.effects {
        print_effect_info(config);
    }

    if !args.stages && !args.effects && !args.all {
        print_basic_info(config);
    }

    Ok(())
}

fn print_version_info() {
    println!("{}", style("Vulpes Shader").cyan().bold());
    println!("Version: {}", env!("CARGO_PKG_VERSION"));
    println!("Target: Metal Shading Language");
    println!();
}

fn print_basic_info(config: &CliConfig) {
    println!("{}", style("Ambient values").yellow().bold());
    for ambient in &AMBIENT_VALUES {
        println!("  {} {}", ambient.ty, ambient.name);
    }
    println!(
        "Entry symbol: {}",
        config
            .transpile
            .entry_symbol
            .as_deref()
            .unwrap_or(DEFAULT_ENTRY_SYMBOL)
    );
    println!("Propagation: {}", config.transpile.propagation);
    println!("Mod semantics: {}", config.transpile.mod_semantics);
    println!(
        "Compiler: {} {}",
        config.compiler.program,
        config.compiler.args.join(" ")
    );
}

fn print_stage_info(config: &CliConfig) -> Result<()> {
    let options = config.transpile.to_options();
    let transpiler = Transpiler::new(options.clone())?;
    println!("{}", style("Stages").yellow().bold());
    for (index, stage) in transpiler.stages().iter().enumerate() {
        let marker = if options.pipeline.stage_enabled(stage) {
            style("on").green()
        } else {
            style("off").red()
        };
        println!("  {}. {:<20} {}", index + 1, stage, marker);
    }
    println!();
    Ok(())
}

fn print_effect_info(config: &CliConfig) {
    println!("{}", style("Effects").yellow().bold());
    for kind in EffectKind::ALL {
        let source = config
            .effects
            .get(&kind)
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "(built-in)".to_string());
        println!("  {:<16} {:<34} {}", kind.name(), kind.entry_symbol(), source);
    }
    println!();
}
