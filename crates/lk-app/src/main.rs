use std::io::Write;

use anyhow::Result;
use clap::Parser;
use lk_core::config::EngineConfig;

pub mod analyze;
pub mod cli;

fn main() -> Result<()> {
    // 1. Parser CLI
    let cli = cli::Cli::parse();

    // 2. Initialiser le logging
    env_logger::Builder::new()
        .filter_level(cli.log_level.parse().unwrap_or(log::LevelFilter::Warn))
        .init();

    // 3. Charger la config
    let config = resolve_config(&cli)?;

    match cli.command {
        cli::Command::Analyze {
            ref files,
            ref out,
            summary,
        } => analyze::run(files, out.as_deref(), summary, &config),
        cli::Command::Config => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(config.to_toml_string()?.as_bytes())?;
            Ok(())
        }
    }
}

/// Load `--config` if it exists, defaults otherwise.
fn resolve_config(cli: &cli::Cli) -> Result<EngineConfig> {
    if cli.config.exists() {
        lk_core::config::load_config(&cli.config)
    } else {
        log::warn!(
            "Config introuvable : {}. Utilisation des défauts.",
            cli.config.display()
        );
        Ok(EngineConfig::default())
    }
}
