use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// lumikey: audio feature extraction for lighting controllers.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Fichier de configuration TOML. Défaut : config/default.toml.
    #[arg(short, long, global = true, default_value = "config/default.toml")]
    pub config: PathBuf,

    /// Niveau de log : error, warn, info, debug, trace.
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyse des fichiers audio et écrit une frame de features par hop (JSON Lines).
    Analyze {
        /// Fichiers audio (WAV, MP3, FLAC, OGG, AAC).
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Dossier de sortie : un `<nom>.jsonl` par fichier. Défaut : stdout.
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// N'écrire qu'un résumé JSON par fichier.
        #[arg(long, default_value_t = false)]
        summary: bool,
    },

    /// Affiche la configuration effective en TOML.
    Config,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn analyze_parses_files_and_flags() {
        let cli = Cli::parse_from([
            "lumikey", "analyze", "a.wav", "b.flac", "--summary", "--out", "out",
        ]);
        match cli.command {
            Command::Analyze {
                files,
                out,
                summary,
            } => {
                assert_eq!(files.len(), 2);
                assert_eq!(out, Some(PathBuf::from("out")));
                assert!(summary);
            }
            Command::Config => panic!("expected analyze"),
        }
        assert_eq!(cli.log_level, "warn");
    }

    #[test]
    fn analyze_requires_a_file() {
        assert!(Cli::try_parse_from(["lumikey", "analyze"]).is_err());
    }
}
