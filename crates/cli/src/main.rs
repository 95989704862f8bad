//! chess-mistakes - report a player's mistakes from annotated PGN files

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use chess_mistakes_core::{analyze_files, AnalysisConfig};

#[derive(Parser)]
#[command(name = "chess-mistakes")]
#[command(
    version,
    about = "Find a player's recurring mistakes in annotated PGN",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze PGN files and print the report as JSON
    Analyze {
        /// Player to track, matched against the White/Black headers
        #[arg(short, long)]
        player: String,

        /// TOML file overriding the default thresholds
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,

        /// PGN files with [%eval] annotations
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Print the default configuration as TOML
    Config,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&PathBuf>) -> Result<AnalysisConfig> {
    let Some(path) = path else {
        return Ok(AnalysisConfig::default());
    };
    let config = AnalysisConfig::load(path)
        .with_context(|| format!("failed to load config from {}", path.display()))?;
    info!(path = %path.display(), "loaded configuration");
    Ok(config)
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            player,
            config,
            pretty,
            files,
        } => {
            if player.trim().is_empty() {
                bail!("player name must not be empty");
            }
            let config = load_config(config.as_ref())?;
            let result = analyze_files(&files, &player, &config).context("analysis failed")?;
            println!("{}", result.to_json(pretty)?);
        }
        Commands::Config => {
            print!("{}", AnalysisConfig::default().to_toml_string()?);
        }
    }

    Ok(())
}
