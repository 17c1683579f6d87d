use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::EnvFilter;
use warodai_cli::{BuildOptions, LookupOptions};
use warodai_db::LoadMode;
use warodai_lookup::SearchMode;

#[derive(Parser)]
#[command(name = "warodai")]
#[command(about = "Build and query the Warodai Japanese-Russian dictionary")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse the raw dump and save the resolved dictionary.
    Build {
        /// Raw dump [env: WARODAI_SOURCE]
        #[arg(long)]
        source: Option<PathBuf>,
        /// Where to write the dictionary [env: WARODAI_DB]
        #[arg(long)]
        out: Option<PathBuf>,
        /// JSON loader config [env: WARODAI_CONFIG]
        #[arg(long)]
        config: Option<PathBuf>,
        /// mmap or owned [env: WARODAI_LOAD_MODE]
        #[arg(long)]
        load_mode: Option<LoadMode>,
    },
    /// Look a word up in a saved dictionary and print JSON.
    Lookup {
        lexeme: String,
        /// Saved dictionary [env: WARODAI_DB]
        #[arg(long)]
        db: Option<PathBuf>,
        /// Hiragana reading to narrow the search
        #[arg(long, default_value = "")]
        reading: String,
        /// consecutive, shallow or deep
        #[arg(long, default_value_t = SearchMode::Consecutive)]
        mode: SearchMode,
        /// Score tiers kept by the deep search
        #[arg(long, default_value_t = 1)]
        order: usize,
        /// Print only the merged translation list
        #[arg(long, default_value_t = false)]
        translations_only: bool,
        /// mmap or owned [env: WARODAI_LOAD_MODE]
        #[arg(long)]
        load_mode: Option<LoadMode>,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            source,
            out,
            config,
            load_mode,
        } => {
            let (path, report) = warodai_cli::build(&BuildOptions {
                source,
                out,
                config,
                load_mode,
            })?;
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "out": path,
                    "report": report,
                }))?
            );
        }
        Commands::Lookup {
            lexeme,
            db,
            reading,
            mode,
            order,
            translations_only,
            load_mode,
        } => {
            let output = warodai_cli::lookup(&LookupOptions {
                db,
                lexeme,
                reading,
                mode,
                order,
                translations_only,
                load_mode,
            })?;
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let max_level = env_filter
        .max_level_hint()
        .and_then(|hint| hint.into_level())
        .unwrap_or(Level::INFO);
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_level(true)
        .with_max_level(max_level)
        .with_writer(std::io::stderr)
        .init();
}
