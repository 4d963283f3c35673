use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use faq_bot::answer::DEFAULT_LANGUAGE;
use faq_bot::commands::{ask, build_index, related, show_status};
use faq_bot::config::{Config, get_config_dir, run_interactive_config, show_config};

#[derive(Parser)]
#[command(name = "faq-bot")]
#[command(about = "Answers questions from an FAQ corpus using embedding search and an LLM")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml and, by default, the corpus and index
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the Azure OpenAI deployments and answer settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Embed the corpus and save the index
    Index {
        /// Corpus file to index instead of the configured one
        #[arg(long)]
        corpus: Option<PathBuf>,
    },
    /// Answer a question
    Ask {
        query: String,
        /// Language the answer should be written in
        #[arg(long, short, default_value = DEFAULT_LANGUAGE)]
        language: String,
        /// Number of related questions to list (defaults to the configured value)
        #[arg(long)]
        related: Option<usize>,
        /// Print the answer as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the nearest corpus questions with their distances
    Related {
        query: String,
        /// Number of questions to list (defaults to the configured value)
        #[arg(short)]
        k: Option<usize>,
    },
    /// Check the saved index against the configuration and corpus
    Status,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_dir = match cli.config_dir {
        Some(dir) => dir,
        None => get_config_dir().context("Could not determine the config directory")?,
    };

    match cli.command {
        Commands::Config { show } => {
            if show {
                show_config(&Config::load(&config_dir)?);
            } else {
                run_interactive_config(&config_dir)?;
            }
        }
        Commands::Index { corpus } => {
            build_index(&Config::load(&config_dir)?, corpus.as_deref())?;
        }
        Commands::Ask {
            query,
            language,
            related: related_count,
            json,
        } => {
            ask(
                &Config::load(&config_dir)?,
                &query,
                &language,
                related_count,
                json,
            )?;
        }
        Commands::Related { query, k } => {
            related(&Config::load(&config_dir)?, &query, k)?;
        }
        Commands::Status => {
            show_status(&Config::load(&config_dir)?)?;
        }
    }

    Ok(())
}
