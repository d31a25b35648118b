//! Command-line interface definition and dispatch for toksync.
//!
//! Uses [`clap`] for argument parsing with derive macros. Each subcommand is
//! routed to its handler; catalog operations live in the [`models`] submodule.

mod models;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tokio::sync::broadcast;

use crate::catalog::Category;
use crate::config::Config;
use crate::engine::Engine;
use crate::events::EngineEvent;
use crate::input::{CountInput, FileUpload};
use crate::output::{Renderer, StdoutRenderer};
use crate::store::Language;
use crate::{format, repl};

/// Top-level CLI structure for toksync.
#[derive(Parser)]
#[command(
    name = "toksync",
    about = "Count tokens across language models from the terminal"
)]
pub struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands for the toksync CLI.
///
/// The `///` doc comments on variants double as `--help` text rendered by clap.
#[derive(Subcommand)]
pub enum Commands {
    /// Count tokens of a text or a document for one or more models
    Count {
        /// Text to count (joined with spaces)
        text: Vec<String>,
        /// Model to count against (repeatable; defaults to the first catalog model)
        #[arg(short, long = "model")]
        models: Vec<String>,
        /// Model category (commercial, huggingface)
        #[arg(short, long)]
        category: Option<Category>,
        /// Count a document (.pdf, .docx, .txt, .md) instead of text
        #[arg(short, long, conflicts_with = "text")]
        file: Option<PathBuf>,
    },
    /// List or add catalog models
    Models {
        /// Only list this category
        #[arg(short, long)]
        category: Option<Category>,
        #[command(subcommand)]
        action: Option<ModelsAction>,
    },
    /// Show pricing and context window of a model
    Pricing { model: String },
    /// Show recent counts
    History {
        /// Forget all recent counts
        #[arg(long)]
        clear: bool,
    },
    /// Show or set the language preference (ko, en)
    Language { language: Option<Language> },
    /// Keep the push channel open and print catalog updates
    Watch,
    /// Start an interactive session
    Interactive,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Subcommands for the `models` command.
#[derive(Subcommand)]
pub enum ModelsAction {
    /// Add a model to the catalog
    Add {
        name: String,
        /// Add to the official list instead of custom
        #[arg(long)]
        official: bool,
    },
}

/// Subcommands for the `config` command.
///
/// Controls reading and writing toksync's TOML configuration file
/// stored at the XDG config path (`~/.config/toksync/config.toml`).
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current config
    Show,
    /// Set a config value (server_url, api_path, channel.*, request.*)
    Set { key: String, value: String },
}

/// Parses command-line arguments into a [`Cli`] struct.
///
/// Delegates to [`clap::Parser::parse`], which exits the process on invalid input.
pub fn parse() -> Cli {
    Cli::parse()
}

/// Dispatches the parsed CLI command to its handler.
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Count {
            text,
            models,
            category,
            file,
        } => {
            let config = Config::load()?;
            count(&config, text, models, category, file).await
        }
        Commands::Models { category, action } => {
            let config = Config::load()?;
            models::handle_models(&config, category, action).await
        }
        Commands::Pricing { model } => {
            let config = Config::load()?;
            models::show_pricing(&config, &model).await
        }
        Commands::History { clear } => {
            let config = Config::load()?;
            let engine = Engine::from_config(&config).await?;
            if clear {
                engine.clear_history();
                engine.flush().await;
                println!("{}", "History cleared.".dimmed());
            } else {
                StdoutRenderer::new().render_history(&engine.history());
            }
            Ok(())
        }
        Commands::Language { language } => {
            let config = Config::load()?;
            let engine = Engine::from_config(&config).await?;
            if let Some(language) = language {
                engine.set_language(language);
                engine.flush().await;
            }
            println!("{}", engine.language().as_str());
            Ok(())
        }
        Commands::Watch => {
            let config = Config::load()?;
            watch(&config).await
        }
        Commands::Interactive => {
            let config = Config::load()?;
            repl::run_interactive(config).await
        }
        Commands::Config { action } => match action {
            ConfigAction::Show => {
                let config = Config::load()?;
                let path = Config::config_path()?;
                println!("{} {}", "Config path:".bold(), path.display());
                println!("{} {}", "API:".bold(), config.api_base());
                match config.ws_url() {
                    Ok(url) => println!("{} {}", "Push channel:".bold(), url),
                    Err(e) => println!("{} {}", "Push channel:".bold(), e.to_string().red()),
                }
                println!();
                let toml_str = toml::to_string_pretty(&config)?;
                println!("{}", toml_str);
                Ok(())
            }
            ConfigAction::Set { key, value } => {
                Config::set_global(&key, &value)?;
                println!("{} {} = {}", "set".green(), key.bold(), value);
                Ok(())
            }
        },
    }
}

/// One-shot count: start the engine, select, count, print, persist.
async fn count(
    config: &Config,
    text: Vec<String>,
    models: Vec<String>,
    category: Option<Category>,
    file: Option<PathBuf>,
) -> Result<()> {
    let input = match file {
        Some(path) => CountInput::file(Some(FileUpload::from_path(&path).await?)),
        None => {
            let text = text.join(" ");
            if text.trim().is_empty() {
                anyhow::bail!("No text provided. Usage: toksync count \"your text here\"");
            }
            CountInput::text(text)
        }
    };

    let engine = Engine::from_config(config).await?;
    if let Some(category) = category {
        if category != engine.category() {
            engine.set_category(category);
        }
    }

    if models.is_empty() {
        engine.refresh_catalog().await?;
        let Some(first) = engine.current_models().into_iter().next() else {
            anyhow::bail!(
                "No {} models in the catalog. Pass one with --model",
                engine.category()
            );
        };
        engine.set_selected_models([first]);
    } else {
        engine.set_selected_models(&models);
    }

    let outcome = engine.count_tokens(&input).await;
    engine.flush().await;
    outcome?;
    StdoutRenderer::new().render_count(&engine.count_view());
    Ok(())
}

/// Holds the push channel open until Ctrl+C, printing what arrives.
async fn watch(config: &Config) -> Result<()> {
    let engine = Engine::from_config(config).await?;
    let mut events = engine.subscribe();
    engine.bootstrap(true).await;
    println!(
        "{} {} (Ctrl+C to stop)",
        "watching".bold().cyan(),
        config.ws_url()?.yellow()
    );
    println!("{}", format::format_catalog(&engine.catalog()));

    let mut renderer = StdoutRenderer::new();
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    renderer.render_event(&event);
                    if let EngineEvent::CatalogChanged { .. } = event {
                        println!("{}", format::format_catalog(&engine.catalog()));
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "engine events skipped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    engine.disconnect();
    engine.flush().await;
    Ok(())
}
