//! Interactive session for toksync.
//!
//! Hosts a live [`Engine`] behind a [`rustyline`] prompt: the push channel
//! stays open while the user selects models and counts text. Plain lines are
//! counted; lines starting with `/` are slash commands.

mod commands;

use anyhow::Result;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tokio::sync::broadcast;

use crate::config::Config;
use crate::constants::READLINE_HISTORY_FILENAME;
use crate::engine::Engine;
use crate::error::ClientError;
use crate::events::EngineEvent;
use crate::input::{CountInput, FileUpload};
use crate::output::{Renderer, StdoutRenderer};

use commands::{handle_slash_command, CommandAction};

/// Session-local input buffers. Never persisted.
#[derive(Default)]
pub(crate) struct ReplState {
    pub(crate) file: Option<FileUpload>,
}

/// Counts `input` and renders the engine's view afterwards.
///
/// A superseded count renders nothing; the newer count owns the view.
pub(crate) async fn count_and_render(
    engine: &Engine,
    input: &CountInput,
    renderer: &mut impl Renderer,
) {
    match engine.count_tokens(input).await {
        Err(ClientError::Superseded) => {}
        _ => renderer.render_count(&engine.count_view()),
    }
}

/// Runs the interactive REPL.
///
/// # Readline behavior
///
/// - **Ctrl+C**: cancels current input, stays in REPL
/// - **Ctrl+D**: exits cleanly, closing the push channel
/// - Readline history is persisted to `~/.local/share/toksync/repl_history.txt`
///
/// The prompt blocks, so it runs on the blocking pool while the push channel
/// keeps running on the runtime.
pub async fn run_interactive(config: Config) -> Result<()> {
    let engine = Engine::from_config(&config).await?;
    let mut events = engine.subscribe();
    engine.bootstrap(config.auto_connect()).await;

    println!(
        "{} [{}] [category: {}] (/help for commands, Ctrl+D to exit)",
        "toksync".bold().cyan(),
        config.server_url.yellow(),
        engine.category().to_string().yellow(),
    );
    println!();

    let mut rl = DefaultEditor::new()?;
    let history_path = Config::data_dir()?.join(READLINE_HISTORY_FILENAME);
    if history_path.exists() {
        let _ = rl.load_history(&history_path);
    }

    let mut renderer = StdoutRenderer::new();
    let mut state = ReplState::default();

    loop {
        drain_events(&mut events, &mut renderer);

        let prompt = format!("{} ", ">".green().bold());
        let (editor, readline) = tokio::task::spawn_blocking(move || {
            let line = rl.readline(&prompt);
            (rl, line)
        })
        .await?;
        rl = editor;

        match readline {
            Ok(line) => {
                let line = line.trim().to_string();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(&line);

                if line.starts_with('/') {
                    match handle_slash_command(&line, &engine, &mut state).await? {
                        CommandAction::Continue => continue,
                        CommandAction::Unknown(cmd) => {
                            println!("{} Unknown command: {}", "?".yellow(), cmd);
                            continue;
                        }
                    }
                }

                let input = CountInput::text(line);
                count_and_render(&engine, &input, &mut renderer).await;
                println!();
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "^C".dimmed());
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "goodbye.".dimmed());
                break;
            }
            Err(e) => {
                eprintln!("{} {}", "error:".red().bold(), e);
                break;
            }
        }
    }

    engine.disconnect();
    engine.flush().await;

    if let Some(parent) = history_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let _ = rl.save_history(&history_path);

    Ok(())
}

/// Prints catalog and connection changes that arrived since the last prompt.
fn drain_events(events: &mut broadcast::Receiver<EngineEvent>, renderer: &mut impl Renderer) {
    loop {
        match events.try_recv() {
            Ok(event) => renderer.render_event(&event),
            Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "engine events skipped");
            }
            Err(_) => break,
        }
    }
}
