//! Slash command handlers for the interactive session.
//!
//! Returns a [`CommandAction`] so the REPL loop can decide how to proceed.

use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use crate::catalog::Category;
use crate::engine::Engine;
use crate::format;
use crate::input::{CountInput, FileUpload};
use crate::output::{Renderer, StdoutRenderer};
use crate::store::Language;

use super::{count_and_render, ReplState};

/// Action returned by slash command handling.
pub(crate) enum CommandAction {
    /// Command was handled; continue the REPL loop.
    Continue,
    /// Unknown command was entered.
    Unknown(String),
}

/// Dispatch and handle a slash command.
pub(crate) async fn handle_slash_command(
    line: &str,
    engine: &Engine,
    state: &mut ReplState,
) -> Result<CommandAction> {
    let (command, rest) = match line.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (line, ""),
    };
    let mut renderer = StdoutRenderer::new();

    match command {
        "/category" => {
            if rest.is_empty() {
                println!("{}", engine.category());
            } else {
                match rest.parse::<Category>() {
                    Ok(category) => {
                        engine.set_category(category);
                        println!("{} {}", "category:".bold(), category);
                    }
                    Err(e) => eprintln!("{} {}", "error:".red().bold(), e),
                }
            }
        }
        "/toggle" => {
            if rest.is_empty() {
                eprintln!("usage: /toggle MODEL");
            } else if engine.toggle_model(rest) {
                println!("{} {}", "+".green().bold(), rest);
                if !engine.catalog().contains(engine.category(), rest) {
                    let hint = "not in the catalog; the service decides whether it exists";
                    println!("{}", hint.dimmed());
                }
            } else {
                println!("{} {}", "-".red().bold(), rest);
            }
        }
        "/select" => {
            engine.set_selected_models(rest.split_whitespace());
            print_selection(engine);
        }
        "/all" => {
            let added = engine.select_all_filtered(rest);
            println!("{}", format!("{added} model(s) added").dimmed());
            print_selection(engine);
        }
        "/none" => {
            engine.clear_selection();
            println!("{}", "selection cleared".dimmed());
        }
        "/models" => {
            let selection = engine.selection();
            println!(
                "{}",
                format::format_models(&engine.current_models(), Some(&selection))
            );
        }
        "/file" => {
            if !rest.is_empty() {
                match FileUpload::from_path(Path::new(rest)).await {
                    Ok(file) => {
                        println!("{} {}", "attached".dimmed(), file.name);
                        state.file = Some(file);
                    }
                    Err(e) => {
                        eprintln!("{} {:#}", "error:".red().bold(), e);
                        return Ok(CommandAction::Continue);
                    }
                }
            }
            let input = CountInput::file(state.file.clone());
            count_and_render(engine, &input, &mut renderer).await;
        }
        "/text" => {
            state.file = None;
            println!("{}", "text mode: plain lines are counted".dimmed());
        }
        "/add" => {
            if rest.is_empty() {
                eprintln!("usage: /add MODEL");
            } else {
                let category = engine.category().catalog_category();
                if engine.is_connected() {
                    engine.add_model(rest, category);
                    let note = "requested; the catalog updates when the service confirms";
                    println!("{}", note.dimmed());
                } else {
                    match engine.register_model(rest, category).await {
                        Ok(catalog) => {
                            let version = format!("catalog now at version {}", catalog.version);
                            println!("{}", version.dimmed());
                        }
                        Err(e) => renderer.render_error(&e),
                    }
                }
            }
        }
        "/history" => renderer.render_history(&engine.history()),
        "/clear-history" => {
            engine.clear_history();
            println!("{}", "History cleared.".dimmed());
        }
        "/status" => print_status(engine, state),
        "/reconnect" => {
            engine.reconnect();
            println!("{}", "reconnecting...".dimmed());
        }
        "/lang" => {
            let language = if rest.is_empty() {
                Ok(engine.language().toggled())
            } else {
                rest.parse::<Language>()
            };
            match language {
                Ok(language) => engine.set_language(language),
                Err(e) => eprintln!("{} {}", "error:".red().bold(), e),
            }
        }
        "/help" => print_help(),
        _ => return Ok(CommandAction::Unknown(command.to_string())),
    }
    Ok(CommandAction::Continue)
}

fn print_selection(engine: &Engine) {
    let selection = engine.selection();
    if selection.is_empty() {
        println!("{}", "nothing selected".dimmed());
    } else {
        println!("{} {}", "selected:".bold(), selection.models().join(", "));
    }
}

fn print_status(engine: &Engine, state: &ReplState) {
    let selection = engine.selection();
    let connection = format::format_connection(&engine.connection());
    println!("{} {}", "channel: ".bold(), connection);
    println!("{} {}", "category:".bold(), selection.category());
    println!(
        "{} {}",
        "selected:".bold(),
        if selection.is_empty() {
            "-".to_string()
        } else {
            selection.models().join(", ")
        }
    );
    let version = engine.catalog().version;
    println!("{} version {version}", "catalog: ".bold());
    println!("{} {}", "language:".bold(), engine.language().as_str());
    if let Some(file) = &state.file {
        println!("{} {}", "file:    ".bold(), file.name);
    }
}

const HELP: &[(&str, &str)] = &[
    ("/category [NAME]", "show or switch the category"),
    ("/toggle MODEL", "select or deselect a model"),
    ("/select MODEL...", "replace the selection"),
    ("/all [FILTER]", "select every model matching the filter"),
    ("/none", "clear the selection"),
    ("/models", "list models of the active category"),
    ("/file [PATH]", "attach a document and count it"),
    ("/text", "drop the attached document"),
    ("/add MODEL", "add a model to the catalog"),
    ("/history", "show recent counts"),
    ("/clear-history", "forget recent counts"),
    ("/status", "show connection and selection"),
    ("/reconnect", "reopen the push channel"),
    ("/lang [LANG]", "switch language (ko, en)"),
    ("/help", "show this help"),
    ("Ctrl+D", "exit"),
];

fn print_help() {
    println!("{}", "Commands:".bold());
    for (usage, what) in HELP {
        println!("  {} - {}", usage.cyan(), what);
    }
    println!("Any other line is counted as text.");
}
