//! Catalog operations for the `toksync models` and `toksync pricing` commands.

use anyhow::Result;
use colored::Colorize;

use crate::catalog::{CatalogCategory, Category};
use crate::config::Config;
use crate::engine::Engine;
use crate::format;

use super::ModelsAction;

/// Lists the catalog, or adds a model when an action is given.
pub(crate) async fn handle_models(
    config: &Config,
    category: Option<Category>,
    action: Option<ModelsAction>,
) -> Result<()> {
    let engine = Engine::from_config(config).await?;
    match action {
        Some(ModelsAction::Add { name, official }) => {
            let target = if official {
                CatalogCategory::Official
            } else {
                CatalogCategory::Custom
            };
            let catalog = engine.register_model(&name, target).await?;
            println!(
                "{} {} {}",
                "added".green(),
                name.trim().bold(),
                format!("(catalog version {})", catalog.version).dimmed()
            );
            Ok(())
        }
        None => {
            let catalog = engine.refresh_catalog().await?;
            match category {
                Some(category) => {
                    println!("{}", category.as_str().bold());
                    println!("{}", format::format_models(catalog.models(category), None));
                }
                None => println!("{}", format::format_catalog(&catalog)),
            }
            Ok(())
        }
    }
}

pub(crate) async fn show_pricing(config: &Config, model: &str) -> Result<()> {
    let engine = Engine::from_config(config).await?;
    let info = engine.pricing(model).await?;
    println!("{}", format::format_pricing(&info));
    Ok(())
}
