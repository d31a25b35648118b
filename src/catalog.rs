//! Model catalog cache.
//!
//! The catalog is server-authoritative: every snapshot (from `GET /models`,
//! a push `init`/`model_added` message, or the answer to an add request)
//! replaces the cached lists wholesale. Only the version counter is guarded,
//! and it never moves backwards.

use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// Grouping of models that scopes catalog lookups and selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Hosted commercial models (the catalog's `official` list).
    #[default]
    Commercial,
    /// Self-hosted Hugging Face models (the catalog's `custom` list).
    HuggingFace,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Commercial => "commercial",
            Self::HuggingFace => "huggingface",
        }
    }

    /// The catalog list this category reads from.
    pub fn catalog_category(&self) -> CatalogCategory {
        match self {
            Self::Commercial => CatalogCategory::Official,
            Self::HuggingFace => CatalogCategory::Custom,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "commercial" | "official" => Ok(Self::Commercial),
            "huggingface" | "hf" | "custom" => Ok(Self::HuggingFace),
            other => Err(anyhow!(
                "Unknown category: {other}. Supported: commercial, huggingface"
            )),
        }
    }
}

/// Name of a catalog list on the wire (`add_model` and `POST /models`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogCategory {
    Official,
    Custom,
}

/// A full catalog snapshot as served by the catalog service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelCatalog {
    #[serde(default)]
    pub official: Vec<String>,
    #[serde(default)]
    pub custom: Vec<String>,
    #[serde(default)]
    pub version: u64,
}

impl ModelCatalog {
    pub fn models(&self, category: Category) -> &[String] {
        match category {
            Category::Commercial => &self.official,
            Category::HuggingFace => &self.custom,
        }
    }

    pub fn contains(&self, category: Category, name: &str) -> bool {
        self.models(category).iter().any(|m| m == name)
    }
}

/// In-memory cache of the latest catalog snapshot.
#[derive(Debug, Default)]
pub struct CatalogCache {
    catalog: ModelCatalog,
}

impl CatalogCache {
    /// Replaces the cached lists with `snapshot`.
    ///
    /// Content is last-writer-wins; the version only advances. Duplicate names
    /// within a list are collapsed, keeping the first occurrence. Returns
    /// `true` when anything observable changed.
    pub fn apply_snapshot(&mut self, snapshot: ModelCatalog) -> bool {
        let official = dedup(snapshot.official);
        let custom = dedup(snapshot.custom);
        let version = self.catalog.version.max(snapshot.version);
        let changed = official != self.catalog.official
            || custom != self.catalog.custom
            || version != self.catalog.version;
        self.catalog = ModelCatalog {
            official,
            custom,
            version,
        };
        changed
    }

    /// Returns the cached sequence for `category`, empty if never populated.
    pub fn get_current_models(&self, category: Category) -> &[String] {
        self.catalog.models(category)
    }

    pub fn version(&self) -> u64 {
        self.catalog.version
    }

    pub fn snapshot(&self) -> ModelCatalog {
        self.catalog.clone()
    }
}

fn dedup(names: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        if !out.contains(&name) {
            out.push(name);
        }
    }
    out
}
