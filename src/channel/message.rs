//! Wire messages of the push channel.
//!
//! Server frames are JSON objects tagged by `type`. Unknown types decode to
//! [`ServerMessage::Unknown`] so they can be ignored without being treated
//! as malformed.

use serde::{Deserialize, Serialize};

use crate::catalog::{CatalogCategory, ModelCatalog};

/// Frame sent by the catalog service.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Full catalog sent right after the channel opens.
    Init { data: ModelCatalog },
    /// Full catalog broadcast after any client added a model.
    ModelAdded { data: ModelCatalog },
    /// Diagnostic from the server, e.g. a rejected `add_model`.
    Error {
        #[serde(default)]
        error: String,
    },
    #[serde(other)]
    Unknown,
}

/// Frame sent by this client.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    AddModel {
        name: String,
        category: CatalogCategory,
    },
}
