//! # Application State
//!
//! [`AppState`] holds the configuration and the collaborators every handler
//! needs. It is built once at startup, wrapped in an `Arc`, and never
//! mutated afterwards; tests build their own with fake collaborators.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use registry_server::config::Config;
//! use registry_server::debloat::JsMinifier;
//! use registry_server::state::AppState;
//! use registry_server::storage::MemoryObjectStore;
//!
//! let state = AppState::new(
//!     Config::default(),
//!     Arc::new(MemoryObjectStore::new("registry")),
//!     Arc::new(JsMinifier),
//! );
//! ```

use crate::config::Config;
use crate::debloat::{JsMinifier, Minifier};
use crate::error::AppResult;
use crate::storage::{self, ObjectStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Shared state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Where package payloads are persisted
    pub store: Arc<dyn ObjectStore>,
    /// Transformer applied to content submitted with `debloat: true`
    pub minifier: Arc<dyn Minifier>,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn ObjectStore>, minifier: Arc<dyn Minifier>) -> Self {
        Self {
            config: Arc::new(config),
            store,
            minifier,
        }
    }

    /// Build the state described by `config`: the configured object store
    /// and the built-in JavaScript minifier.
    pub fn from_config(config: Config) -> AppResult<Self> {
        let store = storage::build_object_store(&config.storage)?;
        Ok(Self::new(config, store, Arc::new(JsMinifier)))
    }

    /// Key prefix shared by every stored package object.
    pub fn key_prefix(&self) -> &str {
        &self.config.storage.key_prefix
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("store", &self.store.name())
            .finish_non_exhaustive()
    }
}

/// Standardized success response.
///
/// Serializes to: `{"message": "Package deleted"}`
#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub message: String,
}
