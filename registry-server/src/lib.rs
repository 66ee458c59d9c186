//! # Package Registry Server
//!
//! Ingestion backend for a package registry. Clients submit a package as
//! JSON (`metadata` plus either inline `Content` or a source `URL`); the
//! server validates it, optionally minifies inline JavaScript, and stores the
//! payload as a single object under `packages/<id>`.
//!
//! ## Key Modules
//!
//! - [`ingest`]: the `POST /package` pipeline
//! - [`validation`]: submission invariants and input guards
//! - [`debloat`]: best-effort JavaScript minification
//! - [`storage`]: the [`storage::ObjectStore`] trait with S3, local and memory backends
//! - [`id`]: package identifiers
//! - [`server`]: router, maintenance handlers and server startup
//! - [`config`], [`state`], [`error`]: configuration, shared state and error responses
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use registry_server::{build_router, AppState, Config};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let state = AppState::from_config(Config::default())?;
//! let app = build_router(Arc::new(state));
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod debloat;
pub mod error;
pub mod hash_utils;
pub mod id;
pub mod ingest;
pub mod server;
pub mod state;
pub mod storage;
pub mod types;
pub mod validation;

pub use config::{Config, StorageBackend};
pub use debloat::{debloat, JsMinifier, Minifier, MinifyError};
pub use error::{ApiErrorResponse, AppError, AppResult, ErrorCode};
pub use ingest::{create_package, ingest};
pub use server::{build_router, run_server};
pub use state::{AppState, SuccessResponse};
pub use storage::{ObjectStore, StorageError, StorageResult};
pub use types::{PackageMetadata, PackageRecord, PackageSource, ValidatedSubmission};
pub use validation::{ValidationError, ValidationResult};
