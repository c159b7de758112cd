//! Edge infrastructure inventory API: single-schedule targeting.
//!
//! A single schedule is a one-shot maintenance or OS-update window that
//! targets at most one host, site or region. This crate exposes the
//! create/get/list/update/patch/delete operations over schedules, scoped to
//! the caller's tenant, on top of:
//!
//! - [`inventory`]: the generic resource store contract and an in-memory store
//! - [`cache`]: a read-through schedule cache (in-process or Redis)
//! - [`schedule`]: validation, conversion and the service handlers
//! - [`gateway`]: the HTTP surface and tenant resolution
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_api::{config::AppConfig, server::create_app};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AppConfig::load()?;
//!     let app = create_app(config).await?;
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod cache;
pub mod config;
pub mod error;
pub mod gateway;
pub mod inventory;
pub mod logging;
pub mod resources;
pub mod schedule;
pub mod server;
pub mod tenant;

use std::sync::Arc;

use config::AppConfig;
use schedule::ScheduleService;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Single-schedule operations.
    pub schedules: ScheduleService,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &"AppConfig")
            .field("schedules", &self.schedules)
            .finish()
    }
}
