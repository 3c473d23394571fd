//! Subsdesk
//!
//! Back office for a streaming-subscription reselling operation: clients,
//! providers, a service catalog, purchased accounts and the profile slots
//! sold on them. The slot ledger keeps `free + occupied == capacity` true
//! for every account, even under concurrent sales.
//!
//! ## Standalone
//!
//! Run the binary:
//! ```bash
//! subsdesk-server
//! ```
//!
//! ## Embedded (Axum)
//!
//! When the `server` feature is enabled, this crate can be embedded into a larger Axum app:
//! ```rust,ignore
//! use axum::Router;
//! use subsdesk::infrastructure::AppConfig;
//! use subsdesk::server::{build_state_with_pool, router};
//! use sqlx::PgPool;
//!
//! let cfg = AppConfig::from_env()?;
//! let pool = PgPool::connect(&cfg.database_url).await?;
//! let state = build_state_with_pool(cfg, pool, true).await?;
//! let app = Router::new().nest("/desk", router(state));
//! ```

pub mod application;
pub mod domain;
pub mod infrastructure;

// Standalone + embedded HTTP server support (Axum).
// Enabled behind the `server` feature so the core library can be used without Axum.
#[cfg(feature = "server")]
pub mod server;

pub use application::*;
pub use domain::*;
pub use infrastructure::*;

#[cfg(feature = "server")]
pub use server::*;
