//! # AdLane API client
//!
//! Session-authenticated client for the AdLane advertising-platform API.
//!
//! This crate contains:
//! - Uniform CRUD operations (`find`/`query`/`query_all`/`create`/`edit`/
//!   `put_edit`/`delete`) over every registered resource type
//! - Transparent re-authentication: an expired session is detected via 401,
//!   refreshed with a single coalesced login, and the original request is
//!   retried exactly once
//! - Offset-batched pagination driven to completion for bulk reads
//! - Normalization of the upstream's inconsistent error shapes into a small,
//!   stable success/failure envelope
//!
//! ## Architecture
//! - [`api::Client`] owns the transport, session state and auth coordinator
//! - `dispatch` sends one logical operation and handles retry-after-reauth
//! - `auth` guarantees at most one in-flight login system-wide
//! - `classify` maps known mutation-failure shapes to soft failures
//!
//! ## Usage Example
//!
//! ```no_run
//! use adlane_client::{Client, ClientConfig};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), adlane_client::ClientError> {
//!     let config = ClientConfig::from_env()?;
//!     let client = Client::new(config)?;
//!
//!     let campaigns = client.campaigns().query_all(&json!({"state": "active"})).await?;
//!     if let Some(records) = campaigns.payload() {
//!         println!("{} active campaigns", records.len());
//!     }
//!
//!     let result = client.advertisers().delete(17, false).await?;
//!     if !result.is_success() {
//!         eprintln!("delete refused: {:?}", result.message());
//!     }
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod errors;
pub mod outcome;
pub mod resources;
pub mod session;

mod auth;
mod classify;
mod dispatch;
mod pagination;
mod upload;

// Re-export commonly used items
pub use api::{Client, Resource, EMPTY_BODY_MESSAGE};
pub use config::{ClientConfig, ClientConfigBuilder, DEFAULT_BASE_URL};
pub use errors::{ClientError, Result};
pub use outcome::Outcome;
pub use resources::ResourceDescriptor;
pub use session::SessionStore;
