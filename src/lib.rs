//! verify-gateway - an API gateway for inference verification.
//!
//! The gateway authenticates callers by API key, deduplicates repeated
//! requests through a time-expiring response cache, and forwards unseen
//! requests to the downstream verification backend selected by the declared
//! model identifier.
//!
//! # Architecture
//!
//! ```text
//! POST /verify
//!      │
//!      ▼
//! ┌──────────────────┐   miss   ┌────────────────┐
//! │ parse + validate │────────► │ route by model │
//! │ + authenticate   │          └───────┬────────┘
//! │ + cache lookup   │                  │
//! └────────┬─────────┘                  ▼
//!          │ hit                 forward to backend
//!          ▼                            │
//!   cached response ◄── cache store ────┘
//! ```

pub mod admin;
pub mod auth;
pub mod backend;
pub mod cache;
pub mod config;
pub mod error;
pub mod gateway;
pub mod keystore;
pub mod pipeline;
pub mod routing;
pub mod server;
pub mod types;

pub use auth::KeyValidator;
pub use backend::{BackendClient, BackendClientConfig};
pub use cache::ResponseCache;
pub use config::GatewayConfig;
pub use error::{Error, Result};
pub use gateway::{GatewayBuilder, RunningGateway};
pub use keystore::{ApiKey, KeyStore, SqliteKeyStore};
pub use pipeline::VerificationPipeline;
pub use routing::BackendRouter;
pub use types::{VerificationRequest, VerificationResponse};
