//! schemasync client - REST implementation of the backend collaborator.
//!
//! # Quick Start
//!
//! ```ignore
//! use schemasync_client::{ClientConfig, HttpBackend};
//! use schemasync_core::Backend;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::new("http://127.0.0.1:8090")
//!         .with_credentials("admin@example.com", "secret");
//!     let backend = HttpBackend::connect(config).await?;
//!
//!     let schema = backend.fetch_current_schema().await?;
//!     println!("backend has {} collections", schema.len());
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;

pub use client::{status_error, HttpBackend};
pub use config::ClientConfig;
pub use error::Error;
