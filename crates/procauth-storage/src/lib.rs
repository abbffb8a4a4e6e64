//! Storage abstraction for procauth.
//!
//! Backend crates (e.g., procauth-store-sqlite) implement the port traits so
//! `procauth-core` doesn't depend on any specific database engine or schema details.

use thiserror::Error;

mod store;
pub mod types;

pub use store::*;
pub use types::*;

/// Uniform error type for all storage backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found")]
    NotFound,
    #[error("already exists")]
    AlreadyExists,
    #[error("conflict")]
    Conflict,
    #[error("backend error: {0}")]
    Backend(String),
}
