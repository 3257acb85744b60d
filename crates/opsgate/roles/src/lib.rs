//! OpsGate role record storage.
//!
//! Role records live in an external document store keyed by user id. This
//! crate defines the storage contract and its adapters:
//! - [`memory::InMemoryRoleStore`] for tests and local development
//! - `postgres::PostgresRoleStore` (feature `postgres`) storing each record as
//!   a JSONB document
//!
//! Records are only written through [`RoleStore::merge`]; ordinary sign-in
//! never creates one.

#![deny(unsafe_code)]
#![warn(rust_2018_idioms)]

mod error;
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;
mod traits;

pub use error::{RoleStoreError, RoleStoreResult};
pub use memory::InMemoryRoleStore;
pub use traits::RoleStore;
