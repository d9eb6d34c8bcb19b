#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! xaas-admin storage
//!
//! SQLite persistence for every record type of `xaas-core`. Queries are
//! built from each model's [`ModelMeta`](xaas_core::ModelMeta), so one
//! generic store serves all tables.
//!
//! # Modules
//!
//! - [`database`]: Connection pool, schema creation and generic CRUD
//! - [`describe`]: Textual representation of records that need lookups

pub mod database;
pub mod describe;

pub use database::SqliteStore;
pub use describe::Describe;
