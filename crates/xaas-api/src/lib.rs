//! # xaas-api
//!
//! HTTP admin site for the xaas-admin records:
//! - [`site`]: registry of administered models and their generic CRUD
//! - [`routes`]: router, handlers and the request pipeline
//! - [`hosts`]: `Host` header guard
//! - [`server`]: listener and graceful shutdown

#![warn(missing_docs)]
#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod error;
pub mod hosts;
pub mod routes;
pub mod server;
pub mod site;

pub use error::{ApiError, Result};
pub use routes::{AppState, build_router};
pub use server::Server;
pub use site::{AdminSite, Entry, ModelAdmin};
