//! # xaas-cli
//!
//! Command-line entry point of the xaas-admin site:
//! - `serve`: run the admin site
//! - `migrate`: create missing tables
//! - `check`: report settings problems for the active environment
//! - `config`: inspect and edit the settings file

#![warn(missing_docs)]
#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod cli;
pub mod commands;
pub mod config_handlers;
