#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! xaas-admin core
//!
//! Record types, validation, errors and settings shared by every xaas-admin
//! crate. It has no internal dependencies (dependency level 0).
//!
//! # Modules
//!
//! - [`error`]: Error types and Result alias
//! - [`model`]: The administered records and their table metadata
//! - [`validate`]: Field checks applied before any write
//! - [`settings`]: Per-environment settings, secrets and file overlays
//! - [`traits`]: Configuration management trait used by the CLI

pub mod error;
pub mod model;
pub mod settings;
pub mod traits;
pub mod validate;

pub use error::{Error, Result};
pub use model::{
    CatalogService, ConditionOperator, EventSubscriptionRule, Faculty, FieldMeta, ItsService,
    KeyKind, Model, ModelMeta, RecordKey, SqlValue, StaticMac, VmQuota, Workflow,
};
pub use settings::{Environment, Secrets, Settings, SettingsSources};
pub use traits::ConfigManager;
