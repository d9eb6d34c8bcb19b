//! The administered records.
//!
//! Every record type implements [`Model`], which ties it to a table, a key
//! column and an ordered list of fields. The storage layer and the admin
//! site are generic over this trait, so adding a record type means adding
//! one module here and registering it with the admin site.

mod faculty;
mod its_service;
mod quota;
mod static_mac;
mod vra;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::sqlite::SqliteRow;

use crate::{Error, Result};

pub use faculty::Faculty;
pub use its_service::ItsService;
pub use quota::VmQuota;
pub use static_mac::StaticMac;
pub use vra::{CatalogService, ConditionOperator, EventSubscriptionRule, RuleDescription, Workflow};

/// How a model's primary key is assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyKind {
    /// The key is a field entered by the administrator.
    Natural,
    /// The key is an integer `id` column assigned by the database.
    Auto,
}

/// One stored field of a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldMeta {
    /// Field name in JSON payloads.
    pub name: &'static str,
    /// Column in the table.
    pub column: &'static str,
    /// Label shown to administrators.
    pub verbose_name: &'static str,
    /// Allowed `(code, label)` pairs, empty for free input.
    #[serde(skip_serializing_if = "no_choices")]
    pub choices: &'static [(&'static str, &'static str)],
}

fn no_choices(choices: &&'static [(&'static str, &'static str)]) -> bool {
    choices.is_empty()
}

/// Static description of a model: where it lives and how it is labelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModelMeta {
    /// Application the model belongs to (groups models on the admin index).
    pub app_label: &'static str,
    /// URL slug of the model.
    pub model_name: &'static str,
    /// Table name.
    pub table: &'static str,
    /// Primary key column.
    pub primary_key: &'static str,
    /// How the primary key is assigned.
    pub key_kind: KeyKind,
    /// Stored fields in bind order. Excludes the auto `id` column.
    pub fields: &'static [FieldMeta],
    /// Singular label.
    pub verbose_name: &'static str,
    /// Plural label.
    pub verbose_name_plural: &'static str,
}

impl ModelMeta {
    /// Columns written on insert, in bind order.
    pub fn insert_columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|f| f.column)
    }

    /// Columns written on update, in bind order (the key column is excluded).
    pub fn update_columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields
            .iter()
            .map(|f| f.column)
            .filter(move |c| *c != self.primary_key)
    }

    /// Parse a key received as text (URL segment, CLI argument).
    pub fn parse_key(&self, raw: &str) -> Result<RecordKey> {
        match self.key_kind {
            KeyKind::Natural if !raw.is_empty() => Ok(RecordKey::Text(raw.to_string())),
            KeyKind::Auto => raw
                .parse::<i64>()
                .map(RecordKey::Integer)
                .map_err(|_| self.invalid_key(raw)),
            KeyKind::Natural => Err(self.invalid_key(raw)),
        }
    }

    fn invalid_key(&self, raw: &str) -> Error {
        Error::InvalidKey {
            model: self.verbose_name.to_string(),
            key: raw.to_string(),
        }
    }
}

/// Primary key value of a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum RecordKey {
    /// Natural text key.
    Text(String),
    /// Auto-assigned integer key.
    Integer(i64),
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKey::Text(s) => write!(f, "{s}"),
            RecordKey::Integer(i) => write!(f, "{i}"),
        }
    }
}

/// A value bound to a column on insert or update.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// `VARCHAR` column.
    Text(String),
    /// `INTEGER` column.
    Integer(i64),
    /// Nullable `INTEGER` column.
    NullableInteger(Option<i64>),
    /// `DATETIME` column, stored in UTC.
    Timestamp(DateTime<Utc>),
}

impl From<&RecordKey> for SqlValue {
    fn from(key: &RecordKey) -> Self {
        match key {
            RecordKey::Text(s) => SqlValue::Text(s.clone()),
            RecordKey::Integer(i) => SqlValue::Integer(*i),
        }
    }
}

/// A record stored in its own table and administered through the admin site.
pub trait Model:
    Clone
    + fmt::Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + Unpin
    + 'static
    + for<'r> sqlx::FromRow<'r, SqliteRow>
{
    /// Table metadata.
    fn meta() -> &'static ModelMeta;

    /// Primary key of this record.
    fn key(&self) -> RecordKey;

    /// Store the database-assigned key after insert. Only auto-key models
    /// override this.
    fn assign_key(&mut self, _id: i64) {}

    /// Column values in the order of [`ModelMeta::fields`].
    fn values(&self) -> Vec<SqlValue>;

    /// Bring fields to their stored form. Runs before [`Model::validate`].
    fn normalize(&mut self) {}

    /// Check field constraints before a write.
    fn validate(&self) -> Result<()>;

    /// Parse a key received as text, in the stored form.
    fn parse_key(raw: &str) -> Result<RecordKey> {
        Self::meta().parse_key(raw)
    }

    /// Advisory findings reported when the record is written. They never
    /// block the write.
    fn advisories(&self) -> Vec<String> {
        Vec::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_natural_key() {
        let meta = Faculty::meta();
        assert_eq!(
            meta.parse_key("si").unwrap(),
            RecordKey::Text("si".to_string())
        );
        assert!(meta.parse_key("").is_err());
    }

    #[test]
    fn test_parse_auto_key() {
        let meta = VmQuota::meta();
        assert_eq!(meta.parse_key("42").unwrap(), RecordKey::Integer(42));
        let err = meta.parse_key("si").unwrap_err();
        assert!(matches!(err, Error::InvalidKey { .. }));
    }

    #[test]
    fn test_update_columns_skip_natural_key() {
        let cols: Vec<_> = StaticMac::meta().update_columns().collect();
        assert_eq!(cols, vec!["myvm_static_mac_used_by"]);
    }

    #[test]
    fn test_values_match_fields() {
        let quota = VmQuota::sample();
        assert_eq!(quota.values().len(), VmQuota::meta().fields.len());
        let rule = EventSubscriptionRule {
            id: 0,
            service: "MyVM".to_string(),
            workflow: 1,
            left_operand: "left.operand".to_string(),
            operator: ConditionOperator::Equals,
            right_operand: "value".to_string(),
        };
        assert_eq!(
            rule.values().len(),
            EventSubscriptionRule::meta().fields.len()
        );
    }

    #[test]
    fn test_record_key_display() {
        assert_eq!(RecordKey::Text("si".into()).to_string(), "si");
        assert_eq!(RecordKey::Integer(7).to_string(), "7");
    }
}
