use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{FieldMeta, KeyKind, Model, ModelMeta, RecordKey, SqlValue};
use crate::{Result, validate};

static META: ModelMeta = ModelMeta {
    app_label: "itservices",
    model_name: "service",
    table: "its_services",
    primary_key: "its_serv_short_name",
    key_kind: KeyKind::Natural,
    fields: &[
        FieldMeta {
            name: "short_name",
            column: "its_serv_short_name",
            verbose_name: "Short name",
            choices: &[],
        },
        FieldMeta {
            name: "long_name",
            column: "its_serv_long_name",
            verbose_name: "Long name",
            choices: &[],
        },
        FieldMeta {
            name: "snow_id",
            column: "its_serv_snow_id",
            verbose_name: "ServiceNow Service ID",
            choices: &[],
        },
    ],
    verbose_name: "ITS Service",
    verbose_name_plural: "ITS Services",
};

/// An IT service offered by the institution, linked to its ticketing-system
/// entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct ItsService {
    /// Short name, e.g. `myvm`.
    #[sqlx(rename = "its_serv_short_name")]
    pub short_name: String,
    /// Human-readable name.
    #[sqlx(rename = "its_serv_long_name")]
    pub long_name: String,
    /// ServiceNow service identifier, e.g. `SVC0080`.
    #[sqlx(rename = "its_serv_snow_id")]
    pub snow_id: String,
}

impl fmt::Display for ItsService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_name)
    }
}

impl Model for ItsService {
    fn meta() -> &'static ModelMeta {
        &META
    }

    fn key(&self) -> RecordKey {
        RecordKey::Text(self.short_name.clone())
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::Text(self.short_name.clone()),
            SqlValue::Text(self.long_name.clone()),
            SqlValue::Text(self.snow_id.clone()),
        ]
    }

    fn validate(&self) -> Result<()> {
        validate::required_max_len("short_name", &self.short_name, 20)?;
        validate::required_max_len("long_name", &self.long_name, 100)?;
        validate::required_max_len("snow_id", &self.snow_id, 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_representation() {
        let service = ItsService {
            short_name: "myvm".to_string(),
            long_name: "Virtual server infrastructure".to_string(),
            snow_id: "SVC0080".to_string(),
        };
        assert_eq!(service.to_string(), "myvm");
        assert!(service.validate().is_ok());
    }

    #[test]
    fn test_short_name_limit() {
        let service = ItsService {
            short_name: "x".repeat(21),
            long_name: "Too long".to_string(),
            snow_id: "SVC0001".to_string(),
        };
        assert!(service.validate().is_err());
    }
}
