use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{FieldMeta, KeyKind, Model, ModelMeta, RecordKey, SqlValue};
use crate::{Result, validate};

static META: ModelMeta = ModelMeta {
    app_label: "global_infos",
    model_name: "faculty",
    table: "glob_inf_faculty_admins",
    primary_key: "g_faculty",
    key_kind: KeyKind::Natural,
    fields: &[
        FieldMeta {
            name: "code",
            column: "g_faculty",
            verbose_name: "Faculty",
            choices: &[],
        },
        FieldMeta {
            name: "ad_group",
            column: "g_ad_group",
            verbose_name: "Active Directory Group (short)",
            choices: &[],
        },
    ],
    verbose_name: "Faculty",
    verbose_name_plural: "Faculties",
};

/// An organizational unit, identified by a short code, with the directory
/// group whose members approve its requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Faculty {
    /// Faculty code, e.g. `si`.
    #[sqlx(rename = "g_faculty")]
    pub code: String,
    /// Active Directory group (short name).
    #[sqlx(rename = "g_ad_group")]
    pub ad_group: String,
}

impl fmt::Display for Faculty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code)
    }
}

impl Model for Faculty {
    fn meta() -> &'static ModelMeta {
        &META
    }

    fn key(&self) -> RecordKey {
        RecordKey::Text(self.code.clone())
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::Text(self.code.clone()),
            SqlValue::Text(self.ad_group.clone()),
        ]
    }

    fn validate(&self) -> Result<()> {
        validate::required_max_len("code", &self.code, 50)?;
        validate::required_max_len("ad_group", &self.ad_group, 50)
    }
}
