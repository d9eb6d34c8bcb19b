use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{FieldMeta, KeyKind, Model, ModelMeta, RecordKey, SqlValue};
use crate::{Result, validate};

static META: ModelMeta = ModelMeta {
    app_label: "myvm",
    model_name: "staticmac",
    table: "myvm_static_mac",
    primary_key: "myvm_static_mac_address",
    key_kind: KeyKind::Natural,
    fields: &[
        FieldMeta {
            name: "mac_address",
            column: "myvm_static_mac_address",
            verbose_name: "Static MAC Address",
            choices: &[],
        },
        FieldMeta {
            name: "used_by",
            column: "myvm_static_mac_used_by",
            verbose_name: "Used by vRA VM ID",
            choices: &[],
        },
    ],
    verbose_name: "MyVM Static MAC",
    verbose_name_plural: "MyVM Static MAC",
};

/// A MAC address reserved for a virtual machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct StaticMac {
    /// The reserved address.
    #[sqlx(rename = "myvm_static_mac_address")]
    pub mac_address: String,
    /// Identifier of the VM holding the reservation.
    #[sqlx(rename = "myvm_static_mac_used_by")]
    pub used_by: String,
}

impl fmt::Display for StaticMac {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.mac_address, self.used_by)
    }
}

impl Model for StaticMac {
    fn meta() -> &'static ModelMeta {
        &META
    }

    fn key(&self) -> RecordKey {
        RecordKey::Text(self.mac_address.clone())
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::Text(self.mac_address.clone()),
            SqlValue::Text(self.used_by.clone()),
        ]
    }

    fn parse_key(raw: &str) -> Result<RecordKey> {
        META.parse_key(&validate::canonical_mac(raw))
    }

    fn normalize(&mut self) {
        self.mac_address = validate::canonical_mac(&self.mac_address);
    }

    fn validate(&self) -> Result<()> {
        validate::mac_address("mac_address", &self.mac_address)?;
        validate::required_max_len("used_by", &self.used_by, 36)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn reservation() -> StaticMac {
        StaticMac {
            mac_address: "00:50:56:00:00:01".to_string(),
            used_by: "6f1c2a4e-2d6b-4c1a-9d0e-8b7a5c3e2f10".to_string(),
        }
    }

    #[test]
    fn test_string_representation() {
        assert_eq!(
            reservation().to_string(),
            "00:50:56:00:00:01=6f1c2a4e-2d6b-4c1a-9d0e-8b7a5c3e2f10"
        );
    }

    #[test]
    fn test_validate() {
        assert!(reservation().validate().is_ok());

        let mut mac = reservation();
        mac.mac_address = "not-a-mac".to_string();
        assert!(mac.validate().is_err());

        let mut mac = reservation();
        mac.used_by = "x".repeat(37);
        assert!(mac.validate().is_err());
    }

    #[test]
    fn test_normalize_canonicalizes_address() {
        let mut mac = reservation();
        mac.mac_address = "00-50-56-AB-CD-01".to_string();
        mac.normalize();
        assert_eq!(mac.mac_address, "00:50:56:ab:cd:01");
        assert_eq!(
            StaticMac::parse_key("00-50-56-AB-CD-01").unwrap(),
            RecordKey::Text("00:50:56:ab:cd:01".to_string())
        );
    }
}
