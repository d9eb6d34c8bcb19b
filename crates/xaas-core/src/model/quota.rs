use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{FieldMeta, KeyKind, Model, ModelMeta, RecordKey, SqlValue};
use crate::{Result, validate};

static META: ModelMeta = ModelMeta {
    app_label: "myvm",
    model_name: "quota",
    table: "myvm_quotas",
    primary_key: "id",
    key_kind: KeyKind::Auto,
    fields: &[
        FieldMeta {
            name: "year",
            column: "myvm_quotas_year",
            verbose_name: "Year",
            choices: &[],
        },
        FieldMeta {
            name: "faculty",
            column: "myvm_faculty",
            verbose_name: "Faculty",
            choices: &[],
        },
        FieldMeta {
            name: "cpu_nb",
            column: "myvm_quotas_cpu_nb",
            verbose_name: "NB CPUs",
            choices: &[],
        },
        FieldMeta {
            name: "ram_mb",
            column: "myvm_quotas_ram_mb",
            verbose_name: "RAM [MB]",
            choices: &[],
        },
        FieldMeta {
            name: "hdd_gb",
            column: "myvm_quotas_hdd_gb",
            verbose_name: "HDD [GB]",
            choices: &[],
        },
        FieldMeta {
            name: "cpu_nb_used",
            column: "myvm_quotas_cpu_nb_used",
            verbose_name: "Used - NB CPUs",
            choices: &[],
        },
        FieldMeta {
            name: "ram_mb_used",
            column: "myvm_quotas_ram_mb_used",
            verbose_name: "Used - RAM [MB]",
            choices: &[],
        },
        FieldMeta {
            name: "hdd_gb_used",
            column: "myvm_quotas_hdd_gb_used",
            verbose_name: "Used - HDD [GB]",
            choices: &[],
        },
        FieldMeta {
            name: "used_last_update",
            column: "myvm_quotas_used_last_update",
            verbose_name: "Quota last update",
            choices: &[],
        },
        FieldMeta {
            name: "cpu_nb_reserved",
            column: "myvm_quotas_cpu_nb_reserved",
            verbose_name: "Reserved - NB CPUs",
            choices: &[],
        },
        FieldMeta {
            name: "ram_mb_reserved",
            column: "myvm_quotas_ram_mb_reserved",
            verbose_name: "Reserved - RAM [MB]",
            choices: &[],
        },
        FieldMeta {
            name: "hdd_gb_reserved",
            column: "myvm_quotas_hdd_gb_reserved",
            verbose_name: "Reserved - HDD [GB]",
            choices: &[],
        },
    ],
    verbose_name: "MyVM Quotas",
    verbose_name_plural: "MyVM Quotas",
};

fn reserved_default() -> Option<i64> {
    Some(0)
}

/// Yearly self-service VM allotment of a faculty, with the usage and
/// reservation counters reported by the provisioning platform.
///
/// There is at most one quota per (year, faculty).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct VmQuota {
    /// Database id. Zero until the record is stored.
    #[serde(default)]
    pub id: i64,
    /// Quota year.
    #[sqlx(rename = "myvm_quotas_year")]
    pub year: i64,
    /// Faculty code.
    #[sqlx(rename = "myvm_faculty")]
    pub faculty: String,
    /// Allotted CPUs.
    #[sqlx(rename = "myvm_quotas_cpu_nb")]
    pub cpu_nb: i64,
    /// Allotted RAM in MB.
    #[sqlx(rename = "myvm_quotas_ram_mb")]
    pub ram_mb: i64,
    /// Allotted disk in GB.
    #[sqlx(rename = "myvm_quotas_hdd_gb")]
    pub hdd_gb: i64,
    /// CPUs in use.
    #[serde(default)]
    #[sqlx(rename = "myvm_quotas_cpu_nb_used")]
    pub cpu_nb_used: i64,
    /// RAM in use, in MB.
    #[serde(default)]
    #[sqlx(rename = "myvm_quotas_ram_mb_used")]
    pub ram_mb_used: i64,
    /// Disk in use, in GB.
    #[serde(default)]
    #[sqlx(rename = "myvm_quotas_hdd_gb_used")]
    pub hdd_gb_used: i64,
    /// When the usage counters were last refreshed.
    #[sqlx(rename = "myvm_quotas_used_last_update")]
    pub used_last_update: DateTime<Utc>,
    /// CPUs reserved by pending requests.
    #[serde(default = "reserved_default")]
    #[sqlx(rename = "myvm_quotas_cpu_nb_reserved")]
    pub cpu_nb_reserved: Option<i64>,
    /// RAM reserved by pending requests, in MB.
    #[serde(default = "reserved_default")]
    #[sqlx(rename = "myvm_quotas_ram_mb_reserved")]
    pub ram_mb_reserved: Option<i64>,
    /// Disk reserved by pending requests, in GB.
    #[serde(default = "reserved_default")]
    #[sqlx(rename = "myvm_quotas_hdd_gb_reserved")]
    pub hdd_gb_reserved: Option<i64>,
}

impl VmQuota {
    /// Resources whose used or reserved counter exceeds the allotment.
    ///
    /// The allotment is advisory: quotas over their allotment are stored
    /// as-is and only reported.
    pub fn exceeded_resources(&self) -> Vec<&'static str> {
        let checks = [
            ("cpu", self.cpu_nb, self.cpu_nb_used, self.cpu_nb_reserved),
            ("ram", self.ram_mb, self.ram_mb_used, self.ram_mb_reserved),
            ("hdd", self.hdd_gb, self.hdd_gb_used, self.hdd_gb_reserved),
        ];
        checks
            .into_iter()
            .filter(|(_, allotted, used, reserved)| {
                used > allotted || reserved.unwrap_or(0) > *allotted
            })
            .map(|(name, ..)| name)
            .collect()
    }

    #[cfg(test)]
    #[allow(clippy::unwrap_used)]
    pub(crate) fn sample() -> Self {
        use chrono::TimeZone;

        Self {
            id: 0,
            year: 2018,
            faculty: "si".to_string(),
            cpu_nb: 100,
            ram_mb: 409_600,
            hdd_gb: 2000,
            cpu_nb_used: 10,
            ram_mb_used: 20_480,
            hdd_gb_used: 500,
            used_last_update: Utc.with_ymd_and_hms(2018, 5, 28, 12, 0, 0).unwrap(),
            cpu_nb_reserved: Some(0),
            ram_mb_reserved: Some(0),
            hdd_gb_reserved: Some(0),
        }
    }
}

impl fmt::Display for VmQuota {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.faculty, self.year)
    }
}

impl Model for VmQuota {
    fn meta() -> &'static ModelMeta {
        &META
    }

    fn key(&self) -> RecordKey {
        RecordKey::Integer(self.id)
    }

    fn assign_key(&mut self, id: i64) {
        self.id = id;
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::Integer(self.year),
            SqlValue::Text(self.faculty.clone()),
            SqlValue::Integer(self.cpu_nb),
            SqlValue::Integer(self.ram_mb),
            SqlValue::Integer(self.hdd_gb),
            SqlValue::Integer(self.cpu_nb_used),
            SqlValue::Integer(self.ram_mb_used),
            SqlValue::Integer(self.hdd_gb_used),
            SqlValue::Timestamp(self.used_last_update),
            SqlValue::NullableInteger(self.cpu_nb_reserved),
            SqlValue::NullableInteger(self.ram_mb_reserved),
            SqlValue::NullableInteger(self.hdd_gb_reserved),
        ]
    }

    fn validate(&self) -> Result<()> {
        validate::required_max_len("faculty", &self.faculty, 50)
    }

    fn advisories(&self) -> Vec<String> {
        self.exceeded_resources()
            .into_iter()
            .map(|resource| format!("{resource} usage of {self} exceeds its allotment"))
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_string_representation() {
        assert_eq!(VmQuota::sample().to_string(), "si:2018");
    }

    #[test]
    fn test_within_allotment() {
        assert!(VmQuota::sample().exceeded_resources().is_empty());
    }

    #[test]
    fn test_exceeded_resources() {
        let mut quota = VmQuota::sample();
        quota.cpu_nb_used = 101;
        quota.hdd_gb_reserved = Some(2001);
        assert_eq!(quota.exceeded_resources(), vec!["cpu", "hdd"]);
        assert_eq!(
            quota.advisories(),
            vec![
                "cpu usage of si:2018 exceeds its allotment",
                "hdd usage of si:2018 exceeds its allotment",
            ]
        );
    }

    #[test]
    fn test_deserialize_applies_counter_defaults() {
        let quota: VmQuota = serde_json::from_str(
            r#"{
                "year": 2019,
                "faculty": "enac",
                "cpu_nb": 50,
                "ram_mb": 204800,
                "hdd_gb": 1000,
                "used_last_update": "2019-01-01T00:00:00Z"
            }"#,
        )
        .unwrap();
        assert_eq!(quota.id, 0);
        assert_eq!(quota.cpu_nb_used, 0);
        assert_eq!(quota.ram_mb_reserved, Some(0));
        assert_eq!(quota.to_string(), "enac:2019");
    }
}
