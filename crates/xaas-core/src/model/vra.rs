//! Orchestration catalog: workflows, catalog entries and the event
//! subscription rules deciding which workflow runs for which request.
//!
//! The rules are stored here and executed by the external orchestrator.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::{FieldMeta, KeyKind, Model, ModelMeta, RecordKey, SqlValue};
use crate::{Error, Result, validate};

// ============================================================================
// Workflow
// ============================================================================

static WORKFLOW_META: ModelMeta = ModelMeta {
    app_label: "vra_service",
    model_name: "workflow",
    table: "vra_event_sub_workflow",
    primary_key: "id",
    key_kind: KeyKind::Auto,
    fields: &[FieldMeta {
        name: "name",
        column: "vra_event_sub_workflow_name",
        verbose_name: "vRO workflow name",
        choices: &[],
    }],
    verbose_name: "vRA Event Subscription Workflow",
    verbose_name_plural: "vRA Event Subscription Workflows",
};

/// A named orchestrator workflow that event subscriptions can trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Workflow {
    /// Database id. Zero until the record is stored.
    #[serde(default)]
    pub id: i64,
    /// Workflow name in the orchestrator.
    #[sqlx(rename = "vra_event_sub_workflow_name")]
    pub name: String,
}

impl fmt::Display for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl Model for Workflow {
    fn meta() -> &'static ModelMeta {
        &WORKFLOW_META
    }

    fn key(&self) -> RecordKey {
        RecordKey::Integer(self.id)
    }

    fn assign_key(&mut self, id: i64) {
        self.id = id;
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![SqlValue::Text(self.name.clone())]
    }

    fn validate(&self) -> Result<()> {
        validate::required_max_len("name", &self.name, 50)
    }
}

// ============================================================================
// CatalogService
// ============================================================================

static SERVICE_META: ModelMeta = ModelMeta {
    app_label: "vra_service",
    model_name: "service",
    table: "vra_service",
    primary_key: "vra_svc_short_name",
    key_kind: KeyKind::Natural,
    fields: &[
        FieldMeta {
            name: "short_name",
            column: "vra_svc_short_name",
            verbose_name: "Service short name",
            choices: &[],
        },
        FieldMeta {
            name: "long_name",
            column: "vra_svc_long_name",
            verbose_name: "Service long name",
            choices: &[],
        },
        FieldMeta {
            name: "description",
            column: "vra_svc_description",
            verbose_name: "Service description",
            choices: &[],
        },
        FieldMeta {
            name: "item_request_workflow",
            column: "vra_svc_item_req_ev_sub_wrkflw_id_id",
            verbose_name: "Item request Event Subscription Workflow",
            choices: &[],
        },
        FieldMeta {
            name: "action_request_workflow",
            column: "vra_svc_action_req_ev_sub_wrkflw_id_id",
            verbose_name: "Action request Event Subscription Workflow",
            choices: &[],
        },
    ],
    verbose_name: "vRA Service",
    verbose_name_plural: "vRA Services",
};

/// An entry of the orchestrator's service catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct CatalogService {
    /// Short name, e.g. `MyVM`.
    #[sqlx(rename = "vra_svc_short_name")]
    pub short_name: String,
    /// Display name.
    #[sqlx(rename = "vra_svc_long_name")]
    pub long_name: String,
    /// Free-text description.
    #[sqlx(rename = "vra_svc_description")]
    pub description: String,
    /// Workflow run on item requests.
    #[sqlx(rename = "vra_svc_item_req_ev_sub_wrkflw_id_id")]
    pub item_request_workflow: i64,
    /// Workflow run on action requests.
    #[sqlx(rename = "vra_svc_action_req_ev_sub_wrkflw_id_id")]
    pub action_request_workflow: i64,
}

impl fmt::Display for CatalogService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.long_name, self.short_name)
    }
}

impl Model for CatalogService {
    fn meta() -> &'static ModelMeta {
        &SERVICE_META
    }

    fn key(&self) -> RecordKey {
        RecordKey::Text(self.short_name.clone())
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::Text(self.short_name.clone()),
            SqlValue::Text(self.long_name.clone()),
            SqlValue::Text(self.description.clone()),
            SqlValue::Integer(self.item_request_workflow),
            SqlValue::Integer(self.action_request_workflow),
        ]
    }

    fn validate(&self) -> Result<()> {
        validate::required_max_len("short_name", &self.short_name, 20)?;
        validate::required_max_len("long_name", &self.long_name, 50)?;
        validate::max_len("description", &self.description, 255)
    }
}

// ============================================================================
// ConditionOperator
// ============================================================================

/// Comparison applied by the orchestrator between a request property and a
/// literal value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConditionOperator {
    /// Property equals the value.
    Equals,
    /// Property differs from the value.
    NotEquals,
    /// Property contains the value.
    Contains,
    /// Property starts with the value.
    StartsWith,
    /// Property ends with the value.
    EndsWith,
    /// Property lies within the value.
    Within,
}

impl ConditionOperator {
    /// Every operator, in the order offered to administrators.
    pub const ALL: [ConditionOperator; 6] = [
        ConditionOperator::Equals,
        ConditionOperator::NotEquals,
        ConditionOperator::Contains,
        ConditionOperator::StartsWith,
        ConditionOperator::EndsWith,
        ConditionOperator::Within,
    ];

    /// `(code, label)` pairs offered to administrators.
    pub const CHOICES: [(&'static str, &'static str); 6] = {
        let mut choices = [("", ""); 6];
        let mut i = 0;
        while i < Self::ALL.len() {
            choices[i] = (Self::ALL[i].as_str(), Self::ALL[i].label());
            i += 1;
        }
        choices
    };

    /// Stored code, as understood by the orchestrator.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ConditionOperator::Equals => "equals",
            ConditionOperator::NotEquals => "notEquals",
            ConditionOperator::Contains => "contains",
            ConditionOperator::StartsWith => "startsWith",
            ConditionOperator::EndsWith => "endsWith",
            ConditionOperator::Within => "within",
        }
    }

    /// Label shown to administrators.
    pub const fn label(&self) -> &'static str {
        match self {
            ConditionOperator::Equals => "Equals",
            ConditionOperator::NotEquals => "Not equals",
            ConditionOperator::Contains => "Contains",
            ConditionOperator::StartsWith => "Starts with",
            ConditionOperator::EndsWith => "Ends with",
            ConditionOperator::Within => "Within",
        }
    }
}

impl fmt::Display for ConditionOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConditionOperator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| {
                Error::validation_field(
                    "operator",
                    format!("Select a valid choice. {s} is not one of the available choices."),
                )
            })
    }
}

impl TryFrom<String> for ConditionOperator {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

// ============================================================================
// EventSubscriptionRule
// ============================================================================

static RULE_META: ModelMeta = ModelMeta {
    app_label: "vra_service",
    model_name: "eventsubscriptioncondition",
    table: "vra_event_sub_conditions",
    primary_key: "id",
    key_kind: KeyKind::Auto,
    fields: &[
        FieldMeta {
            name: "service",
            column: "vra_svc_long_name",
            verbose_name: "When request for vRA Service...",
            choices: &[],
        },
        FieldMeta {
            name: "workflow",
            column: "vra_event_sub_workflow_id_id",
            verbose_name: "... execute vRO Workflow",
            choices: &[],
        },
        FieldMeta {
            name: "left_operand",
            column: "vra_event_sub_cond_left_operand",
            verbose_name: "If vRO properties (path)",
            choices: &[],
        },
        FieldMeta {
            name: "operator",
            column: "vra_event_sub_cond_operator",
            verbose_name: "Operator",
            choices: &ConditionOperator::CHOICES,
        },
        FieldMeta {
            name: "right_operand",
            column: "vra_event_sub_cond_right_operand",
            verbose_name: "Value",
            choices: &[],
        },
    ],
    verbose_name: "vRO Workflow exec condition",
    verbose_name_plural: "vRO Workflow exec conditions",
};

/// Condition under which the orchestrator runs a workflow for requests on a
/// catalog service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct EventSubscriptionRule {
    /// Database id. Zero until the record is stored.
    #[serde(default)]
    pub id: i64,
    /// Short name of the catalog service.
    #[sqlx(rename = "vra_svc_long_name")]
    pub service: String,
    /// Id of the workflow to run.
    #[sqlx(rename = "vra_event_sub_workflow_id_id")]
    pub workflow: i64,
    /// Request property path.
    #[sqlx(rename = "vra_event_sub_cond_left_operand")]
    pub left_operand: String,
    /// Comparison.
    #[sqlx(rename = "vra_event_sub_cond_operator", try_from = "String")]
    pub operator: ConditionOperator,
    /// Literal compared against.
    #[sqlx(rename = "vra_event_sub_cond_right_operand")]
    pub right_operand: String,
}

impl EventSubscriptionRule {
    /// Pair the rule with its resolved service and workflow for display.
    pub fn display_with<'a>(
        &'a self,
        service: &'a CatalogService,
        workflow: &'a Workflow,
    ) -> RuleDescription<'a> {
        RuleDescription {
            rule: self,
            service,
            workflow,
        }
    }
}

/// Textual representation of a rule:
/// `<service>: exec <workflow> if '<left>' <operator> '<right>'`.
#[derive(Debug, Clone, Copy)]
pub struct RuleDescription<'a> {
    rule: &'a EventSubscriptionRule,
    service: &'a CatalogService,
    workflow: &'a Workflow,
}

impl fmt::Display for RuleDescription<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: exec {} if '{}' {} '{}'",
            self.service,
            self.workflow,
            self.rule.left_operand,
            self.rule.operator,
            self.rule.right_operand
        )
    }
}

impl Model for EventSubscriptionRule {
    fn meta() -> &'static ModelMeta {
        &RULE_META
    }

    fn key(&self) -> RecordKey {
        RecordKey::Integer(self.id)
    }

    fn assign_key(&mut self, id: i64) {
        self.id = id;
    }

    fn values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::Text(self.service.clone()),
            SqlValue::Integer(self.workflow),
            SqlValue::Text(self.left_operand.clone()),
            SqlValue::Text(self.operator.as_str().to_string()),
            SqlValue::Text(self.right_operand.clone()),
        ]
    }

    fn validate(&self) -> Result<()> {
        validate::require("service", &self.service)?;
        validate::required_max_len("left_operand", &self.left_operand, 255)?;
        validate::max_len("right_operand", &self.right_operand, 255)
    }
}
