//! Textual representation of records.
//!
//! Most records describe themselves through `Display`. A rule's text names
//! its catalog service and workflow, which live in other tables, so
//! describing one needs the store.

use async_trait::async_trait;
use xaas_core::{
    CatalogService, EventSubscriptionRule, Faculty, ItsService, RecordKey, Result, StaticMac,
    VmQuota, Workflow,
};

use crate::SqliteStore;

/// A record that can render the text shown to administrators.
#[async_trait]
pub trait Describe: xaas_core::Model {
    /// The record's textual representation.
    async fn describe(&self, store: &SqliteStore) -> Result<String>;
}

macro_rules! describe_with_display {
    ($($model:ty),+ $(,)?) => {
        $(
            #[async_trait]
            impl Describe for $model {
                async fn describe(&self, _store: &SqliteStore) -> Result<String> {
                    Ok(self.to_string())
                }
            }
        )+
    };
}

describe_with_display!(Faculty, ItsService, VmQuota, StaticMac, Workflow, CatalogService);

#[async_trait]
impl Describe for EventSubscriptionRule {
    async fn describe(&self, store: &SqliteStore) -> Result<String> {
        let service: CatalogService = store
            .get(&RecordKey::Text(self.service.clone()))
            .await?;
        let workflow: Workflow = store.get(&RecordKey::Integer(self.workflow)).await?;
        Ok(self.display_with(&service, &workflow).to_string())
    }
}
