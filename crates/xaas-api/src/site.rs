//! Registry of administered models.
//!
//! Each registered model gets list, detail, create, replace and delete
//! operations over JSON records. The registry is keyed by app label and
//! model slug, which is also how models are addressed in URLs.

use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use xaas_core::{
    CatalogService, EventSubscriptionRule, Faculty, FieldMeta, ItsService, KeyKind,
    ModelMeta, RecordKey, StaticMac, VmQuota, Workflow,
};
use xaas_storage::{Describe, SqliteStore};

use crate::{ApiError, Result};

/// One record as returned by the admin site.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entry {
    /// Primary key.
    pub pk: RecordKey,
    /// Textual representation.
    pub display: String,
    /// All fields.
    pub record: Value,
}

/// Admin operations for one model, on JSON records.
#[async_trait]
pub trait ModelAdmin: Send + Sync {
    /// Static metadata of the model.
    fn meta(&self) -> &'static ModelMeta;

    /// All records, ordered by key.
    async fn list(&self, store: &SqliteStore) -> Result<Vec<Entry>>;

    /// One record by its key as it appears in the URL.
    async fn get(&self, store: &SqliteStore, key: &str) -> Result<Entry>;

    /// Validate and store a new record.
    async fn create(&self, store: &SqliteStore, payload: Value) -> Result<Entry>;

    /// Replace the record stored under `key`.
    async fn update(&self, store: &SqliteStore, key: &str, payload: Value) -> Result<Entry>;

    /// Delete the record stored under `key`.
    async fn delete(&self, store: &SqliteStore, key: &str) -> Result<()>;
}

struct Registered<M>(PhantomData<fn() -> M>);

impl<M: Describe> Registered<M> {
    fn parse(payload: Value) -> Result<M> {
        let mut record: M = serde_json::from_value(payload).map_err(|e| ApiError::Payload {
            model: M::meta().verbose_name.to_string(),
            message: e.to_string(),
        })?;
        record.normalize();
        Ok(record)
    }

    async fn entry(store: &SqliteStore, record: &M) -> Result<Entry> {
        Ok(Entry {
            pk: record.key(),
            display: record.describe(store).await?,
            record: serde_json::to_value(record).map_err(xaas_core::Error::from)?,
        })
    }
}

#[async_trait]
impl<M: Describe> ModelAdmin for Registered<M> {
    fn meta(&self) -> &'static ModelMeta {
        M::meta()
    }

    async fn list(&self, store: &SqliteStore) -> Result<Vec<Entry>> {
        let records = store.list::<M>().await?;
        let mut entries = Vec::with_capacity(records.len());
        for record in &records {
            entries.push(Self::entry(store, record).await?);
        }
        Ok(entries)
    }

    async fn get(&self, store: &SqliteStore, key: &str) -> Result<Entry> {
        let key = M::parse_key(key)?;
        let record: M = store.get(&key).await?;
        Self::entry(store, &record).await
    }

    async fn create(&self, store: &SqliteStore, payload: Value) -> Result<Entry> {
        let record = Self::parse(payload)?;
        let stored = store.insert(&record).await?;
        Self::entry(store, &stored).await
    }

    async fn update(&self, store: &SqliteStore, key: &str, mut payload: Value) -> Result<Entry> {
        let meta = M::meta();
        let key = M::parse_key(key)?;

        let record = match (&key, meta.key_kind) {
            (RecordKey::Integer(id), KeyKind::Auto) => {
                let mut record = Self::parse(payload)?;
                record.assign_key(*id);
                record
            }
            _ => {
                if let (Some(object), Some(field)) = (payload.as_object_mut(), key_field(meta)) {
                    object
                        .entry(field.name)
                        .or_insert_with(|| Value::String(key.to_string()));
                }
                let record = Self::parse(payload)?;
                if record.key() != key {
                    return Err(ApiError::KeyMismatch {
                        path: key.to_string(),
                        body: record.key().to_string(),
                    });
                }
                record
            }
        };

        let stored = store.update(&record).await?;
        Self::entry(store, &stored).await
    }

    async fn delete(&self, store: &SqliteStore, key: &str) -> Result<()> {
        let key = M::parse_key(key)?;
        store.delete::<M>(&key).await?;
        Ok(())
    }
}

fn key_field(meta: &ModelMeta) -> Option<&'static FieldMeta> {
    meta.fields.iter().find(|f| f.column == meta.primary_key)
}

/// A model as listed on the admin index.
#[derive(Debug, Clone, Serialize)]
pub struct ModelIndex {
    /// URL slug.
    pub model_name: &'static str,
    /// Singular label.
    pub verbose_name: &'static str,
    /// Plural label.
    pub verbose_name_plural: &'static str,
    /// How the key is assigned.
    pub key_kind: KeyKind,
    /// Editable fields.
    pub fields: &'static [FieldMeta],
    /// List URL.
    pub url: String,
}

/// Models of one app on the admin index.
#[derive(Debug, Clone, Serialize)]
pub struct AppIndex {
    /// App label.
    pub app_label: &'static str,
    /// Models, ordered by plural label.
    pub models: Vec<ModelIndex>,
}

/// The registered models.
#[derive(Default, Clone)]
pub struct AdminSite {
    models: BTreeMap<(&'static str, &'static str), Arc<dyn ModelAdmin>>,
}

impl AdminSite {
    /// An empty site.
    pub fn new() -> Self {
        Self::default()
    }

    /// The site with every xaas-admin model registered.
    pub fn with_all_models() -> Result<Self> {
        let mut site = Self::new();
        site.register::<Faculty>()?
            .register::<ItsService>()?
            .register::<VmQuota>()?
            .register::<StaticMac>()?
            .register::<Workflow>()?
            .register::<CatalogService>()?
            .register::<EventSubscriptionRule>()?;
        Ok(site)
    }

    /// Register a model. Registering the same app and slug twice fails.
    pub fn register<M: Describe>(&mut self) -> Result<&mut Self> {
        let meta = M::meta();
        let id = (meta.app_label, meta.model_name);
        if self.models.contains_key(&id) {
            return Err(ApiError::AlreadyRegistered(format!(
                "{}.{}",
                meta.app_label, meta.model_name
            )));
        }
        self.models.insert(id, Arc::new(Registered::<M>(PhantomData)));
        tracing::debug!(app = meta.app_label, model = meta.model_name, "Registered model");
        Ok(self)
    }

    /// Number of registered models.
    pub fn len(&self) -> usize {
        self.models.len()
    }

    /// Whether no model is registered.
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Find a model by app label and slug.
    pub fn lookup(&self, app_label: &str, model_name: &str) -> Result<&dyn ModelAdmin> {
        self.models
            .iter()
            .find(|((app, model), _)| *app == app_label && *model == model_name)
            .map(|(_, admin)| admin.as_ref())
            .ok_or_else(|| ApiError::UnknownModel {
                app_label: app_label.to_string(),
                model_name: model_name.to_string(),
            })
    }

    /// Registered models grouped by app, apps ordered by label.
    pub fn index(&self) -> Vec<AppIndex> {
        let mut apps: Vec<AppIndex> = Vec::new();
        for admin in self.models.values() {
            let meta = admin.meta();
            let model = ModelIndex {
                model_name: meta.model_name,
                verbose_name: meta.verbose_name,
                verbose_name_plural: meta.verbose_name_plural,
                key_kind: meta.key_kind,
                fields: meta.fields,
                url: format!("/admin/{}/{}/", meta.app_label, meta.model_name),
            };
            match apps.iter_mut().find(|a| a.app_label == meta.app_label) {
                Some(app) => app.models.push(model),
                None => apps.push(AppIndex {
                    app_label: meta.app_label,
                    models: vec![model],
                }),
            }
        }
        for app in &mut apps {
            app.models
                .sort_by(|a, b| a.verbose_name_plural.cmp(b.verbose_name_plural));
        }
        apps
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_all_models_registered() {
        let site = AdminSite::with_all_models().unwrap();
        assert_eq!(site.len(), 7);
        assert!(site.lookup("myvm", "quota").is_ok());
        assert!(site.lookup("vra_service", "service").is_ok());
        assert!(site.lookup("itservices", "service").is_ok());
        assert!(matches!(
            site.lookup("myvm", "nope"),
            Err(ApiError::UnknownModel { .. })
        ));
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut site = AdminSite::new();
        site.register::<Faculty>().unwrap();
        assert!(matches!(
            site.register::<Faculty>(),
            Err(ApiError::AlreadyRegistered(_))
        ));
    }

    #[test]
    fn test_index_groups_by_app() {
        let site = AdminSite::with_all_models().unwrap();
        let index = site.index();
        let labels: Vec<_> = index.iter().map(|a| a.app_label).collect();
        assert_eq!(
            labels,
            vec!["global_infos", "itservices", "myvm", "vra_service"]
        );
        let myvm = &index[2];
        assert_eq!(myvm.models.len(), 2);
        assert!(
            myvm.models
                .iter()
                .any(|m| m.url == "/admin/myvm/staticmac/")
        );
    }
}
