//! Connection pool, schema creation and generic CRUD.

use std::str::FromStr;

use sqlx::Sqlite;
use sqlx::query::{Query, QueryAs};
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use xaas_core::settings::DatabaseSettings;
use xaas_core::{Error, KeyKind, Model, ModelMeta, RecordKey, Result, SqlValue};

const SCHEMA: &str = include_str!("../migrations/0001_initial.sql");

/// Record store backed by a SQLite connection pool.
///
/// Cloning is cheap; clones share the pool.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open a pool for the configured database URL with foreign keys
    /// enforced.
    ///
    /// In-memory databases are held on a single connection that is never
    /// recycled, otherwise each connection would see its own empty database.
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(&settings.url)?.foreign_keys(true);
        let pool_options = if is_in_memory(&settings.url) {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(settings.max_connections.max(1))
        };
        let pool = pool_options.connect_with(options).await?;
        tracing::debug!(url = %settings.url, "Connected to database");
        Ok(Self { pool })
    }

    /// Shorthand for [`connect`](Self::connect) with default pool size.
    pub async fn connect_url(url: &str) -> Result<Self> {
        Self::connect(&DatabaseSettings {
            url: url.to_string(),
            max_connections: 5,
        })
        .await
    }

    /// The underlying pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create missing tables. Safe to run on every start.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        tracing::info!("Database schema is up to date");
        Ok(())
    }

    /// Close every connection of the pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Validate and store a new record. Auto-key records come back with
    /// their assigned id.
    pub async fn insert<M: Model>(&self, record: &M) -> Result<M> {
        let meta = M::meta();
        let mut record = record.clone();
        record.normalize();
        record.validate()?;

        let columns: Vec<&str> = meta.insert_columns().collect();
        let placeholders = vec!["?"; columns.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            meta.table,
            columns.join(", "),
            placeholders
        );

        let mut query = sqlx::query(&sql);
        for value in record.values() {
            query = bind(query, value);
        }
        let done = query
            .execute(&self.pool)
            .await
            .map_err(|e| classify(e, meta))?;

        if meta.key_kind == KeyKind::Auto {
            record.assign_key(done.last_insert_rowid());
        }
        report_advisories(&record);
        tracing::info!(model = meta.model_name, key = %record.key(), "Created record");
        Ok(record)
    }

    /// Fetch one record by key.
    pub async fn get<M: Model>(&self, key: &RecordKey) -> Result<M> {
        let meta = M::meta();
        let sql = format!(
            "SELECT * FROM {} WHERE {} = ?",
            meta.table, meta.primary_key
        );
        let query = bind_as(sqlx::query_as::<_, M>(&sql), SqlValue::from(key));
        query
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::not_found(meta.verbose_name, key))
    }

    /// All records of a model, ordered by key.
    pub async fn list<M: Model>(&self) -> Result<Vec<M>> {
        let meta = M::meta();
        let sql = format!(
            "SELECT * FROM {} ORDER BY {}",
            meta.table, meta.primary_key
        );
        Ok(sqlx::query_as::<_, M>(&sql).fetch_all(&self.pool).await?)
    }

    /// Validate and overwrite an existing record. The key itself is never
    /// changed.
    pub async fn update<M: Model>(&self, record: &M) -> Result<M> {
        let meta = M::meta();
        let mut record = record.clone();
        record.normalize();
        record.validate()?;

        let assignments: Vec<String> = meta
            .update_columns()
            .map(|column| format!("{column} = ?"))
            .collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ?",
            meta.table,
            assignments.join(", "),
            meta.primary_key
        );

        let mut query = sqlx::query(&sql);
        for (field, value) in meta.fields.iter().zip(record.values()) {
            if field.column != meta.primary_key {
                query = bind(query, value);
            }
        }
        let key = record.key();
        query = bind(query, SqlValue::from(&key));

        let done = query
            .execute(&self.pool)
            .await
            .map_err(|e| classify(e, meta))?;
        if done.rows_affected() == 0 {
            return Err(Error::not_found(meta.verbose_name, &key));
        }
        report_advisories(&record);
        tracing::info!(model = meta.model_name, key = %key, "Updated record");
        Ok(record)
    }

    /// Delete one record by key. Dependent records are removed with it.
    pub async fn delete<M: Model>(&self, key: &RecordKey) -> Result<()> {
        let meta = M::meta();
        let sql = format!("DELETE FROM {} WHERE {} = ?", meta.table, meta.primary_key);
        let done = bind(sqlx::query(&sql), SqlValue::from(key))
            .execute(&self.pool)
            .await
            .map_err(|e| classify(e, meta))?;
        if done.rows_affected() == 0 {
            return Err(Error::not_found(meta.verbose_name, key));
        }
        tracing::info!(model = meta.model_name, key = %key, "Deleted record");
        Ok(())
    }
}

fn is_in_memory(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

fn bind<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    value: SqlValue,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        SqlValue::Text(s) => query.bind(s),
        SqlValue::Integer(i) => query.bind(i),
        SqlValue::NullableInteger(i) => query.bind(i),
        SqlValue::Timestamp(t) => query.bind(t),
    }
}

fn bind_as<'q, M>(
    query: QueryAs<'q, Sqlite, M, SqliteArguments<'q>>,
    value: SqlValue,
) -> QueryAs<'q, Sqlite, M, SqliteArguments<'q>> {
    match value {
        SqlValue::Text(s) => query.bind(s),
        SqlValue::Integer(i) => query.bind(i),
        SqlValue::NullableInteger(i) => query.bind(i),
        SqlValue::Timestamp(t) => query.bind(t),
    }
}

/// Map constraint failures to domain errors.
fn classify(err: sqlx::Error, meta: &ModelMeta) -> Error {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return Error::Conflict {
                model: meta.verbose_name.to_string(),
                message: db.message().to_string(),
            };
        }
        if db.is_foreign_key_violation() {
            return Error::Integrity {
                message: format!("{}: {}", meta.verbose_name, db.message()),
            };
        }
    }
    Error::Database(err)
}

fn report_advisories<M: Model>(record: &M) {
    for advisory in record.advisories() {
        tracing::warn!(model = M::meta().model_name, "{advisory}");
    }
}
