//! Router, handlers and the request pipeline.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{FromRequestParts, Path, State};
use axum::response::Redirect;
use axum::routing::get;
use axum::{Json, Router, middleware};
use http::StatusCode;
use http::request::Parts;
use serde_json::{Value, json};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use xaas_auth::{AuthConfig, AuthLayer, StaticTokenValidator, username_from_parts};
use xaas_core::Settings;
use xaas_storage::SqliteStore;

use crate::site::{AdminSite, Entry};
use crate::{Result, hosts};

/// Shared state of every handler.
#[derive(Clone)]
pub struct AppState {
    /// Record store.
    pub store: SqliteStore,
    /// Registered models.
    pub site: Arc<AdminSite>,
    /// Active settings.
    pub settings: Arc<Settings>,
}

impl AppState {
    /// State with every model registered.
    pub fn new(store: SqliteStore, settings: Settings) -> Result<Self> {
        Ok(Self {
            store,
            site: Arc::new(AdminSite::with_all_models()?),
            settings: Arc::new(settings),
        })
    }
}

/// Username of the administrator behind a request, for the audit log.
pub struct Actor(pub String);

impl<S: Send + Sync> FromRequestParts<S> for Actor {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        Ok(Actor(username_from_parts(parts).to_string()))
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    let settings = state.settings.clone();
    let validator = Arc::new(StaticTokenValidator::new(&settings.auth.tokens));
    let auth = AuthLayer::new(validator, AuthConfig::from(&settings.auth));

    let admin = Router::new()
        .route("/admin", get(index))
        .route("/admin/", get(index))
        .route(
            "/admin/{app}/{model}",
            get(list_records).post(create_record),
        )
        .route(
            "/admin/{app}/{model}/",
            get(list_records).post(create_record),
        )
        .route(
            "/admin/{app}/{model}/{pk}",
            get(get_record).put(update_record).delete(delete_record),
        )
        .layer(auth);

    let mut router = Router::new()
        .route("/", get(|| async { Redirect::temporary("/admin/") }))
        .route("/health", get(health))
        .merge(admin);

    let static_prefix = settings.static_url.trim_end_matches('/');
    if !static_prefix.is_empty() && static_prefix.starts_with('/') {
        router = router.nest_service(static_prefix, ServeDir::new(&settings.static_root));
    }

    router
        .layer(middleware::from_fn_with_state(state.clone(), hosts::allowed_hosts))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "server_name": state.settings.server_name,
    }))
}

async fn index(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "server_name": state.settings.server_name,
        "apps": state.site.index(),
    }))
}

async fn list_records(
    State(state): State<AppState>,
    Path((app, model)): Path<(String, String)>,
) -> Result<Json<Vec<Entry>>> {
    let admin = state.site.lookup(&app, &model)?;
    Ok(Json(admin.list(&state.store).await?))
}

async fn get_record(
    State(state): State<AppState>,
    Path((app, model, pk)): Path<(String, String, String)>,
) -> Result<Json<Entry>> {
    let admin = state.site.lookup(&app, &model)?;
    Ok(Json(admin.get(&state.store, &pk).await?))
}

async fn create_record(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path((app, model)): Path<(String, String)>,
    Json(payload): Json<Value>,
) -> Result<(StatusCode, Json<Entry>)> {
    let admin = state.site.lookup(&app, &model)?;
    let entry = admin.create(&state.store, payload).await?;
    tracing::info!(%actor, %app, %model, pk = %entry.pk, "Added \"{}\"", entry.display);
    Ok((StatusCode::CREATED, Json(entry)))
}

async fn update_record(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path((app, model, pk)): Path<(String, String, String)>,
    Json(payload): Json<Value>,
) -> Result<Json<Entry>> {
    let admin = state.site.lookup(&app, &model)?;
    let entry = admin.update(&state.store, &pk, payload).await?;
    tracing::info!(%actor, %app, %model, pk = %entry.pk, "Changed \"{}\"", entry.display);
    Ok(Json(entry))
}

async fn delete_record(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path((app, model, pk)): Path<(String, String, String)>,
) -> Result<StatusCode> {
    let admin = state.site.lookup(&app, &model)?;
    admin.delete(&state.store, &pk).await?;
    tracing::info!(%actor, %app, %model, %pk, "Deleted record");
    Ok(StatusCode::NO_CONTENT)
}
