//! Admin site round trips through the full router.

#![allow(clippy::unwrap_used)]

use std::collections::HashMap;

use axum::Router;
use axum::body::{Body, to_bytes};
use http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;
use xaas_api::{AppState, build_router};
use xaas_core::settings::TokenGrant;
use xaas_core::{Environment, Secrets, Settings, SettingsSources};
use xaas_storage::SqliteStore;

fn ci_settings() -> Settings {
    let sources = SettingsSources::new(HashMap::new(), Secrets::default());
    Settings::for_environment(Environment::Ci, &sources).unwrap()
}

async fn app_with(settings: Settings) -> Router {
    let store = SqliteStore::connect(&settings.database).await.unwrap();
    store.migrate().await.unwrap();
    build_router(AppState::new(store, settings).unwrap())
}

async fn app() -> Router {
    app_with(ci_settings()).await
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Host", "localhost");
    let body = match body {
        Some(value) => {
            builder = builder.header("Content-Type", "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };
    let resp = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_health() {
    let app = app().await;
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["server_name"], "ci");
}

#[tokio::test]
async fn test_root_redirects_to_admin() {
    let app = app().await;
    let req = Request::builder()
        .uri("/")
        .header("Host", "localhost")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert!(resp.status().is_redirection());
    assert_eq!(resp.headers()["location"], "/admin/");
}

#[tokio::test]
async fn test_index_lists_apps() {
    let app = app().await;
    let (status, body) = send(&app, "GET", "/admin/", None).await;
    assert_eq!(status, StatusCode::OK);
    let apps = body["apps"].as_array().unwrap();
    assert_eq!(apps.len(), 4);
    assert_eq!(apps[0]["app_label"], "global_infos");
    assert_eq!(apps[0]["models"][0]["fields"][0]["name"], "code");
    assert!(apps[0]["models"][0]["fields"][0].get("choices").is_none());

    let rules = apps[3]["models"]
        .as_array()
        .unwrap()
        .iter()
        .find(|m| m["model_name"] == "eventsubscriptioncondition")
        .unwrap();
    let operator = rules["fields"]
        .as_array()
        .unwrap()
        .iter()
        .find(|f| f["name"] == "operator")
        .unwrap();
    let choices = operator["choices"].as_array().unwrap();
    assert_eq!(choices.len(), 6);
    assert_eq!(choices[0], json!(["equals", "Equals"]));
    assert_eq!(choices[5], json!(["within", "Within"]));
}

#[tokio::test]
async fn test_faculty_round_trip() {
    let app = app().await;

    let (status, body) = send(
        &app,
        "POST",
        "/admin/global_infos/faculty",
        Some(json!({"code": "si", "ad_group": "si-admins"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["pk"], "si");
    assert_eq!(body["display"], "si");

    let (status, body) = send(&app, "GET", "/admin/global_infos/faculty", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (status, body) = send(
        &app,
        "PUT",
        "/admin/global_infos/faculty/si",
        Some(json!({"ad_group": "si-vpsi"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["record"]["ad_group"], "si-vpsi");

    let (status, body) = send(&app, "GET", "/admin/global_infos/faculty/si", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["record"]["ad_group"], "si-vpsi");

    let (status, _) = send(&app, "DELETE", "/admin/global_infos/faculty/si", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&app, "GET", "/admin/global_infos/faculty/si", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["category"], "not_found");
}

#[tokio::test]
async fn test_duplicate_mac_conflicts() {
    let app = app().await;
    let mac = json!({"mac_address": "00:50:56:aa:bb:cc", "used_by": "vm-01"});
    let (status, _) = send(&app, "POST", "/admin/myvm/staticmac", Some(mac.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = send(&app, "POST", "/admin/myvm/staticmac", Some(mac)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["category"], "conflict");

    let dashed = json!({"mac_address": "00-50-56-AA-BB-CC", "used_by": "vm-02"});
    let (status, _) = send(&app, "POST", "/admin/myvm/staticmac", Some(dashed)).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_mac_urls_accept_either_notation() {
    let app = app().await;
    let mac = json!({"mac_address": "00-50-56-AA-BB-CC", "used_by": "vm-01"});
    let (status, body) = send(&app, "POST", "/admin/myvm/staticmac", Some(mac)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["pk"], "00:50:56:aa:bb:cc");

    let (status, body) = send(&app, "GET", "/admin/myvm/staticmac/00-50-56-AA-BB-CC", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["record"]["used_by"], "vm-01");

    let (status, body) = send(
        &app,
        "PUT",
        "/admin/myvm/staticmac/00-50-56-aa-bb-cc",
        Some(json!({"mac_address": "00:50:56:AA:BB:CC", "used_by": "vm-02"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["display"], "00:50:56:aa:bb:cc=vm-02");
}

#[tokio::test]
async fn test_invalid_payloads_are_rejected() {
    let app = app().await;
    let (status, body) = send(
        &app,
        "POST",
        "/admin/myvm/staticmac",
        Some(json!({"mac_address": "zz", "used_by": "vm-01"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["category"], "validation");

    let (status, _) = send(
        &app,
        "POST",
        "/admin/global_infos/faculty",
        Some(json!({"code": "si"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_quota_flow() {
    let app = app().await;
    send(
        &app,
        "POST",
        "/admin/global_infos/faculty",
        Some(json!({"code": "si", "ad_group": "si-admins"})),
    )
    .await;

    let quota = json!({
        "year": 2018,
        "faculty": "si",
        "cpu_nb": 100,
        "ram_mb": 409600,
        "hdd_gb": 2000,
        "used_last_update": "2018-05-28T12:00:00Z"
    });
    let (status, body) = send(&app, "POST", "/admin/myvm/quota", Some(quota.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["display"], "si:2018");
    let id = body["pk"].as_i64().unwrap();

    let (status, _) = send(&app, "POST", "/admin/myvm/quota", Some(quota.clone())).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let mut next_year = quota.clone();
    next_year["year"] = json!(2019);
    let (status, _) = send(&app, "POST", "/admin/myvm/quota", Some(next_year)).await;
    assert_eq!(status, StatusCode::CREATED);

    let mut unknown = quota.clone();
    unknown["faculty"] = json!("enac");
    let (status, body) = send(&app, "POST", "/admin/myvm/quota", Some(unknown)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["category"], "integrity");

    let mut used = quota;
    used["cpu_nb_used"] = json!(150);
    let (status, body) = send(&app, "PUT", &format!("/admin/myvm/quota/{id}"), Some(used)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["record"]["cpu_nb_used"], 150);
    assert_eq!(body["pk"], id);

    let (status, _) = send(&app, "GET", "/admin/myvm/quota/not-a-number", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_rule_display_names_service_and_workflow() {
    let app = app().await;
    let (_, workflow) = send(
        &app,
        "POST",
        "/admin/vra_service/workflow",
        Some(json!({"name": "NewItemWorkflow"})),
    )
    .await;
    let workflow_id = workflow["pk"].as_i64().unwrap();

    let (status, _) = send(
        &app,
        "POST",
        "/admin/vra_service/service",
        Some(json!({
            "short_name": "MyVM",
            "long_name": "Virtualization Server",
            "description": "Server virtualization hosting",
            "item_request_workflow": workflow_id,
            "action_request_workflow": workflow_id
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        &app,
        "POST",
        "/admin/vra_service/eventsubscriptioncondition",
        Some(json!({
            "service": "MyVM",
            "workflow": workflow_id,
            "left_operand": "left.operand",
            "operator": "equals",
            "right_operand": "value"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(
        body["display"],
        "Virtualization Server (MyVM): exec NewItemWorkflow if 'left.operand' equals 'value'"
    );

    let (status, _) = send(
        &app,
        "POST",
        "/admin/vra_service/eventsubscriptioncondition",
        Some(json!({
            "service": "MyVM",
            "workflow": workflow_id,
            "left_operand": "left.operand",
            "operator": "matches",
            "right_operand": "value"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_natural_key_mismatch_is_rejected() {
    let app = app().await;
    send(
        &app,
        "POST",
        "/admin/itservices/service",
        Some(json!({"short_name": "myvm", "long_name": "MyVM", "snow_id": "SVC1"})),
    )
    .await;
    let (status, body) = send(
        &app,
        "PUT",
        "/admin/itservices/service/myvm",
        Some(json!({"short_name": "other", "long_name": "MyVM", "snow_id": "SVC1"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["category"], "invalid_key");
}

#[tokio::test]
async fn test_unknown_model_is_not_found() {
    let app = app().await;
    let (status, body) = send(&app, "GET", "/admin/myvm/unknown", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["category"], "not_found");
}

#[tokio::test]
async fn test_disallowed_host_is_rejected() {
    let mut settings = ci_settings();
    settings.allowed_hosts = vec!["xaas-admin-test.epfl.ch".to_string()];
    let app = app_with(settings).await;

    let req = Request::builder()
        .uri("/health")
        .header("Host", "evil.example.com")
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let req = Request::builder()
        .uri("/health")
        .header("Host", "xaas-admin-test.epfl.ch:443")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_admin_requires_token_when_enabled() {
    let mut settings = ci_settings();
    settings.auth.enabled = true;
    settings.auth.required_group = Some("xaas-admins".to_string());
    settings.auth.tokens = vec![TokenGrant {
        token: "admin-token".to_string(),
        username: "alice".to_string(),
        groups: vec!["xaas-admins".to_string()],
    }];
    let app = app_with(settings).await;

    let (status, _) = send(&app, "GET", "/admin/", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);

    let req = Request::builder()
        .uri("/admin/")
        .header("Host", "localhost")
        .header("Authorization", "Bearer admin-token")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_static_files_are_served() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("admin.css"), "body {}").unwrap();
    let mut settings = ci_settings();
    settings.static_root = dir.path().to_path_buf();
    let app = app_with(settings).await;

    let req = Request::builder()
        .uri("/static/admin.css")
        .header("Host", "localhost")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"body {}");
}
