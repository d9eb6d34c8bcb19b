//! `serve`, `migrate` and `check`.

use xaas_api::Server;
use xaas_core::{Result, Settings};
use xaas_storage::SqliteStore;

/// Run the admin site until SIGINT or SIGTERM.
pub async fn serve(settings: Settings) -> anyhow::Result<()> {
    for issue in check_settings(&settings) {
        tracing::warn!("{issue}");
    }
    let server = Server::new(settings).await?;
    server.run(shutdown_signal()).await?;
    Ok(())
}

/// Create missing tables in the configured database.
pub async fn migrate(settings: &Settings) -> Result<()> {
    let store = SqliteStore::connect(&settings.database).await?;
    store.migrate().await?;
    store.close().await;
    Ok(())
}

/// Problems with settings that a deployment should not run with.
pub fn check_settings(settings: &Settings) -> Vec<String> {
    let mut issues = Vec::new();
    let public = settings
        .allowed_hosts
        .iter()
        .any(|h| h == "*" || !is_loopback(h));

    if settings.debug && public && settings.server_name != "ci" {
        issues.push("debug is enabled while serving non-local hosts".to_string());
    }
    if !settings.debug && settings.allowed_hosts.is_empty() {
        issues.push("allowed_hosts is empty, every request will be rejected".to_string());
    }
    if !settings.debug && settings.allowed_hosts.iter().any(|h| h == "*") {
        issues.push("allowed_hosts accepts any host".to_string());
    }
    if settings.auth.enabled && settings.auth.tokens.is_empty() {
        issues.push("authentication is enabled but no token is configured".to_string());
    }
    if !settings.auth.enabled && !settings.debug {
        issues.push("authentication is disabled".to_string());
    }
    if !settings.static_root.is_dir() {
        issues.push(format!(
            "static_root {} is not a directory",
            settings.static_root.display()
        ));
    }
    issues
}

fn is_loopback(host: &str) -> bool {
    matches!(host, "localhost" | "127.0.0.1" | "[::1]" | ".localhost")
}

/// Print the check report. Returns the number of issues.
pub fn check(settings: &Settings) -> usize {
    println!(
        "Environment '{}', database {}",
        settings.server_name, settings.database.url
    );
    let issues = check_settings(settings);
    for issue in &issues {
        println!("  - {issue}");
    }
    match issues.len() {
        0 => println!("System check identified no issues."),
        1 => println!("System check identified 1 issue."),
        n => println!("System check identified {n} issues."),
    }
    issues.len()
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => {},
                    _ = sigint.recv() => {},
                }
            }
            _ => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
    tracing::info!("Shutdown requested");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use xaas_core::settings::TokenGrant;

    fn settings_in(dir: &tempfile::TempDir) -> Settings {
        Settings {
            static_root: dir.path().to_path_buf(),
            ..Settings::default()
        }
    }

    #[test]
    fn test_local_defaults_have_no_issues() {
        let dir = tempfile::tempdir().unwrap();
        assert!(check_settings(&settings_in(&dir)).is_empty());
    }

    #[test]
    fn test_production_like_issues() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = settings_in(&dir);
        settings.debug = false;
        settings.allowed_hosts = vec!["*".to_string()];
        settings.auth.enabled = true;

        let issues = check_settings(&settings);
        assert_eq!(issues.len(), 2, "{issues:?}");
        assert!(issues.iter().any(|i| i.contains("any host")));
        assert!(issues.iter().any(|i| i.contains("no token")));

        settings.allowed_hosts = vec!["xaas-admin-test.epfl.ch".to_string()];
        settings.auth.tokens = vec![TokenGrant {
            token: "t".to_string(),
            username: "alice".to_string(),
            groups: Vec::new(),
        }];
        assert!(check_settings(&settings).is_empty());
    }

    #[test]
    fn test_debug_on_public_host() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = settings_in(&dir);
        settings.allowed_hosts = vec!["xaas-admin.epfl.ch".to_string()];
        let issues = check_settings(&settings);
        assert_eq!(issues, vec!["debug is enabled while serving non-local hosts"]);
    }

    #[test]
    fn test_missing_static_root() {
        let settings = Settings {
            static_root: "/nonexistent/xaas-admin/static".into(),
            ..Settings::default()
        };
        assert_eq!(check(&settings), 1);
    }

    #[tokio::test]
    async fn test_migrate_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = settings_in(&dir);
        settings.database.url = format!(
            "sqlite://{}?mode=rwc",
            dir.path().join("db.sqlite").display()
        );
        migrate(&settings).await.unwrap();
        migrate(&settings).await.unwrap();
        assert!(dir.path().join("db.sqlite").exists());
    }
}
