//! Task scenarios run against a recording shell.

#![allow(clippy::unwrap_used)]

use std::path::PathBuf;

use xaas_deploy::{Call, DeployConfig, DeployError, Deployer, RecordingShell, Task};

const BRANCH: &str = "git rev-parse --abbrev-ref HEAD";

fn config_with_test_host() -> DeployConfig {
    DeployConfig {
        test_host: Some("kis@exopgesrv55.epfl.ch".to_string()),
        ..DeployConfig::default()
    }
}

fn run(
    config: DeployConfig,
    shell: RecordingShell,
    tasks: &[Task],
) -> (Result<(), DeployError>, Vec<Call>) {
    let mut deployer = Deployer::new(config, shell);
    let result = deployer.run_tasks(tasks);
    (result, deployer.shell().calls().to_vec())
}

fn commands(calls: &[Call]) -> Vec<&str> {
    calls.iter().filter_map(Call::command).collect()
}

#[test]
fn test_prod_deploy_from_feature_branch_aborts() {
    let shell = RecordingShell::new().with_capture("feature/quotas");
    let (result, calls) = run(DeployConfig::default(), shell, &[Task::Prod, Task::Deploy]);

    let err = result.unwrap_err();
    assert!(err.is_abort());
    assert_eq!(
        err.to_string(),
        "Only the 'master' branch is allowed. You are on the 'feature/quotas' branch."
    );
    assert_eq!(calls, vec![Call::Capture(BRANCH.to_string())]);
}

#[test]
fn test_declined_confirmation_aborts() {
    let shell = RecordingShell::new().with_capture("master").answering("no");
    let (result, calls) = run(DeployConfig::default(), shell, &[Task::Prod, Task::Deploy]);

    assert_eq!(result.unwrap_err().to_string(), "bye bye");
    assert_eq!(
        calls,
        vec![
            Call::Capture(BRANCH.to_string()),
            Call::Prompt(
                "Deploy on the 'production' server kis@exopgesrv34.epfl.ch ? [type 'yes' to confirm]"
                    .to_string()
            ),
        ]
    );
}

#[test]
fn test_confirmed_prod_deploy_runs_from_origin() {
    let shell = RecordingShell::new().with_capture("master").answering("yes");
    let (result, calls) = run(DeployConfig::default(), shell, &[Task::Prod, Task::Deploy]);
    result.unwrap();

    let vhost = "/var/www/vhosts/xaas-admin.epfl.ch";
    assert_eq!(calls[2], Call::Local("git push".to_string()));
    assert_eq!(
        calls[3],
        Call::Run {
            host: "kis@exopgesrv34.epfl.ch".to_string(),
            command: "cd /home/kis/xaas-admin && git pull".to_string(),
        }
    );
    assert!(calls[..3].iter().all(|c| !c.is_remote()));

    let cmds = commands(&calls);
    assert!(cmds.contains(
        &format!(
            "rsync -r -l -z -t --delete --delete-excluded --filter=\"- target/\" --filter=\"+ */\" \
             /home/kis/xaas-admin/crates/ {vhost}/private/src/crates/"
        )
        .as_str()
    ));
    assert!(cmds.contains(
        &format!(
            "ln -sf {vhost}/private/src/config/settings/prod.toml \
             {vhost}/private/src/config/settings/config.toml"
        )
        .as_str()
    ));
    assert!(cmds.contains(
        &format!("cd /home/kis/xaas-admin && cp \"xaas-admin.conf\" \"{vhost}/conf\"").as_str()
    ));
    assert!(cmds.contains(
        &format!("cd {vhost}/private/src && cargo build --release --locked").as_str()
    ));
    assert!(!calls.iter().any(|c| matches!(c, Call::Put { .. })));
    assert_eq!(
        calls.last().unwrap(),
        &Call::Sudo {
            host: "kis@exopgesrv34.epfl.ch".to_string(),
            command: "systemctl restart xaas-admin".to_string(),
        }
    );
}

#[test]
fn test_test_deploy_without_host_fails_before_any_command() {
    let (result, calls) = run(
        DeployConfig::default(),
        RecordingShell::new(),
        &[Task::Test, Task::Deploy],
    );
    assert!(matches!(result.unwrap_err(), DeployError::Config(_)));
    assert!(calls.is_empty());
}

#[test]
fn test_test_deploy_ships_local_checkout() {
    let shell = RecordingShell::new().with_capture("feature/quotas");
    let (result, calls) = run(config_with_test_host(), shell, &[Task::Test, Task::Deploy]);
    result.unwrap();

    let host = "kis@exopgesrv55.epfl.ch";
    assert!(!calls.iter().any(|c| matches!(c, Call::Prompt(_))));
    assert!(!commands(&calls).contains(&"git push"));

    let clone = commands(&calls)
        .into_iter()
        .find(|c| c.starts_with("git clone . "))
        .unwrap()
        .to_string();
    let checkout = clone
        .trim_start_matches("git clone . ")
        .trim_matches('"')
        .to_string();
    assert!(commands(&calls).contains(
        &format!(
            "rsync -r -l -z -t --delete --delete-excluded --filter=\"- target/\" --filter=\"+ */\" \
             {checkout}/Cargo.toml {host}:/var/www/vhosts/xaas-admin.epfl.ch/private/src/Cargo.toml"
        )
        .as_str()
    ));
    assert!(calls.contains(&Call::Put {
        host: host.to_string(),
        source: PathBuf::from("xaas-admin.conf"),
        destination: "/var/www/vhosts/xaas-admin.epfl.ch/conf".to_string(),
    }));
    let shipped_settings =
        "settings/test.toml /var/www/vhosts/xaas-admin.epfl.ch/private/src/config/settings/config.toml";
    assert!(commands(&calls).iter().any(|c| c.ends_with(shipped_settings)));
    assert!(matches!(calls.last().unwrap(), Call::Sudo { .. }));
}

#[test]
fn test_clone_on_production_aborts_before_dump() {
    let (result, calls) = run(
        DeployConfig::default(),
        RecordingShell::new(),
        &[Task::Prod, Task::Clone],
    );
    assert_eq!(
        result.unwrap_err().to_string(),
        "Cannot clone the database on the production server !"
    );
    assert!(calls.is_empty());
}

#[test]
fn test_local_clone_survives_failed_upload_copy() {
    let shell = RecordingShell::new().failing("rsync");
    let (result, calls) = run(DeployConfig::default(), shell, &[Task::Clone]);
    result.unwrap();

    assert_eq!(
        calls,
        vec![
            Call::Local(
                "ssh kis@exopgesrv34.epfl.ch \"sqlite3 /var/www/vhosts/xaas-admin.epfl.ch/private/xaas-admin.sqlite .dump\" \
                 | sh -c 'rm -f xaas-admin.sqlite && sqlite3 xaas-admin.sqlite'"
                    .to_string()
            ),
            Call::LocalUnchecked(
                "rsync -r -l -t -p -o -g --numeric-ids -v \
                 kis@exopgesrv34.epfl.ch:/var/www/vhosts/xaas-admin.epfl.ch/htdocs/upload/* public/upload"
                    .to_string()
            ),
        ]
    );
}

#[test]
fn test_clone_to_test_server() {
    let (result, calls) = run(
        config_with_test_host(),
        RecordingShell::new(),
        &[Task::Test, Task::Clone],
    );
    result.unwrap();

    let db = "/var/www/vhosts/xaas-admin.epfl.ch/private/xaas-admin.sqlite";
    assert_eq!(calls.len(), 3);
    assert_eq!(
        calls[0],
        Call::Local(format!(
            "ssh kis@exopgesrv34.epfl.ch \"sqlite3 {db} .dump\" \
             | ssh kis@exopgesrv55.epfl.ch \"rm -f {db} && sqlite3 {db}\""
        ))
    );
    assert!(matches!(calls[1], Call::LocalUnchecked(_)));
    assert_eq!(
        calls[2],
        Call::Local(
            "rsync -r -l -t -p -o -g --numeric-ids -v --chmod=ug+rw public/upload/* \
             kis@exopgesrv55.epfl.ch:/var/www/vhosts/xaas-admin.epfl.ch/htdocs/upload"
                .to_string()
        )
    );
}
