mod common;

use std::fs;

use clap::Parser;
use common::{cluster, etcd_calls, tls_files};
use eis_etcd_tools::{execute, run_admin, AdminArgs, AdminCommand};
use eis_integ::runner::mock::FakeCluster;
use eis_integ::{EtcdConfig, Etcdctl, ErrorCode};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn parse(argv: &[&str]) -> AdminArgs {
    AdminArgs::try_parse_from(argv).unwrap()
}

fn client(cluster: &FakeCluster) -> Etcdctl<FakeCluster> {
    Etcdctl::with_runner(cluster.clone(), EtcdConfig::default())
}

// ── Argument parsing ────────────────────────────────────────────

#[test]
fn parses_remove_app_with_delete_keys() {
    let args = parse(&["eis-etcd", "remove-app", "Camera", "--delete-keys"]);
    assert_eq!(
        args.command,
        AdminCommand::RemoveApp {
            app: "Camera".into(),
            delete_keys: true
        }
    );
    assert_eq!(args.command.name(), "remove-app");
}

#[test]
fn remove_app_keeps_keys_by_default() {
    let args = parse(&["eis-etcd", "remove-app", "Camera"]);
    assert_eq!(
        args.command,
        AdminCommand::RemoveApp {
            app: "Camera".into(),
            delete_keys: false
        }
    );
}

#[test]
fn create_user_requires_an_app() {
    assert!(AdminArgs::try_parse_from(["eis-etcd", "create-user"]).is_err());
    let args = parse(&["eis-etcd", "create-user", "A", "B"]);
    assert_eq!(
        args.command,
        AdminCommand::CreateUser {
            apps: vec!["A".into(), "B".into()]
        }
    );
}

#[test]
fn global_options_follow_subcommand() {
    let args = parse(&["eis-etcd", "read", "/Camera/", "--log-file", "/tmp/eis.log"]);
    assert_eq!(args.connection.log_file, std::path::PathBuf::from("/tmp/eis.log"));
}

#[test]
fn enable_auth_takes_password_flag() {
    let args = parse(&["eis-etcd", "enable-auth", "--password", "pw"]);
    assert_eq!(
        args.command,
        AdminCommand::EnableAuth {
            password: "pw".into()
        }
    );
}

// ── Commands ────────────────────────────────────────────────────

#[test]
fn put_json_pushes_file_fields() {
    let cluster = cluster();
    let (_certs, tls) = tls_files();
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("eis_config.json");
    fs::write(&file, r#"{"/GlobalEnv/": {"PY_LOG_LEVEL": "DEBUG"}, "/Camera/config": {"fps": 30}}"#)
        .unwrap();

    let args = parse(&["eis-etcd", "put-json", file.to_str().unwrap()]);
    run_admin(&args, cluster.clone(), &tls).unwrap();

    assert_eq!(
        cluster.get("/GlobalEnv/").as_deref(),
        Some("{\n    \"PY_LOG_LEVEL\": \"DEBUG\"\n}")
    );
    assert_eq!(
        cluster.get("/Camera/config").as_deref(),
        Some("{\n    \"fps\": 30\n}")
    );
}

#[test]
fn put_json_missing_file_is_filesystem_error() {
    let cluster = cluster();
    let (certs, tls) = tls_files();
    let missing = certs.path().join("absent.json");
    let args = parse(&["eis-etcd", "put-json", missing.to_str().unwrap()]);
    let err = run_admin(&args, cluster.clone(), &tls).unwrap_err();
    assert_eq!(err.code(), ErrorCode::FileSystemError);
    assert_eq!(err.code().value(), 3);
    assert_eq!(etcd_calls(&cluster), 0);
}

#[test]
fn create_user_provisions_each_app() {
    let cluster = cluster();
    execute(
        &client(&cluster),
        &AdminCommand::CreateUser {
            apps: vec!["A".into(), "B".into()],
        },
    )
    .unwrap();
    assert!(cluster.user_exists("A"));
    assert!(cluster.user_exists("B"));
}

#[test]
fn create_user_stops_at_first_failing_app() {
    let cluster = cluster();
    cluster.fail_when("user add A");
    let err = execute(
        &client(&cluster),
        &AdminCommand::CreateUser {
            apps: vec!["A".into(), "B".into()],
        },
    )
    .unwrap_err();
    assert_eq!(err.code(), ErrorCode::ExtCmdError);
    assert!(!cluster.user_exists("B"));
}

#[test]
fn put_and_remove_key() {
    let cluster = cluster();
    let etcd = client(&cluster);
    execute(
        &etcd,
        &AdminCommand::Put {
            key: "/GlobalEnv/".into(),
            value: "{}".into(),
        },
    )
    .unwrap();
    assert_eq!(cluster.get("/GlobalEnv/").as_deref(), Some("{}"));
    execute(
        &etcd,
        &AdminCommand::RemoveKey {
            key: "/GlobalEnv/".into(),
        },
    )
    .unwrap();
    assert_eq!(cluster.get("/GlobalEnv/"), None);
}

#[test]
fn remove_prefix_clears_subtree() {
    let cluster = cluster();
    cluster.seed("/Camera/config", "{}");
    cluster.seed("/Camera/datastore/a", "1");
    execute(
        &client(&cluster),
        &AdminCommand::RemovePrefix {
            key: "/Camera/".into(),
        },
    )
    .unwrap();
    assert!(cluster.keys().is_empty());
}

#[test]
fn read_prints_configuration() {
    let cluster = cluster();
    cluster.seed("/Camera/config", "{\"fps\": 30}");
    execute(
        &client(&cluster),
        &AdminCommand::Read {
            client: "/Camera/".into(),
        },
    )
    .unwrap();
    assert!(cluster.printed().contains("\"fps\": 30"));
}

#[test]
fn enable_auth_through_admin() {
    let cluster = cluster();
    execute(
        &client(&cluster),
        &AdminCommand::EnableAuth {
            password: "pw".into(),
        },
    )
    .unwrap();
    assert!(cluster.auth_enabled());
}

#[test]
fn remove_app_end_to_end() {
    let cluster = cluster();
    let (_certs, tls) = tls_files();
    let etcd = client(&cluster);
    execute(
        &etcd,
        &AdminCommand::CreateUser {
            apps: vec!["Camera".into()],
        },
    )
    .unwrap();
    let _ = eis_integ::provision::put_zmq_keys(&etcd, "Camera");
    cluster.seed("/Camera/config", "{}");

    let args = parse(&["eis-etcd", "remove-app", "Camera", "--delete-keys"]);
    run_admin(&args, cluster.clone(), &tls).unwrap();

    assert!(cluster.keys().is_empty());
    assert!(!cluster.user_exists("Camera"));
    assert!(cluster.role_permissions("Camera").is_none());
}

#[test]
fn check_keys_reports_without_error() {
    let cluster = cluster();
    execute(
        &client(&cluster),
        &AdminCommand::CheckKeys {
            app: "Camera".into(),
        },
    )
    .unwrap();
    assert_eq!(cluster.count_calls("etcdctl", &["get"]), 2);
}
