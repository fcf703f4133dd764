//! End-to-end provisioning tests.
//!
//! Each test provisions real workspaces under a temporary base directory,
//! inspects the written documents, and drives the shutdown coordinator to
//! verify cleanup.

use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE;

use hacfg_core::params::{GLOBAL, available_threads};
use hacfg_core::{DrainResult, ParameterSet, ProvisionError, ShutdownCoordinator, provision_config};

fn read(path: &std::path::Path) -> String {
    std::fs::read_to_string(path).unwrap()
}

// ─────────────────────────────────────────────────────────────────────────────
// Rendered content
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_empty_overrides_use_processor_count_for_nbthread() {
    let tmp = tempfile::tempdir().unwrap();
    let sd = ShutdownCoordinator::new();

    let rendered = provision_config(tmp.path(), &ParameterSet::new(), &sd).unwrap();
    let main = read(rendered.workspace().haproxy_conf());

    assert!(main.contains(&format!("\n\tnbthread {}\n", available_threads())));
    assert!(main.contains("\n\tmaxconn 32000\n"));
    assert!(main.contains("\n\tstats timeout 2m\n"));
    assert!(main.contains("\n\ttune.ssl.default-dh-param 1024\n"));
    assert!(main.contains("\n\tulimit-n 65536\n"));
    assert!(main.contains("\n\thttp-reuse always\n"));
}

#[tokio::test]
async fn test_maxconn_override_replaces_default() {
    let tmp = tempfile::tempdir().unwrap();
    let sd = ShutdownCoordinator::new();
    let mut overrides = ParameterSet::new();
    overrides.insert(GLOBAL, "maxconn", ["5000"]);

    let rendered = provision_config(tmp.path(), &overrides, &sd).unwrap();
    let main = read(rendered.workspace().haproxy_conf());

    let maxconn: Vec<&str> = main
        .lines()
        .map(str::trim)
        .filter(|l| l.starts_with("maxconn"))
        .collect();
    assert_eq!(maxconn, vec!["maxconn 5000"]);
    assert!(!main.contains("32000"));
}

#[tokio::test]
async fn test_agent_config_is_parameter_independent() {
    let tmp = tempfile::tempdir().unwrap();
    let sd = ShutdownCoordinator::new();

    let a = provision_config(tmp.path(), &ParameterSet::new(), &sd).unwrap();
    let overrides = ParameterSet::from_flags([
        "global.maxconn=10",
        "defaults.timeout=connect 5s",
        "defaults.mode=http",
    ])
    .unwrap();
    let b = provision_config(tmp.path(), &overrides, &sd).unwrap();

    let spoe_a = std::fs::read(a.workspace().spoe_conf()).unwrap();
    let spoe_b = std::fs::read(b.workspace().spoe_conf()).unwrap();
    assert_eq!(spoe_a, spoe_b);
    assert_eq!(spoe_a, hacfg_core::render::SPOE_CONF.as_bytes());
}

#[tokio::test]
async fn test_userlist_matches_returned_credentials() {
    let tmp = tempfile::tempdir().unwrap();
    let sd = ShutdownCoordinator::new();

    let rendered = provision_config(tmp.path(), &ParameterSet::new(), &sd).unwrap();
    let main = read(rendered.workspace().haproxy_conf());

    let userlist = main
        .split("userlist controller\n")
        .nth(1)
        .expect("userlist section present");
    let user_line = userlist.lines().next().unwrap().trim();
    let fields: Vec<&str> = user_line.split(' ').collect();
    assert_eq!(fields.len(), 4);
    assert_eq!(fields[0], "user");
    assert_eq!(fields[1], rendered.credentials().username());
    assert_eq!(fields[2], "insecure-password");
    assert_eq!(fields[3], rendered.credentials().password());
}

#[tokio::test]
async fn test_credentials_are_fresh_per_workspace() {
    let tmp = tempfile::tempdir().unwrap();
    let sd = ShutdownCoordinator::new();

    let a = provision_config(tmp.path(), &ParameterSet::new(), &sd).unwrap();
    let b = provision_config(tmp.path(), &ParameterSet::new(), &sd).unwrap();

    assert_ne!(a.workspace().base(), b.workspace().base());
    assert_ne!(a.credentials().password(), b.credentials().password());
    for creds in [a.credentials(), b.credentials()] {
        assert_eq!(URL_SAFE.decode(creds.password()).unwrap().len(), 32);
    }
}

#[tokio::test]
async fn test_haproxy_args_point_at_main_document() {
    let tmp = tempfile::tempdir().unwrap();
    let sd = ShutdownCoordinator::new();

    let rendered = provision_config(tmp.path(), &ParameterSet::new(), &sd).unwrap();
    assert_eq!(
        rendered.haproxy_args(),
        vec![
            "-f".to_string(),
            rendered.workspace().haproxy_conf().display().to_string()
        ]
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Cleanup
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_shutdown_removes_every_workspace() {
    let tmp = tempfile::tempdir().unwrap();
    let sd = ShutdownCoordinator::new();

    let a = provision_config(tmp.path(), &ParameterSet::new(), &sd).unwrap();
    let b = provision_config(tmp.path(), &ParameterSet::new(), &sd).unwrap();
    assert!(a.workspace().haproxy_conf().exists());
    assert!(b.workspace().spoe_conf().exists());
    assert_eq!(sd.outstanding(), 2);

    sd.begin_shutdown();
    assert_eq!(
        sd.wait_timeout(Duration::from_secs(5)).await,
        DrainResult::Complete
    );

    assert!(!a.workspace().base().exists());
    assert!(!b.workspace().base().exists());
    assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_failed_materialization_is_still_cleaned() {
    let tmp = tempfile::tempdir().unwrap();
    let sd = ShutdownCoordinator::new();

    let mut overrides = ParameterSet::new();
    overrides.insert(GLOBAL, "maxconn", ["5000\ninjected"]);
    let err = provision_config(tmp.path(), &overrides, &sd).unwrap_err();
    assert!(matches!(err, ProvisionError::Template(_)));

    // the directory exists and is owed a cleanup
    assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 1);
    assert_eq!(sd.outstanding(), 1);

    sd.begin_shutdown();
    assert_eq!(
        sd.wait_timeout(Duration::from_secs(5)).await,
        DrainResult::Complete
    );
    assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_unwritable_base_dir_fails_without_obligation() {
    let tmp = tempfile::tempdir().unwrap();
    let not_a_dir = tmp.path().join("file");
    std::fs::write(&not_a_dir, "").unwrap();
    let sd = ShutdownCoordinator::new();

    let err = provision_config(&not_a_dir, &ParameterSet::new(), &sd).unwrap_err();
    assert!(matches!(err, ProvisionError::Provisioning { .. }));
    assert_eq!(sd.outstanding(), 0);

    sd.begin_shutdown();
    assert_eq!(
        sd.wait_timeout(Duration::from_secs(1)).await,
        DrainResult::Complete
    );
}
