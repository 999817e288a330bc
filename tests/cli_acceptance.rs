/// Acceptance tests for the mountkeeper command line
///
/// Each test runs the real binary against its own data directory and then,
/// where useful, reopens that directory through the library to check state.
mod common;

use predicates::prelude::*;
use std::fs;

use common::TestWorkspace;
use mountkeeper::{Admin, ProcessFlags, Services};

fn reopen(workspace: &TestWorkspace) -> (Services, Admin) {
    let flags = ProcessFlags::default().with_data_dir(workspace.data_dir());
    let services = Services::open(&flags).unwrap();
    let admin = Admin::from_services(flags, &services);
    (services, admin)
}

#[test]
fn test_storage_add_then_count() {
    let workspace = TestWorkspace::new();
    let root = workspace.create_dir("srv-data");

    workspace
        .mountkeeper()
        .args(["storage", "count"])
        .assert()
        .success()
        .stdout("0\n");

    workspace
        .mountkeeper()
        .args(["storage", "add"])
        .arg(&root)
        .arg("/local")
        .assert()
        .success()
        .stdout(predicate::str::contains("Mounted"))
        .stdout(predicate::str::contains("/local"));

    workspace
        .mountkeeper()
        .args(["storage", "count", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"count\":1"));
}

#[test]
fn test_duplicate_mount_fails() {
    let workspace = TestWorkspace::new();
    let root = workspace.create_dir("srv-data");

    workspace
        .mountkeeper()
        .args(["storage", "add"])
        .arg(&root)
        .arg("/local")
        .assert()
        .success();

    workspace
        .mountkeeper()
        .args(["storage", "add"])
        .arg(&root)
        .arg("/local")
        .assert()
        .failure()
        .stderr(predicate::str::contains("mount path already exists"));

    workspace
        .mountkeeper()
        .args(["storage", "count"])
        .assert()
        .success()
        .stdout("1\n");
}

#[test]
fn test_storage_list_json() {
    let workspace = TestWorkspace::new();
    let root = workspace.create_dir("srv-data");

    workspace
        .mountkeeper()
        .args(["storage", "add"])
        .arg(&root)
        .arg("/local")
        .assert()
        .success();

    let output = workspace
        .mountkeeper()
        .args(["storage", "list", "--json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(rows[0]["mount_path"], "/local");
    assert_eq!(rows[0]["driver"], "Local");
    assert_eq!(rows[0]["status"], "work");
    assert_eq!(rows[0]["root"], root.to_str().unwrap());
}

#[test]
fn test_admin_show_and_set() {
    let workspace = TestWorkspace::new();

    workspace
        .mountkeeper()
        .args(["admin", "show"])
        .assert()
        .success()
        .stdout("admin\n");

    workspace
        .mountkeeper()
        .args(["admin", "set", "hunter22"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Password updated for admin"));

    let (services, _admin) = reopen(&workspace);
    assert!(services.sessions.authenticate("admin", "hunter22").is_ok());
}

#[test]
fn test_admin_random_prints_working_password() {
    let workspace = TestWorkspace::new();

    let output = workspace
        .mountkeeper()
        .args(["admin", "random"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let password = stdout
        .lines()
        .find_map(|line| line.strip_prefix("password: "))
        .unwrap()
        .to_string();
    assert_eq!(password.len(), 8);

    let (services, _admin) = reopen(&workspace);
    assert!(services.sessions.authenticate("admin", &password).is_ok());
}

#[test]
fn test_init_runs_once() {
    let workspace = TestWorkspace::new();
    let internal = workspace.create_dir("internal");
    let usb = workspace.create_dir("usb");

    workspace
        .mountkeeper()
        .arg("init")
        .arg("--device")
        .arg(&internal)
        .arg("--device")
        .arg(&usb)
        .args(["--password", "first-boot"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 mounted"))
        .stdout(predicate::str::contains("password: first-boot"));

    assert!(workspace.data_dir().join(".initialized").exists());

    workspace
        .mountkeeper()
        .arg("init")
        .arg("--device")
        .arg(&internal)
        .assert()
        .success()
        .stdout(predicate::str::contains("Already initialized"));

    let (services, admin) = reopen(&workspace);
    assert_eq!(admin.storage_count().unwrap(), 2);
    assert!(services.sessions.authenticate("admin", "first-boot").is_ok());
}

#[test]
fn test_init_uses_configured_fallback() {
    let workspace = TestWorkspace::new();
    let fallback = workspace.create_dir("fallback");
    workspace.write_config(&format!(
        "[bootstrap]\nprimary_mount_path = \"/local\"\ndefault_password = \"from-config\"\nfallback_root = \"{}\"\n",
        fallback.display()
    ));

    workspace
        .mountkeeper()
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 mounted"))
        .stdout(predicate::str::contains("password: from-config"));

    let (_services, admin) = reopen(&workspace);
    let storages = admin.storages().unwrap();
    assert_eq!(storages.len(), 1);
    assert_eq!(storages[0].mount_path, "/local");
}

#[test]
fn test_address_from_config() {
    let workspace = TestWorkspace::new();

    workspace
        .mountkeeper()
        .arg("address")
        .assert()
        .success()
        .stdout("http://0.0.0.0:5244\n");

    workspace.write_config(
        "[scheme]\naddress = \"127.0.0.1\"\nhttp_port = 8080\nhttps_port = 8443\nforce_https = true\n",
    );

    workspace
        .mountkeeper()
        .arg("address")
        .assert()
        .success()
        .stdout("https://127.0.0.1:8443\n");
}

#[test]
fn test_config_generate_validates() {
    let workspace = TestWorkspace::new();

    let output = workspace
        .mountkeeper()
        .args(["config", "generate"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let path = workspace.path().join("generated.toml");
    fs::write(&path, &output.stdout).unwrap();

    workspace
        .mountkeeper()
        .args(["config", "validate"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration file is valid"));
}

#[test]
fn test_logs_go_to_data_dir_by_default() {
    let workspace = TestWorkspace::new();
    let root = workspace.create_dir("srv-data");

    workspace
        .mountkeeper()
        .args(["storage", "add"])
        .arg(&root)
        .arg("/local")
        .assert()
        .success();

    let log = fs::read_to_string(workspace.data_dir().join("log/mountkeeper.log")).unwrap();
    assert!(log.contains("success: mount local storage [/local]"));
}

#[test]
fn test_log_reports_cleaned_mount_path() {
    let workspace = TestWorkspace::new();
    let root = workspace.create_dir("srv-data");

    workspace
        .mountkeeper()
        .args(["storage", "add"])
        .arg(&root)
        .arg("/local/")
        .assert()
        .success();

    let log = fs::read_to_string(workspace.data_dir().join("log/mountkeeper.log")).unwrap();
    assert!(log.contains("success: mount local storage [/local] with id:1"));
    assert!(!log.contains("[/local/]"));
}
