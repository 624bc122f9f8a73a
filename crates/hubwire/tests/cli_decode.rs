#![cfg(feature = "cli")]

use std::process::{Command, Output};

fn hubwire(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_hubwire"))
        .arg("--log-level")
        .arg("error")
        .args(args)
        .output()
        .expect("hubwire should run")
}

#[test]
fn decode_mesh_id_as_json() {
    let out = hubwire(&["--format", "json", "decode", "0xA0000001"]);
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

    let report: serde_json::Value =
        serde_json::from_slice(&out.stdout).expect("decode output should be JSON");
    assert_eq!(report["family"], "mesh");
    assert_eq!(report["mesh_variant"], "A");
    assert_eq!(report["valve_count"], 1);
}

#[test]
fn decode_long_range_pretty() {
    let out = hubwire(&["--format", "pretty", "decode", "2000015"]);
    assert!(out.status.success());

    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("family: long_range"));
    assert!(stdout.contains("long_range_type: 2"));
}

#[test]
fn decode_rejects_bad_id_with_usage_code() {
    let out = hubwire(&["decode", "0xnothex"]);
    assert_eq!(out.status.code(), Some(64));
    assert!(String::from_utf8_lossy(&out.stderr).contains("invalid device id"));
}

#[test]
fn send_to_missing_port_is_transport_error() {
    let out = hubwire(&["send", "/dev/hubwire-does-not-exist", "--hex", "03"]);
    assert_eq!(out.status.code(), Some(3));
    assert!(String::from_utf8_lossy(&out.stderr).contains("open failed"));
}

#[test]
fn version_prints_package_version() {
    let out = hubwire(&["version"]);
    assert!(out.status.success());
    assert_eq!(
        String::from_utf8_lossy(&out.stdout).trim(),
        format!("hubwire {}", env!("CARGO_PKG_VERSION"))
    );
}
