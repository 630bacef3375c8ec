//! Drives the launcher against shell scripts standing in for uniclip.
#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use logiflow_clipboard::{ClipboardError, Uniclip};

fn fake_uniclip(name: &str, body: &str) -> PathBuf {
    let dir = Path::new(env!("CARGO_TARGET_TMPDIR")).join("fake-uniclip");
    std::fs::create_dir_all(&dir).unwrap();
    let script = dir.join(name);
    std::fs::write(&script, format!("#!/bin/sh\n{body}")).unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
    script
}

#[tokio::test]
async fn server_reports_listen_address() {
    let script = fake_uniclip(
        "server",
        "echo 'Starting a new clipboard'\n\
         echo 'Run `uniclip 10.1.2.3:41000` to join this clipboard'\n\
         sleep 30\n",
    );
    let mut uniclip = Uniclip::from_path(&script).unwrap();

    let address = uniclip.start_server().await.unwrap();

    assert_eq!(address.as_deref(), Some("10.1.2.3:41000"));
    assert!(uniclip.is_server_running());
    uniclip.stop_all().await;
    assert!(!uniclip.is_server_running());
}

#[tokio::test]
async fn server_without_banner_yields_none() {
    let script = fake_uniclip("quiet-server", "echo 'nothing useful'\n");
    let mut uniclip = Uniclip::from_path(&script).unwrap();

    assert_eq!(uniclip.start_server().await.unwrap(), None);
    uniclip.stop_server().await;
}

#[tokio::test]
async fn client_sends_password_after_prompt() {
    let out = Path::new(env!("CARGO_TARGET_TMPDIR")).join("fake-uniclip/received");
    let _ = std::fs::remove_file(&out);
    let script = fake_uniclip(
        "client",
        &format!(
            "echo 'Password:'\nread pw\necho \"$pw\" > {}\necho 'Connected'\nsleep 30\n",
            out.display()
        ),
    );
    let mut uniclip = Uniclip::from_path(&script).unwrap();

    uniclip.start_client("10.1.2.3:41000", "hunter2").await.unwrap();

    assert!(uniclip.is_client_running());
    assert_eq!(std::fs::read_to_string(&out).unwrap().trim(), "hunter2");
    uniclip.stop_client().await;
    assert!(!uniclip.is_client_running());
}

#[tokio::test]
async fn client_rejects_malformed_address() {
    let script = fake_uniclip("never-run", "exit 1\n");
    let mut uniclip = Uniclip::from_path(&script).unwrap();

    let err = uniclip.start_client("no-port-here", "pw").await.unwrap_err();

    assert!(matches!(err, ClipboardError::InvalidAddress(_)));
    assert!(!uniclip.is_client_running());
}
