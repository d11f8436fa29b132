//! End-to-end tests for both roles over real loopback sockets.
//!
//! Interpreters are small `/bin/sh` scripts so each test controls exactly what
//! the remote side prints and reads.

#![cfg(unix)]

mod common;

use std::os::unix::fs::PermissionsExt;

use common::{connect_any, read_to_close, read_until, stub_shell, RunningResponder, WAIT};
use pinshell::{run, Config, ExitKind, Initiator, Outcome, ShellError, ShellSpec};
use pinshell_auth::{check_key_pin, Fingerprint};
use tokio::io::AsyncWriteExt;

const ECHO_ONCE: &str = r#"echo ready; read line; echo "got:$line""#;

// ============================================================================
// Bind role
// ============================================================================

#[tokio::test]
async fn test_bind_bridges_input_and_output() {
    let responder = RunningResponder::start(stub_shell(ECHO_ONCE)).await;
    let mut client = connect_any(responder.addr).await;

    read_until(&mut client, "ready").await;
    client.write_all(b"hello\n").await.unwrap();

    let output = read_until(&mut client, "got:hello").await;
    assert!(output.contains("got:hello"));
}

#[tokio::test]
async fn test_bind_presents_advertised_fingerprint() {
    let responder = RunningResponder::start(stub_shell("true")).await;
    let client = connect_any(responder.addr).await;

    let (_, connection) = client.get_ref();
    let chain = connection.peer_certificates().expect("No server certificate");
    assert_eq!(chain.len(), 1);
    assert_eq!(Fingerprint::of_certificate(&chain[0]), responder.fingerprint);
    assert!(check_key_pin(chain, &responder.fingerprint));
}

#[tokio::test]
async fn test_bind_forwards_stderr() {
    let responder = RunningResponder::start(stub_shell("echo oops >&2")).await;
    let mut client = connect_any(responder.addr).await;

    let output = read_until(&mut client, "oops").await;
    assert!(output.contains("oops"));
}

#[tokio::test]
async fn test_bind_delivers_output_while_client_keeps_sending() {
    let responder = RunningResponder::start(stub_shell("sleep 0.1; echo bye")).await;
    let client = connect_any(responder.addr).await;
    let (mut client_read, mut client_write) = tokio::io::split(client);

    let flood = tokio::spawn(async move {
        let chunk = vec![b'x'; 4096];
        while client_write.write_all(&chunk).await.is_ok() {}
    });

    let output = read_until(&mut client_read, "bye").await;
    flood.abort();
    assert!(output.starts_with("bye"), "output was {output:?}");
}

#[tokio::test]
async fn test_bind_serves_sessions_concurrently() {
    let responder = RunningResponder::start(stub_shell(ECHO_ONCE)).await;

    let mut first = connect_any(responder.addr).await;
    let mut second = connect_any(responder.addr).await;

    // Both interpreters are live before either gets input.
    read_until(&mut first, "ready").await;
    read_until(&mut second, "ready").await;
    assert_eq!(responder.stats.accepted(), 2);
    assert_eq!(responder.stats.active(), 2);

    second.write_all(b"two\n").await.unwrap();
    first.write_all(b"one\n").await.unwrap();
    read_until(&mut second, "got:two").await;
    read_until(&mut first, "got:one").await;
}

#[tokio::test]
async fn test_interpreter_failure_does_not_stop_listener() {
    let dir = tempfile::tempdir().unwrap();
    let script = dir.path().join("shell.sh");
    let responder = RunningResponder::start(ShellSpec::new(&script)).await;

    // Interpreter missing: only this session ends.
    let mut doomed = connect_any(responder.addr).await;
    let received = read_to_close(&mut doomed).await;
    assert!(received.is_empty());

    std::fs::write(&script, "#!/bin/sh\necho alive\n").unwrap();
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

    let mut healthy = connect_any(responder.addr).await;
    read_until(&mut healthy, "alive").await;
    assert_eq!(responder.stats.accepted(), 2);
}

#[tokio::test]
async fn test_failed_handshake_does_not_stop_listener() {
    let responder = RunningResponder::start(stub_shell("echo alive")).await;

    let mut garbage = tokio::net::TcpStream::connect(responder.addr).await.unwrap();
    garbage.write_all(b"GET / HTTP/1.1\r\n\r\n").await.unwrap();
    read_to_close(&mut garbage).await;

    let mut client = connect_any(responder.addr).await;
    read_until(&mut client, "alive").await;
}

// ============================================================================
// Reverse role
// ============================================================================

#[tokio::test]
async fn test_dial_with_matching_pin() {
    let responder = RunningResponder::start(stub_shell("echo greeting")).await;

    let initiator = Initiator::new().unwrap();
    let mut session = tokio::time::timeout(
        WAIT,
        initiator.dial(&responder.addr.to_string(), &responder.fingerprint),
    )
    .await
    .expect("Dial timed out")
    .expect("Dial failed");

    assert_eq!(session.peer_addr(), Some(responder.addr));
    assert_eq!(session.peer_chain().len(), 1);
    read_until(&mut session, "greeting").await;
}

#[tokio::test]
async fn test_dial_accepts_colon_separated_pin() {
    let responder = RunningResponder::start(stub_shell("true")).await;
    let pinned = Fingerprint::parse_hex(&responder.fingerprint.to_string()).unwrap();

    let session = Initiator::new()
        .unwrap()
        .dial(&responder.addr.to_string(), &pinned)
        .await;
    assert!(session.is_ok());
}

#[tokio::test]
async fn test_dial_with_wrong_pin_runs_no_interpreter() {
    let responder = RunningResponder::start(ShellSpec::new("/bin/cat")).await;
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("ran");

    let local_shell = stub_shell(&format!("touch '{}'", marker.display()));
    let config = Config::new(responder.addr.to_string(), "00".repeat(32), "reverse");

    let err = tokio::time::timeout(WAIT, run(&config, &local_shell))
        .await
        .expect("Run timed out")
        .unwrap_err();

    assert_eq!(err.kind(), ExitKind::FingerprintMismatch);
    match err {
        ShellError::FingerprintMismatch { presented, .. } => {
            assert_eq!(presented, responder.fingerprint.to_string());
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!marker.exists());
}

#[tokio::test]
async fn test_dial_unreachable() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);

    let pinned = Fingerprint::parse_hex(&"AB".repeat(32)).unwrap();
    let err = tokio::time::timeout(WAIT, Initiator::new().unwrap().dial(&addr, &pinned))
        .await
        .expect("Dial did not fail in time")
        .unwrap_err();

    assert_eq!(err.kind(), ExitKind::HostUnreachable);
}

#[tokio::test]
async fn test_reverse_run_bridges_local_interpreter() {
    // The remote side here plays operator: it sends a command and reads back.
    let responder = RunningResponder::start(stub_shell(
        r#"echo 'echo from-initiator'; read line; test "$line" = from-initiator"#,
    ))
    .await;

    let config = Config::new(
        responder.addr.to_string(),
        responder.fingerprint.to_string(),
        "reverse",
    );

    let outcome = tokio::time::timeout(WAIT, run(&config, &ShellSpec::new("/bin/sh")))
        .await
        .expect("Run timed out")
        .unwrap();
    assert_eq!(outcome, Outcome::Completed);
}

#[tokio::test]
async fn test_run_unconfigured_is_idle() {
    let outcome = run(&Config::default(), &ShellSpec::default()).await.unwrap();
    assert_eq!(outcome, Outcome::Idle);
}
