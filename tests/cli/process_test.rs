//! Tests for codex process spawning and control.

use std::collections::HashMap;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;

use codex_sdk::cli::{CodexExec, ExecArgs, ORIGINATOR_ENV, SDK_ORIGINATOR};
use codex_sdk::Error;

use crate::support::{emit, FakeCodex};

async fn read_lines(stdout: tokio::process::ChildStdout) -> Vec<String> {
    let mut lines = BufReader::new(stdout).lines();
    let mut out = Vec::new();
    while let Some(line) = lines.next_line().await.unwrap() {
        out.push(line);
    }
    out
}

#[tokio::test]
async fn clean_exit_yields_output_and_ok() {
    let fake = FakeCodex::new(&format!(
        "cat >/dev/null\n{}",
        emit(&[r#"{"type":"line1"}"#, r#"{"type":"line2"}"#])
    ));
    let exec = CodexExec::new(fake.path());

    let mut stream = exec
        .run(&ExecArgs::new("hello"), &CancellationToken::new())
        .unwrap();
    assert!(stream.id().is_some());

    let stdout = stream.take_stdout().unwrap();
    assert!(stream.take_stdout().is_none());
    assert_eq!(read_lines(stdout).await.len(), 2);
    stream.wait().await.unwrap();
}

#[tokio::test]
async fn non_zero_exit_reports_full_stderr_without_draining_stdout() {
    let fake = FakeCodex::new(&format!(
        "cat >/dev/null\n{}\necho 'first problem' >&2\necho 'second problem' >&2\nexit 3",
        emit(&[r#"{"type":"turn.started"}"#])
    ));
    let exec = CodexExec::new(fake.path());
    let stream = exec
        .run(&ExecArgs::new("hello"), &CancellationToken::new())
        .unwrap();

    let result = tokio::time::timeout(Duration::from_secs(10), stream.wait())
        .await
        .expect("wait should not hang");
    match result.unwrap_err() {
        Error::ExecFailed { exit_code, stderr } => {
            assert_eq!(exit_code, Some(3));
            assert_eq!(stderr, "first problem\nsecond problem");
        }
        other => panic!("Expected ExecFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn concurrent_waits_share_one_result() {
    let fake = FakeCodex::new("cat >/dev/null\necho crashed >&2\nexit 9");
    let exec = CodexExec::new(fake.path());
    let stream = exec
        .run(&ExecArgs::new("hello"), &CancellationToken::new())
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..10 {
        let completion = stream.completion();
        handles.push(tokio::spawn(async move { completion.wait().await }));
    }

    for handle in handles {
        let err = handle.await.unwrap().unwrap_err();
        assert_eq!(err.to_string(), "codex exec exited with code 9: crashed");
    }
    assert_eq!(stream.wait().await.unwrap_err().exit_code(), Some(9));
}

#[tokio::test]
async fn input_is_written_to_stdin_and_closed() {
    let fake = FakeCodex::build(|dir| format!("cat > '{}'", dir.join("stdin.txt").display()));
    let captured = fake.file("stdin.txt");

    let exec = CodexExec::new(fake.path());
    let stream = exec
        .run(&ExecArgs::new("line one\nline two"), &CancellationToken::new())
        .unwrap();
    stream.wait().await.unwrap();

    assert_eq!(std::fs::read_to_string(&captured).unwrap(), "line one\nline two");
}

#[tokio::test]
async fn arguments_reach_the_process() {
    let fake = FakeCodex::build(|dir| {
        format!(
            "cat >/dev/null\nfor a in \"$@\"; do printf '%s\\n' \"$a\"; done > '{}'",
            dir.join("args.txt").display()
        )
    });
    let captured = fake.file("args.txt");

    let exec = CodexExec::new(fake.path());
    let args = ExecArgs::new("hi").resume("thread_42");
    exec.run(&args, &CancellationToken::new())
        .unwrap()
        .wait()
        .await
        .unwrap();

    let recorded = std::fs::read_to_string(&captured).unwrap();
    let recorded: Vec<&str> = recorded.lines().collect();
    assert_eq!(recorded, ["exec", "--experimental-json", "resume", "thread_42"]);
}

#[tokio::test]
async fn custom_environment_replaces_host_environment() {
    let fake = FakeCodex::build(|dir| {
        format!(
            "read _ignored || true\nprintf '%s\\n' \"$ONLY\" \"${}\" \"${{HOME:-unset}}\" \"$CODEX_API_KEY\" > '{}'",
            ORIGINATOR_ENV,
            dir.join("env.txt").display()
        )
    });
    let captured = fake.file("env.txt");

    let env = HashMap::from([("ONLY".to_string(), "kept".to_string())]);
    let exec = CodexExec::new(fake.path())
        .with_env(env)
        .with_credentials(None, Some("sk-test".to_string()));
    exec.run(&ExecArgs::new("x"), &CancellationToken::new())
        .unwrap()
        .wait()
        .await
        .unwrap();

    let recorded = std::fs::read_to_string(&captured).unwrap();
    let recorded: Vec<&str> = recorded.lines().collect();
    assert_eq!(recorded, ["kept", SDK_ORIGINATOR, "unset", "sk-test"]);
}

#[tokio::test]
async fn cancellation_without_grace_lets_process_finish() {
    let fake = FakeCodex::new("cat >/dev/null\nsleep 0.3\nexit 0");
    let exec = CodexExec::new(fake.path());
    let cancel = CancellationToken::new();
    let stream = exec.run(&ExecArgs::new("x"), &cancel).unwrap();

    cancel.cancel();
    stream.wait().await.unwrap();
}

#[tokio::test]
async fn cancellation_with_grace_terminates_process() {
    let fake = FakeCodex::new("cat >/dev/null\nexec sleep 30");
    let exec = CodexExec::new(fake.path()).with_termination_grace(Duration::from_millis(100));
    let cancel = CancellationToken::new();
    let stream = exec.run(&ExecArgs::new("x"), &cancel).unwrap();

    cancel.cancel();
    let result = tokio::time::timeout(Duration::from_secs(10), stream.wait())
        .await
        .expect("terminated process should be reaped");
    assert!(result.unwrap_err().is_cancelled());
}
