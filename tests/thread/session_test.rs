//! End-to-end turns through `Codex` and `Thread`.

use std::time::{Duration, Instant};

use serde_json::json;
use tokio_util::sync::CancellationToken;

use codex_sdk::{Codex, CodexOptions, Error, Input, ThreadItem, ThreadOptions, TurnOptions, UserInput};

use crate::support::{emit, FakeCodex};

const STARTED: &str = r#"{"type":"thread.started","thread_id":"thread_abc"}"#;
const TURN_STARTED: &str = r#"{"type":"turn.started"}"#;
const COMPLETED: &str = r#"{"type":"turn.completed","usage":{"input_tokens":120,"cached_input_tokens":20,"output_tokens":7}}"#;
const FAILED: &str = r#"{"type":"turn.failed","error":{"message":"model overloaded"}}"#;

fn client(fake: &FakeCodex) -> Codex {
    Codex::new(CodexOptions::default().codex_path(fake.path())).unwrap()
}

fn script(events: &[&str]) -> String {
    format!("cat >/dev/null\n{}", emit(events))
}

#[tokio::test]
async fn run_aggregates_items_response_and_usage() {
    let fake = FakeCodex::new(&script(&[
        STARTED,
        TURN_STARTED,
        r#"{"type":"item.completed","item":{"id":"r","type":"reasoning","text":"thinking"}}"#,
        r#"{"type":"item.completed","item":{"id":"a1","type":"agent_message","text":"draft"}}"#,
        r#"{"type":"item.updated","item":{"id":"t","type":"todo_list","items":[]}}"#,
        r#"{"type":"item.completed","item":{"id":"a2","type":"agent_message","text":"final answer"}}"#,
        COMPLETED,
    ]));
    let thread = client(&fake).start_thread(ThreadOptions::default());
    assert_eq!(thread.id(), None);

    let turn = thread.run("hello", TurnOptions::default()).await.unwrap();

    assert_eq!(thread.id().as_deref(), Some("thread_abc"));
    assert_eq!(turn.final_response, "final answer");
    assert_eq!(turn.items.len(), 3);
    let usage = turn.usage.unwrap();
    assert_eq!(usage.input_tokens, 120);
    assert_eq!(usage.cached_input_tokens, 20);
    assert_eq!(usage.output_tokens, 7);
}

#[tokio::test]
async fn unknown_items_are_kept_in_the_turn() {
    let fake = FakeCodex::new(&script(&[
        r#"{"type":"item.completed","item":{"id":"g","type":"image_generation","prompt":"a fox"}}"#,
        COMPLETED,
    ]));
    let thread = client(&fake).start_thread(ThreadOptions::default());

    let turn = thread.run("draw", TurnOptions::default()).await.unwrap();

    assert_eq!(turn.final_response, "");
    match &turn.items[0] {
        ThreadItem::Unknown(unknown) => {
            assert_eq!(unknown.item_type, "image_generation");
            assert_eq!(unknown.raw["prompt"], "a fox");
        }
        other => panic!("Expected Unknown item, got {other:?}"),
    }
}

#[tokio::test]
async fn turn_failed_is_reported_and_caller_token_untouched() {
    let fake = FakeCodex::new(&format!("{}\nsleep 1\nexit 0", script(&[TURN_STARTED, FAILED])));
    let thread = client(&fake).start_thread(ThreadOptions::default());
    let caller = CancellationToken::new();

    let err = thread
        .run("hello", TurnOptions::default().cancellation(caller.clone()))
        .await
        .unwrap_err();

    match err {
        Error::TurnFailed(message) => assert_eq!(message, "model overloaded"),
        other => panic!("Expected TurnFailed, got {other:?}"),
    }
    assert!(!caller.is_cancelled());
}

#[tokio::test]
async fn turn_failed_terminates_a_lingering_process() {
    let fake = FakeCodex::new(&format!("{}\nexec sleep 30", script(&[FAILED])));
    let codex = Codex::new(
        CodexOptions::default()
            .codex_path(fake.path())
            .termination_grace(Duration::from_millis(100)),
    )
    .unwrap();
    let thread = codex.start_thread(ThreadOptions::default());

    let started = Instant::now();
    let err = thread.run("hello", TurnOptions::default()).await.unwrap_err();

    assert!(matches!(err, Error::TurnFailed(_)), "got {err:?}");
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn process_failure_supersedes_turn_failure() {
    let fake = FakeCodex::new(&format!(
        "{}\necho 'auth expired' >&2\nexit 3",
        script(&[FAILED])
    ));
    let thread = client(&fake).start_thread(ThreadOptions::default());

    let err = thread.run("hello", TurnOptions::default()).await.unwrap_err();

    match err {
        Error::ExecFailed { exit_code, stderr } => {
            assert_eq!(exit_code, Some(3));
            assert_eq!(stderr, "auth expired");
        }
        other => panic!("Expected ExecFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn later_turns_resume_the_started_thread() {
    let fake = FakeCodex::build(|dir| {
        format!(
            "cat >/dev/null\necho \"$*\" >> '{}'\n{}",
            dir.join("args.txt").display(),
            emit(&[STARTED, COMPLETED])
        )
    });
    let thread = client(&fake).start_thread(ThreadOptions::default());

    thread.run("one", TurnOptions::default()).await.unwrap();
    thread.run("two", TurnOptions::default()).await.unwrap();

    let recorded = std::fs::read_to_string(fake.file("args.txt")).unwrap();
    let recorded: Vec<&str> = recorded.lines().collect();
    assert_eq!(
        recorded,
        [
            "exec --experimental-json",
            "exec --experimental-json resume thread_abc"
        ]
    );
}

#[tokio::test]
async fn resumed_thread_passes_its_id_on_the_first_turn() {
    let fake = FakeCodex::build(|dir| {
        format!(
            "cat >/dev/null\necho \"$*\" > '{}'\n{}",
            dir.join("args.txt").display(),
            emit(&[COMPLETED])
        )
    });
    let thread = client(&fake).resume_thread("thread_old", ThreadOptions::default().model("gpt-5"));
    assert_eq!(thread.id().as_deref(), Some("thread_old"));

    thread.run("again", TurnOptions::default()).await.unwrap();

    let recorded = std::fs::read_to_string(fake.file("args.txt")).unwrap();
    assert_eq!(
        recorded.trim(),
        "exec --experimental-json --model gpt-5 resume thread_old"
    );
}

#[tokio::test]
async fn output_schema_is_readable_then_removed() {
    let fake = FakeCodex::build(|dir| {
        format!(
            "cat >/dev/null
while [ $# -gt 0 ]; do
  if [ \"$1\" = \"--output-schema\" ]; then
    cat \"$2\" > '{copy}'
    echo \"$2\" > '{path}'
  fi
  shift
done
{events}",
            copy = dir.join("schema_copy.json").display(),
            path = dir.join("schema_path.txt").display(),
            events = emit(&[COMPLETED])
        )
    });
    let schema = json!({
        "type": "object",
        "properties": {"summary": {"type": "string"}},
        "required": ["summary"]
    });
    let thread = client(&fake).start_thread(ThreadOptions::default());

    thread
        .run("summarize", TurnOptions::default().output_schema(schema.clone()))
        .await
        .unwrap();

    let copy = std::fs::read_to_string(fake.file("schema_copy.json")).unwrap();
    let copy: serde_json::Value = serde_json::from_str(&copy).unwrap();
    assert_eq!(copy, schema);

    let path = std::fs::read_to_string(fake.file("schema_path.txt")).unwrap();
    assert!(!std::path::Path::new(path.trim()).exists());
}

#[tokio::test]
async fn invalid_input_never_spawns_the_process() {
    let fake = FakeCodex::build(|dir| format!("touch '{}'", dir.join("spawned").display()));
    let thread = client(&fake).start_thread(ThreadOptions::default());

    let err = thread
        .run("hi", TurnOptions::default().output_schema(json!("not an object")))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::InvalidInput { ref field, .. } if field == "output schema"));

    let parts = vec![UserInput::text("look"), UserInput::local_image("")];
    let err = thread.run(parts, TurnOptions::default()).await.unwrap_err();
    assert!(matches!(err, Error::InvalidInput { .. }));

    assert!(!fake.file("spawned").exists());
}

#[test]
fn explicit_binary_path_must_be_a_file() {
    let dir = tempfile::tempdir().unwrap();

    let err = Codex::new(CodexOptions::default().codex_path(dir.path())).unwrap_err();
    assert!(matches!(err, Error::InvalidInput { .. }), "got {err:?}");

    let missing = dir.path().join("nope");
    let err = Codex::new(CodexOptions::default().codex_path(missing)).unwrap_err();
    assert!(matches!(err, Error::InvalidInput { .. }), "got {err:?}");
}

#[tokio::test]
async fn caller_cancellation_stops_the_turn() {
    let fake = FakeCodex::new(&format!("{}\nexec sleep 30", script(&[TURN_STARTED])));
    let codex = Codex::new(
        CodexOptions::default()
            .codex_path(fake.path())
            .termination_grace(Duration::from_millis(100)),
    )
    .unwrap();
    let thread = codex.start_thread(ThreadOptions::default());
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        trigger.cancel();
    });

    let result = tokio::time::timeout(
        Duration::from_secs(10),
        thread.run("hello", TurnOptions::default().cancellation(cancel)),
    )
    .await
    .expect("cancelled turn should finish");
    assert!(result.unwrap_err().is_cancelled());
}

#[tokio::test]
async fn prompt_parts_are_joined_on_stdin() {
    let fake = FakeCodex::build(|dir| {
        format!(
            "cat > '{stdin}'\necho \"$*\" > '{args}'\n{events}",
            stdin = dir.join("stdin.txt").display(),
            args = dir.join("args.txt").display(),
            events = emit(&[COMPLETED])
        )
    });
    let thread = client(&fake).start_thread(ThreadOptions::default());

    let input = Input::from(vec![
        UserInput::text("Describe this"),
        UserInput::local_image("/tmp/screen.png"),
        UserInput::text("Be brief"),
    ]);
    thread.run(input, TurnOptions::default()).await.unwrap();

    let stdin = std::fs::read_to_string(fake.file("stdin.txt")).unwrap();
    assert_eq!(stdin, "Describe this\n\nBe brief");
    let args = std::fs::read_to_string(fake.file("args.txt")).unwrap();
    assert_eq!(args.trim(), "exec --experimental-json --image /tmp/screen.png");
}

#[tokio::test]
async fn streamed_turn_exposes_events_and_thread_id() {
    let fake = FakeCodex::new(&script(&[STARTED, TURN_STARTED, COMPLETED]));
    let thread = client(&fake).start_thread(ThreadOptions::default());

    let mut streamed = thread.run_streamed("hi", TurnOptions::default()).unwrap();
    let first = streamed.next_event().await.unwrap();
    assert_eq!(first.thread_id(), Some("thread_abc"));
    assert_eq!(thread.id().as_deref(), Some("thread_abc"));

    let mut rest = 0;
    while streamed.next_event().await.is_some() {
        rest += 1;
    }
    assert_eq!(rest, 2);
    streamed.wait().await.unwrap();
}
