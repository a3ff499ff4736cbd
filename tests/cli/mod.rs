//! CLI layer tests: event decoding, process control and the event pump.

#[cfg(unix)]
mod process_test;

/// Verify the CLI types are exported from the library.
#[test]
fn test_cli_types_exported() {
    use codex_sdk::cli::{
        CodexExec, Completion, EventPump, ExecArgs, StreamParser, StreamedTurn, ThreadEvent,
        ThreadItem, DEFAULT_CHANNEL_BUFFER,
    };

    let _ = std::any::type_name::<(CodexExec, Completion, EventPump<tokio::io::DuplexStream>)>();
    let _ = std::any::type_name::<(ExecArgs, StreamParser, StreamedTurn, ThreadEvent, ThreadItem)>();
    assert_eq!(DEFAULT_CHANNEL_BUFFER, 64);
}
