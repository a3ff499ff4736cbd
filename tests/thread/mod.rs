//! Thread tests against a scripted codex binary.

mod session_test;
