//! Fake `codex` executables for driving the SDK end to end.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A shell script standing in for the codex binary.
pub struct FakeCodex {
    dir: TempDir,
    path: PathBuf,
}

impl FakeCodex {
    /// Write an executable `/bin/sh` script with `body`.
    pub fn new(body: &str) -> Self {
        Self::build(|_| body.to_string())
    }

    /// Like [`FakeCodex::new`], with the body built from the script's own
    /// directory so it can record files next to itself.
    pub fn build(body: impl FnOnce(&Path) -> String) -> Self {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("codex");
        let body = body(dir.path());
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        Self { dir, path }
    }

    /// Path of the script.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A path inside the script's directory, for files the script writes.
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}

/// Shell lines printing each JSON document on its own stdout line.
pub fn emit(lines: &[&str]) -> String {
    lines
        .iter()
        .map(|line| format!("printf '%s\\n' '{line}'"))
        .collect::<Vec<_>>()
        .join("\n")
}
