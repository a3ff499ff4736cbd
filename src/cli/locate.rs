//! Resolution of the `codex` binary.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Map an OS/architecture pair (as reported by [`std::env::consts`]) to the
/// target triple used for bundled binaries.
#[must_use]
pub fn target_triple(os: &str, arch: &str) -> Option<&'static str> {
    match (os, arch) {
        ("linux" | "android", "x86_64") => Some("x86_64-unknown-linux-musl"),
        ("linux" | "android", "aarch64") => Some("aarch64-unknown-linux-musl"),
        ("macos", "x86_64") => Some("x86_64-apple-darwin"),
        ("macos", "aarch64") => Some("aarch64-apple-darwin"),
        ("windows", "x86_64") => Some("x86_64-pc-windows-msvc"),
        ("windows", "aarch64") => Some("aarch64-pc-windows-msvc"),
        _ => None,
    }
}

/// Path of a bundled binary below `root` for the given platform.
#[must_use]
pub fn bundled_candidate(root: &Path, os: &str, arch: &str) -> Option<PathBuf> {
    let triple = target_triple(os, arch)?;
    let binary = if os == "windows" { "codex.exe" } else { "codex" };
    Some(root.join("vendor").join(triple).join("codex").join(binary))
}

fn bundled_path() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    let root = exe.parent()?;
    let candidate = bundled_candidate(root, std::env::consts::OS, std::env::consts::ARCH)?;
    candidate.is_file().then_some(candidate)
}

/// Locate the `codex` binary: bundled next to the running executable first,
/// then on `PATH`.
///
/// # Errors
///
/// Returns [`Error::NotFound`] if neither location has a binary.
pub fn find_codex_path() -> Result<PathBuf> {
    if let Some(path) = bundled_path() {
        tracing::debug!(path = %path.display(), "Using bundled codex binary");
        return Ok(path);
    }

    which::which("codex").map_err(|e| {
        Error::NotFound(format!("{e} (ensure codex is installed and in PATH)"))
    })
}

/// Check that an explicitly configured binary path exists and is a file.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] describing what is wrong with the path.
pub fn validate_executable(path: &Path) -> Result<()> {
    let shown = path.display().to_string();
    if shown.is_empty() {
        return Err(Error::invalid_input("codex path", "", "path must not be empty"));
    }
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Err(Error::invalid_input(
            "codex path",
            shown,
            "path is a directory, not a file",
        )),
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(Error::invalid_input("codex path", shown, "path does not exist"))
        }
        Err(e) => Err(Error::invalid_input(
            "codex path",
            shown,
            format!("path is not accessible: {e}"),
        )),
    }
}
