//! Temporary file holding a turn's output schema.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use crate::error::{Error, Result};

/// A schema persisted for `--output-schema`, removed on [`release`] or drop.
///
/// [`release`]: OutputSchemaFile::release
#[derive(Debug)]
pub struct OutputSchemaFile {
    dir: TempDir,
    path: PathBuf,
}

impl OutputSchemaFile {
    /// Persist `schema` when present. `None` and JSON `null` mean no schema.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if the schema is not a JSON object, or
    /// [`Error::OutputSchema`] if the file cannot be written.
    pub fn create(schema: Option<&serde_json::Value>) -> Result<Option<Self>> {
        let schema = match schema {
            None | Some(serde_json::Value::Null) => return Ok(None),
            Some(serde_json::Value::Object(map)) => map,
            Some(_) => {
                return Err(Error::invalid_input(
                    "output schema",
                    "",
                    "must be a JSON object, not a primitive or array",
                ))
            }
        };

        let io_err = |e: std::io::Error| Error::OutputSchema(Arc::new(e));
        let dir = tempfile::Builder::new()
            .prefix("codex-output-schema-")
            .tempdir()
            .map_err(io_err)?;
        let path = dir.path().join("schema.json");
        let data = serde_json::to_vec(schema)
            .map_err(|e| io_err(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;
        std::fs::write(&path, data).map_err(io_err)?;

        tracing::debug!(path = %path.display(), "Wrote output schema");
        Ok(Some(Self { dir, path }))
    }

    /// Location of `schema.json`.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the schema directory now.
    pub fn release(self) {
        let shown = self.dir.path().display().to_string();
        if let Err(e) = self.dir.close() {
            tracing::warn!(path = %shown, error = %e, "Failed to remove output schema");
        }
    }
}
