use std::{
    fs,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use serde::{Serialize, de::DeserializeOwned};

use crate::ledger::error::{LedgerError, LedgerErrorKind, corruption_error, persistence_error};

/// A single JSON document on disk, replaced atomically on every save.
#[derive(Debug, Clone)]
pub struct JsonDocument {
    path: PathBuf,
}

impl JsonDocument {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load<T: DeserializeOwned>(&self) -> Result<Option<T>, LedgerError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(persistence_error(format!(
                    "failed to read ledger document '{}': {err}",
                    self.path.display()
                )));
            }
        };

        if content.trim().is_empty() {
            return Ok(None);
        }

        serde_json::from_str(&content).map(Some).map_err(|err| {
            corruption_error(format!(
                "failed to parse ledger document '{}': {err}",
                self.path.display()
            ))
        })
    }

    /// Loads the document, starting empty when it is missing or does not parse.
    /// A corrupt file is moved aside to `<file>.corrupt` first; I/O failures are returned.
    pub fn load_or_default<T: DeserializeOwned + Default>(&self) -> Result<T, LedgerError> {
        match self.load() {
            Ok(Some(value)) => Ok(value),
            Ok(None) => Ok(T::default()),
            Err(err) if err.kind == LedgerErrorKind::Corruption => {
                let backup = self.quarantine();
                tracing::warn!(
                    target: "ledger",
                    path = %self.path.display(),
                    backup = ?backup.as_ref().map(|path| path.display().to_string()),
                    error = %err,
                    "ledger_document_corrupt_starting_empty"
                );
                Ok(T::default())
            }
            Err(err) => Err(err),
        }
    }

    fn quarantine(&self) -> Option<PathBuf> {
        let backup = self.sibling(".corrupt");
        fs::rename(&self.path, &backup).ok().map(|_| backup)
    }

    fn temp_path(&self) -> PathBuf {
        self.sibling(".tmp")
    }

    /// `<file><suffix>` next to the document, keeping the full file name.
    fn sibling(&self, suffix: &str) -> PathBuf {
        let mut sibling = self.path.clone().into_os_string();
        sibling.push(suffix);
        PathBuf::from(sibling)
    }

    pub fn save<T: Serialize>(&self, value: &T) -> Result<(), LedgerError> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent).map_err(|err| {
            persistence_error(format!(
                "failed to create ledger directory '{}': {err}",
                parent.display()
            ))
        })?;

        let tmp_path = self.temp_path();
        let file = fs::File::create(&tmp_path).map_err(|err| {
            persistence_error(format!(
                "failed to create ledger temp file '{}': {err}",
                tmp_path.display()
            ))
        })?;
        {
            let mut writer = BufWriter::new(&file);
            serde_json::to_writer_pretty(&mut writer, value).map_err(|err| {
                persistence_error(format!(
                    "failed to serialize ledger document '{}': {err}",
                    tmp_path.display()
                ))
            })?;
            writer.write_all(b"\n").map_err(|err| {
                persistence_error(format!(
                    "failed to finalize ledger document '{}': {err}",
                    tmp_path.display()
                ))
            })?;
            writer.flush().map_err(|err| {
                persistence_error(format!(
                    "failed to flush ledger document '{}': {err}",
                    tmp_path.display()
                ))
            })?;
        }
        file.sync_all().map_err(|err| {
            persistence_error(format!(
                "failed to sync ledger temp file '{}': {err}",
                tmp_path.display()
            ))
        })?;

        fs::rename(&tmp_path, &self.path).map_err(|err| {
            persistence_error(format!(
                "failed to replace ledger document '{}' from '{}': {err}",
                self.path.display(),
                tmp_path.display()
            ))
        })?;

        if let Ok(parent_file) = fs::File::open(&parent) {
            let _ = parent_file.sync_all();
        }

        Ok(())
    }
}
