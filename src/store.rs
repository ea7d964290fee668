use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use thiserror::Error;

use crate::record::Contact;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no contact file at {0}")]
    NotFound(PathBuf),
    #[error("failed to read contact file at {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("contact file at {path} is not valid JSON")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Load a record from `path`. Field-level shape problems are tolerated by
/// `Contact::from_value`; this only fails when the file itself cannot be
/// read or is not a JSON document at all.
pub fn load(path: &Path) -> Result<Contact, LoadError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(LoadError::NotFound(path.to_path_buf()))
        }
        Err(err) => {
            return Err(LoadError::Io {
                path: path.to_path_buf(),
                source: err,
            })
        }
    };

    let value = serde_json::from_str(&raw).map_err(|err| LoadError::Parse {
        path: path.to_path_buf(),
        source: err,
    })?;

    Ok(Contact::from_value(&value))
}

/// Load a record, degrading to an empty one on any failure. Starting on a
/// brand-new contact must feel the same as opening an existing one, so a
/// missing file stays silent; a present-but-broken file gets one warning.
pub fn load_or_empty(path: &Path) -> Contact {
    match load(path) {
        Ok(contact) => contact,
        Err(LoadError::NotFound(_)) => Contact::default(),
        Err(err) => {
            eprintln!("warning: {err}; starting with an empty contact");
            Contact::default()
        }
    }
}

/// Write `contact` to `path` as pretty-printed JSON, going through a temp
/// sibling and a rename so a failed write never leaves a partial file.
pub fn save(path: &Path, contact: &Contact) -> Result<()> {
    let mut output = serde_json::to_string_pretty(&contact.to_value())
        .context("serializing contact record")?;
    output.push('\n');
    write_atomic(path, output.as_bytes())
}

fn write_atomic(target: &Path, data: &[u8]) -> Result<()> {
    let parent = target
        .parent()
        .ok_or_else(|| anyhow!("target path has no parent: {}", target.display()))?;
    if !parent.as_os_str().is_empty() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create parent dir {}", parent.display()))?;
    }

    let temp_name = target
        .file_name()
        .and_then(|name| name.to_str())
        .map(|name| format!(".{name}.tmp"))
        .unwrap_or_else(|| ".onecard.tmp".to_string());
    let temp_path = parent.join(temp_name);

    fs::write(&temp_path, data)
        .with_context(|| format!("failed to write {}", temp_path.display()))?;
    if let Err(err) = fs::rename(&temp_path, target) {
        let _ = fs::remove_file(&temp_path);
        return Err(err)
            .with_context(|| format!("failed to move {} into place", target.display()));
    }
    Ok(())
}
