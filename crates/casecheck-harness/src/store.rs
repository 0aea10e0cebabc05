//! Case files on disk.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use casecheck_core::naming::{CONVENTION_FILE, matches_any};
use casecheck_core::{
    Convention, DecodeError, DecodePolicy, EncodeError, NamingError, TestCase, decode_case_with,
    encode_case,
};
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("file {} does not exist", path.display())]
    FileNotFound { path: PathBuf },
    #[error("{} does not exist or is not a directory", path.display())]
    NotADirectory { path: PathBuf },
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: DecodeError,
    },
    #[error("{}: {source}", path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: EncodeError,
    },
    #[error("{}: {source}", path.display())]
    Convention {
        path: PathBuf,
        #[source]
        source: NamingError,
    },
}

fn io_error(path: &Path, source: io::Error) -> StoreError {
    if source.kind() == io::ErrorKind::NotFound {
        StoreError::FileNotFound {
            path: path.to_path_buf(),
        }
    } else {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Raw bytes of a case file.
pub fn read_case_bytes(path: &Path) -> Result<Vec<u8>, StoreError> {
    std::fs::read(path).map_err(|err| io_error(path, err))
}

/// Read and decode one case file.
pub fn read_case_file(path: &Path, policy: DecodePolicy) -> Result<TestCase, StoreError> {
    let bytes = read_case_bytes(path)?;
    decode_case_with(&bytes, policy).map_err(|source| StoreError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

/// Encode `case` and write it to `path`. Nothing is written if encoding fails.
/// The record goes to a sibling temp file that is then renamed over `path`,
/// so readers see either the old case or the new one.
/// Returns the bytes written.
pub fn write_case_file(path: &Path, case: &TestCase) -> Result<Vec<u8>, StoreError> {
    let bytes = encode_case(case).map_err(|source| StoreError::Encode {
        path: path.to_path_buf(),
        source,
    })?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|err| io_error(path, err))?;
    tmp.write_all(&bytes).map_err(|err| io_error(path, err))?;
    tmp.as_file().sync_all().map_err(|err| io_error(path, err))?;
    tmp.persist(path).map_err(|err| io_error(path, err.error))?;
    Ok(bytes)
}

/// Lowercase hex SHA-256 of a record, used as an artifact reference in logs.
#[must_use]
pub fn case_digest(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

/// The directory's `.testconvention`, or the default convention when absent.
pub fn load_convention(dir: &Path) -> Result<Convention, StoreError> {
    let path = dir.join(CONVENTION_FILE);
    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Convention::default()),
        Err(source) => return Err(StoreError::Io { path, source }),
    };
    Convention::parse(&content).map_err(|source| StoreError::Convention { path, source })
}

/// Names of all regular files in `dir`, sorted.
pub fn file_names(dir: &Path) -> Result<Vec<String>, StoreError> {
    if !dir.is_dir() {
        return Err(StoreError::NotADirectory {
            path: dir.to_path_buf(),
        });
    }
    let entries = std::fs::read_dir(dir).map_err(|err| io_error(dir, err))?;
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| io_error(dir, err))?;
        let is_file = entry
            .file_type()
            .map_err(|err| io_error(&entry.path(), err))?
            .is_file();
        if is_file && let Ok(name) = entry.file_name().into_string() {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

/// Case files in `dir` selected by the convention's folder rules, sorted by name.
pub fn list_case_files(dir: &Path, convention: &Convention) -> Result<Vec<PathBuf>, StoreError> {
    let rules = convention
        .folder_rules()
        .map_err(|source| StoreError::Convention {
            path: dir.join(CONVENTION_FILE),
            source,
        })?;
    Ok(file_names(dir)?
        .into_iter()
        .filter(|name| name != CONVENTION_FILE && matches_any(&rules, name))
        .map(|name| dir.join(name))
        .collect())
}

/// Next unused case path in `dir` according to its convention.
pub fn next_case_path(dir: &Path) -> Result<PathBuf, StoreError> {
    let convention = load_convention(dir)?;
    let existing = file_names(dir)?;
    let name = convention
        .next_name(&existing)
        .map_err(|source| StoreError::Convention {
            path: dir.join(CONVENTION_FILE),
            source,
        })?;
    Ok(dir.join(name))
}
