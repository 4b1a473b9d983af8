//! Blob-file side storage for `set_blob`/`get_blob` (§4.10).
//!
//! Blob bytes live on disk under `<blob-dir>/<sanitized-domain>/<sanitized-key>`,
//! separate from the in-memory (domain, key) → value map. Every path this
//! module touches is re-verified to resolve under the configured blob
//! directory before use, mirroring the `check_blob_path`/`realpath` guard
//! in the original storage backend.

use std::fs;
use std::path::{Path, PathBuf};

use crate::StoreError;

/// Replaces path separators and spaces with underscores, as the original
/// backend does before using a domain/key as a filesystem path component.
fn sanitize(s: &str) -> String {
    s.chars()
        .map(|c| if c == ' ' || c == '/' || c == '\\' { '_' } else { c })
        .collect()
}

fn relative_path(domain: &str, key: &str) -> PathBuf {
    PathBuf::from(sanitize(domain)).join(sanitize(key))
}

/// Verifies that `candidate`'s resolved real path lies under `blob_dir`'s
/// resolved real path. Returns the canonicalized candidate path on success.
fn verify_contained(blob_dir: &Path, candidate: &Path) -> Result<PathBuf, StoreError> {
    let real_root = fs::canonicalize(blob_dir).map_err(|_| StoreError::InvalidState)?;

    let parent = candidate.parent().unwrap_or(candidate);
    let real_parent = fs::canonicalize(parent).map_err(|_| StoreError::InvalidState)?;
    if !real_parent.starts_with(&real_root) {
        return Err(StoreError::InvalidState);
    }

    let file_name = candidate
        .file_name()
        .ok_or(StoreError::InvalidState)?;
    Ok(real_parent.join(file_name))
}

/// Writes `bytes` to the blob path for (domain, key), creating the
/// sub-directory if needed and writing atomically (temp file + rename) so
/// a concurrent reader never observes a partial write.
pub fn write(blob_dir: &Path, domain: &str, key: &str, bytes: &[u8]) -> Result<PathBuf, StoreError> {
    let rel = relative_path(domain, key);
    let target = blob_dir.join(&rel);
    let parent = target.parent().unwrap_or(blob_dir);
    fs::create_dir_all(parent).map_err(|_| StoreError::Io)?;

    let verified = verify_contained(blob_dir, &target)?;

    let tmp_name = format!(
        ".{}.{}.tmp",
        verified.file_name().and_then(|n| n.to_str()).unwrap_or("blob"),
        std::process::id()
    );
    let tmp_path = verified.with_file_name(tmp_name);
    fs::write(&tmp_path, bytes).map_err(|_| StoreError::Io)?;
    fs::rename(&tmp_path, &verified).map_err(|_| StoreError::Io)?;

    Ok(verified)
}

/// Reads the full contents of the blob at (domain, key).
pub fn read(blob_dir: &Path, domain: &str, key: &str) -> Result<Vec<u8>, StoreError> {
    let rel = relative_path(domain, key);
    let target = blob_dir.join(&rel);
    let verified = verify_contained(blob_dir, &target)?;
    fs::read(&verified).map_err(|_| StoreError::Io)
}

/// Deletes the blob at (domain, key). Failure to remove it is logged and
/// treated as non-fatal per §4.10, since the referring entry has already
/// been removed from the map by the time this runs.
pub fn delete(blob_dir: &Path, domain: &str, key: &str) {
    let rel = relative_path(domain, key);
    let target = blob_dir.join(&rel);
    match verify_contained(blob_dir, &target) {
        Ok(verified) => {
            if let Err(err) = fs::remove_file(&verified) {
                if err.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(?err, domain, key, "failed to remove orphaned blob file");
                }
            }
        }
        Err(err) => {
            tracing::warn!(?err, domain, key, "blob path failed containment check on delete");
        }
    }
}
