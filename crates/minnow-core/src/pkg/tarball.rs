//! Tarball download and extraction.

use super::error::PkgError;
use bytes::Bytes;
use flate2::read::GzDecoder;
use minnow_util::fs::replace_dir;
use reqwest::Client;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tar::Archive;

/// Maximum tarball size (200 MB).
pub const MAX_TARBALL_SIZE: u64 = 200 * 1024 * 1024;

/// Download timeout in seconds.
const DOWNLOAD_TIMEOUT_SECS: u64 = 30;

/// Download a tarball from a URL.
///
/// If `auth_token` is provided, attaches a `Bearer` authorization header.
///
/// # Errors
/// Returns an error if the download fails or exceeds the size limit.
pub async fn download_tarball(
    client: &Client,
    url: &str,
    max_bytes: u64,
    auth_token: Option<&str>,
) -> Result<Bytes, PkgError> {
    let mut request = client
        .get(url)
        .timeout(Duration::from_secs(DOWNLOAD_TIMEOUT_SECS));

    if let Some(token) = auth_token {
        request = request.bearer_auth(token);
    }

    let response = request
        .send()
        .await
        .map_err(|e| PkgError::download_failed(format!("Failed to download '{url}': {e}")))?;

    if !response.status().is_success() {
        return Err(PkgError::download_failed(format!(
            "Download failed with status {} for '{url}'",
            response.status()
        )));
    }

    if let Some(len) = response.content_length() {
        if len > max_bytes {
            return Err(PkgError::download_failed(format!(
                "Tarball too large: {len} bytes (max: {max_bytes})"
            )));
        }
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| PkgError::download_failed(format!("Failed to read response body: {e}")))?;

    if bytes.len() as u64 > max_bytes {
        return Err(PkgError::download_failed(format!(
            "Tarball too large: {} bytes (max: {max_bytes})",
            bytes.len()
        )));
    }

    Ok(bytes)
}

/// Write downloaded archive bytes next to `dest`, unpack them into `dest`,
/// and remove the archive file.
///
/// The archive file is removed whether or not extraction succeeds.
///
/// # Errors
/// Returns an error if the archive cannot be written or extracted.
pub fn unpack_tarball(bytes: &[u8], dest: &Path) -> Result<(), PkgError> {
    let parent = dest
        .parent()
        .ok_or_else(|| PkgError::extract_failed("Destination has no parent"))?;
    fs::create_dir_all(parent)?;

    // Deleted on drop, including every error path below
    let mut archive = tempfile::Builder::new()
        .prefix(".minnow-download-")
        .suffix(".tgz")
        .tempfile_in(parent)?;
    archive.write_all(bytes)?;
    archive.flush()?;

    extract_tgz_file(archive.path(), dest)
}

/// Extract a gzipped tarball into `dest`, replacing any previous contents.
///
/// The first path component of every entry is stripped (registry tarballs
/// wrap their contents in a single `package/` directory). Extraction goes to
/// a staging directory first and is swapped in once complete, so a failed
/// extraction leaves the old contents in place.
///
/// # Errors
/// Returns an error if the archive is unreadable, empty, or contains unsafe paths.
pub fn extract_tgz_file(archive_path: &Path, dest: &Path) -> Result<(), PkgError> {
    let parent = dest
        .parent()
        .ok_or_else(|| PkgError::extract_failed("Destination has no parent"))?;
    fs::create_dir_all(parent)?;

    let staging = tempfile::Builder::new()
        .prefix(".minnow-extract-")
        .tempdir_in(parent)?;
    let staged_package = staging.path().join("package");
    fs::create_dir_all(&staged_package)?;

    let file = File::open(archive_path).map_err(|e| {
        PkgError::extract_failed(format!(
            "Failed to open archive {}: {e}",
            archive_path.display()
        ))
    })?;

    let extracted = extract_entries(file, &staged_package)?;
    if extracted == 0 {
        return Err(PkgError::extract_failed("Tarball does not contain any files"));
    }

    replace_dir(&staged_package, dest).map_err(|e| {
        PkgError::extract_failed(format!(
            "Failed to move extracted package into {}: {e}",
            dest.display()
        ))
    })
}

/// Unpack entries with their leading component stripped. Returns the number
/// of files written.
fn extract_entries(reader: impl io::Read, dest: &Path) -> Result<usize, PkgError> {
    let mut archive = Archive::new(GzDecoder::new(reader));
    let mut files = 0;

    for entry in archive
        .entries()
        .map_err(|e| PkgError::extract_failed(format!("Failed to read tarball entries: {e}")))?
    {
        let mut entry = entry
            .map_err(|e| PkgError::extract_failed(format!("Failed to read tarball entry: {e}")))?;

        let path = entry
            .path()
            .map_err(|e| PkgError::extract_failed(format!("Failed to read entry path: {e}")))?
            .into_owned();

        let Some(relative) = strip_leading_component(&path)? else {
            continue;
        };

        let dest_path = dest.join(&relative);

        let entry_type = entry.header().entry_type();
        if entry_type.is_dir() {
            fs::create_dir_all(&dest_path)?;
        } else if entry_type.is_file() {
            if let Some(parent) = dest_path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut file = File::create(&dest_path)?;
            io::copy(&mut entry, &mut file)?;
            files += 1;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Ok(mode) = entry.header().mode() {
                    let _ = fs::set_permissions(&dest_path, fs::Permissions::from_mode(mode));
                }
            }
        }
        // Symlinks and special entries are skipped
    }

    Ok(files)
}

/// Validate an entry path and drop its first component.
///
/// Returns `None` for the wrapper directory itself.
fn strip_leading_component(path: &Path) -> Result<Option<PathBuf>, PkgError> {
    let path_str = path.to_string_lossy();

    if path.is_absolute() {
        return Err(PkgError::extract_failed(format!(
            "Tarball contains absolute path: {path_str}"
        )));
    }

    let mut normal = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => normal.push(part),
            Component::CurDir => {}
            _ => {
                return Err(PkgError::extract_failed(format!(
                    "Tarball contains path traversal: {path_str}"
                )));
            }
        }
    }

    let stripped: PathBuf = normal.into_iter().skip(1).collect();
    Ok((!stripped.as_os_str().is_empty()).then_some(stripped))
}
