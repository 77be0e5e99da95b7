use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// Atomically write bytes to a file via a sibling temp file and a rename.
///
/// Readers see either the old contents or the new contents, never a partial
/// write. The temp file is removed if anything fails.
///
/// # Errors
/// Returns an error if the write or rename fails.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    // Same directory so the rename never crosses filesystems
    let mut temp = tempfile::Builder::new()
        .prefix(".minnow-write-")
        .tempfile_in(parent)?;
    temp.write_all(bytes)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    Ok(())
}

/// Move `src` to `dst`, replacing whatever is at `dst`.
///
/// Falls back to a recursive copy when the rename fails (e.g. across
/// filesystems). `src` is consumed either way.
///
/// # Errors
/// Returns an error if the old destination cannot be removed or the move fails.
pub fn replace_dir(src: &Path, dst: &Path) -> io::Result<()> {
    if dst.symlink_metadata().is_ok() {
        if dst.is_dir() {
            fs::remove_dir_all(dst)?;
        } else {
            fs::remove_file(dst)?;
        }
    }

    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }

    match fs::rename(src, dst) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            copy_dir_all(src, dst).map_err(|copy_err| {
                io::Error::new(
                    copy_err.kind(),
                    format!("rename={rename_err}, copy={copy_err}"),
                )
            })?;
            let _ = fs::remove_dir_all(src);
            Ok(())
        }
    }
}

/// Recursively copy a directory tree. Symlinks are skipped.
///
/// # Errors
/// Returns an error if any directory or file cannot be copied.
pub fn copy_dir_all(src: &Path, dst: &Path) -> io::Result<()> {
    fs::create_dir_all(dst)?;

    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let ty = entry.file_type()?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if ty.is_dir() {
            copy_dir_all(&src_path, &dst_path)?;
        } else if ty.is_file() {
            fs::copy(&src_path, &dst_path)?;
        }
    }

    Ok(())
}
