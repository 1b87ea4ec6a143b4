//! Temp-file-then-rename writes

use std::fs::Permissions;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Replace `path` with `data` so that readers see either the old or the new
/// content, never a partial file.
///
/// The temporary file lives next to `path` under a unique name, so concurrent
/// writers of the same path never share it; the last rename wins.
pub(crate) async fn write_atomic(path: &Path, data: &[u8], mode: Option<u32>) -> io::Result<()> {
    let temp_path = temp_path_for(path)?;

    let result = write_then_rename(&temp_path, path, data, mode).await;
    if result.is_err() {
        let _ = fs::remove_file(&temp_path).await;
    }
    result
}

async fn write_then_rename(
    temp_path: &Path,
    path: &Path,
    data: &[u8],
    mode: Option<u32>,
) -> io::Result<()> {
    let mut file = fs::File::create(temp_path).await?;
    if let Some(mode) = mode {
        fs::set_permissions(temp_path, Permissions::from_mode(mode)).await?;
    }
    file.write_all(data).await?;
    file.sync_all().await?;
    drop(file);

    fs::rename(temp_path, path).await
}

fn temp_path_for(path: &Path) -> io::Result<PathBuf> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
    Ok(path.with_file_name(format!(".{file_name}.{}.tmp", uuid::Uuid::new_v4().simple())))
}

/// Whether a directory entry is a leftover or in-progress temporary file
pub(crate) fn is_temp_name(name: &str) -> bool {
    name.starts_with('.') && name.ends_with(".tmp")
}
