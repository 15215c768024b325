use crate::error::Res;
use anyhow::Context;
use std::path::{Path, PathBuf};

/// Write a file.
pub(crate) async fn write(path: impl AsRef<Path>, contents: impl AsRef<[u8]>) -> Res<()> {
    let path = path.as_ref();
    tokio::fs::write(path, contents)
        .await
        .context(format!("Unable to write to {}", path.to_string_lossy()))
}

/// Read a file to a `String`.
pub(crate) async fn read(path: &Path) -> Res<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read file at {}", path.display()))
}

/// Basically move a file. Renames `from` -> `to`. Falls back to copy-and-remove when the two paths
/// are on different filesystems.
pub(crate) async fn rename(from: impl AsRef<Path>, to: impl AsRef<Path>) -> Res<()> {
    let (from, to) = (from.as_ref(), to.as_ref());
    if tokio::fs::rename(from, to).await.is_ok() {
        return Ok(());
    }
    tokio::fs::copy(from, to).await.with_context(|| {
        format!(
            "Unable to move file from '{}' to '{}'",
            from.to_string_lossy(),
            to.to_string_lossy()
        )
    })?;
    tokio::fs::remove_file(from)
        .await
        .with_context(|| format!("Unable to remove '{}'", from.display()))
}

/// Create a directory and its parents if they do not exist.
pub(crate) async fn make_dir(path: impl AsRef<Path>) -> Res<()> {
    let path = path.as_ref();
    tokio::fs::create_dir_all(path)
        .await
        .with_context(|| format!("Unable to create directory {}", path.display()))
}

/// Resolve `path` to an absolute path with symlinks resolved. The path must exist.
pub(crate) async fn canonicalize(path: impl AsRef<Path>) -> Res<PathBuf> {
    let path = path.as_ref();
    tokio::fs::canonicalize(path)
        .await
        .with_context(|| format!("Unable to resolve the path {}", path.display()))
}

/// Make a file readable and writable by its owner only (0600 on Unix).
pub(crate) fn restrict_permissions(path: &Path) -> Res<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let permissions = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, permissions)
            .with_context(|| format!("Failed to set permissions on {}", path.display()))?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_rename_read() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.json");
        let b = dir.path().join("nested").join("b.json");
        write(&a, "{}").await.unwrap();
        make_dir(b.parent().unwrap()).await.unwrap();
        rename(&a, &b).await.unwrap();
        assert!(!a.exists());
        assert_eq!(read(&b).await.unwrap(), "{}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_restrict_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("key.json");
        write(&path, "secret").await.unwrap();
        restrict_permissions(&path).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
