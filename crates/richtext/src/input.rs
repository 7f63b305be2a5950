use std::path::Path;

use anyhow::{Context, Result};
use tokio::fs;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Reads the command input from `path`, or from stdin when no path is given.
pub async fn read_input(path: Option<&Path>, max_bytes: u64) -> Result<String> {
    match path {
        Some(path) => read_file(path, max_bytes).await,
        None => read_limited(tokio::io::stdin(), max_bytes, "stdin").await,
    }
}

pub async fn read_file(path: &Path, max_bytes: u64) -> Result<String> {
    if !path.exists() {
        return Err(anyhow::anyhow!("file not found: {}", path.display()));
    }

    if !path.is_file() {
        return Err(anyhow::anyhow!("not a regular file: {}", path.display()));
    }

    let metadata = fs::metadata(path)
        .await
        .with_context(|| format!("failed to read metadata of {}", path.display()))?;
    if metadata.len() > max_bytes {
        return Err(anyhow::anyhow!(
            "{} is too large ({} bytes, limit {} bytes)",
            path.display(),
            metadata.len(),
            max_bytes
        ));
    }

    let file = fs::File::open(path).await.map_err(|e| {
        let message = match e.kind() {
            std::io::ErrorKind::PermissionDenied => {
                format!("permission denied: {}", path.display())
            }
            _ => format!("failed to open {}: {}", path.display(), e),
        };
        anyhow::anyhow!(message)
    })?;

    let content = read_limited(file, max_bytes, &path.display().to_string()).await?;
    log::info!("Read {} bytes from {}", content.len(), path.display());
    Ok(content)
}

/// Reads at most `max_bytes` from `reader` as UTF-8 text.
pub async fn read_limited<R>(reader: R, max_bytes: u64, source: &str) -> Result<String>
where
    R: AsyncRead + Unpin,
{
    let mut buffer = Vec::new();
    reader
        .take(max_bytes.saturating_add(1))
        .read_to_end(&mut buffer)
        .await
        .with_context(|| format!("failed to read {}", source))?;

    if buffer.len() as u64 > max_bytes {
        return Err(anyhow::anyhow!(
            "{} exceeds the input limit of {} bytes",
            source,
            max_bytes
        ));
    }

    let content = String::from_utf8(buffer)
        .map_err(|_| anyhow::anyhow!("{} is not valid UTF-8", source))?;

    if content.contains('\0') {
        return Err(anyhow::anyhow!("{} looks like binary data", source));
    }

    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[tokio::test]
    async fn test_read_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "# Title\n\nBody").unwrap();

        let content = read_file(temp_file.path(), 1024).await.unwrap();
        assert_eq!(content, "# Title\n\nBody");
    }

    #[tokio::test]
    async fn test_missing_file_and_directory_are_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing.md");

        let err = read_file(&missing, 1024).await.unwrap_err();
        assert!(err.to_string().contains("file not found"));

        let err = read_file(temp_dir.path(), 1024).await.unwrap_err();
        assert!(err.to_string().contains("not a regular file"));
    }

    #[tokio::test]
    async fn test_size_limit() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "0123456789").unwrap();

        assert!(read_file(temp_file.path(), 10).await.is_ok());
        let err = read_file(temp_file.path(), 9).await.unwrap_err();
        assert!(err.to_string().contains("too large"));

        let err = read_limited(&b"0123456789"[..], 4, "stdin").await.unwrap_err();
        assert!(err.to_string().contains("exceeds the input limit"));
    }

    #[tokio::test]
    async fn test_binary_and_invalid_utf8_are_rejected() {
        let err = read_limited(&b"a\0b"[..], 64, "stdin").await.unwrap_err();
        assert!(err.to_string().contains("binary"));

        let err = read_limited(&[0xffu8, 0xfe][..], 64, "stdin").await.unwrap_err();
        assert!(err.to_string().contains("UTF-8"));
    }

    #[tokio::test]
    async fn test_read_input_prefers_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        write!(temp_file, "<p>x</p>").unwrap();

        let content = read_input(Some(temp_file.path()), 1024).await.unwrap();
        assert_eq!(content, "<p>x</p>");
    }
}
