use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Create a directory and all of its parents if they do not exist.
pub(crate) async fn make_dir(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    tokio::fs::create_dir_all(path)
        .await
        .with_context(|| format!("Unable to create directory at {}", path.display()))
}

pub(crate) async fn canonicalize(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    tokio::fs::canonicalize(path)
        .await
        .with_context(|| format!("Unable to canonicalize the path {}", path.display()))
}

/// Fails if `path` is not a readable directory.
pub(crate) async fn read_dir(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let _ = tokio::fs::read_dir(path)
        .await
        .with_context(|| format!("Unable to read directory {}", path.display()))?;
    Ok(())
}

/// Write a file.
pub(crate) async fn write(path: impl AsRef<Path>, contents: impl AsRef<[u8]>) -> Result<()> {
    let path = path.as_ref();
    tokio::fs::write(path, contents)
        .await
        .with_context(|| format!("Unable to write to {}", path.display()))
}

pub(crate) async fn remove_file(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    tokio::fs::remove_file(path)
        .await
        .with_context(|| format!("Unable to remove {}", path.display()))
}

/// Read a file to a `String`.
pub(crate) async fn read(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read file at {}", path.display()))
}

/// Deserialize a JSON file into type `T`.
pub(crate) async fn deserialize<T>(path: impl AsRef<Path>) -> Result<T>
where
    T: DeserializeOwned,
{
    let path = path.as_ref();
    let content = read(path).await?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse JSON file at {}", path.display()))
}

/// A new random identifier for an entry or an installment group.
pub(crate) fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_read_deserialize() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("data.json");
        make_dir(path.parent().unwrap()).await.unwrap();
        write(&path, r#"{"a": 1}"#).await.unwrap();
        assert_eq!(read(&path).await.unwrap(), r#"{"a": 1}"#);
        let value: serde_json::Value = deserialize(&path).await.unwrap();
        assert_eq!(value["a"], 1);
    }

    #[tokio::test]
    async fn test_read_dir_missing() {
        let dir = TempDir::new().unwrap();
        assert!(read_dir(dir.path()).await.is_ok());
        assert!(read_dir(dir.path().join("nope")).await.is_err());
    }

    #[test]
    fn test_generate_id_is_unique() {
        assert_ne!(generate_id(), generate_id());
    }
}
