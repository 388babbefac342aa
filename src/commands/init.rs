use crate::commands::Out;
use crate::{Config, Result};
use std::path::Path;

/// Creates the pillar home directory with a default `config.json`, an empty database and the
/// reports directory.
///
/// # Errors
/// - Returns an error if any file operation fails or if `pillar_home` is already initialized.
pub async fn init(pillar_home: &Path) -> Result<Out<()>> {
    let config = Config::create(pillar_home).await?;
    Ok(format!(
        "Successfully created the pillar directory at {}",
        config.root().display()
    )
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_init() {
        let dir = TempDir::new().unwrap();
        let home = dir.path().join("home");
        let out = init(&home).await.unwrap();
        assert!(out.message().contains("Successfully created"));
        assert!(home.join("config.json").is_file());
        assert!(init(&home).await.is_err());
    }
}
