//! Widget markup collaborator.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

pub const WIDGET_ASSET: &str = "shopping-cart.html";
const WIDGET_ASSET_PREFIX: &str = "shopping-cart-";
const HTML_EXTENSION: &str = ".html";

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("asset `{name}` not found under {}", dir.display())]
    NotFound { name: String, dir: PathBuf },

    #[error("failed to read asset `{}`: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Asset {
    pub content: String,
    pub mime_type: String,
}

/// Returns raw content for a static resource name. Content is forwarded to
/// callers unmodified.
#[async_trait]
pub trait AssetSource: Send + Sync {
    async fn load(&self, name: &str) -> Result<Asset, AssetError>;
}

/// Reads assets from a directory on disk.
#[derive(Clone, Debug)]
pub struct FsAssetSource {
    dir: PathBuf,
    mime_type: String,
}

impl FsAssetSource {
    pub fn new(dir: impl Into<PathBuf>, mime_type: impl Into<String>) -> Self {
        Self { dir: dir.into(), mime_type: mime_type.into() }
    }

    /// Uses `configured` when given, otherwise the first existing of
    /// `./assets` and `../assets`.
    pub fn locate(configured: Option<&Path>) -> Self {
        let dir = match configured {
            Some(dir) => dir.to_path_buf(),
            None => ["assets", "../assets"]
                .iter()
                .map(PathBuf::from)
                .find(|candidate| candidate.is_dir())
                .unwrap_or_else(|| PathBuf::from("assets")),
        };
        Self::new(dir, crate::protocol::WIDGET_MIME_TYPE)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    async fn resolve(&self, name: &str) -> Result<PathBuf, AssetError> {
        let direct = self.dir.join(name);
        if tokio::fs::try_exists(&direct).await.unwrap_or(false) {
            return Ok(direct);
        }
        if name != WIDGET_ASSET {
            return Err(self.not_found(name));
        }

        // Versioned builds: take the lexicographically last one.
        let mut entries = tokio::fs::read_dir(&self.dir).await.map_err(|_| self.not_found(name))?;
        let mut newest: Option<String> = None;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|source| AssetError::Io { path: self.dir.clone(), source })?
        {
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if file_name.starts_with(WIDGET_ASSET_PREFIX)
                && file_name.ends_with(HTML_EXTENSION)
                && newest.as_deref().map_or(true, |current| file_name.as_str() > current)
            {
                newest = Some(file_name);
            }
        }

        match newest {
            Some(file_name) => {
                debug!(event_name = "assets.widget.fallback", file = %file_name, "using versioned widget asset");
                Ok(self.dir.join(file_name))
            }
            None => Err(self.not_found(name)),
        }
    }

    fn not_found(&self, name: &str) -> AssetError {
        AssetError::NotFound { name: name.to_string(), dir: self.dir.clone() }
    }
}

#[async_trait]
impl AssetSource for FsAssetSource {
    async fn load(&self, name: &str) -> Result<Asset, AssetError> {
        let path = self.resolve(name).await?;
        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| AssetError::Io { path: path.clone(), source })?;
        Ok(Asset { content, mime_type: self.mime_type.clone() })
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::{AssetError, AssetSource, FsAssetSource, WIDGET_ASSET};

    fn source(dir: &TempDir) -> FsAssetSource {
        FsAssetSource::new(dir.path(), "text/html+skybridge")
    }

    #[tokio::test]
    async fn loads_exact_widget_file() {
        let dir = TempDir::new().expect("tempdir");
        std::fs::write(dir.path().join(WIDGET_ASSET), "<div>cart</div>").expect("write");

        let asset = source(&dir).load(WIDGET_ASSET).await.expect("asset");
        assert_eq!(asset.content, "<div>cart</div>");
        assert_eq!(asset.mime_type, "text/html+skybridge");
    }

    #[tokio::test]
    async fn falls_back_to_last_versioned_widget() {
        let dir = TempDir::new().expect("tempdir");
        std::fs::write(dir.path().join("shopping-cart-0a1b.html"), "old").expect("write");
        std::fs::write(dir.path().join("shopping-cart-9f00.html"), "new").expect("write");
        std::fs::write(dir.path().join("shopping-cart-zz.css"), "css").expect("write");

        let asset = source(&dir).load(WIDGET_ASSET).await.expect("asset");
        assert_eq!(asset.content, "new");
    }

    #[tokio::test]
    async fn missing_asset_is_a_distinct_error() {
        let dir = TempDir::new().expect("tempdir");
        let error = source(&dir).load(WIDGET_ASSET).await.expect_err("missing");
        assert!(matches!(error, AssetError::NotFound { .. }));
    }
}
