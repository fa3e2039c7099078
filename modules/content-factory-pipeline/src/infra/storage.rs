use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tracing::debug;

use crate::traits::BlobStorage;

/// Blob storage on the local filesystem, rooted at one directory.
pub struct LocalBlobStorage {
    root: PathBuf,
}

impl LocalBlobStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a key to a path under the root. Keys are relative and may not climb out.
    fn resolve(&self, key: &str) -> Result<PathBuf> {
        let rel = Path::new(key);
        if key.is_empty() || rel.is_absolute() {
            bail!("invalid storage key '{key}'");
        }
        for component in rel.components() {
            match component {
                Component::Normal(_) => {}
                _ => bail!("invalid storage key '{key}'"),
            }
        }
        Ok(self.root.join(rel))
    }
}

#[async_trait]
impl BlobStorage for LocalBlobStorage {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<()> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        // Write then rename so readers never see a partial bundle.
        let mut tmp = path.clone().into_os_string();
        tmp.push(".part");
        let tmp = PathBuf::from(tmp);
        tokio::fs::write(&tmp, &bytes)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("Failed to move {} into place", path.display()))?;
        debug!(key, bytes = bytes.len(), "Stored blob");
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.resolve(key)?;
        tokio::fs::read(&path)
            .await
            .with_context(|| format!("Failed to read blob '{key}'"))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.resolve(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to delete blob '{key}'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_delete_under_root() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalBlobStorage::new(dir.path());

        storage
            .put("carousels/carousel_1.zip", b"PK\x03\x04".to_vec())
            .await
            .unwrap();
        assert!(dir.path().join("carousels/carousel_1.zip").exists());
        assert!(!dir.path().join("carousels/carousel_1.zip.part").exists());
        assert_eq!(
            storage.get("carousels/carousel_1.zip").await.unwrap(),
            b"PK\x03\x04".to_vec()
        );

        storage.delete("carousels/carousel_1.zip").await.unwrap();
        assert!(storage.get("carousels/carousel_1.zip").await.is_err());
        // Deleting twice is fine.
        storage.delete("carousels/carousel_1.zip").await.unwrap();
    }

    #[tokio::test]
    async fn sibling_keys_stored_concurrently_keep_their_own_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalBlobStorage::new(dir.path());
        let zip = vec![b'z'; 256 * 1024];
        let png = vec![b'p'; 256 * 1024];

        let (a, b) = tokio::join!(
            storage.put("carousels/carousel_3.zip", zip.clone()),
            storage.put("carousels/carousel_3.png", png.clone()),
        );
        a.unwrap();
        b.unwrap();

        assert_eq!(storage.get("carousels/carousel_3.zip").await.unwrap(), zip);
        assert_eq!(storage.get("carousels/carousel_3.png").await.unwrap(), png);
        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("carousels"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|x| x == "part"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn rejects_escaping_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalBlobStorage::new(dir.path());
        assert!(storage.put("../escape.zip", vec![1]).await.is_err());
        assert!(storage.put("a/../../escape.zip", vec![1]).await.is_err());
        assert!(storage.get("/etc/passwd").await.is_err());
        assert!(storage.put("", vec![1]).await.is_err());
    }
}
