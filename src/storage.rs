use std::path::PathBuf;

use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;

/// Where uploaded avatar images live. Keys are bare file names; the files
/// are served back under `/uploads/<key>`.
#[async_trait]
pub trait AvatarStore: Send + Sync {
    async fn put(&self, key: &str, body: Bytes) -> anyhow::Result<()>;
    async fn delete(&self, key: &str) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct DiskStorage {
    root: PathBuf,
}

impl DiskStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl AvatarStore for DiskStorage {
    async fn put(&self, key: &str, body: Bytes) -> anyhow::Result<()> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .with_context(|| format!("create uploads dir {}", self.root.display()))?;
        let path = self.root.join(key);
        tokio::fs::write(&path, &body)
            .await
            .with_context(|| format!("write upload {}", path.display()))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        let path = self.root.join(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("remove upload {}", path.display())),
        }
    }
}

pub fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ext_from_mime() {
        assert_eq!(ext_from_mime("image/jpeg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/jpg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/png"), Some("png"));
        assert_eq!(ext_from_mime("image/webp"), Some("webp"));
        assert_eq!(ext_from_mime("image/heic"), Some("heic"));
        assert_eq!(ext_from_mime("application/octet-stream"), None);
        assert_eq!(ext_from_mime("whatever/else"), None);
    }

    #[tokio::test]
    async fn put_then_delete_roundtrip() {
        let dir = std::env::temp_dir().join(format!("expensetra-store-{}", uuid::Uuid::new_v4()));
        let store = DiskStorage::new(&dir);

        store
            .put("avatar_test.png", Bytes::from_static(b"png-bytes"))
            .await
            .expect("put should succeed");
        let on_disk = tokio::fs::read(dir.join("avatar_test.png"))
            .await
            .expect("file exists");
        assert_eq!(on_disk, b"png-bytes");

        store.delete("avatar_test.png").await.expect("delete");
        assert!(!dir.join("avatar_test.png").exists());

        // deleting a missing key is not an error
        store.delete("avatar_test.png").await.expect("idempotent");

        tokio::fs::remove_dir_all(&dir).await.ok();
    }
}
