//! Content-addressable blob storage

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use dispatch_core::{ImageTransport, OrderId, PendingImage, UploadedImage};
use tokio::io::AsyncReadExt;
use tracing::debug;

use crate::{Result, StorageError};

const URL_SCHEME: &str = "blob://";
const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;
const DEFAULT_MAX_BYTES: u64 = 10 * 1024 * 1024;

/// Blob store for item photos.
///
/// Uploading an image copies it into the store under its BLAKE3 hash and
/// hands back a `blob://<hash>` URL.
pub struct BlobStore {
    root: PathBuf,
    chunk_size: usize,
    max_bytes: u64,
}

impl BlobStore {
    pub fn new(root: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_bytes: DEFAULT_MAX_BYTES,
        })
    }

    /// Bytes read between progress reports
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Store content and return its hash
    pub async fn store(&self, content: &[u8]) -> Result<String> {
        let hash = blake3::hash(content).to_hex().to_string();
        self.write_blob(&hash, content).await?;
        Ok(hash)
    }

    /// Copy a file into the store, reporting progress as it is read
    pub async fn store_file(
        &self,
        path: &Path,
        on_progress: &(dyn Fn(u8) + Send + Sync),
    ) -> Result<String> {
        let mut file = tokio::fs::File::open(path).await?;
        let size = file.metadata().await?.len();
        if size > self.max_bytes {
            return Err(StorageError::ImageTooLarge {
                path: path.display().to_string(),
                size,
                limit: self.max_bytes,
            });
        }

        on_progress(0);
        let mut hasher = blake3::Hasher::new();
        let mut content = Vec::with_capacity(size as usize);
        let mut chunk = vec![0u8; self.chunk_size];
        loop {
            let read = file.read(&mut chunk).await?;
            if read == 0 {
                break;
            }
            hasher.update(&chunk[..read]);
            content.extend_from_slice(&chunk[..read]);
            if size > 0 {
                let pct = (content.len() as u64 * 99 / size).min(99) as u8;
                on_progress(pct);
            }
        }

        let hash = hasher.finalize().to_hex().to_string();
        self.write_blob(&hash, &content).await?;
        on_progress(100);
        Ok(hash)
    }

    /// Retrieve content by hash
    pub async fn retrieve(&self, hash: &str) -> Result<Vec<u8>> {
        let path = self.path_for_hash(hash);
        if !path.exists() {
            return Err(StorageError::BlobNotFound(hash.to_string()));
        }
        Ok(tokio::fs::read(path).await?)
    }

    /// Check if blob exists
    pub fn exists(&self, hash: &str) -> bool {
        self.path_for_hash(hash).exists()
    }

    pub fn url_for(hash: &str) -> String {
        format!("{URL_SCHEME}{hash}")
    }

    /// URL `content` would be stored under
    pub fn url_for_content(content: &[u8]) -> String {
        Self::url_for(&blake3::hash(content).to_hex())
    }

    /// Hash behind a `blob://` URL
    pub fn hash_from_url(url: &str) -> Option<&str> {
        url.strip_prefix(URL_SCHEME).filter(|h| !h.is_empty())
    }

    async fn write_blob(&self, hash: &str, content: &[u8]) -> Result<()> {
        let path = self.path_for_hash(hash);
        if path.exists() {
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, content).await?;
        debug!(hash, bytes = content.len(), "stored blob");
        Ok(())
    }

    /// Format: {root}/blake3/{hash[0:2]}/{hash}
    fn path_for_hash(&self, hash: &str) -> PathBuf {
        let shard = hash.get(..2).unwrap_or(hash);
        self.root.join("blake3").join(shard).join(hash)
    }
}

#[async_trait]
impl ImageTransport for BlobStore {
    async fn upload_item_image(
        &self,
        order_id: &OrderId,
        item_index: usize,
        image: &PendingImage,
        on_progress: &(dyn Fn(u8) + Send + Sync),
    ) -> anyhow::Result<UploadedImage> {
        let hash = self.store_file(image.path(), on_progress).await?;
        debug!(
            order_id = %order_id,
            item_index,
            file = %image.file_name(),
            hash = %hash,
            "uploaded item image"
        );
        Ok(UploadedImage {
            url: Self::url_for(&hash),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_sharding() {
        let dir = tempfile::tempdir().unwrap();
        let store = BlobStore::new(dir.path().to_path_buf()).unwrap();
        let path = store.path_for_hash("abcdef");
        assert!(path.ends_with("blake3/ab/abcdef"));
    }

    #[test]
    fn test_url_round_trip() {
        let url = BlobStore::url_for("abc123");
        assert_eq!(url, "blob://abc123");
        assert_eq!(BlobStore::hash_from_url(&url), Some("abc123"));
        assert_eq!(BlobStore::hash_from_url("https://x/y.jpg"), None);
        assert_eq!(BlobStore::hash_from_url("blob://"), None);
        assert_eq!(
            BlobStore::url_for_content(b"abc"),
            BlobStore::url_for(&blake3::hash(b"abc").to_hex())
        );
    }
}
