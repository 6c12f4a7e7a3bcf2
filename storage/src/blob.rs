use std::{
    io::ErrorKind,
    path::{Component, Path, PathBuf},
};

use chrono::Utc;
use common::{env_config::StorageConfig, error::Res};
use tokio::{fs::File, io::AsyncWriteExt};
use uuid::Uuid;

/// An upload that has already been streamed into the uploads directory.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Multipart field the file arrived in.
    pub field_name: String,
    pub content_type: String,
    /// Path relative to the storage root, e.g. `uploads/galleryImages-...jpg`.
    pub path: String,
    pub size: usize,
}

/// A blob being written chunk by chunk. Either [`finish`](Self::finish) or
/// [`discard`](Self::discard) it; a dropped writer leaves a partial file.
pub struct BlobWriter {
    file: File,
    full_path: PathBuf,
    relative_path: String,
    written: usize,
}

impl BlobWriter {
    pub async fn write(&mut self, chunk: &[u8]) -> Res<()> {
        self.file.write_all(chunk).await?;
        self.written += chunk.len();
        Ok(())
    }

    /// Bytes written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Flushes the file and returns its path relative to the storage root.
    pub async fn finish(mut self) -> Res<String> {
        if let Err(err) = self.file.flush().await {
            self.discard().await;
            return Err(err.into());
        }
        log::debug!("Stored blob {} ({} bytes)", self.relative_path, self.written);
        Ok(self.relative_path)
    }

    /// Closes and removes the partial file.
    pub async fn discard(self) {
        drop(self.file);
        if let Err(err) = tokio::fs::remove_file(&self.full_path).await {
            if err.kind() != ErrorKind::NotFound {
                log::warn!("Failed to remove partial blob {}: {}", self.relative_path, err);
            }
        }
    }
}

/// Local-disk blob storage.
///
/// Files are written to `<root>/<uploads_dir>/` and referred to by paths
/// relative to `root` (`uploads/<name>`). Public URLs are the relative path
/// appended to the configured base URL.
#[derive(Debug, Clone)]
pub struct BlobStore {
    root: PathBuf,
    uploads_dir: String,
    base_url: String,
}

impl BlobStore {
    pub fn new(config: &StorageConfig) -> Self {
        BlobStore {
            root: PathBuf::from(&config.root_dir),
            uploads_dir: config.uploads_dir.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory uploaded files are written to.
    pub fn uploads_path(&self) -> PathBuf {
        self.root.join(&self.uploads_dir)
    }

    /// Creates the uploads directory if it does not exist yet.
    pub async fn ensure_dirs(&self) -> Res<()> {
        tokio::fs::create_dir_all(self.uploads_path()).await?;
        Ok(())
    }

    /// Opens a new blob under a generated unique name, e.g.
    /// `uploads/galleryImages-1700000000000-<id>.jpg`, keeping the extension
    /// of `original_name`.
    pub async fn create(&self, field_name: &str, original_name: Option<&str>) -> Res<BlobWriter> {
        let mut name = format!(
            "{}-{}-{}",
            sanitize(field_name),
            Utc::now().timestamp_millis(),
            Uuid::new_v4().simple()
        );
        if let Some(ext) = original_name.and_then(extension_of) {
            name.push_str(&ext);
        }

        self.ensure_dirs().await?;
        let full_path = self.uploads_path().join(&name);
        let file = File::create(&full_path).await?;

        Ok(BlobWriter {
            file,
            full_path,
            relative_path: format!("{}/{}", self.uploads_dir, name),
            written: 0,
        })
    }

    /// Absolute URL of a stored blob, `None` for a missing or empty path.
    pub fn url_for(&self, relative_path: Option<&str>) -> Option<String> {
        let path = relative_path?.trim();
        if path.is_empty() {
            return None;
        }
        let normalized = path.replace('\\', "/");
        Some(format!(
            "{}/{}",
            self.base_url,
            normalized.trim_start_matches('/')
        ))
    }

    /// Removes a stored blob. Missing files are ignored, and so are paths
    /// that would resolve outside the storage root.
    pub async fn delete(&self, relative_path: &str) -> Res<()> {
        let Some(path) = self.resolve(relative_path) else {
            log::warn!("Refusing to delete blob outside storage root: {}", relative_path);
            return Ok(());
        };
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                log::debug!("Deleted blob {}", relative_path);
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Best-effort removal of several blobs, used to clean up after a
    /// failed request.
    pub async fn delete_all(&self, relative_paths: &[String]) {
        for path in relative_paths {
            if let Err(err) = self.delete(path).await {
                log::warn!("Failed to remove orphaned blob {}: {}", path, err);
            }
        }
    }

    fn resolve(&self, relative_path: &str) -> Option<PathBuf> {
        let normalized = relative_path.replace('\\', "/");
        let relative = Path::new(normalized.trim_start_matches('/'));
        if relative.as_os_str().is_empty()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_)))
        {
            return None;
        }
        Some(self.root.join(relative))
    }
}

/// Extension of `file_name` including the dot, e.g. `.jpg`.
fn extension_of(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .map(|ext| format!(".{}", sanitize(ext)))
}

fn sanitize(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &Path) -> BlobStore {
        BlobStore::new(&StorageConfig {
            root_dir: dir.to_string_lossy().to_string(),
            base_url: "http://localhost:3000/".to_string(),
            ..Default::default()
        })
    }

    async fn jpeg(blobs: &BlobStore, name: Option<&str>) -> String {
        let mut writer = blobs.create("thumb_Resized_image", name).await.unwrap();
        writer.write(&[0xFF, 0xD8]).await.unwrap();
        writer.write(&[0xFF]).await.unwrap();
        writer.finish().await.unwrap()
    }

    #[tokio::test]
    async fn chunks_are_written_under_a_generated_name() {
        let dir = tempfile::tempdir().unwrap();
        let blobs = store_in(dir.path());

        let path = jpeg(&blobs, Some("car.front.JPG")).await;
        assert!(path.starts_with("uploads/thumb_Resized_image-"));
        assert!(path.ends_with(".JPG"));

        let written = std::fs::read(dir.path().join(&path)).unwrap();
        assert_eq!(written, vec![0xFF, 0xD8, 0xFF]);
    }

    #[tokio::test]
    async fn names_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let blobs = store_in(dir.path());
        let a = jpeg(&blobs, Some("a.png")).await;
        let b = jpeg(&blobs, Some("a.png")).await;
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn no_original_name_means_no_extension() {
        let dir = tempfile::tempdir().unwrap();
        let blobs = store_in(dir.path());
        let path = jpeg(&blobs, None).await;
        assert!(!path.rsplit('/').next().unwrap().contains('.'));
    }

    #[tokio::test]
    async fn discarded_writers_leave_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let blobs = store_in(dir.path());

        let mut writer = blobs.create("galleryImages", Some("big.jpg")).await.unwrap();
        writer.write(&[0; 512]).await.unwrap();
        assert_eq!(writer.written(), 512);
        writer.discard().await;

        assert_eq!(std::fs::read_dir(blobs.uploads_path()).unwrap().count(), 0);
    }

    #[test]
    fn url_for_normalizes_separators() {
        let blobs = store_in(Path::new("public"));
        assert_eq!(
            blobs.url_for(Some("uploads\\a.jpg")).as_deref(),
            Some("http://localhost:3000/uploads/a.jpg")
        );
        assert_eq!(blobs.url_for(Some("")), None);
        assert_eq!(blobs.url_for(None), None);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let blobs = store_in(dir.path());
        let path = jpeg(&blobs, Some("a.jpg")).await;

        blobs.delete(&path).await.unwrap();
        assert!(!dir.path().join(&path).exists());
        blobs.delete(&path).await.unwrap();
    }

    #[tokio::test]
    async fn delete_all_skips_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let blobs = store_in(dir.path());
        let kept = jpeg(&blobs, Some("a.jpg")).await;
        let gone = jpeg(&blobs, Some("b.jpg")).await;

        blobs
            .delete_all(&[gone.clone(), "uploads/missing.jpg".to_string(), gone.clone()])
            .await;
        assert!(!dir.path().join(&gone).exists());
        assert!(dir.path().join(&kept).exists());
    }

    #[tokio::test]
    async fn delete_ignores_paths_escaping_root() {
        let dir = tempfile::tempdir().unwrap();
        let outside = dir.path().join("keep.txt");
        std::fs::write(&outside, b"x").unwrap();

        let root = dir.path().join("public");
        let blobs = store_in(&root);
        blobs.delete("../keep.txt").await.unwrap();
        assert!(outside.exists());
    }
}
