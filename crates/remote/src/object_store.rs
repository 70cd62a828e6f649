//! Object storage for recipe and profile images.
//!
//! Uploads are opaque to the rest of the system: the store receives raw bytes
//! and hands back a URL string that ends up in `Recipe::image_url`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::fs;
use uuid::Uuid;

use crate::error::UploadError;

/// Folder for images attached to recipes.
pub const RECIPE_IMAGES: &str = "recipe_images";
/// Folder for profile avatars.
pub const PROFILE_IMAGES: &str = "profile_images";

/// Raw image picked by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

impl ImageUpload {
    pub fn new(bytes: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            bytes,
            content_type: content_type.into(),
        }
    }

    fn extension(&self) -> &'static str {
        match self.content_type.as_str() {
            "image/jpeg" | "image/jpg" => "jpg",
            "image/png" => "png",
            "image/webp" => "webp",
            "image/gif" => "gif",
            _ => "bin",
        }
    }
}

/// Object upload contract.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `image` under `folder` with a fresh unique name and return a URL
    /// the remote collection can reference.
    async fn upload(&self, folder: &str, image: ImageUpload) -> Result<String, UploadError>;
}

fn object_key(folder: &str, image: &ImageUpload) -> String {
    format!("{}/{}.{}", folder, Uuid::now_v7().simple(), image.extension())
}

fn ensure_not_empty(image: &ImageUpload) -> Result<(), UploadError> {
    if image.bytes.is_empty() {
        return Err(UploadError::failed("image is empty"));
    }
    Ok(())
}

/// In-memory bucket for tests/dev.
#[derive(Debug)]
pub struct InMemoryObjectStore {
    base_url: String,
    objects: Mutex<HashMap<String, ImageUpload>>,
    fail: Mutex<bool>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::with_base_url("memory://uploads/")
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            objects: Mutex::new(HashMap::new()),
            fail: Mutex::new(false),
        }
    }

    /// Make every upload fail until switched off.
    pub fn set_failing(&self, failing: bool) {
        if let Ok(mut f) = self.fail.lock() {
            *f = failing;
        }
    }

    pub fn len(&self) -> usize {
        self.objects.lock().map(|o| o.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up an uploaded object by the URL `upload` returned.
    pub fn get_by_url(&self, url: &str) -> Option<ImageUpload> {
        let key = url.strip_prefix(&self.base_url)?;
        self.objects.lock().ok()?.get(key).cloned()
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn upload(&self, folder: &str, image: ImageUpload) -> Result<String, UploadError> {
        if self.fail.lock().map(|f| *f).unwrap_or(false) {
            return Err(UploadError::failed("object store rejected the upload"));
        }
        ensure_not_empty(&image)?;

        let key = object_key(folder, &image);
        let mut objects = self
            .objects
            .lock()
            .map_err(|_| UploadError::failed("lock poisoned"))?;
        objects.insert(key.clone(), image);
        Ok(format!("{}{}", self.base_url, key))
    }
}

/// Filesystem-backed store; files are served under `url_prefix`.
#[derive(Debug, Clone)]
pub struct LocalObjectStore {
    /// Root directory for all uploads (e.g., "./data/uploads")
    root: PathBuf,
    /// Public URL prefix (e.g., "/static/uploads")
    url_prefix: String,
}

impl LocalObjectStore {
    pub fn new(root: PathBuf, url_prefix: impl Into<String>) -> Self {
        Self {
            root,
            url_prefix: url_prefix.into(),
        }
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn upload(&self, folder: &str, image: ImageUpload) -> Result<String, UploadError> {
        ensure_not_empty(&image)?;

        let key = object_key(folder, &image);
        let path = self.root.join(&key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                UploadError::failed(format!("failed to create {}: {e}", parent.display()))
            })?;
        }
        fs::write(&path, &image.bytes)
            .await
            .map_err(|e| UploadError::failed(format!("failed to write {}: {e}", path.display())))?;

        tracing::debug!(key = %key, bytes = image.bytes.len(), "stored upload");
        Ok(format!("{}/{}", self.url_prefix.trim_end_matches('/'), key))
    }
}
