use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::primitives::ByteStream;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object '{0}' not found")]
    NotFound(String),

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
}

// 1. StorageService Contract
/// StorageService
///
/// Object storage used for resumes and chat transcripts. Keys are `/`-separated paths such
/// as `resumes/resume-1700000000000-42.pdf`; every implementation sanitizes them before use.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Prepares the backend (creates the upload directory or bucket). Safe to call repeatedly.
    async fn ensure_ready(&self) -> Result<(), StorageError>;

    async fn put(&self, key: &str, content_type: &str, bytes: Vec<u8>) -> Result<(), StorageError>;

    /// Fails with `StorageError::NotFound` when the key is absent.
    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// StorageState
///
/// The concrete type used to share the storage service across the application state.
pub type StorageState = Arc<dyn StorageService>;

/// sanitize_key
///
/// Drops empty, `.` and `..` segments so a key can never climb out of the storage root.
pub fn sanitize_key(key: &str) -> String {
    key.split(['/', '\\'])
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

// 2. Local disk (Env::Local)
/// LocalDiskStorage
///
/// Stores objects as plain files under `root`.
#[derive(Clone, Debug)]
pub struct LocalDiskStorage {
    root: PathBuf,
}

impl LocalDiskStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let clean = sanitize_key(key);
        if clean.is_empty() {
            return Err(StorageError::NotFound(key.to_string()));
        }
        Ok(self.root.join(clean))
    }
}

#[async_trait]
impl StorageService for LocalDiskStorage {
    async fn ensure_ready(&self) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    async fn put(&self, key: &str, _content_type: &str, bytes: Vec<u8>) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

// 3. S3-compatible object storage (Env::Production)
/// S3StorageClient
///
/// Talks to any S3-compatible endpoint (AWS, MinIO, Supabase Storage).
/// `force_path_style(true)` is required by MinIO and Supabase gateways.
#[derive(Clone)]
pub struct S3StorageClient {
    client: s3::Client,
    bucket_name: String,
}

impl S3StorageClient {
    pub fn new(
        endpoint: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
        bucket: &str,
    ) -> Self {
        let credentials =
            s3::config::Credentials::new(access_key, secret_key, None, None, "static");

        let config = s3::Config::builder()
            .credentials_provider(credentials)
            .endpoint_url(endpoint)
            .region(s3::config::Region::new(region.to_string()))
            .behavior_version_latest()
            .force_path_style(true)
            .build();

        Self {
            client: s3::Client::from_conf(config),
            bucket_name: bucket.to_string(),
        }
    }
}

#[async_trait]
impl StorageService for S3StorageClient {
    /// CreateBucket is idempotent from our point of view: an "already owned" failure is fine.
    async fn ensure_ready(&self) -> Result<(), StorageError> {
        if let Err(e) = self
            .client
            .create_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await
        {
            tracing::debug!(bucket = %self.bucket_name, error = %e, "create_bucket skipped");
        }
        Ok(())
    }

    async fn put(&self, key: &str, content_type: &str, bytes: Vec<u8>) -> Result<(), StorageError> {
        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(sanitize_key(key))
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket_name)
            .key(sanitize_key(key))
            .send()
            .await
            .map_err(|e| {
                let service_error = e.into_service_error();
                if service_error.is_no_such_key() {
                    StorageError::NotFound(key.to_string())
                } else {
                    StorageError::Backend(service_error.to_string())
                }
            })?;

        let data = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(data.into_bytes().to_vec())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.client
            .delete_object()
            .bucket(&self.bucket_name)
            .key(sanitize_key(key))
            .send()
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(())
    }
}

// 4. In-memory mock (tests)
/// MockStorageService
///
/// Keeps objects in memory. Clones share the same object map so a test can inspect what a
/// handler stored.
#[derive(Clone, Default)]
pub struct MockStorageService {
    /// When true, every operation fails with a backend error.
    pub should_fail: bool,
    objects: Arc<Mutex<HashMap<String, (String, Vec<u8>)>>>,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Sorted keys of everything currently stored.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .objects
            .lock()
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    pub fn content_type(&self, key: &str) -> Option<String> {
        self.objects
            .lock()
            .ok()
            .and_then(|objects| objects.get(key).map(|(ct, _)| ct.clone()))
    }

    fn check(&self) -> Result<(), StorageError> {
        if self.should_fail {
            return Err(StorageError::Backend(
                "Mock Storage Error: Simulation requested".to_string(),
            ));
        }
        Ok(())
    }

    fn objects(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<String, (String, Vec<u8>)>>, StorageError> {
        self.objects
            .lock()
            .map_err(|_| StorageError::Backend("mock storage lock poisoned".to_string()))
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_ready(&self) -> Result<(), StorageError> {
        self.check()
    }

    async fn put(&self, key: &str, content_type: &str, bytes: Vec<u8>) -> Result<(), StorageError> {
        self.check()?;
        self.objects()?
            .insert(sanitize_key(key), (content_type.to_string(), bytes));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        self.check()?;
        self.objects()?
            .get(&sanitize_key(key))
            .map(|(_, bytes)| bytes.clone())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        self.check()?;
        self.objects()?.remove(&sanitize_key(key));
        Ok(())
    }
}

// 5. Resume upload policy

/// Allowed resume MIME types and the extension stored for each.
const RESUME_TYPES: [(&str, &str); 3] = [
    ("application/pdf", "pdf"),
    ("application/msword", "doc"),
    (
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "docx",
    ),
];

/// Extension for an accepted resume MIME type, `None` for anything else.
pub fn resume_extension(content_type: &str) -> Option<&'static str> {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    RESUME_TYPES
        .iter()
        .find(|(allowed, _)| *allowed == mime)
        .map(|(_, ext)| *ext)
}

/// Guesses a resume MIME type from a file name, for clients that send none.
pub fn mime_from_filename(filename: &str) -> Option<&'static str> {
    let ext = Path::new(filename)
        .extension()?
        .to_str()?
        .to_ascii_lowercase();
    RESUME_TYPES
        .iter()
        .find(|(_, allowed)| *allowed == ext)
        .map(|(mime, _)| *mime)
}

/// Storage key for a new resume: `resumes/resume-<millis>-<n>.<ext>`.
pub fn resume_key(extension: &str) -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    // uuid v4 supplies the random suffix.
    let suffix = uuid::Uuid::new_v4().as_u128() % 1_000_000_000;
    format!("resumes/resume-{millis}-{suffix}.{extension}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_traversal() {
        assert_eq!(sanitize_key("../../etc/passwd"), "etc/passwd");
        assert_eq!(sanitize_key("resumes/./a.pdf"), "resumes/a.pdf");
        assert_eq!(sanitize_key("..\\..\\secret"), "secret");
    }

    #[test]
    fn resume_policy() {
        assert_eq!(resume_extension("application/pdf"), Some("pdf"));
        assert_eq!(resume_extension("Application/PDF; charset=binary"), Some("pdf"));
        assert_eq!(resume_extension("image/png"), None);
        assert_eq!(mime_from_filename("cv.DOCX"), Some(RESUME_TYPES[2].0));
        assert_eq!(mime_from_filename("cv"), None);
    }

    #[test]
    fn resume_key_shape() {
        let key = resume_key("pdf");
        assert!(key.starts_with("resumes/resume-"));
        assert!(key.ends_with(".pdf"));
        assert_eq!(key.matches('-').count(), 2);
    }

    #[tokio::test]
    async fn mock_round_trip_and_failure() {
        let storage = MockStorageService::new();
        storage
            .put("chats/chat_1.json", "application/json", b"{}".to_vec())
            .await
            .unwrap();
        assert_eq!(storage.keys(), vec!["chats/chat_1.json"]);
        assert_eq!(storage.get("chats/chat_1.json").await.unwrap(), b"{}");
        storage.delete("chats/chat_1.json").await.unwrap();
        assert!(matches!(
            storage.get("chats/chat_1.json").await,
            Err(StorageError::NotFound(_))
        ));

        let failing = MockStorageService::new_failing();
        assert!(failing.put("x", "text/plain", vec![]).await.is_err());
    }
}
