use jobboard_api::storage::{
    LocalDiskStorage, MockStorageService, S3StorageClient, StorageError, StorageService,
};
use tempfile::TempDir;

#[cfg(test)]
mod local_disk_tests {
    use super::*;

    fn storage() -> (TempDir, LocalDiskStorage) {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalDiskStorage::new(dir.path().join("uploads"));
        (dir, storage)
    }

    #[tokio::test]
    async fn test_ensure_ready_creates_root() {
        let (_dir, storage) = storage();
        assert!(!storage.root().exists());

        storage.ensure_ready().await.unwrap();
        assert!(storage.root().is_dir());

        // Idempotent.
        storage.ensure_ready().await.unwrap();
    }

    #[tokio::test]
    async fn test_put_get_delete() {
        let (_dir, storage) = storage();
        let key = "resumes/resume-1700000000000-42.pdf";

        storage
            .put(key, "application/pdf", b"%PDF".to_vec())
            .await
            .unwrap();
        assert!(storage.root().join(key).is_file());
        assert_eq!(storage.get(key).await.unwrap(), b"%PDF");

        storage.delete(key).await.unwrap();
        assert!(!storage.root().join(key).exists());
        // Deleting twice is not an error.
        storage.delete(key).await.unwrap();
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let (_dir, storage) = storage();
        storage.ensure_ready().await.unwrap();

        let result = storage.get("resumes/nope.pdf").await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_traversal_stays_inside_root() {
        let (dir, storage) = storage();

        storage
            .put("../../escape.txt", "text/plain", b"x".to_vec())
            .await
            .unwrap();

        assert!(storage.root().join("escape.txt").is_file());
        assert!(!dir.path().join("escape.txt").exists());
        assert_eq!(storage.get("../escape.txt").await.unwrap(), b"x");
    }

    #[tokio::test]
    async fn test_empty_key_is_rejected() {
        let (_dir, storage) = storage();

        let result = storage.put("../..", "text/plain", b"x".to_vec()).await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }
}

#[cfg(test)]
mod mock_tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_success() {
        let mock = MockStorageService::new();
        mock.put("chats/chat_1.json", "application/json", b"[]".to_vec())
            .await
            .unwrap();

        assert_eq!(mock.keys(), vec!["chats/chat_1.json"]);
        assert_eq!(
            mock.content_type("chats/chat_1.json").as_deref(),
            Some("application/json")
        );
    }

    #[tokio::test]
    async fn test_mock_failure() {
        let mock = MockStorageService::new_failing();
        assert!(mock.ensure_ready().await.is_err());
        assert!(mock.put("a.pdf", "application/pdf", vec![]).await.is_err());
        assert!(matches!(
            mock.get("a.pdf").await,
            Err(StorageError::Backend(_))
        ));
    }

    #[tokio::test]
    async fn test_mock_sanitization() {
        let mock = MockStorageService::new();
        mock.put("../../etc/passwd", "text/plain", b"root".to_vec())
            .await
            .unwrap();

        assert_eq!(mock.keys(), vec!["etc/passwd"]);
        assert!(mock.keys().iter().all(|k| !k.contains("..")));
    }

    #[tokio::test]
    async fn test_clones_share_objects() {
        let mock = MockStorageService::new();
        let handle = mock.clone();
        handle
            .put("resumes/a.pdf", "application/pdf", b"a".to_vec())
            .await
            .unwrap();

        assert_eq!(mock.get("resumes/a.pdf").await.unwrap(), b"a");
    }
}

#[cfg(test)]
mod s3_tests {
    use super::*;

    #[tokio::test]
    async fn test_s3_client_creation() {
        let _client = S3StorageClient::new(
            "http://localhost:9000",
            "us-east-1",
            "testkey",
            "testsecret",
            "testbucket",
        );
        // Construction alone must not touch the network.
    }
}
