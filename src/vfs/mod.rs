//! Filesystem capability — the narrow surface the loop reads files through.
//!
//! Provides a [`Filesystem`] trait that decouples the conversation loop from
//! concrete storage. Ships with [`NativeFs`] for the real OS filesystem
//! (behind the `native` feature) and [`MemoryFs`] for tests.

use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AccordResult;

/// How file content is transported back to the LLM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentEncoding {
    Text,
    Base64,
}

/// Metadata about a filesystem entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub path: String,
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    pub is_directory: bool,
}

/// Read-only filesystem trait.
///
/// Paths are absolute strings; implementations decide what backs them.
/// Inaccessible paths fail with a not-found/permission error, never panic.
pub trait Filesystem: Send + Sync {
    /// Read a file's entire content. Non-UTF8 content is returned
    /// base64-encoded with [`ContentEncoding::Base64`].
    fn read_content<'a>(
        &'a self,
        path: &'a str,
    ) -> Pin<Box<dyn Future<Output = AccordResult<(String, ContentEncoding)>> + Send + 'a>>;

    /// Get metadata for a path.
    fn read_metadata<'a>(
        &'a self,
        path: &'a str,
    ) -> Pin<Box<dyn Future<Output = AccordResult<FileMetadata>> + Send + 'a>>;

    /// List the entry names directly under a directory.
    fn read_dir<'a>(
        &'a self,
        path: &'a str,
    ) -> Pin<Box<dyn Future<Output = AccordResult<Vec<String>>> + Send + 'a>>;
}

mod memory;
pub use memory::MemoryFs;

#[cfg(feature = "native")]
mod native;
#[cfg(feature = "native")]
pub use native::NativeFs;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_fs_read_content() {
        let fs = MemoryFs::new();
        fs.add_file("/notes/hello.txt", "world");
        let (content, encoding) = fs.read_content("/notes/hello.txt").await.unwrap();
        assert_eq!(content, "world");
        assert_eq!(encoding, ContentEncoding::Text);
    }

    #[tokio::test]
    async fn memory_fs_read_nonexistent_errors() {
        let fs = MemoryFs::new();
        assert!(fs.read_content("/nope.txt").await.is_err());
        assert!(fs.read_metadata("/nope.txt").await.is_err());
    }

    #[tokio::test]
    async fn memory_fs_metadata_file() {
        let fs = MemoryFs::new();
        fs.add_file("/f.txt", "hello");
        let meta = fs.read_metadata("/f.txt").await.unwrap();
        assert_eq!(meta.size, 5);
        assert!(!meta.is_directory);
        assert_eq!(meta.path, "/f.txt");
    }

    #[tokio::test]
    async fn memory_fs_metadata_dir() {
        let fs = MemoryFs::new();
        fs.add_file("/dir/a.txt", "a");
        let meta = fs.read_metadata("/dir").await.unwrap();
        assert!(meta.is_directory);
    }

    #[tokio::test]
    async fn memory_fs_read_dir() {
        let fs = MemoryFs::new();
        fs.add_file("/dir/a.txt", "a");
        fs.add_file("/dir/b.txt", "b");
        fs.add_file("/dir/sub/c.txt", "c");

        let names = fs.read_dir("/dir").await.unwrap();
        assert_eq!(names, vec!["a.txt", "b.txt", "sub"]);
    }

    #[tokio::test]
    async fn memory_fs_read_dir_on_file_errors() {
        let fs = MemoryFs::new();
        fs.add_file("/f.txt", "x");
        assert!(fs.read_dir("/f.txt").await.is_err());
    }

    #[tokio::test]
    async fn memory_fs_counts_reads() {
        let fs = MemoryFs::new();
        fs.add_file("/f.txt", "x");
        assert_eq!(fs.read_count(), 0);
        fs.read_content("/f.txt").await.unwrap();
        fs.read_content("/f.txt").await.unwrap();
        assert_eq!(fs.read_count(), 2);
    }

    #[cfg(feature = "native")]
    #[tokio::test]
    async fn native_fs_read_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.txt");
        std::fs::write(&path, "native content").unwrap();

        let fs = NativeFs::new();
        let (content, encoding) = fs.read_content(path.to_str().unwrap()).await.unwrap();
        assert_eq!(content, "native content");
        assert_eq!(encoding, ContentEncoding::Text);
    }

    #[cfg(feature = "native")]
    #[tokio::test]
    async fn native_fs_binary_content_is_base64() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob.bin");
        std::fs::write(&path, [0u8, 159, 146, 150]).unwrap();

        let fs = NativeFs::new();
        let (content, encoding) = fs.read_content(path.to_str().unwrap()).await.unwrap();
        assert_eq!(encoding, ContentEncoding::Base64);
        use base64::Engine as _;
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(content)
            .unwrap();
        assert_eq!(decoded, vec![0u8, 159, 146, 150]);
    }

    #[cfg(feature = "native")]
    #[tokio::test]
    async fn native_fs_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meta.txt");
        std::fs::write(&path, "12345").unwrap();

        let fs = NativeFs::new();
        let meta = fs.read_metadata(path.to_str().unwrap()).await.unwrap();
        assert_eq!(meta.size, 5);
        assert!(!meta.is_directory);
        assert!(meta.modified.is_some());

        let dir_meta = fs
            .read_metadata(dir.path().to_str().unwrap())
            .await
            .unwrap();
        assert!(dir_meta.is_directory);
    }

    #[cfg(feature = "native")]
    #[tokio::test]
    async fn native_fs_read_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "a").unwrap();
        std::fs::write(dir.path().join("b.txt"), "b").unwrap();

        let fs = NativeFs::new();
        let names = fs.read_dir(dir.path().to_str().unwrap()).await.unwrap();
        assert_eq!(names, vec!["a.txt", "b.txt"]);
    }

    #[cfg(feature = "native")]
    #[tokio::test]
    async fn native_fs_missing_path_errors() {
        let fs = NativeFs::new();
        assert!(fs.read_content("/definitely/not/here").await.is_err());
    }
}
