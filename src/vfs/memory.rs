//! In-memory filesystem implementation for tests.

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use crate::error::{AccordError, AccordResult};

use super::{ContentEncoding, FileMetadata, Filesystem};

/// In-memory filesystem backed by a `BTreeMap`.
///
/// Thread-safe via `RwLock`. Content reads are counted so tests can assert
/// that a vetoed or denied requirement never touched the primitive.
pub struct MemoryFs {
    files: RwLock<BTreeMap<String, String>>,
    dirs: RwLock<BTreeSet<String>>,
    reads: AtomicUsize,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self {
            files: RwLock::new(BTreeMap::new()),
            dirs: RwLock::new(BTreeSet::new()),
            reads: AtomicUsize::new(0),
        }
    }

    /// Register a file and its parent directories.
    pub fn add_file(&self, path: &str, content: &str) {
        let normalized = Self::normalize(path);
        {
            let mut dirs = self.dirs.write().unwrap();
            let parts: Vec<&str> = normalized.split('/').skip(1).collect();
            for i in 1..parts.len() {
                dirs.insert(format!("/{}", parts[..i].join("/")));
            }
        }
        let mut files = self.files.write().unwrap();
        files.insert(normalized, content.to_string());
    }

    /// Number of `read_content` calls served so far.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Collapse duplicate separators and strip any trailing slash.
    fn normalize(path: &str) -> String {
        let mut out = String::with_capacity(path.len());
        for part in path.split('/').filter(|p| !p.is_empty()) {
            out.push('/');
            out.push_str(part);
        }
        if out.is_empty() {
            "/".to_string()
        } else {
            out
        }
    }

    fn not_found(path: &str) -> AccordError {
        AccordError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Path not found: {path}"),
        ))
    }
}

impl Default for MemoryFs {
    fn default() -> Self {
        Self::new()
    }
}

impl Filesystem for MemoryFs {
    fn read_content<'a>(
        &'a self,
        path: &'a str,
    ) -> Pin<Box<dyn Future<Output = AccordResult<(String, ContentEncoding)>> + Send + 'a>> {
        Box::pin(async move {
            let normalized = Self::normalize(path);
            let files = self.files.read().unwrap();
            let content = files
                .get(&normalized)
                .cloned()
                .ok_or_else(|| Self::not_found(&normalized))?;
            self.reads.fetch_add(1, Ordering::SeqCst);
            Ok((content, ContentEncoding::Text))
        })
    }

    fn read_metadata<'a>(
        &'a self,
        path: &'a str,
    ) -> Pin<Box<dyn Future<Output = AccordResult<FileMetadata>> + Send + 'a>> {
        Box::pin(async move {
            let normalized = Self::normalize(path);

            let files = self.files.read().unwrap();
            if let Some(content) = files.get(&normalized) {
                return Ok(FileMetadata {
                    path: normalized,
                    size: content.len() as u64,
                    modified: None,
                    owner: None,
                    group: None,
                    is_directory: false,
                });
            }

            let dirs = self.dirs.read().unwrap();
            if dirs.contains(&normalized) {
                return Ok(FileMetadata {
                    path: normalized,
                    size: 0,
                    modified: None,
                    owner: None,
                    group: None,
                    is_directory: true,
                });
            }

            Err(Self::not_found(&normalized))
        })
    }

    fn read_dir<'a>(
        &'a self,
        path: &'a str,
    ) -> Pin<Box<dyn Future<Output = AccordResult<Vec<String>>> + Send + 'a>> {
        Box::pin(async move {
            let normalized = Self::normalize(path);
            let files = self.files.read().unwrap();
            let dirs = self.dirs.read().unwrap();

            if files.contains_key(&normalized) {
                return Err(AccordError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotADirectory,
                    format!("Not a directory: {normalized}"),
                )));
            }
            if !dirs.contains(&normalized) {
                return Err(Self::not_found(&normalized));
            }

            let prefix = format!("{normalized}/");
            let mut names = BTreeSet::new();
            for key in files.keys().chain(dirs.iter()) {
                if let Some(rest) = key.strip_prefix(&prefix) {
                    if let Some(name) = rest.split('/').next() {
                        if !name.is_empty() {
                            names.insert(name.to_string());
                        }
                    }
                }
            }
            Ok(names.into_iter().collect())
        })
    }
}
