//! Native OS filesystem using `tokio::fs`.

use std::future::Future;
use std::pin::Pin;

use base64::Engine as _;
use chrono::{DateTime, Utc};

use crate::error::AccordResult;

use super::{ContentEncoding, FileMetadata, Filesystem};

/// Reads from the real filesystem. Paths are used as given (the loop hands
/// over policy-normalized absolute paths).
pub struct NativeFs;

impl NativeFs {
    pub fn new() -> Self {
        Self
    }
}

impl Default for NativeFs {
    fn default() -> Self {
        Self::new()
    }
}

impl Filesystem for NativeFs {
    fn read_content<'a>(
        &'a self,
        path: &'a str,
    ) -> Pin<Box<dyn Future<Output = AccordResult<(String, ContentEncoding)>> + Send + 'a>> {
        Box::pin(async move {
            let bytes = tokio::fs::read(path).await?;
            match String::from_utf8(bytes) {
                Ok(text) => Ok((text, ContentEncoding::Text)),
                Err(err) => {
                    let encoded =
                        base64::engine::general_purpose::STANDARD.encode(err.into_bytes());
                    Ok((encoded, ContentEncoding::Base64))
                }
            }
        })
    }

    fn read_metadata<'a>(
        &'a self,
        path: &'a str,
    ) -> Pin<Box<dyn Future<Output = AccordResult<FileMetadata>> + Send + 'a>> {
        Box::pin(async move {
            let meta = tokio::fs::metadata(path).await?;
            let modified = meta
                .modified()
                .ok()
                .map(|mtime| DateTime::<Utc>::from(mtime));

            #[cfg(unix)]
            let (owner, group) = {
                use std::os::unix::fs::MetadataExt;
                (Some(meta.uid().to_string()), Some(meta.gid().to_string()))
            };
            #[cfg(not(unix))]
            let (owner, group) = (None, None);

            Ok(FileMetadata {
                path: path.to_string(),
                size: meta.len(),
                modified,
                owner,
                group,
                is_directory: meta.is_dir(),
            })
        })
    }

    fn read_dir<'a>(
        &'a self,
        path: &'a str,
    ) -> Pin<Box<dyn Future<Output = AccordResult<Vec<String>>> + Send + 'a>> {
        Box::pin(async move {
            let mut entries = tokio::fs::read_dir(path).await?;
            let mut names = Vec::new();
            while let Some(entry) = entries.next_entry().await? {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
            names.sort();
            Ok(names)
        })
    }
}
