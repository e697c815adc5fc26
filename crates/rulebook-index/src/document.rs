use std::path::Path;

use crate::error::IndexError;

/// Default maximum file size: 50 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 50 * 1024 * 1024;

/// The rulebook text and where it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub content: String,
    pub source: String,
}

impl Document {
    #[must_use]
    pub fn new(content: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            source: source.into(),
        }
    }
}

/// A contiguous slice of a [`Document`].
///
/// `start` and `end` are byte offsets into the document content, so
/// `&content[start..end] == text` always holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Passage {
    pub index: usize,
    pub start: usize,
    pub end: usize,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct TextLoader {
    pub max_file_size: u64,
}

impl Default for TextLoader {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl TextLoader {
    /// Read a UTF-8 text file.
    ///
    /// # Errors
    ///
    /// Returns [`IndexError::DocumentLoad`] if the file is missing, unreadable or not
    /// valid UTF-8, and [`IndexError::DocumentTooLarge`] above `max_file_size`.
    pub async fn load(&self, path: &Path) -> Result<Document, IndexError> {
        let load_err = |source| IndexError::DocumentLoad {
            path: path.to_path_buf(),
            source,
        };

        let meta = tokio::fs::metadata(path).await.map_err(load_err)?;
        if meta.len() > self.max_file_size {
            return Err(IndexError::DocumentTooLarge {
                path: path.to_path_buf(),
                size: meta.len(),
                limit: self.max_file_size,
            });
        }

        let content = tokio::fs::read_to_string(path).await.map_err(load_err)?;
        tracing::debug!(path = %path.display(), bytes = content.len(), "document loaded");

        Ok(Document {
            content,
            source: path.display().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn load_text_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("rules.txt");
        std::fs::write(&file, "Offside: 5 yards.").unwrap();

        let doc = TextLoader::default().load(&file).await.unwrap();
        assert_eq!(doc.content, "Offside: 5 yards.");
        assert_eq!(doc.source, file.display().to_string());
    }

    #[tokio::test]
    async fn load_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("empty.txt");
        std::fs::write(&file, "").unwrap();

        let doc = TextLoader::default().load(&file).await.unwrap();
        assert!(doc.content.is_empty());
    }

    #[tokio::test]
    async fn load_nonexistent_file() {
        let result = TextLoader::default()
            .load(Path::new("/nonexistent/rules.txt"))
            .await;
        assert!(matches!(result, Err(IndexError::DocumentLoad { .. })));
    }

    #[tokio::test]
    async fn invalid_utf8_is_load_error() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("binary.txt");
        std::fs::write(&file, [0xff, 0xfe, 0x00, 0xc3]).unwrap();

        let result = TextLoader::default().load(&file).await;
        assert!(matches!(result, Err(IndexError::DocumentLoad { .. })));
    }

    #[tokio::test]
    async fn file_too_large_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("big.txt");
        std::fs::write(&file, "x").unwrap();

        let loader = TextLoader { max_file_size: 0 };
        let result = loader.load(&file).await;
        assert!(matches!(
            result,
            Err(IndexError::DocumentTooLarge {
                size: 1,
                limit: 0,
                ..
            })
        ));
    }
}
