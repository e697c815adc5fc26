use crate::document::{Document, Passage};
use crate::error::IndexError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitterConfig {
    /// Maximum passage length in chars.
    pub chunk_size: usize,
    /// Chars shared by consecutive passages.
    pub chunk_overlap: usize,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

impl SplitterConfig {
    /// # Errors
    ///
    /// Returns [`IndexError::InvalidSplitter`] unless `chunk_size > chunk_overlap`.
    pub fn validate(&self) -> Result<(), IndexError> {
        if self.chunk_size == 0 {
            return Err(IndexError::InvalidSplitter(
                "chunk_size must be greater than zero".into(),
            ));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(IndexError::InvalidSplitter(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct TextSplitter {
    config: SplitterConfig,
}

impl TextSplitter {
    /// # Errors
    ///
    /// Returns [`IndexError::InvalidSplitter`] for an invalid configuration.
    pub fn new(config: SplitterConfig) -> Result<Self, IndexError> {
        config.validate()?;
        Ok(Self { config })
    }

    #[must_use]
    pub fn config(&self) -> SplitterConfig {
        self.config
    }

    #[must_use]
    pub fn split(&self, document: &Document) -> Vec<Passage> {
        let passages = split_validated(
            &document.content,
            self.config.chunk_size,
            self.config.chunk_overlap,
        );
        tracing::debug!(
            source = %document.source,
            passages = passages.len(),
            chunk_size = self.config.chunk_size,
            chunk_overlap = self.config.chunk_overlap,
            "document split"
        );
        passages
    }
}

/// Split `text` into passages of at most `chunk_size` chars, each starting
/// `chunk_overlap` chars before the previous one ended.
///
/// # Errors
///
/// Returns [`IndexError::InvalidSplitter`] unless `chunk_size > chunk_overlap`.
pub fn split(
    text: &str,
    chunk_size: usize,
    chunk_overlap: usize,
) -> Result<Vec<Passage>, IndexError> {
    SplitterConfig {
        chunk_size,
        chunk_overlap,
    }
    .validate()?;
    Ok(split_validated(text, chunk_size, chunk_overlap))
}

fn split_validated(text: &str, chunk_size: usize, chunk_overlap: usize) -> Vec<Passage> {
    if text.is_empty() {
        return Vec::new();
    }

    // Shorter passages would not move past the overlap.
    let min_len = (chunk_overlap + 1).max(chunk_size / 2);

    let mut passages = Vec::new();
    let mut start = 0;
    loop {
        // Only the current window is decoded, never the whole document.
        let window: Vec<(usize, char)> = text[start..]
            .char_indices()
            .take(chunk_size)
            .map(|(i, c)| (start + i, c))
            .collect();
        let window_end = window
            .last()
            .map_or(start, |&(i, c)| i + c.len_utf8());

        let len = if window_end == text.len() {
            window.len()
        } else {
            find_break(&window, min_len).unwrap_or(window.len())
        };
        let end = window.get(len).map_or(window_end, |&(i, _)| i);

        passages.push(Passage {
            index: passages.len(),
            start,
            end,
            text: text[start..end].to_owned(),
        });

        if end == text.len() {
            break;
        }
        start = window
            .get(len - chunk_overlap)
            .map_or(window_end, |&(i, _)| i);
    }

    passages
}

/// Last passage length in `min_len..=window.len()` that ends on a boundary, trying
/// paragraph, line, sentence and whitespace boundaries in that order.
fn find_break(window: &[(usize, char)], min_len: usize) -> Option<usize> {
    let c = |i: usize| window[i].1;
    let two = |e: usize, first: fn(char) -> bool, second: fn(char) -> bool| {
        e >= 2 && first(c(e - 2)) && second(c(e - 1))
    };

    let tiers: [&dyn Fn(usize) -> bool; 4] = [
        &|e: usize| two(e, |a| a == '\n', |b| b == '\n'),
        &|e: usize| c(e - 1) == '\n',
        &|e: usize| two(e, |a| matches!(a, '.' | '?' | '!'), char::is_whitespace),
        &|e: usize| c(e - 1).is_whitespace(),
    ];

    tiers
        .iter()
        .find_map(|is_break| (min_len..=window.len()).rev().find(|&e| is_break(e)))
}
