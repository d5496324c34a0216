//! Class names for the model's output vector.
//!
//! The label file has one class per line, in output order. Each line starts
//! with an index token that is not part of the display name:
//!
//! ```text
//! 0 Golden Retriever
//! 1 Tabby Cat
//! ```

use anyhow::Context;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSet {
    labels: Vec<String>,
}

impl LabelSet {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read labels from {}", path.display()))?;
        Ok(Self::parse(&text))
    }

    pub fn parse(text: &str) -> Self {
        let labels = text.lines().map(|line| line.trim_end().to_string()).collect();
        Self { labels }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Raw label line for `index`.
    pub fn raw(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    /// Label for `index` without its leading index token. Any run of
    /// whitespace after the token is dropped, so `"0  Dog"` gives `"Dog"`.
    pub fn display_name(&self, index: usize) -> Option<&str> {
        self.raw(index).map(strip_index_token)
    }
}

fn strip_index_token(line: &str) -> &str {
    match line.split_once(char::is_whitespace) {
        Some((_, rest)) => rest.trim_start(),
        None => "",
    }
}
