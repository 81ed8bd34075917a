//! The code under review

use crate::config::ContextStrategy;
use serde::{Deserialize, Serialize};

/// One changed file in the review
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewFile {
    /// Repository-relative path
    pub path: String,
    /// Language tag, if known
    pub language: Option<String>,
    /// Full file content
    pub content: String,
}

impl ReviewFile {
    /// Create a file entry
    #[must_use]
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            language: None,
            content: content.into(),
        }
    }

    /// With a language tag
    #[inline]
    #[must_use]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    fn render(&self) -> String {
        let rule = "=".repeat(80);
        let mut block = format!("{rule}\nFile: {}\n", self.path);
        if let Some(language) = &self.language {
            block.push_str(&format!("Language: {language}\n"));
        }
        block.push_str(&format!("Lines: {}\n{rule}\n\n", self.content.lines().count()));
        block.push_str(&self.content);
        block
    }
}

/// Everything an analysis stage receives about the code
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReviewRequest {
    /// Human-readable change title
    pub title: Option<String>,
    /// Files under review
    pub files: Vec<ReviewFile>,
}

impl ReviewRequest {
    /// Empty request
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With a change title
    #[inline]
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// With a file appended
    #[inline]
    #[must_use]
    pub fn with_file(mut self, file: ReviewFile) -> Self {
        self.files.push(file);
        self
    }

    /// Paths of every file under review
    #[must_use]
    pub fn file_paths(&self) -> Vec<String> {
        self.files.iter().map(|f| f.path.clone()).collect()
    }

    /// All files joined into one delimited context block
    #[must_use]
    pub fn concatenated(&self) -> String {
        self.files
            .iter()
            .map(ReviewFile::render)
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Code contexts per the configured strategy
    #[must_use]
    pub fn contexts(&self, strategy: ContextStrategy) -> Vec<String> {
        match strategy {
            ContextStrategy::Concatenated => vec![self.concatenated()],
            ContextStrategy::PerFile => {
                self.files.iter().map(ReviewFile::render).collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ReviewRequest {
        ReviewRequest::new()
            .with_file(ReviewFile::new("src/a.rs", "fn a() {}").with_language("rust"))
            .with_file(ReviewFile::new("src/b.rs", "fn b() {}\nfn c() {}"))
    }

    #[test]
    fn concatenated_context_carries_file_headers() {
        let context = request().concatenated();
        assert!(context.contains("File: src/a.rs"));
        assert!(context.contains("Language: rust"));
        assert!(context.contains("File: src/b.rs"));
        assert!(context.contains("Lines: 2"));
    }

    #[test]
    fn strategy_controls_chunking() {
        let request = request();
        assert_eq!(request.contexts(ContextStrategy::Concatenated).len(), 1);
        assert_eq!(request.contexts(ContextStrategy::PerFile).len(), 2);
    }

    #[test]
    fn file_paths_in_order() {
        assert_eq!(request().file_paths(), vec!["src/a.rs", "src/b.rs"]);
    }
}
