//! Candidate sources produced by the search collaborator.

use serde::{Deserialize, Serialize};

/// Anything exposing the four text fields the evaluator reads.
///
/// Every field defaults to the empty string, so partial records from
/// other collaborators can be scored without conversion.
pub trait Evaluable {
    /// Source URL.
    fn url(&self) -> &str {
        ""
    }

    /// Source title.
    fn title(&self) -> &str {
        ""
    }

    /// Short excerpt shown in search results.
    fn snippet(&self) -> &str {
        ""
    }

    /// Full text, when retrieved.
    fn content(&self) -> &str {
        ""
    }
}

/// A retrieved source awaiting scoring.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateSource {
    /// Source URL.
    pub url: String,
    /// Source title.
    pub title: String,
    /// Short excerpt.
    pub snippet: String,
    /// Full text.
    pub content: String,
}

impl CandidateSource {
    /// Creates a source with the given URL and title.
    pub fn new(url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            ..Self::default()
        }
    }

    /// Sets the snippet.
    #[must_use]
    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = snippet.into();
        self
    }

    /// Sets the full content.
    #[must_use]
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }
}

impl Evaluable for CandidateSource {
    fn url(&self) -> &str {
        &self.url
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn snippet(&self) -> &str {
        &self.snippet
    }

    fn content(&self) -> &str {
        &self.content
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_default_empty() {
        let source: CandidateSource =
            serde_json::from_str(r#"{"url": "https://example.com"}"#).unwrap_or_default();
        assert_eq!(source.url, "https://example.com");
        assert!(source.title.is_empty());
        assert!(source.content.is_empty());
    }

    #[test]
    fn test_trait_defaults() {
        struct TitleOnly;
        impl Evaluable for TitleOnly {
            fn title(&self) -> &str {
                "Only a title"
            }
        }
        let t = TitleOnly;
        assert_eq!(t.title(), "Only a title");
        assert_eq!(t.url(), "");
        assert_eq!(t.content(), "");
    }
}
