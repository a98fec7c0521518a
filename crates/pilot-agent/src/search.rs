//! Search augmentation: fetch a few web snippets and tag them for synthesis.

use std::fmt;
use std::sync::LazyLock;

use async_trait::async_trait;
use pilot_ai::search::TavilyClient;
use regex::Regex;

/// Marker prefixed to every augmentation block
pub const SEARCH_RESULT_MARKER: &str = "SEARCH_RESULT:";

/// Upper bound on snippets fetched per turn
pub const MAX_SEARCH_RESULTS: usize = 3;

// Only `<` followed by a letter, `/` or `!` opens a tag; bare comparisons stay.
static TAG_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style)[^>]*>.*?</(script|style)>|</?[A-Za-z!][^>]*>")
        .expect("valid regex")
});

/// Something that can run a web search
#[async_trait]
pub trait Searcher: Send + Sync {
    /// Return the text content of at most `max_results` hits
    async fn search(&self, query: &str, max_results: usize) -> pilot_ai::Result<Vec<String>>;
}

/// [`Searcher`] backed by the Tavily API
pub struct TavilySearcher {
    client: TavilyClient,
}

impl TavilySearcher {
    pub fn new(client: TavilyClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Searcher for TavilySearcher {
    async fn search(&self, query: &str, max_results: usize) -> pilot_ai::Result<Vec<String>> {
        let hits = self.client.search(query, max_results).await?;
        Ok(hits.into_iter().map(|h| h.content).collect())
    }
}

/// Search-derived context for one synthesis call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Augmentation {
    text: String,
    snippets: usize,
}

impl Augmentation {
    /// Clean and join raw snippets. Returns `None` when nothing usable remains.
    pub fn from_snippets<I, S>(snippets: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let cleaned: Vec<String> = snippets
            .into_iter()
            .take(MAX_SEARCH_RESULTS)
            .map(|s| clean_snippet(s.as_ref()))
            .filter(|s| !s.is_empty())
            .collect();

        if cleaned.is_empty() {
            return None;
        }

        Some(Self {
            text: format!("{} {}", SEARCH_RESULT_MARKER, cleaned.join("\n")),
            snippets: cleaned.len(),
        })
    }

    /// Full tagged text, starting with [`SEARCH_RESULT_MARKER`]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Snippet text without the marker
    pub fn body(&self) -> &str {
        strip_marker(&self.text).unwrap_or(&self.text)
    }

    pub fn snippet_count(&self) -> usize {
        self.snippets
    }
}

impl fmt::Display for Augmentation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// If `text` carries the search marker, return what follows it
pub fn strip_marker(text: &str) -> Option<&str> {
    text.strip_prefix(SEARCH_RESULT_MARKER).map(str::trim)
}

/// Strip markup and collapse whitespace
pub fn clean_snippet(raw: &str) -> String {
    let without_tags = TAG_PATTERN.replace_all(raw, " ");
    let decoded = without_tags
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_snippet_strips_markup() {
        let raw = "<p>Rust   1.85\n\n<b>released</b></p><script>track()</script> &amp; stable";
        assert_eq!(clean_snippet(raw), "Rust 1.85 released & stable");
    }

    #[test]
    fn test_clean_snippet_plain_text_untouched() {
        assert_eq!(clean_snippet("2 < 3 is true"), "2 < 3 is true");
    }

    #[test]
    fn test_clean_snippet_keeps_comparisons() {
        let text = "Inflation < 3% this year while growth > 2% overall";
        assert_eq!(clean_snippet(text), text);
        assert_eq!(clean_snippet("x < 3 and y > 2"), "x < 3 and y > 2");
        assert_eq!(
            clean_snippet("<p>x < 3</p><!-- ad --> and <br/>y > 2"),
            "x < 3 and y > 2"
        );
    }

    #[test]
    fn test_augmentation_is_tagged() {
        let aug = Augmentation::from_snippets(["first fact", "second fact"]).unwrap();
        assert_eq!(aug.text(), "SEARCH_RESULT: first fact\nsecond fact");
        assert_eq!(aug.body(), "first fact\nsecond fact");
        assert_eq!(aug.snippet_count(), 2);
    }

    #[test]
    fn test_augmentation_caps_snippets() {
        let aug = Augmentation::from_snippets(["a", "b", "c", "d", "e"]).unwrap();
        assert_eq!(aug.snippet_count(), MAX_SEARCH_RESULTS);
        assert!(!aug.text().contains('d'));
    }

    #[test]
    fn test_augmentation_empty() {
        assert!(Augmentation::from_snippets(Vec::<String>::new()).is_none());
        assert!(Augmentation::from_snippets(["  ", "<br/>"]).is_none());
    }

    #[test]
    fn test_strip_marker() {
        assert_eq!(strip_marker("SEARCH_RESULT: x y"), Some("x y"));
        assert_eq!(strip_marker("NO_SEARCH"), None);
    }
}
