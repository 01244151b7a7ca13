//! Keyword matching.
//!
//! Matching is a plain case-insensitive substring test: no tokenising, no
//! stemming and no word boundaries, so `"mining"` also matches inside
//! `"miningpool"`. A false positive costs one extra chat message; a false
//! negative is a missed alert.

/// Returns `true` if any of `keywords` occurs in `text`, ignoring case.
pub fn matches<S: AsRef<str>>(text: &str, keywords: &[S]) -> bool {
    let text = text.to_lowercase();
    keywords
        .iter()
        .any(|k| text.contains(&k.as_ref().to_lowercase()))
}

/// A keyword list with its terms lower-cased once up front.
#[derive(Debug, Clone)]
pub struct KeywordFilter {
    terms: Vec<String>,
}

impl KeywordFilter {
    pub fn new<S: AsRef<str>>(terms: &[S]) -> Self {
        Self {
            terms: terms
                .iter()
                .map(|t| t.as_ref().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
        }
    }

    /// The normalised terms, in configuration order.
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn matches(&self, text: &str) -> bool {
        matches(text, &self.terms)
    }

    /// Convenience for sources that match on `"{title} {body}"`.
    pub fn matches_parts(&self, title: &str, body: &str) -> bool {
        self.matches(&format!("{title} {body}"))
    }
}
