use serde::{Deserialize, Serialize};

/// An anchor element found on a rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anchor {
    /// Absolute URL, resolved against the page it was found on
    pub href: String,
    pub link_text: String,
    /// Text content of the anchor's parent element
    pub parent_text: String,
}

impl Anchor {
    pub fn new(
        href: impl Into<String>,
        link_text: impl Into<String>,
        parent_text: impl Into<String>,
    ) -> Self {
        Self {
            href: href.into(),
            link_text: link_text.into(),
            parent_text: parent_text.into(),
        }
    }
}

/// Everything the crawler needs from one loaded page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PageSnapshot {
    /// URL the page was loaded from
    pub url: String,
    pub body_text: String,
    pub title: String,
    pub anchors: Vec<Anchor>,
}

/// A link submitted for follow classification. Never retained past that call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkCandidate {
    pub url: String,
    pub link_text: String,
    pub context: String,
}

impl LinkCandidate {
    /// Builds a candidate from an anchor, keeping at most `context_limit`
    /// characters of the parent element's text.
    pub fn from_anchor(anchor: &Anchor, context_limit: usize) -> Self {
        Self {
            url: anchor.href.clone(),
            link_text: anchor.link_text.clone(),
            context: truncate_chars(&anchor.parent_text, context_limit).to_string(),
        }
    }
}

/// Returns the prefix of `text` holding at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Collapses runs of whitespace into single spaces and trims the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
