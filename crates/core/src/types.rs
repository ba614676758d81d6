use serde::{Deserialize, Serialize};

/// A crawled page, keyed by its fingerprint. `url` is the first
/// canonical URL observed for that fingerprint; never mutated after.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub page_id: String,
    pub host: String,
    pub path: String,
    pub url: String,
}

/// A directed edge between two pages. Composite identity is
/// `(from_page_id, to_page_id)`; `text` is the anchor's inner text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub from_page_id: String,
    pub to_page_id: String,
    pub text: String,
}

impl Link {
    /// Anchor text is coerced to valid UTF-8 before it ever reaches a
    /// batcher channel; invalid byte sequences are dropped, not
    /// replaced with U+FFFD.
    pub fn new(from_page_id: String, to_page_id: String, text: impl AsRef<[u8]>) -> Self {
        let text = sanitize_utf8(text.as_ref());
        Self {
            from_page_id,
            to_page_id,
            text,
        }
    }
}

fn sanitize_utf8(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => String::from_utf8_lossy(bytes).replace('\u{FFFD}', ""),
    }
}
