//! Hyperlink table (OSC 8).
//!
//! Cells carry a small integer tag instead of a URI so rows can be copied
//! into scrollback and evicted without lifetime coupling. Tags are assigned
//! monotonically from 1; identical URIs reuse their existing tag. Tags are
//! never removed — a tag stays resolvable for the life of the session.

use rustc_hash::FxHashMap;
use thiserror::Error;

/// Per-cell hyperlink reference. 0 means "no link".
pub type LinkTag = u32;

/// Error from [`HyperlinkTable::resolve`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LinkError {
    /// The tag is 0 or was never allocated.
    #[error("hyperlink tag {0} not found")]
    NotFound(LinkTag),
}

/// Session-owned mapping from link tags to URIs.
#[derive(Debug, Clone, Default)]
pub struct HyperlinkTable {
    /// URIs indexed by `tag - 1`.
    uris: Vec<String>,
    /// URI → tag lookup for deduplication.
    lookup: FxHashMap<String, LinkTag>,
}

impl HyperlinkTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a link for `uri`, returning its tag.
    ///
    /// An identical URI returns the previously assigned tag; a new URI
    /// allocates the next one. Empty URIs return 0 ("no link").
    pub fn open(&mut self, uri: &str) -> LinkTag {
        if uri.is_empty() {
            return 0;
        }
        if let Some(&tag) = self.lookup.get(uri) {
            return tag;
        }
        let tag = self.uris.len() as LinkTag + 1;
        self.uris.push(uri.to_string());
        self.lookup.insert(uri.to_string(), tag);
        tag
    }

    /// Resolve a tag back to its URI.
    pub fn resolve(&self, tag: LinkTag) -> Result<&str, LinkError> {
        if tag == 0 {
            return Err(LinkError::NotFound(0));
        }
        self.uris
            .get(tag as usize - 1)
            .map(String::as_str)
            .ok_or(LinkError::NotFound(tag))
    }

    /// Number of distinct URIs ever opened.
    #[must_use]
    pub fn len(&self) -> usize {
        self.uris.len()
    }

    /// Whether no link has been opened yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.uris.is_empty()
    }
}
