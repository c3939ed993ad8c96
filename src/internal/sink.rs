use scraper::Html;
use std::sync::{Arc, PoisonError, RwLock};

/// Identifier of the fixture container in hosted test pages.
pub const DEFAULT_CONTAINER_ID: &str = "testArea";

/// The container a fixture writes its markup into.
///
/// Implementations are handles: cloning one must give another view of the same container, so a
/// test can keep a handle while the loader owns another. None of these operations can fail.
pub trait DocumentSink {
    fn id(&self) -> &str;

    /// Replace the container's markup with `markup`.
    fn set_content(&self, markup: &str);

    /// The container's markup as the sink currently holds it.
    fn content(&self) -> String;

    fn reset(&self) {
        self.set_content("");
    }
}

/// Stores markup verbatim.
#[derive(Debug, Clone)]
pub struct MemorySink {
    id: Arc<str>,
    content: Arc<RwLock<String>>,
}

impl MemorySink {
    pub fn new(id: &str) -> Self {
        Self {
            id: Arc::from(id),
            content: Arc::new(RwLock::new(String::new())),
        }
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new(DEFAULT_CONTAINER_ID)
    }
}

impl DocumentSink for MemorySink {
    fn id(&self) -> &str {
        &self.id
    }

    fn set_content(&self, markup: &str) {
        *self.content.write().unwrap_or_else(PoisonError::into_inner) = markup.to_string();
    }

    fn content(&self) -> String {
        self.content
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Reflects markup the way a browser reflects `innerHTML`: the fragment is parsed and the
/// stored value is its serialization, so tag and attribute names come back lowercased,
/// attribute values quoted and implied end tags filled in.
#[derive(Debug, Clone)]
pub struct HtmlSink {
    inner: MemorySink,
}

impl HtmlSink {
    pub fn new(id: &str) -> Self {
        Self {
            inner: MemorySink::new(id),
        }
    }
}

impl Default for HtmlSink {
    fn default() -> Self {
        Self::new(DEFAULT_CONTAINER_ID)
    }
}

impl DocumentSink for HtmlSink {
    fn id(&self) -> &str {
        self.inner.id()
    }

    fn set_content(&self, markup: &str) {
        self.inner.set_content(&reserialize(markup));
    }

    fn content(&self) -> String {
        self.inner.content()
    }

    fn reset(&self) {
        self.inner.reset();
    }
}

fn reserialize(markup: &str) -> String {
    if markup.is_empty() {
        return String::new();
    }
    Html::parse_fragment(markup).root_element().inner_html()
}
