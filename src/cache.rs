use std::collections::HashMap;

use parking_lot::RwLock;

/// Process-lifetime cache of template text keyed by `category/template`.
///
/// Entries are written once and never replaced or evicted; templates are assumed immutable
/// upstream.  Two requests racing on the same key both fetch and the first write is kept.
#[derive(Debug, Default)]
pub struct TemplateCache {
    entries: RwLock<HashMap<String, String>>,
}

impl TemplateCache {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The cache key for a template.
    pub fn key(category: &str, template_name: &str) -> String {
        format!("{category}/{template_name}")
    }

    /// Look up cached content.
    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    /// Insert content unless the key is already present.
    pub fn insert(&self, key: String, content: String) {
        self.entries.write().entry(key).or_insert(content);
    }

    /// The number of cached templates.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// True when nothing has been cached yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
