use crate::url::normalize_url;
use std::collections::HashSet;
use std::sync::Mutex;
use url::Url;

/// Run-scoped set of visited pages
///
/// URLs are keyed by their normalized form, so trivially different spellings
/// of one page are fetched once.
#[derive(Debug, Default)]
pub struct VisitedSet {
    urls: Mutex<HashSet<String>>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The visit key of a URL
    pub fn key(url: &Url) -> String {
        normalize_url(url.as_str())
            .map(|u| u.to_string())
            .unwrap_or_else(|_| url.to_string())
    }

    /// Checks and marks in one critical section
    ///
    /// Returns `true` when the URL was not visited before and is now marked.
    pub fn mark_if_new(&self, url: &Url) -> bool {
        let key = Self::key(url);
        self.urls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key)
    }

    pub fn contains(&self, url: &Url) -> bool {
        let key = Self::key(url);
        self.urls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&key)
    }

    pub fn len(&self) -> usize {
        self.urls.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
