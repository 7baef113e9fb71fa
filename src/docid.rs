//! Docid assignment, injected into whatever feeds the frontier.
//!
//! The frontier trusts docids to be unique per canonical URL and never
//! generates them itself.

use parking_lot::Mutex;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocIdAssignment {
    /// First sighting of this canonical URL.
    New(u32),
    /// Already registered under this docid.
    Seen(u32),
}

impl DocIdAssignment {
    pub fn docid(&self) -> u32 {
        match *self {
            Self::New(docid) | Self::Seen(docid) => docid,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, Self::New(_))
    }
}

pub trait DocIdRegistry: Send + Sync {
    /// Register `canonical_url`, or report the docid it already has.
    /// `None` once the id space is exhausted.
    fn assign(&self, canonical_url: &str) -> Option<DocIdAssignment>;

    fn lookup(&self, canonical_url: &str) -> Option<u32>;

    /// Forget `canonical_url` so a later `assign` reports it as new again.
    /// Used to undo assignments whose records never reached the frontier.
    fn release(&self, canonical_url: &str);
}

/// Process-local registry handing out consecutive ids.
#[derive(Debug)]
pub struct InMemoryDocIds {
    inner: Mutex<Registry>,
}

#[derive(Debug)]
struct Registry {
    ids: HashMap<String, u32>,
    next: Option<u32>,
}

impl InMemoryDocIds {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    /// Start numbering at `first`, e.g. one past the highest docid a resumed
    /// crawl already queued.
    pub fn starting_at(first: u32) -> Self {
        Self {
            inner: Mutex::new(Registry {
                ids: HashMap::new(),
                next: Some(first),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryDocIds {
    fn default() -> Self {
        Self::new()
    }
}

impl DocIdRegistry for InMemoryDocIds {
    fn assign(&self, canonical_url: &str) -> Option<DocIdAssignment> {
        let mut registry = self.inner.lock();
        if let Some(&docid) = registry.ids.get(canonical_url) {
            return Some(DocIdAssignment::Seen(docid));
        }

        let docid = registry.next?;
        registry.next = docid.checked_add(1);
        registry.ids.insert(canonical_url.to_string(), docid);
        Some(DocIdAssignment::New(docid))
    }

    fn lookup(&self, canonical_url: &str) -> Option<u32> {
        self.inner.lock().ids.get(canonical_url).copied()
    }

    // Released docids are not handed out again; a re-assignment gets a fresh
    // one so ids keep encoding discovery order.
    fn release(&self, canonical_url: &str) {
        self.inner.lock().ids.remove(canonical_url);
    }
}
