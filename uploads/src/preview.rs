//! Preview handle abstractions for staged files.
//!
//! A staged file is shown through a revocable local handle (a `blob:` URL in
//! a browser). Handles are scoped resources: created when a file is staged
//! and revoked exactly once, when the file is unstaged or the session ends.
//!
//! The module uses a trait-based design so hosts and tests can supply their
//! own handle source:
//! - `PreviewStore` trait: creates and revokes handles
//! - `ObjectUrlStore`: default implementation with a shared ledger that
//!   counts live, revoked and double-revoked handles

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::session::SourceFile;

/// A revocable display handle for a staged file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PreviewUrl(String);

impl PreviewUrl {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PreviewUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Source of preview handles.
pub trait PreviewStore {
    /// Creates a new handle for `file`.
    fn create(&mut self, file: &SourceFile) -> PreviewUrl;

    /// Releases a handle. Returns `false` if the handle was not live.
    fn revoke(&mut self, url: &PreviewUrl) -> bool;
}

#[derive(Debug, Default)]
struct Ledger {
    live: HashSet<PreviewUrl>,
    created: usize,
    revoked: usize,
    double_revoked: usize,
}

/// Default preview store issuing `blob:` style handles.
///
/// Clones share one ledger, so a host can keep a clone to audit handle
/// counts after the session that used the store is gone.
#[derive(Debug, Clone)]
pub struct ObjectUrlStore {
    origin: Arc<str>,
    ledger: Arc<Mutex<Ledger>>,
}

impl Default for ObjectUrlStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectUrlStore {
    pub fn new() -> Self {
        Self::with_origin("local")
    }

    /// Store whose handles read `blob:{origin}/{uuid}`.
    pub fn with_origin(origin: &str) -> Self {
        Self {
            origin: Arc::from(origin),
            ledger: Arc::default(),
        }
    }

    fn ledger(&self) -> MutexGuard<'_, Ledger> {
        // A poisoned ledger still holds valid counts.
        self.ledger.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Number of handles created and not yet revoked.
    pub fn live_count(&self) -> usize {
        self.ledger().live.len()
    }

    pub fn created_count(&self) -> usize {
        self.ledger().created
    }

    pub fn revoked_count(&self) -> usize {
        self.ledger().revoked
    }

    /// Revocations of handles that were not live.
    pub fn double_revoked_count(&self) -> usize {
        self.ledger().double_revoked
    }

    pub fn is_live(&self, url: &PreviewUrl) -> bool {
        self.ledger().live.contains(url)
    }
}

impl PreviewStore for ObjectUrlStore {
    fn create(&mut self, file: &SourceFile) -> PreviewUrl {
        let url = PreviewUrl(format!("blob:{}/{}", self.origin, uuid::Uuid::new_v4()));
        let mut ledger = self.ledger();
        ledger.created += 1;
        ledger.live.insert(url.clone());

        log::trace!(
            target: "campus_uploads::preview",
            "created url={} name={} bytes={}",
            url,
            file.name(),
            file.size()
        );
        url
    }

    fn revoke(&mut self, url: &PreviewUrl) -> bool {
        let mut ledger = self.ledger();
        if ledger.live.remove(url) {
            ledger.revoked += 1;
            log::trace!(target: "campus_uploads::preview", "revoked url={url}");
            true
        } else {
            ledger.double_revoked += 1;
            log::warn!(target: "campus_uploads::preview", "revoke_of_dead_handle url={url}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file() -> SourceFile {
        SourceFile::new("a.png", "image/png", vec![1, 2, 3])
    }

    #[test]
    fn test_create_and_revoke_counts() {
        let mut store = ObjectUrlStore::new();
        let audit = store.clone();

        let a = store.create(&file());
        let b = store.create(&file());
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("blob:local/"));
        assert_eq!(audit.live_count(), 2);

        assert!(store.revoke(&a));
        assert_eq!(audit.live_count(), 1);
        assert_eq!(audit.revoked_count(), 1);
        assert!(!audit.is_live(&a));
        assert!(audit.is_live(&b));
    }

    #[test]
    fn test_double_revoke_is_recorded() {
        let mut store = ObjectUrlStore::with_origin("campus.test");
        let url = store.create(&file());
        assert!(url.as_str().starts_with("blob:campus.test/"));

        assert!(store.revoke(&url));
        assert!(!store.revoke(&url));
        assert_eq!(store.revoked_count(), 1);
        assert_eq!(store.double_revoked_count(), 1);
    }

    #[test]
    fn test_preview_store_trait_is_object_safe() {
        fn _accept_store(_store: &mut dyn PreviewStore) {}
        let mut store = ObjectUrlStore::new();
        _accept_store(&mut store);
    }
}
