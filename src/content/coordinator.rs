//! Content Coordinator - the single choke point for every read or write that
//! touches the content store on behalf of a post.
//!
//! Read-path failures (bad reference, unreachable store, missing document)
//! all degrade to "absent"; the caller decides whether absent content is
//! acceptable. Write paths are the opposite: asking to persist content while
//! the store is unconfigured is a hard error, because silently dropping the
//! body would be a partial success.

use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

use super::{ContentStore, ContentStoreError};

#[derive(Debug, Error)]
pub enum ContentWriteError {
    #[error("content store is not configured")]
    Unavailable,
    #[error(transparent)]
    Store(#[from] ContentStoreError),
}

/// Mediates between the relational rows and the document store.
#[derive(Clone)]
pub struct ContentCoordinator {
    store: Option<Arc<dyn ContentStore>>,
}

impl ContentCoordinator {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store: Some(store) }
    }

    /// Coordinator with no backing store; every resolve yields absent and
    /// every content write fails with `Unavailable`.
    pub fn unconfigured() -> Self {
        Self { store: None }
    }

    pub fn is_configured(&self) -> bool {
        self.store.is_some()
    }

    /// Health probe against the backing store.
    pub async fn ping(&self) -> Result<(), ContentWriteError> {
        match &self.store {
            Some(store) => store.ping().await.map_err(ContentWriteError::from),
            None => Err(ContentWriteError::Unavailable),
        }
    }

    /// Fetch the document behind a post's content reference.
    ///
    /// `None` covers every degraded case: null reference, malformed
    /// reference, unconfigured store, store failure, document not found.
    pub async fn resolve(&self, content_ref: Option<&str>) -> Option<Value> {
        let store = self.store.as_ref()?;
        let content_ref = content_ref?;
        if !store.is_valid_ref(content_ref) {
            return None;
        }
        match store.fetch(content_ref).await {
            Ok(document) => document,
            Err(err) => {
                tracing::warn!(content_ref, "content fetch failed, degrading to absent: {}", err);
                None
            }
        }
    }

    /// Write a new document and return its reference.
    pub async fn create(&self, payload: &Value) -> Result<String, ContentWriteError> {
        let store = self.store.as_ref().ok_or(ContentWriteError::Unavailable)?;
        Ok(store.insert(payload).await?)
    }

    /// Overwrite the document behind `existing` in place when it still
    /// resolves, otherwise store the payload under a fresh reference.
    ///
    /// Returns `(reference, was_created)`. A missing or malformed existing
    /// reference is silently replaced rather than failing the request, so a
    /// post's content reference can change across updates.
    pub async fn upsert(
        &self,
        existing: Option<&str>,
        payload: &Value,
    ) -> Result<(String, bool), ContentWriteError> {
        let store = self.store.as_ref().ok_or(ContentWriteError::Unavailable)?;
        if let Some(existing) = existing {
            if store.is_valid_ref(existing) && store.replace(existing, payload).await? {
                return Ok((existing.to_string(), false));
            }
        }
        let new_ref = store.insert(payload).await?;
        Ok((new_ref, true))
    }

    /// Best-effort delete accompanying a post deletion. Failures are logged
    /// and swallowed; a failed cleanup must never block the row delete.
    pub async fn cleanup(&self, content_ref: Option<&str>) {
        let (Some(store), Some(content_ref)) = (self.store.as_ref(), content_ref) else {
            return;
        };
        if !store.is_valid_ref(content_ref) {
            return;
        }
        if let Err(err) = store.delete(content_ref).await {
            tracing::warn!(content_ref, "content cleanup failed, continuing: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::MemoryContentStore;
    use serde_json::json;

    fn configured() -> (ContentCoordinator, Arc<MemoryContentStore>) {
        let store = Arc::new(MemoryContentStore::new());
        (ContentCoordinator::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_resolve_absent_when_unconfigured() {
        let coordinator = ContentCoordinator::unconfigured();
        assert_eq!(coordinator.resolve(Some("anything")).await, None);
    }

    #[tokio::test]
    async fn test_resolve_absent_for_null_and_invalid_refs() {
        let (coordinator, _) = configured();
        assert_eq!(coordinator.resolve(None).await, None);
        assert_eq!(coordinator.resolve(Some("")).await, None);
        assert_eq!(coordinator.resolve(Some("missing-doc")).await, None);
    }

    #[tokio::test]
    async fn test_create_then_resolve() {
        let (coordinator, _) = configured();
        let body = json!({"section_1_title": "Hello Atlanta"});
        let content_ref = coordinator.create(&body).await.unwrap();
        assert_eq!(coordinator.resolve(Some(&content_ref)).await, Some(body));
    }

    #[tokio::test]
    async fn test_create_fails_when_unconfigured() {
        let coordinator = ContentCoordinator::unconfigured();
        let err = coordinator.create(&json!({})).await.unwrap_err();
        assert!(matches!(err, ContentWriteError::Unavailable));
    }

    #[tokio::test]
    async fn test_upsert_creates_then_overwrites_same_ref() {
        let (coordinator, store) = configured();

        let (first_ref, created) = coordinator.upsert(None, &json!({"v": 1})).await.unwrap();
        assert!(created);

        let (second_ref, created) = coordinator
            .upsert(Some(&first_ref), &json!({"v": 2}))
            .await
            .unwrap();
        assert!(!created);
        assert_eq!(first_ref, second_ref);
        assert_eq!(store.len(), 1);
        assert_eq!(
            coordinator.resolve(Some(&second_ref)).await,
            Some(json!({"v": 2}))
        );
    }

    #[tokio::test]
    async fn test_upsert_replaces_dangling_ref() {
        let (coordinator, _) = configured();
        let (new_ref, created) = coordinator
            .upsert(Some("dangling"), &json!({"v": 3}))
            .await
            .unwrap();
        assert!(created);
        assert_ne!(new_ref, "dangling");
    }

    #[tokio::test]
    async fn test_cleanup_never_panics() {
        let (coordinator, store) = configured();
        let content_ref = coordinator.create(&json!({})).await.unwrap();

        coordinator.cleanup(Some(&content_ref)).await;
        assert!(store.is_empty());

        // Second pass on the already-deleted ref, plus degenerate inputs.
        coordinator.cleanup(Some(&content_ref)).await;
        coordinator.cleanup(Some("")).await;
        coordinator.cleanup(None).await;
        ContentCoordinator::unconfigured().cleanup(Some("x")).await;
    }
}
