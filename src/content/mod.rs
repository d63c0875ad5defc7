//! Document content store - external storage for article bodies.
//!
//! Posts reference their body through an opaque string id
//! (`content_mongo_id`). The store behind that id is pluggable: MongoDB in
//! production, an in-memory map in tests and content-less dev setups. The
//! process connects once at startup and injects the handle through
//! `AppState`; nothing reaches for a global client.

pub mod coordinator;

pub use coordinator::{ContentCoordinator, ContentWriteError};

use async_trait::async_trait;
use mongodb::{
    bson::{doc, oid::ObjectId, Document},
    Client, Collection,
};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContentStoreError {
    #[error("document store error: {0}")]
    Backend(#[from] mongodb::error::Error),
    #[error("document encoding error: {0}")]
    Encode(#[from] mongodb::bson::ser::Error),
    #[error("document decoding error: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("store returned an unusable insert id")]
    BadInsertId,
}

/// Connection settings for the external content store.
#[derive(Debug, Clone)]
pub struct ContentStoreConfig {
    pub uri: String,
    pub database: String,
    pub collection: String,
}

impl ContentStoreConfig {
    /// Read settings from the environment; `None` when no URI is configured,
    /// which leaves the coordinator in its "unavailable" state.
    pub fn from_env() -> Option<Self> {
        let uri = std::env::var("CONTENT_DB_URI").ok()?;
        Some(Self {
            uri,
            database: std::env::var("CONTENT_DB_NAME").unwrap_or_else(|_| "localnews".to_string()),
            collection: std::env::var("CONTENT_DB_COLLECTION")
                .unwrap_or_else(|_| "blog_content".to_string()),
        })
    }
}

/// Abstract key/document store holding article bodies.
///
/// `fetch`/`replace`/`delete` take the opaque reference stored on the post
/// row. Deleting a missing id is not an error; `replace` reports whether the
/// document existed.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn ping(&self) -> Result<(), ContentStoreError>;
    async fn fetch(&self, id: &str) -> Result<Option<Value>, ContentStoreError>;
    async fn insert(&self, document: &Value) -> Result<String, ContentStoreError>;
    async fn replace(&self, id: &str, document: &Value) -> Result<bool, ContentStoreError>;
    async fn delete(&self, id: &str) -> Result<(), ContentStoreError>;

    /// Whether `id` is syntactically a reference this store could resolve.
    fn is_valid_ref(&self, id: &str) -> bool;
}

/// MongoDB-backed content store. References are ObjectId hex strings.
pub struct MongoContentStore {
    collection: Collection<Document>,
}

impl MongoContentStore {
    pub async fn connect(config: &ContentStoreConfig) -> Result<Self, ContentStoreError> {
        let client = Client::with_uri_str(&config.uri).await?;
        let database = client.database(&config.database);
        // Fail fast on bad credentials/unreachable clusters.
        database.run_command(doc! { "ping": 1 }).await?;
        Ok(Self {
            collection: database.collection::<Document>(&config.collection),
        })
    }
}

#[async_trait]
impl ContentStore for MongoContentStore {
    async fn ping(&self) -> Result<(), ContentStoreError> {
        // Touches the server without moving data.
        self.collection
            .estimated_document_count()
            .await
            .map(|_| ())
            .map_err(ContentStoreError::from)
    }

    async fn fetch(&self, id: &str) -> Result<Option<Value>, ContentStoreError> {
        let oid = match ObjectId::parse_str(id) {
            Ok(oid) => oid,
            Err(_) => return Ok(None),
        };
        let found = self.collection.find_one(doc! { "_id": oid }).await?;
        match found {
            Some(mut document) => {
                // The internal id never leaves the store boundary.
                document.remove("_id");
                Ok(Some(serde_json::to_value(&document)?))
            }
            None => Ok(None),
        }
    }

    async fn insert(&self, document: &Value) -> Result<String, ContentStoreError> {
        let document = mongodb::bson::to_document(document)?;
        let result = self.collection.insert_one(document).await?;
        result
            .inserted_id
            .as_object_id()
            .map(|oid| oid.to_hex())
            .ok_or(ContentStoreError::BadInsertId)
    }

    async fn replace(&self, id: &str, document: &Value) -> Result<bool, ContentStoreError> {
        let oid = match ObjectId::parse_str(id) {
            Ok(oid) => oid,
            Err(_) => return Ok(false),
        };
        let document = mongodb::bson::to_document(document)?;
        let result = self
            .collection
            .replace_one(doc! { "_id": oid }, document)
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn delete(&self, id: &str) -> Result<(), ContentStoreError> {
        let oid = match ObjectId::parse_str(id) {
            Ok(oid) => oid,
            // Not a reference we could ever have issued; nothing to delete.
            Err(_) => return Ok(()),
        };
        self.collection.delete_one(doc! { "_id": oid }).await?;
        Ok(())
    }

    fn is_valid_ref(&self, id: &str) -> bool {
        ObjectId::parse_str(id).is_ok()
    }
}

/// In-memory content store keyed by UUID strings.
///
/// Substitutes for Mongo in tests and lets the full API run locally without
/// a document database.
#[derive(Default)]
pub struct MemoryContentStore {
    documents: Mutex<HashMap<String, Value>>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents (test inspection helper).
    pub fn len(&self) -> usize {
        self.documents.lock().expect("content store lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn ping(&self) -> Result<(), ContentStoreError> {
        Ok(())
    }

    async fn fetch(&self, id: &str) -> Result<Option<Value>, ContentStoreError> {
        Ok(self
            .documents
            .lock()
            .expect("content store lock")
            .get(id)
            .cloned())
    }

    async fn insert(&self, document: &Value) -> Result<String, ContentStoreError> {
        let id = uuid::Uuid::new_v4().to_string();
        self.documents
            .lock()
            .expect("content store lock")
            .insert(id.clone(), document.clone());
        Ok(id)
    }

    async fn replace(&self, id: &str, document: &Value) -> Result<bool, ContentStoreError> {
        let mut documents = self.documents.lock().expect("content store lock");
        match documents.get_mut(id) {
            Some(existing) => {
                *existing = document.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: &str) -> Result<(), ContentStoreError> {
        self.documents
            .lock()
            .expect("content store lock")
            .remove(id);
        Ok(())
    }

    fn is_valid_ref(&self, id: &str) -> bool {
        !id.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryContentStore::new();
        let id = store.insert(&json!({"body": "hello"})).await.unwrap();
        let fetched = store.fetch(&id).await.unwrap();
        assert_eq!(fetched, Some(json!({"body": "hello"})));
    }

    #[tokio::test]
    async fn test_memory_store_replace_reports_missing() {
        let store = MemoryContentStore::new();
        let replaced = store.replace("nope", &json!({})).await.unwrap();
        assert!(!replaced);

        let id = store.insert(&json!({"v": 1})).await.unwrap();
        let replaced = store.replace(&id, &json!({"v": 2})).await.unwrap();
        assert!(replaced);
        assert_eq!(store.fetch(&id).await.unwrap(), Some(json!({"v": 2})));
    }

    #[tokio::test]
    async fn test_memory_store_delete_is_idempotent() {
        let store = MemoryContentStore::new();
        let id = store.insert(&json!({})).await.unwrap();
        store.delete(&id).await.unwrap();
        store.delete(&id).await.unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_memory_refs_reject_blank() {
        let store = MemoryContentStore::new();
        assert!(!store.is_valid_ref(""));
        assert!(!store.is_valid_ref("   "));
        assert!(store.is_valid_ref("some-ref"));
    }
}
