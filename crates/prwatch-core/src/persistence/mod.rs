//! Key/value persistence for state that must survive restarts.

pub mod errors;
pub mod file_store;
pub mod memory;

use async_trait::async_trait;

pub use errors::PersistenceError;
pub use file_store::FileStore;
pub use memory::MemoryStore;

/// String-valued key/value store. Values are JSON documents.
#[async_trait]
pub trait PersistenceStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, PersistenceError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), PersistenceError>;

    /// Returns whether the key existed.
    async fn delete(&self, key: &str) -> Result<bool, PersistenceError>;
}
