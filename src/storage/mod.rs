pub mod memory_storage;
pub mod storage_client;

pub use memory_storage::*;
pub use storage_client::*;

pub use crate::core::StorageError;
