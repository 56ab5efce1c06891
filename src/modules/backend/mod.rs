//! External backend seam
//!
//! Capability traits for the hosted service (auth, entity CRUD, like
//! toggle, blob storage, realtime change feed) plus the in-memory
//! implementation used by tests and local development.

pub mod changes;
pub mod gateway;
pub mod memory;

pub use changes::{ChangeEvent, ChangeKind, ChangeSubscription, TableKind};
pub use gateway::{
    Backend, BlobStorage, ChangeFeed, EntityGateway, IdentityApi, LikeApi, LikeState, RemoteRecord,
};
pub use memory::MemoryBackend;
