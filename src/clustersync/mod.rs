//! ClusterSync aggregated configuration
//!
//! Storage, backup, restore and schedule configurations are kept as four
//! name-keyed collections inside one OperatorConfig custom resource.
//!
//! - [`dto`]: request/response contracts and their validation
//! - [`store`]: read-modify-write CRUD with conflict retry
//! - [`repository`]: Kubernetes and in-memory persistence

pub mod dto;
pub mod repository;
pub mod store;

pub use dto::{
    BackupModifyRequest, BackupRequest, BackupResponse, EntryResource, ListResponse,
    NameResponse, RestoreModifyRequest, RestoreRequest, RestoreResponse, ScheduleModifyRequest,
    ScheduleRequest, ScheduleResponse, StorageModifyRequest, StorageRequest, StorageResponse,
};
pub use repository::{InMemoryOperatorConfigRepository, KubeOperatorConfigRepository};
pub use store::{ClusterSyncStore, StoreConfig};
