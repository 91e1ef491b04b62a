pub mod common;
pub mod remote;
pub mod store;

pub use common::{ApiError, StoreError};
pub use remote::{FileSource, HttpSource, RemoteSource, UnavailableSource};
pub use store::{DurableStore, FileStore, MemoryStore};
