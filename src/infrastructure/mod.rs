pub mod catalog_store;
pub mod drive;
pub mod file_store;
pub mod lock;
pub mod sqlite_catalog;

pub use catalog_store::{CatalogStore, MemoryCatalog};
pub use drive::DriveFileStore;
pub use file_store::{FileStore, LocalFileStore};
pub use lock::CycleLock;
pub use sqlite_catalog::SqliteCatalog;
