pub mod backup;
pub mod json_store;

pub use backup::BackupManager;
pub use json_store::{StoreLoad, StoreState};
