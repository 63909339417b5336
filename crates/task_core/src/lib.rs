pub mod clock;
pub mod config;
pub mod error;
pub mod model;
pub mod query;
pub mod stats;
pub mod storage;
pub mod tracker;

pub use tracker::{StatusChange, TaskDraft, TaskStore};
