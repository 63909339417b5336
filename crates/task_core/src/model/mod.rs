mod task;

pub use task::{
    DEFAULT_CATEGORY, DUE_DATE_FORMAT, Priority, StoreMetadata, Task, TaskStatus,
    normalize_category, parse_due_date,
};
pub(crate) use task::join_labels;
