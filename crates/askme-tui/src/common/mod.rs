mod task;
pub mod text;

pub use task::{DeferredTask, TaskId, TaskSeq};
