//! Domain model: the scan task and its lifecycle.

pub mod task;

pub use task::{RepositoryIdentity, Task, TaskSource, TaskStatus};
