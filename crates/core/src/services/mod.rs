mod tasks;

pub use tasks::{SubmitError, TasksService};
