pub mod note;
pub mod role;
pub mod subtask;
pub mod task;
pub mod user;
