pub mod auth;
pub mod health;
pub mod notes;
pub mod subtasks;
pub mod tasks;
pub mod users;
