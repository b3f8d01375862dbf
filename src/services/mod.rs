//! Business operations. Each takes the pool and the calling [`Actor`](crate::authz::Actor),
//! checks the policy, then talks to the store.

pub mod notes;
pub mod sessions;
pub mod subtasks;
pub mod tasks;
pub mod users;
