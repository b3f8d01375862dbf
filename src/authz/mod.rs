//! Authorization policy.
//!
//! Decisions are made from the caller's role (see [`Role`](crate::models::role::Role))
//! and a little context about the target resource. Every service operation
//! calls [`authorize`] before touching the store.

mod evaluator;
mod principal;

pub use evaluator::{authorize, decide, task_scope, Action, Decision, TaskScope};
pub use principal::{display_name, Actor, UserTarget};
