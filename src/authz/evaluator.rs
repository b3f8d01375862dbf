use crate::errors::{AppError, AppResult};
use crate::models::role::Role;

use super::principal::{Actor, UserTarget};

/// Everything an actor can ask to do, with just enough context about the
/// resource to decide.
#[derive(Debug, Clone, Copy)]
pub enum Action<'a> {
    ListTasks,
    ViewTask { assigned_to: Option<&'a str> },
    CreateTask,
    UpdateTask,
    DeleteTask,
    AddNote { assigned_to: Option<&'a str> },
    EditNote { author: &'a str, assigned_to: Option<&'a str> },
    DeleteNote { author: &'a str, assigned_to: Option<&'a str> },
    ListUsers,
    ViewUser,
    CreateUser { role: Role },
    UpdateUser { target: UserTarget },
    UpdateUserRole { target: UserTarget, new_role: Role },
    DeleteUser { target: UserTarget },
}

impl Action<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            Action::ListTasks => "list_tasks",
            Action::ViewTask { .. } => "view_task",
            Action::CreateTask => "create_task",
            Action::UpdateTask => "update_task",
            Action::DeleteTask => "delete_task",
            Action::AddNote { .. } => "add_note",
            Action::EditNote { .. } => "edit_note",
            Action::DeleteNote { .. } => "delete_note",
            Action::ListUsers => "list_users",
            Action::ViewUser => "view_user",
            Action::CreateUser { .. } => "create_user",
            Action::UpdateUser { .. } => "update_user",
            Action::UpdateUserRole { .. } => "update_user_role",
            Action::DeleteUser { .. } => "delete_user",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(&'static str),
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn into_result(self) -> AppResult<()> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => Err(AppError::forbidden(reason)),
        }
    }
}

/// Which tasks an actor may see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskScope {
    All,
    AssignedTo(String),
}

impl TaskScope {
    pub fn contains(&self, assigned_to: Option<&str>) -> bool {
        match self {
            TaskScope::All => true,
            TaskScope::AssignedTo(name) => assigned_to == Some(name.as_str()),
        }
    }
}

pub fn task_scope(actor: &Actor) -> TaskScope {
    if actor.role.is_admin_tier() {
        TaskScope::All
    } else {
        TaskScope::AssignedTo(actor.display_name())
    }
}

const ADMIN_REQUIRED: &str = "admin role or higher required";

fn require_admin(actor: &Actor) -> Decision {
    if actor.role.is_admin_tier() {
        Decision::Allow
    } else {
        Decision::Deny(ADMIN_REQUIRED)
    }
}

fn can_view(actor: &Actor, assigned_to: Option<&str>) -> Decision {
    if task_scope(actor).contains(assigned_to) {
        Decision::Allow
    } else {
        Decision::Deny("task is not assigned to you")
    }
}

fn can_change_note(actor: &Actor, author: &str, assigned_to: Option<&str>) -> Decision {
    if actor.role.is_admin_tier() {
        return Decision::Allow;
    }
    if author != actor.display_name() {
        return Decision::Deny("only the author or an admin can change this note");
    }
    can_view(actor, assigned_to)
}

/// Pure policy: no I/O, no logging. See [`authorize`] for the logged form.
pub fn decide(actor: &Actor, action: &Action<'_>) -> Decision {
    match *action {
        Action::ListTasks => Decision::Allow,
        Action::ViewTask { assigned_to } | Action::AddNote { assigned_to } => can_view(actor, assigned_to),
        Action::CreateTask | Action::UpdateTask | Action::DeleteTask => require_admin(actor),
        Action::EditNote { author, assigned_to } | Action::DeleteNote { author, assigned_to } => {
            can_change_note(actor, author, assigned_to)
        }
        Action::ListUsers | Action::ViewUser => require_admin(actor),
        Action::CreateUser { role } => {
            if !actor.role.is_admin_tier() {
                Decision::Deny(ADMIN_REQUIRED)
            } else if role.outranks(actor.role) {
                Decision::Deny("cannot create an account above your own role")
            } else {
                Decision::Allow
            }
        }
        Action::UpdateUser { target } => {
            if target.id == actor.id {
                Decision::Allow
            } else if !actor.role.is_admin_tier() {
                Decision::Deny(ADMIN_REQUIRED)
            } else if target.role.outranks(actor.role) {
                Decision::Deny("cannot modify an account that outranks you")
            } else {
                Decision::Allow
            }
        }
        Action::UpdateUserRole { target, new_role } => {
            if !actor.role.is_admin_tier() {
                Decision::Deny(ADMIN_REQUIRED)
            } else if target.id == actor.id {
                if new_role.rank() < actor.role.rank() {
                    Decision::Deny("cannot demote yourself")
                } else {
                    Decision::Allow
                }
            } else if target.role.outranks(actor.role) {
                Decision::Deny("cannot change the role of an account that outranks you")
            } else {
                Decision::Allow
            }
        }
        Action::DeleteUser { target } => {
            if target.id == actor.id {
                Decision::Deny("cannot delete your own account")
            } else if !actor.role.is_admin_tier() {
                Decision::Deny(ADMIN_REQUIRED)
            } else if actor.role.rank() < target.role.rank() {
                Decision::Deny("cannot delete an account that outranks you")
            } else {
                Decision::Allow
            }
        }
    }
}

/// Evaluates `action` for `actor`, logging and converting a denial into
/// `Forbidden`.
pub fn authorize(actor: &Actor, action: Action<'_>) -> AppResult<()> {
    let decision = decide(actor, &action);
    if let Decision::Deny(reason) = decision {
        tracing::warn!(
            user_id = %actor.id,
            role = %actor.role,
            action = action.name(),
            reason,
            "authorization denied"
        );
    }
    decision.into_result()
}
