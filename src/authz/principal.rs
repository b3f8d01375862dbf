use uuid::Uuid;

use crate::models::role::Role;

/// The authenticated caller, as described by the verified token claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
}

impl Actor {
    /// "First Last" when both names are set, otherwise the email.
    ///
    /// Tasks store assignees and authors by this value.
    pub fn display_name(&self) -> String {
        display_name(&self.first_name, &self.last_name, &self.email)
    }

    pub fn as_target(&self) -> UserTarget {
        UserTarget {
            id: self.id,
            role: self.role,
        }
    }
}

/// The account a user-management action is aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserTarget {
    pub id: Uuid,
    pub role: Role,
}

pub fn display_name(first_name: &str, last_name: &str, email: &str) -> String {
    let first = first_name.trim();
    let last = last_name.trim();
    if first.is_empty() || last.is_empty() {
        email.to_string()
    } else {
        format!("{first} {last}")
    }
}
