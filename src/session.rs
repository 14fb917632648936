//! The signed-in user and their session, passed explicitly to whatever
//! needs to act on their behalf.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    Operator,
    Instructor,
    Director,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Operator => "operator",
            Role::Instructor => "instructor",
            Role::Director => "director",
        }
    }

    /// Roles that may read every instructor's statistics.
    fn sees_all_instructors(self) -> bool {
        matches!(self, Role::Admin | Role::Operator | Role::Director)
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "operator" => Ok(Role::Operator),
            "instructor" => Ok(Role::Instructor),
            "director" => Ok(Role::Director),
            other => Err(Error::Config(format!("unknown role '{other}'"))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub user_id: String,
    pub email: Option<String>,
    pub roles: Vec<Role>,
    /// Set when the user is linked to an instructor record.
    pub instructor_id: Option<String>,
}

#[derive(Clone)]
pub struct Session {
    access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn new(access_token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct AppContext {
    pub user: UserProfile,
    pub session: Session,
}

impl AppContext {
    pub fn new(user: UserProfile, session: Session) -> Self {
        Self { user, session }
    }

    /// The bearer token, as long as the session has not expired.
    pub fn access_token(&self, now: DateTime<Utc>) -> Result<&str> {
        if self.session.is_expired(now) {
            return Err(Error::SessionExpired);
        }
        Ok(&self.session.access_token)
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.user.roles.contains(&role)
    }

    /// Admin, operator and director see everyone; an instructor only sees
    /// their own statistics.
    pub fn can_view_instructor(&self, instructor_id: &str) -> bool {
        if self.user.roles.iter().any(|r| r.sees_all_instructors()) {
            return true;
        }
        self.has_role(Role::Instructor) && self.user.instructor_id.as_deref() == Some(instructor_id)
    }

    pub fn ensure_can_view(&self, instructor_id: &str) -> Result<()> {
        if self.can_view_instructor(instructor_id) {
            Ok(())
        } else {
            Err(Error::AccessDenied(format!(
                "user {} may not view instructor {instructor_id}",
                self.user.user_id
            )))
        }
    }

    /// Managing accounts and cache refreshes is limited to admins.
    pub fn ensure_admin(&self) -> Result<()> {
        if self.has_role(Role::Admin) {
            Ok(())
        } else {
            Err(Error::AccessDenied(format!(
                "user {} is not an admin",
                self.user.user_id
            )))
        }
    }
}
