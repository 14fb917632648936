//! Environment-driven configuration.
//!
//! Values are read from the process environment (optionally seeded from a
//! `.env` file by the binary):
//!
//! | Variable               | Default                        |
//! |------------------------|--------------------------------|
//! | `BACKEND_URL`          | required                       |
//! | `BACKEND_ANON_KEY`     | required                       |
//! | `BACKEND_ACCESS_TOKEN` | `BACKEND_ANON_KEY`             |
//! | `STATS_VIEW`           | `instructor_course_stats`      |
//! | `FUNCTIONS_URL`        | `{BACKEND_URL}/functions/v1`   |
//! | `APP_USER_ID`          | `cli`                          |
//! | `APP_USER_EMAIL`       | unset                          |
//! | `APP_ROLES`            | `instructor`                   |
//! | `APP_INSTRUCTOR_ID`    | unset                          |
//! | `SESSION_EXPIRES_AT`   | one hour from load (RFC 3339)  |

use chrono::{DateTime, Duration, Utc};

use crate::error::{Error, Result};
use crate::session::{AppContext, Role, Session, UserProfile};

pub const DEFAULT_STATS_VIEW: &str = "instructor_course_stats";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub backend_url: String,
    pub anon_key: String,
    access_token: String,
    pub stats_view: String,
    pub functions_url: String,
    pub user: UserProfile,
    pub session_expires_at: DateTime<Utc>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let require =
            |key: &str| get(key).ok_or_else(|| Error::Config(format!("{key} must be set")));

        let backend_url = require("BACKEND_URL")?.trim_end_matches('/').to_string();
        let anon_key = require("BACKEND_ANON_KEY")?;
        let access_token = get("BACKEND_ACCESS_TOKEN").unwrap_or_else(|| anon_key.clone());
        let functions_url = get("FUNCTIONS_URL")
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| format!("{backend_url}/functions/v1"));

        let roles = get("APP_ROLES")
            .unwrap_or_else(|| Role::Instructor.to_string())
            .split(',')
            .filter(|r| !r.trim().is_empty())
            .map(str::parse)
            .collect::<Result<Vec<Role>>>()?;

        let session_expires_at = match get("SESSION_EXPIRES_AT") {
            Some(raw) => DateTime::parse_from_rfc3339(&raw)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| Error::Config(format!("SESSION_EXPIRES_AT: {e}")))?,
            None => Utc::now() + Duration::hours(1),
        };

        Ok(Self {
            backend_url,
            anon_key,
            access_token,
            stats_view: get("STATS_VIEW").unwrap_or_else(|| DEFAULT_STATS_VIEW.to_string()),
            functions_url,
            user: UserProfile {
                user_id: get("APP_USER_ID").unwrap_or_else(|| "cli".to_string()),
                email: get("APP_USER_EMAIL"),
                roles,
                instructor_id: get("APP_INSTRUCTOR_ID"),
            },
            session_expires_at,
        })
    }

    pub fn context(&self) -> AppContext {
        AppContext::new(
            self.user.clone(),
            Session::new(self.access_token.clone(), self.session_expires_at),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_lookup(lookup(&[
            ("BACKEND_URL", "https://db.example.com/"),
            ("BACKEND_ANON_KEY", "anon"),
        ]))
        .unwrap();

        assert_eq!(config.backend_url, "https://db.example.com");
        assert_eq!(config.functions_url, "https://db.example.com/functions/v1");
        assert_eq!(config.stats_view, DEFAULT_STATS_VIEW);
        assert_eq!(config.user.roles, vec![Role::Instructor]);
        assert_eq!(config.context().access_token(Utc::now()).unwrap(), "anon");
    }

    #[test]
    fn test_missing_required_values() {
        let err = AppConfig::from_lookup(lookup(&[("BACKEND_URL", "https://x")])).unwrap_err();
        assert!(err.to_string().contains("BACKEND_ANON_KEY"));

        let err = AppConfig::from_lookup(lookup(&[
            ("BACKEND_URL", "  "),
            ("BACKEND_ANON_KEY", "anon"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("BACKEND_URL"));
    }

    #[test]
    fn test_roles_and_session() {
        let config = AppConfig::from_lookup(lookup(&[
            ("BACKEND_URL", "https://x"),
            ("BACKEND_ANON_KEY", "anon"),
            ("BACKEND_ACCESS_TOKEN", "user-jwt"),
            ("APP_ROLES", "admin, director"),
            ("SESSION_EXPIRES_AT", "2020-01-01T00:00:00Z"),
        ]))
        .unwrap();

        assert_eq!(config.user.roles, vec![Role::Admin, Role::Director]);
        assert!(matches!(
            config.context().access_token(Utc::now()),
            Err(Error::SessionExpired)
        ));
    }

    #[test]
    fn test_rejects_unknown_role() {
        let result = AppConfig::from_lookup(lookup(&[
            ("BACKEND_URL", "https://x"),
            ("BACKEND_ANON_KEY", "anon"),
            ("APP_ROLES", "admin,student"),
        ]));
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
