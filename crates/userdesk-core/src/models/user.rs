use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity record of a registered user.
///
/// Never used as an authorization source on the client; only the access
/// credential gates access.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub email: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Soft-deletion timestamp, absent for live accounts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// One-line summary for listings
    pub fn display_line(&self) -> String {
        let status = if self.is_deleted() {
            "deleted"
        } else if self.is_active {
            "active"
        } else {
            "disabled"
        };
        format!("#{:<5} {:<20} {:<32} {}", self.id, self.username, self.email, status)
    }
}

/// Partial user update. Absent fields are left untouched by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateUser {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

impl UpdateUser {
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && self.password.is_none()
            && self.is_active.is_none()
    }
}

/// One page of `GET /users`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsersPage {
    pub users: Vec<User>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

impl UsersPage {
    pub fn total_pages(&self) -> u64 {
        if self.limit == 0 {
            return 0;
        }
        self.total.div_ceil(u64::from(self.limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_user_without_deleted_at() {
        let json = r#"{"id":7,"username":"ada","email":"ada@example.com","is_active":true,"created_at":"2024-03-01T10:00:00Z","updated_at":"2024-03-02T11:30:00Z"}"#;
        let user: User = serde_json::from_str(json).expect("Failed to parse user JSON");
        assert_eq!(user.id, 7);
        assert_eq!(user.username, "ada");
        assert!(user.is_active);
        assert!(!user.is_deleted());
    }

    #[test]
    fn test_parse_user_with_null_deleted_at() {
        let json = r#"{"id":1,"username":"bob","email":"bob@example.com","is_active":false,"created_at":"2024-03-01T10:00:00+02:00","updated_at":"2024-03-01T10:00:00+02:00","deleted_at":null}"#;
        let user: User = serde_json::from_str(json).expect("Failed to parse user JSON");
        assert_eq!(user.deleted_at, None);
        assert!(user.display_line().ends_with("disabled"));
    }

    #[test]
    fn test_update_user_omits_absent_fields() {
        let update = UpdateUser {
            email: Some("new@example.com".to_string()),
            is_active: Some(false),
            ..Default::default()
        };
        let json = serde_json::to_value(&update).expect("serialize");
        assert_eq!(json, serde_json::json!({"email": "new@example.com", "is_active": false}));
        assert!(!update.is_empty());
        assert!(UpdateUser::default().is_empty());
    }

    #[test]
    fn test_total_pages() {
        let page = UsersPage { users: vec![], total: 21, page: 1, limit: 10 };
        assert_eq!(page.total_pages(), 3);
        let empty = UsersPage { users: vec![], total: 0, page: 1, limit: 10 };
        assert_eq!(empty.total_pages(), 0);
    }
}
