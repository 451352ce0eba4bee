use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Account role. Fixed at creation; there is no role change operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Member,
    Admin,
}

impl Role {
    pub fn is_admin(self) -> bool {
        matches!(self, Role::Admin)
    }
}

/// Task lifecycle states. The set is closed; legality of a transition
/// depends on the actor's role and the comment gate (see `tasks`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    New,
    Opened,
    InProgress,
    Completed,
    Reopened,
    Closed,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 6] = [
        TaskStatus::New,
        TaskStatus::Opened,
        TaskStatus::InProgress,
        TaskStatus::Completed,
        TaskStatus::Reopened,
        TaskStatus::Closed,
    ];

    /// Display labels match what gets stored in the status column.
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::New => "New",
            TaskStatus::Opened => "Opened",
            TaskStatus::InProgress => "In-Progress",
            TaskStatus::Completed => "Completed",
            TaskStatus::Reopened => "Re-Opened",
            TaskStatus::Closed => "Closed",
        }
    }

    pub fn parse(s: &str) -> Option<TaskStatus> {
        TaskStatus::ALL
            .into_iter()
            .find(|st| st.as_str().eq_ignore_ascii_case(s))
    }

    /// Counts toward project progress.
    pub fn is_done(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Closed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub role: Role,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub project_id: i64,
    pub name: String,
    pub description: String,
    pub assigned_to: i64,
    pub status: TaskStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub task_id: i64,
    pub author_id: i64,
    pub author: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// In-app notification record. Append-only; there is no read/unread flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: i64,
    pub recipient_id: i64,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Global channel toggles. Singleton row, created lazily with these
/// defaults on first read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationSettings {
    pub email: bool,
    pub in_app: bool,
    pub sms: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        NotificationSettings {
            email: true,
            in_app: true,
            sms: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_labels_roundtrip() {
        for status in TaskStatus::ALL {
            assert_eq!(TaskStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn test_status_parse_case_insensitive() {
        assert_eq!(TaskStatus::parse("in-progress"), Some(TaskStatus::InProgress));
        assert_eq!(TaskStatus::parse("RE-OPENED"), Some(TaskStatus::Reopened));
    }

    #[test]
    fn test_status_parse_unknown() {
        assert_eq!(TaskStatus::parse("Done"), None);
        assert_eq!(TaskStatus::parse(""), None);
    }

    #[test]
    fn test_done_states() {
        assert!(TaskStatus::Completed.is_done());
        assert!(TaskStatus::Closed.is_done());
        assert!(!TaskStatus::Reopened.is_done());
        assert!(!TaskStatus::New.is_done());
    }

    #[test]
    fn test_default_settings() {
        let settings = NotificationSettings::default();
        assert!(settings.email);
        assert!(settings.in_app);
        assert!(!settings.sms);
    }
}
