use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, ToSql};
use std::path::Path;

use crate::error::{Error, Result};
use crate::models::{
    Comment, Notification, NotificationSettings, Project, Role, Task, TaskStatus, User,
};

const SCHEMA_VERSION: i32 = 1;

impl ToSql for TaskStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

impl FromSql for TaskStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        TaskStatus::parse(s).ok_or_else(|| FromSqlError::Other(format!("unknown task status '{s}'").into()))
    }
}

/// Row-level access to the relational store. Policy (role gates, comment
/// gates, channel gating) lives in the service modules; this layer only
/// reads and writes rows.
pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        let version: i32 = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?;

        if version < SCHEMA_VERSION {
            self.conn.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS users (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    username TEXT NOT NULL UNIQUE,
                    password_hash TEXT NOT NULL,
                    is_admin INTEGER NOT NULL DEFAULT 0,
                    email TEXT,
                    phone TEXT
                );

                CREATE TABLE IF NOT EXISTS projects (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    description TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS tasks (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    project_id INTEGER NOT NULL,
                    name TEXT NOT NULL,
                    description TEXT NOT NULL,
                    assigned_to INTEGER NOT NULL,
                    status TEXT NOT NULL DEFAULT 'New',
                    FOREIGN KEY (project_id) REFERENCES projects(id) ON DELETE CASCADE,
                    FOREIGN KEY (assigned_to) REFERENCES users(id)
                );

                CREATE TABLE IF NOT EXISTS comments (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    task_id INTEGER NOT NULL,
                    author_id INTEGER NOT NULL,
                    content TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    FOREIGN KEY (task_id) REFERENCES tasks(id) ON DELETE CASCADE,
                    FOREIGN KEY (author_id) REFERENCES users(id)
                );

                CREATE TABLE IF NOT EXISTS notifications (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    recipient_id INTEGER NOT NULL,
                    message TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    FOREIGN KEY (recipient_id) REFERENCES users(id)
                );

                CREATE TABLE IF NOT EXISTS notification_settings (
                    id INTEGER PRIMARY KEY CHECK (id = 1),
                    email INTEGER NOT NULL,
                    in_app INTEGER NOT NULL,
                    sms INTEGER NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_tasks_project ON tasks(project_id);
                CREATE INDEX IF NOT EXISTS idx_tasks_assignee ON tasks(assigned_to);
                CREATE INDEX IF NOT EXISTS idx_comments_task ON comments(task_id);
                CREATE INDEX IF NOT EXISTS idx_notifications_recipient ON notifications(recipient_id);
                "#,
            )?;

            self.conn
                .execute(&format!("PRAGMA user_version = {}", SCHEMA_VERSION), [])?;
        }

        // Enable foreign keys (required for comment cascade on task delete)
        self.conn.execute("PRAGMA foreign_keys = ON", [])?;

        Ok(())
    }

    // Users

    pub fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        role: Role,
        email: Option<&str>,
        phone: Option<&str>,
    ) -> Result<i64> {
        let result = self.conn.execute(
            "INSERT INTO users (username, password_hash, is_admin, email, phone) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![username, password_hash, role.is_admin() as i64, email, phone],
        );
        match result {
            Ok(_) => Ok(self.conn.last_insert_rowid()),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(Error::UsernameConflict(username.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn get_user(&self, id: i64) -> Result<Option<User>> {
        let user = self
            .conn
            .query_row(
                "SELECT id, username, is_admin, email, phone FROM users WHERE id = ?1",
                [id],
                map_user,
            )
            .optional()?;
        Ok(user)
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let user = self
            .conn
            .query_row(
                "SELECT id, username, is_admin, email, phone FROM users WHERE username = ?1",
                [username],
                map_user,
            )
            .optional()?;
        Ok(user)
    }

    /// User row plus stored password hash, for credential verification.
    pub fn credential_for(&self, username: &str) -> Result<Option<(User, String)>> {
        let row = self
            .conn
            .query_row(
                "SELECT id, username, is_admin, email, phone, password_hash FROM users WHERE username = ?1",
                [username],
                |row| Ok((map_user(row)?, row.get::<_, String>(5)?)),
            )
            .optional()?;
        Ok(row)
    }

    /// Non-admin accounts, for assignee pickers.
    pub fn list_members(&self) -> Result<Vec<User>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, username, is_admin, email, phone FROM users WHERE is_admin = 0 ORDER BY id",
        )?;
        let users = stmt
            .query_map([], map_user)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(users)
    }

    pub fn admin_ids(&self) -> Result<Vec<i64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id FROM users WHERE is_admin = 1 ORDER BY id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<i64>, _>>()?;
        Ok(ids)
    }

    pub fn has_admin(&self) -> Result<bool> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM users WHERE is_admin = 1", [], |row| {
                    row.get(0)
                })?;
        Ok(count > 0)
    }

    // Projects

    pub fn create_project(&self, name: &str, description: &str) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO projects (name, description) VALUES (?1, ?2)",
            params![name, description],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_project(&self, id: i64) -> Result<Option<Project>> {
        let project = self
            .conn
            .query_row(
                "SELECT id, name, description FROM projects WHERE id = ?1",
                [id],
                map_project,
            )
            .optional()?;
        Ok(project)
    }

    pub fn list_projects(&self) -> Result<Vec<Project>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, description FROM projects ORDER BY id")?;
        let projects = stmt
            .query_map([], map_project)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(projects)
    }

    /// (total, done) task counts for a project. Done means Completed or
    /// Closed.
    pub fn project_task_counts(&self, project_id: i64) -> Result<(i64, i64)> {
        let total: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM tasks WHERE project_id = ?1",
            [project_id],
            |row| row.get(0),
        )?;
        let done: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM tasks WHERE project_id = ?1 AND status IN ('Completed', 'Closed')",
            [project_id],
            |row| row.get(0),
        )?;
        Ok((total, done))
    }

    // Tasks

    pub fn create_task(
        &self,
        project_id: i64,
        name: &str,
        description: &str,
        assigned_to: i64,
    ) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO tasks (project_id, name, description, assigned_to, status) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![project_id, name, description, assigned_to, TaskStatus::New],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_task(&self, id: i64) -> Result<Option<Task>> {
        let task = self
            .conn
            .query_row(
                "SELECT id, project_id, name, description, assigned_to, status FROM tasks WHERE id = ?1",
                [id],
                map_task,
            )
            .optional()?;
        Ok(task)
    }

    /// Tasks in a project. `visible_to` restricts the result to one
    /// assignee; `None` returns everything (admin view). The filter is
    /// applied in the query, not on the result.
    pub fn list_tasks(&self, project_id: i64, visible_to: Option<i64>) -> Result<Vec<Task>> {
        let sql = "SELECT id, project_id, name, description, assigned_to, status FROM tasks \
                   WHERE project_id = ?1";
        let tasks = match visible_to {
            None => {
                let mut stmt = self.conn.prepare(&format!("{sql} ORDER BY id"))?;
                let rows = stmt
                    .query_map([project_id], map_task)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
            Some(user_id) => {
                let mut stmt = self
                    .conn
                    .prepare(&format!("{sql} AND assigned_to = ?2 ORDER BY id"))?;
                let rows = stmt
                    .query_map(params![project_id, user_id], map_task)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
        };
        Ok(tasks)
    }

    pub fn set_task_status(&self, id: i64, status: TaskStatus) -> Result<bool> {
        let rows = self.conn.execute(
            "UPDATE tasks SET status = ?1 WHERE id = ?2",
            params![status, id],
        )?;
        Ok(rows > 0)
    }

    /// Status update plus in-app notification records in one transaction,
    /// so a crash cannot apply the transition without recording the
    /// broadcast. `recipients` may be empty.
    pub fn set_task_status_notifying(
        &self,
        id: i64,
        status: TaskStatus,
        recipients: &[i64],
        message: &str,
    ) -> Result<bool> {
        let tx = self.conn.unchecked_transaction()?;
        let rows = tx.execute(
            "UPDATE tasks SET status = ?1 WHERE id = ?2",
            params![status, id],
        )?;
        if rows > 0 {
            let now = Utc::now().to_rfc3339();
            for recipient in recipients {
                tx.execute(
                    "INSERT INTO notifications (recipient_id, message, created_at) VALUES (?1, ?2, ?3)",
                    params![recipient, message, now],
                )?;
            }
        }
        tx.commit()?;
        Ok(rows > 0)
    }

    pub fn set_task_description(&self, id: i64, description: &str) -> Result<bool> {
        let rows = self.conn.execute(
            "UPDATE tasks SET description = ?1 WHERE id = ?2",
            params![description, id],
        )?;
        Ok(rows > 0)
    }

    /// Comments go with the task via the foreign key cascade.
    pub fn delete_task(&self, id: i64) -> Result<bool> {
        let rows = self.conn.execute("DELETE FROM tasks WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }

    // Comments

    pub fn add_comment(&self, task_id: i64, author_id: i64, content: &str) -> Result<i64> {
        self.add_comment_at(task_id, author_id, content, Utc::now())
    }

    pub fn add_comment_at(
        &self,
        task_id: i64,
        author_id: i64,
        content: &str,
        created_at: DateTime<Utc>,
    ) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO comments (task_id, author_id, content, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![task_id, author_id, content, created_at.to_rfc3339()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_comment(&self, id: i64) -> Result<Option<Comment>> {
        let comment = self
            .conn
            .query_row(
                "SELECT c.id, c.task_id, c.author_id, u.username, c.content, c.created_at \
                 FROM comments c JOIN users u ON c.author_id = u.id WHERE c.id = ?1",
                [id],
                map_comment,
            )
            .optional()?;
        Ok(comment)
    }

    /// Newest first; equal timestamps keep insertion order.
    pub fn list_comments(&self, task_id: i64) -> Result<Vec<Comment>> {
        let mut stmt = self.conn.prepare(
            "SELECT c.id, c.task_id, c.author_id, u.username, c.content, c.created_at \
             FROM comments c JOIN users u ON c.author_id = u.id \
             WHERE c.task_id = ?1 ORDER BY c.created_at DESC, c.id ASC",
        )?;
        let comments = stmt
            .query_map([task_id], map_comment)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(comments)
    }

    pub fn comment_count(&self, task_id: i64) -> Result<i64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM comments WHERE task_id = ?1",
            [task_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // Notifications

    pub fn add_notification(&self, recipient_id: i64, message: &str) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO notifications (recipient_id, message, created_at) VALUES (?1, ?2, ?3)",
            params![recipient_id, message, Utc::now().to_rfc3339()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn list_notifications(&self, recipient_id: i64) -> Result<Vec<Notification>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, recipient_id, message, created_at FROM notifications \
             WHERE recipient_id = ?1 ORDER BY created_at DESC, id DESC",
        )?;
        let notifications = stmt
            .query_map([recipient_id], |row| {
                Ok(Notification {
                    id: row.get(0)?,
                    recipient_id: row.get(1)?,
                    message: row.get(2)?,
                    created_at: parse_datetime(row.get::<_, String>(3)?),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(notifications)
    }

    // Notification settings

    /// Singleton row, inserted with defaults on first read.
    pub fn notification_settings(&self) -> Result<NotificationSettings> {
        let settings = self
            .conn
            .query_row(
                "SELECT email, in_app, sms FROM notification_settings WHERE id = 1",
                [],
                |row| {
                    Ok(NotificationSettings {
                        email: row.get::<_, i64>(0)? != 0,
                        in_app: row.get::<_, i64>(1)? != 0,
                        sms: row.get::<_, i64>(2)? != 0,
                    })
                },
            )
            .optional()?;

        match settings {
            Some(s) => Ok(s),
            None => {
                let defaults = NotificationSettings::default();
                self.conn.execute(
                    "INSERT INTO notification_settings (id, email, in_app, sms) VALUES (1, ?1, ?2, ?3)",
                    params![defaults.email as i64, defaults.in_app as i64, defaults.sms as i64],
                )?;
                Ok(defaults)
            }
        }
    }

    pub fn update_notification_settings(&self, settings: NotificationSettings) -> Result<()> {
        // Read first so the row exists
        self.notification_settings()?;
        self.conn.execute(
            "UPDATE notification_settings SET email = ?1, in_app = ?2, sms = ?3 WHERE id = 1",
            params![
                settings.email as i64,
                settings.in_app as i64,
                settings.sms as i64
            ],
        )?;
        Ok(())
    }
}

fn map_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        role: if row.get::<_, i64>(2)? != 0 {
            Role::Admin
        } else {
            Role::Member
        },
        email: row.get(3)?,
        phone: row.get(4)?,
    })
}

fn map_project(row: &rusqlite::Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
    })
}

fn map_task(row: &rusqlite::Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        project_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        assigned_to: row.get(4)?,
        status: row.get(5)?,
    })
}

fn map_comment(row: &rusqlite::Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        task_id: row.get(1)?,
        author_id: row.get(2)?,
        author: row.get(3)?,
        content: row.get(4)?,
        created_at: parse_datetime(row.get::<_, String>(5)?),
    })
}

fn parse_datetime(s: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}
