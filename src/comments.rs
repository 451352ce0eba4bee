//! Append-only comment thread per task. Posting notifies all admins;
//! listing is newest first.

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::Comment;
use crate::notify::Notifier;

/// Appends a comment with a server-assigned timestamp, then broadcasts
/// to admins. Empty content is accepted.
pub fn post_comment(
    db: &Database,
    notifier: &Notifier<'_>,
    task_id: i64,
    author_id: i64,
    content: &str,
) -> Result<Comment> {
    let task = db.get_task(task_id)?.ok_or(Error::TaskNotFound(task_id))?;
    let author = db
        .get_user(author_id)?
        .ok_or(Error::UserNotFound(author_id))?;

    let id = db.add_comment(task_id, author_id, content)?;
    notifier.notify_admins(&format!(
        "New comment on task '{}' by {}",
        task.name, author.username
    ))?;

    db.get_comment(id)?.ok_or(Error::Store(
        rusqlite::Error::QueryReturnedNoRows,
    ))
}

/// Newest first; equal timestamps keep insertion order. Returns an empty
/// sequence for unknown or deleted tasks.
pub fn list_comments(db: &Database, task_id: i64) -> Result<Vec<Comment>> {
    db.list_comments(task_id)
}
