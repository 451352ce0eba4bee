use anyhow::{bail, Result};
use std::io::{self, Write};

use taskdeck::db::Database;
use taskdeck::models::TaskStatus;
use taskdeck::notify::{ChannelOutcome, ChannelRequest, Notifier};
use taskdeck::tasks;

use crate::commands::user::{require_admin, resolve};

#[allow(clippy::too_many_arguments)]
pub fn create(
    db: &Database,
    project_id: i64,
    name: &str,
    description: &str,
    assignee: &str,
    notify_email: bool,
    notify_in_app: bool,
    notify_sms: bool,
    actor: &str,
) -> Result<()> {
    require_admin(db, actor)?;

    if name.is_empty() || description.is_empty() {
        bail!("Task name and description are required");
    }

    let assignee = resolve(db, assignee)?;
    let requested = ChannelRequest {
        email: notify_email,
        in_app: notify_in_app,
        sms: notify_sms,
    };

    let notifier = Notifier::with_stubs(db);
    let (task, outcomes) = tasks::create_task(
        db,
        &notifier,
        project_id,
        name,
        description,
        assignee.id,
        requested,
    )?;

    println!("Created task '{}' (#{})", task.name, task.id);
    for (channel, outcome) in outcomes {
        match outcome {
            ChannelOutcome::Sent => println!("Notified assignee via {}", channel.as_str()),
            ChannelOutcome::Failed(reason) => {
                println!("Warning: {} notification failed: {}", channel.as_str(), reason)
            }
        }
    }
    Ok(())
}

pub fn list(db: &Database, project_id: i64, actor: &str) -> Result<()> {
    let actor = resolve(db, actor)?;
    let visible = tasks::list_tasks(db, project_id, actor.id)?;

    if visible.is_empty() {
        println!("No tasks found.");
        return Ok(());
    }

    for task in visible {
        println!(
            "#{:<4} [{}] {:<40} assignee #{}",
            task.id,
            task.status,
            truncate(&task.name, 40),
            task.assigned_to
        );
    }

    Ok(())
}

pub fn show(db: &Database, id: i64, actor: &str) -> Result<()> {
    let actor = resolve(db, actor)?;
    let task = match db.get_task(id)? {
        Some(t) => t,
        None => bail!("Task #{} not found", id),
    };

    println!("#{} {} (Status: {})", task.id, task.name, task.status);
    println!("Assigned to: #{}", task.assigned_to);
    println!();
    println!("{}", task.description);

    let comments = db.list_comments(id)?;
    if !comments.is_empty() {
        println!();
        println!("Comments:");
        for comment in comments {
            println!(
                "  {} ({}): {}",
                comment.author,
                comment.created_at.format("%Y-%m-%d %H:%M"),
                comment.content
            );
        }
    }

    let targets = tasks::allowed_targets(actor.role, task.status);
    if targets.is_empty() {
        println!();
        println!("Read-only for {}.", actor.username);
    } else {
        let names: Vec<&str> = targets.iter().map(|s| s.as_str()).collect();
        println!();
        println!("Available statuses: {}", names.join(", "));
    }

    Ok(())
}

pub fn status(db: &Database, id: i64, status: &str, actor: &str) -> Result<()> {
    let Some(new_status) = TaskStatus::parse(status) else {
        let names: Vec<&str> = TaskStatus::ALL.iter().map(|s| s.as_str()).collect();
        bail!(
            "Invalid status '{}'. Must be one of: {}",
            status,
            names.join(", ")
        );
    };

    let actor = resolve(db, actor)?;
    let task = tasks::update_status(db, id, new_status, actor.id)?;
    println!("Task #{} is now {}", task.id, task.status);
    Ok(())
}

pub fn describe(db: &Database, id: i64, description: &str) -> Result<()> {
    tasks::update_description(db, id, description)?;
    println!("Updated task #{}", id);
    Ok(())
}

pub fn delete(db: &Database, id: i64, force: bool, actor: &str) -> Result<()> {
    require_admin(db, actor)?;

    let task = match db.get_task(id)? {
        Some(t) => t,
        None => bail!("Task #{} not found", id),
    };

    if !force {
        print!("Delete task #{} \"{}\"? [y/N] ", id, task.name);
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Cancelled.");
            return Ok(());
        }
    }

    tasks::delete_task(db, id)?;
    println!("Deleted task #{}", id);
    Ok(())
}

fn truncate(s: &str, max_chars: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max_chars {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_chars - 3).collect();
        format!("{}...", truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskdeck::auth;
    use taskdeck::models::Role;
    use tempfile::tempdir;

    fn setup_test_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(&db_path).unwrap();
        auth::ensure_default_admin(&db).unwrap();
        auth::create_user(&db, "alice", "pw", None, None, Role::Member).unwrap();
        (db, dir)
    }

    #[test]
    fn test_create_requires_admin_and_fields() {
        let (db, _dir) = setup_test_db();
        let project = db.create_project("P", "d").unwrap();

        assert!(create(&db, project, "T", "d", "alice", false, true, false, "admin").is_ok());
        assert!(create(&db, project, "T", "d", "alice", false, true, false, "alice").is_err());
        assert!(create(&db, project, "", "d", "alice", false, true, false, "admin").is_err());
    }

    #[test]
    fn test_status_rejects_unknown_label() {
        let (db, _dir) = setup_test_db();
        let project = db.create_project("P", "d").unwrap();
        create(&db, project, "T", "d", "alice", false, false, false, "admin").unwrap();

        let result = status(&db, 1, "Done", "alice");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid status"));
    }

    #[test]
    fn test_delete_force() {
        let (db, _dir) = setup_test_db();
        let project = db.create_project("P", "d").unwrap();
        create(&db, project, "T", "d", "alice", false, false, false, "admin").unwrap();

        assert!(delete(&db, 1, true, "alice").is_err());
        assert!(delete(&db, 1, true, "admin").is_ok());
        assert!(db.get_task(1).unwrap().is_none());
    }

    #[test]
    fn test_status_gate_errors_are_reported() {
        let (db, _dir) = setup_test_db();
        let project = db.create_project("P", "d").unwrap();
        create(&db, project, "T", "d", "alice", false, false, false, "admin").unwrap();

        // No comments yet
        let result = status(&db, 1, "Completed", "alice");
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("comment is required"));
    }
}
