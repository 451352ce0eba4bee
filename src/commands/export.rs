use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};

use taskdeck::db::Database;
use taskdeck::models::{Project, Task};
use taskdeck::projects;

use crate::commands::user::require_admin;

#[derive(Serialize, Deserialize)]
pub struct ExportedProject {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub progress: f64,
    pub tasks: Vec<ExportedTask>,
}

#[derive(Serialize, Deserialize)]
pub struct ExportedTask {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub assigned_to: i64,
    pub status: String,
    pub comments: Vec<ExportedComment>,
}

#[derive(Serialize, Deserialize)]
pub struct ExportedComment {
    pub author: String,
    pub content: String,
    pub created_at: String,
}

#[derive(Serialize, Deserialize)]
pub struct ExportData {
    pub version: i32,
    pub exported_at: String,
    pub projects: Vec<ExportedProject>,
}

fn export_task(db: &Database, task: &Task) -> Result<ExportedTask> {
    let comments = db.list_comments(task.id)?;

    Ok(ExportedTask {
        id: task.id,
        name: task.name.clone(),
        description: task.description.clone(),
        assigned_to: task.assigned_to,
        status: task.status.to_string(),
        comments: comments
            .into_iter()
            .map(|c| ExportedComment {
                author: c.author,
                content: c.content,
                created_at: c.created_at.to_rfc3339(),
            })
            .collect(),
    })
}

fn export_project(db: &Database, project: &Project) -> Result<ExportedProject> {
    let tasks = db.list_tasks(project.id, None)?;

    Ok(ExportedProject {
        id: project.id,
        name: project.name.clone(),
        description: project.description.clone(),
        progress: projects::progress(db, project.id)?,
        tasks: tasks
            .iter()
            .map(|t| export_task(db, t))
            .collect::<Result<Vec<_>>>()?,
    })
}

/// Full dump of every project with its tasks and comments. Admin only:
/// the export ignores the per-member visibility filter.
pub fn run_json(db: &Database, output_path: Option<&str>, actor: &str) -> Result<()> {
    require_admin(db, actor)?;

    let exported: Vec<ExportedProject> = projects::list_projects(db)?
        .iter()
        .map(|p| export_project(db, p))
        .collect::<Result<Vec<_>>>()?;

    let data = ExportData {
        version: 1,
        exported_at: chrono::Utc::now().to_rfc3339(),
        projects: exported,
    };

    let json = serde_json::to_string_pretty(&data)?;

    match output_path {
        Some(path) => {
            fs::write(path, json).context("Failed to write export file")?;
            eprintln!("Exported {} projects to {}", data.projects.len(), path);
        }
        None => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{}", json)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskdeck::auth;
    use taskdeck::models::{Role, TaskStatus};
    use tempfile::tempdir;

    fn setup_test_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(&db_path).unwrap();
        auth::ensure_default_admin(&db).unwrap();
        (db, dir)
    }

    #[test]
    fn test_export_task_with_comments() {
        let (db, _dir) = setup_test_db();
        let alice = auth::create_user(&db, "alice", "pw", None, None, Role::Member).unwrap();
        let project = db.create_project("P", "d").unwrap();
        let id = db.create_task(project, "Ship it", "desc", alice.id).unwrap();
        db.add_comment(id, alice.id, "first").unwrap();
        db.add_comment(id, alice.id, "second").unwrap();

        let task = db.get_task(id).unwrap().unwrap();
        let exported = export_task(&db, &task).unwrap();
        assert_eq!(exported.name, "Ship it");
        assert_eq!(exported.status, "New");
        assert_eq!(exported.comments.len(), 2);
        assert_eq!(exported.comments[0].author, "alice");
    }

    #[test]
    fn test_export_uses_display_status_labels() {
        let (db, _dir) = setup_test_db();
        let alice = auth::create_user(&db, "alice", "pw", None, None, Role::Member).unwrap();
        let project = db.create_project("P", "d").unwrap();
        let id = db.create_task(project, "T", "d", alice.id).unwrap();
        db.set_task_status(id, TaskStatus::InProgress).unwrap();

        let task = db.get_task(id).unwrap().unwrap();
        let exported = export_task(&db, &task).unwrap();
        assert_eq!(exported.status, "In-Progress");
    }

    #[test]
    fn test_run_json_to_file() {
        let (db, dir) = setup_test_db();
        let alice = auth::create_user(&db, "alice", "pw", None, None, Role::Member).unwrap();
        let p1 = db.create_project("P1", "d").unwrap();
        db.create_project("P2", "d").unwrap();
        let t1 = db.create_task(p1, "T1", "d", alice.id).unwrap();
        db.create_task(p1, "T2", "d", alice.id).unwrap();
        db.set_task_status(t1, TaskStatus::Closed).unwrap();

        let output_path = dir.path().join("export.json");
        run_json(&db, Some(output_path.to_str().unwrap()), "admin").unwrap();

        let content = fs::read_to_string(&output_path).unwrap();
        let data: ExportData = serde_json::from_str(&content).unwrap();
        assert_eq!(data.version, 1);
        assert_eq!(data.projects.len(), 2);
        assert_eq!(data.projects[0].tasks.len(), 2);
        assert_eq!(data.projects[0].progress, 0.5);
        assert!(data.projects[1].tasks.is_empty());
    }

    #[test]
    fn test_run_json_requires_admin() {
        let (db, dir) = setup_test_db();
        auth::create_user(&db, "alice", "pw", None, None, Role::Member).unwrap();

        let output_path = dir.path().join("export.json");
        let result = run_json(&db, Some(output_path.to_str().unwrap()), "alice");
        assert!(result.is_err());
        assert!(!output_path.exists());
    }
}
