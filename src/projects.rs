//! Project CRUD and progress. Progress is the share of tasks that are
//! Completed or Closed; a project with no tasks reports zero.

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::Project;

/// Access control is the caller's job: only the admin-facing surface
/// should offer project creation.
pub fn create_project(db: &Database, name: &str, description: &str) -> Result<Project> {
    let id = db.create_project(name, description)?;
    Ok(Project {
        id,
        name: name.to_string(),
        description: description.to_string(),
    })
}

pub fn list_projects(db: &Database) -> Result<Vec<Project>> {
    db.list_projects()
}

/// Completed-or-closed ratio in [0, 1].
pub fn progress(db: &Database, project_id: i64) -> Result<f64> {
    db.get_project(project_id)?
        .ok_or(Error::ProjectNotFound(project_id))?;
    let (total, done) = db.project_task_counts(project_id)?;
    if total == 0 {
        Ok(0.0)
    } else {
        Ok(done as f64 / total as f64)
    }
}
