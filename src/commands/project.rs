use anyhow::{bail, Result};

use taskdeck::db::Database;
use taskdeck::projects;

use crate::commands::user::require_admin;

pub fn create(db: &Database, name: &str, description: &str, actor: &str) -> Result<()> {
    require_admin(db, actor)?;

    if name.is_empty() || description.is_empty() {
        bail!("Project name and description are required");
    }

    let project = projects::create_project(db, name, description)?;
    println!("Created project '{}' (#{})", project.name, project.id);
    Ok(())
}

pub fn list(db: &Database) -> Result<()> {
    let all = projects::list_projects(db)?;

    if all.is_empty() {
        println!("No projects found.");
        return Ok(());
    }

    for project in all {
        println!("#{:<4} {}", project.id, project.name);
    }

    Ok(())
}

pub fn show(db: &Database, id: i64) -> Result<()> {
    let project = match db.get_project(id)? {
        Some(p) => p,
        None => bail!("Project #{} not found", id),
    };
    let progress = projects::progress(db, id)?;

    println!("#{} {}", project.id, project.name);
    println!("{}", project.description);
    println!("Progress: {:.0}%", progress * 100.0);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskdeck::auth;
    use tempfile::tempdir;

    fn setup_test_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(&db_path).unwrap();
        auth::ensure_default_admin(&db).unwrap();
        (db, dir)
    }

    #[test]
    fn test_create_requires_admin() {
        let (db, _dir) = setup_test_db();
        auth::create_user(&db, "alice", "pw", None, None, taskdeck::models::Role::Member).unwrap();

        assert!(create(&db, "P", "desc", "admin").is_ok());
        assert!(create(&db, "Q", "desc", "alice").is_err());
    }

    #[test]
    fn test_create_rejects_empty_fields() {
        let (db, _dir) = setup_test_db();

        let result = create(&db, "", "desc", "admin");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("required"));
    }

    #[test]
    fn test_show_unknown_project() {
        let (db, _dir) = setup_test_db();

        let result = show(&db, 42);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("not found"));
    }
}
