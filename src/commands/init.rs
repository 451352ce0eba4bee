use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use taskdeck::auth;
use taskdeck::db::Database;

pub fn run(path: &Path) -> Result<()> {
    let taskdeck_dir = path.join(".taskdeck");

    if taskdeck_dir.exists() {
        println!("Already initialized at {}", path.display());
        return Ok(());
    }

    fs::create_dir_all(&taskdeck_dir).context("Failed to create .taskdeck directory")?;

    let db_path = taskdeck_dir.join("taskdeck.db");
    let db = Database::open(&db_path)?;
    if auth::ensure_default_admin(&db)? {
        println!(
            "Created default admin (username: {}, password: {}). Change the password.",
            auth::DEFAULT_ADMIN_USERNAME,
            auth::DEFAULT_ADMIN_PASSWORD
        );
    }

    println!("Created {}", taskdeck_dir.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_init_creates_dir_and_default_admin() {
        let dir = tempdir().unwrap();

        run(dir.path()).unwrap();

        let db = Database::open(&dir.path().join(".taskdeck/taskdeck.db")).unwrap();
        assert!(db.has_admin().unwrap());
    }

    #[test]
    fn test_init_twice_is_a_no_op() {
        let dir = tempdir().unwrap();

        run(dir.path()).unwrap();
        run(dir.path()).unwrap();

        let db = Database::open(&dir.path().join(".taskdeck/taskdeck.db")).unwrap();
        assert_eq!(db.admin_ids().unwrap().len(), 1);
    }
}
