use anyhow::{bail, Result};

use taskdeck::auth;
use taskdeck::db::Database;
use taskdeck::error::Error;
use taskdeck::models::{Role, User};

/// Resolves a username to a user row or fails with a friendly message.
pub fn resolve(db: &Database, username: &str) -> Result<User> {
    match db.get_user_by_username(username)? {
        Some(user) => Ok(user),
        None => bail!("No such user '{}'", username),
    }
}

pub fn require_admin(db: &Database, username: &str) -> Result<User> {
    let user = resolve(db, username)?;
    if !user.role.is_admin() {
        bail!("'{}' is not an admin", username);
    }
    Ok(user)
}

pub fn login(db: &Database, username: &str, password: &str) -> Result<()> {
    match auth::verify_credential(db, username, password) {
        Ok(user) => {
            let role = if user.role.is_admin() { "admin" } else { "member" };
            println!("Welcome, {} ({})", user.username, role);
            Ok(())
        }
        Err(Error::InvalidCredential) => bail!("Invalid username or password"),
        Err(e) => Err(e.into()),
    }
}

pub fn create(
    db: &Database,
    username: &str,
    password: &str,
    email: Option<&str>,
    phone: Option<&str>,
    admin: bool,
    actor: &str,
) -> Result<()> {
    require_admin(db, actor)?;

    let role = if admin { Role::Admin } else { Role::Member };
    match auth::create_user(db, username, password, email, phone, role) {
        Ok(user) => {
            println!("Created user '{}' (#{})", user.username, user.id);
            Ok(())
        }
        Err(Error::UsernameConflict(_)) => bail!("Username '{}' already exists", username),
        Err(e) => Err(e.into()),
    }
}

pub fn list(db: &Database) -> Result<()> {
    let members = db.list_members()?;

    if members.is_empty() {
        println!("No members found.");
        return Ok(());
    }

    for member in members {
        println!(
            "#{:<4} {:<20} {}",
            member.id,
            member.username,
            member.email.as_deref().unwrap_or("-")
        );
    }

    Ok(())
}

pub fn inbox(db: &Database, username: &str) -> Result<()> {
    let user = resolve(db, username)?;
    let notifications = db.list_notifications(user.id)?;

    if notifications.is_empty() {
        println!("No notifications.");
        return Ok(());
    }

    for n in notifications {
        println!("[{}] {}", n.created_at.format("%Y-%m-%d %H:%M"), n.message);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn setup_test_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(&db_path).unwrap();
        auth::ensure_default_admin(&db).unwrap();
        (db, dir)
    }

    #[test]
    fn test_create_requires_admin_actor() {
        let (db, _dir) = setup_test_db();
        create(&db, "alice", "pw", None, None, false, "admin").unwrap();

        let result = create(&db, "bob", "pw", None, None, false, "alice");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("not an admin"));
    }

    #[test]
    fn test_create_duplicate_username_fails() {
        let (db, _dir) = setup_test_db();
        create(&db, "alice", "pw", None, None, false, "admin").unwrap();

        let result = create(&db, "alice", "pw2", None, None, false, "admin");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("already exists"));
    }

    #[test]
    fn test_login_messages() {
        let (db, _dir) = setup_test_db();
        create(&db, "alice", "hunter2", None, None, false, "admin").unwrap();

        assert!(login(&db, "alice", "hunter2").is_ok());
        assert!(login(&db, "alice", "wrong").is_err());
        assert!(login(&db, "ghost", "whatever").is_err());
    }
}
