use anyhow::Result;

use taskdeck::db::Database;
use taskdeck::models::NotificationSettings;

use crate::commands::user::require_admin;

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

pub fn show(db: &Database) -> Result<()> {
    let settings = db.notification_settings()?;
    println!("email:  {}", on_off(settings.email));
    println!("in-app: {}", on_off(settings.in_app));
    println!("sms:    {}", on_off(settings.sms));
    Ok(())
}

/// Unset flags keep their current value.
pub fn set(
    db: &Database,
    email: Option<bool>,
    in_app: Option<bool>,
    sms: Option<bool>,
    actor: &str,
) -> Result<()> {
    require_admin(db, actor)?;

    let current = db.notification_settings()?;
    let updated = NotificationSettings {
        email: email.unwrap_or(current.email),
        in_app: in_app.unwrap_or(current.in_app),
        sms: sms.unwrap_or(current.sms),
    };
    db.update_notification_settings(updated)?;

    println!("Notification settings updated");
    show(db)
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
        (db, dir)
    }

    #[test]
    fn test_set_requires_admin() {
        let (db, _dir) = setup_test_db();
        auth::create_user(&db, "alice", "pw", None, None, Role::Member).unwrap();

        assert!(set(&db, Some(false), None, None, "alice").is_err());
        assert!(set(&db, Some(false), None, None, "admin").is_ok());
        assert!(!db.notification_settings().unwrap().email);
    }

    #[test]
    fn test_unset_flags_keep_current_values() {
        let (db, _dir) = setup_test_db();

        set(&db, None, None, Some(true), "admin").unwrap();

        let settings = db.notification_settings().unwrap();
        assert!(settings.email);
        assert!(settings.in_app);
        assert!(settings.sms);
    }
}
