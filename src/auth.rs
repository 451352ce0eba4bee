//! Identity and access: credential verification, user provisioning, role
//! lookup. Passwords are stored as salted Argon2id hashes in PHC string
//! format; the raw password never touches the store.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use tracing::warn;

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{Role, User};

pub const DEFAULT_ADMIN_USERNAME: &str = "admin";
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";
pub const DEFAULT_ADMIN_EMAIL: &str = "admin@example.com";

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| Error::Credential(e.to_string()))
}

fn verify_hash(password: &str, hash: &str) -> Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| Error::Credential(e.to_string()))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(Error::Credential(e.to_string())),
    }
}

/// Looks up the user and checks the password. Unknown username and wrong
/// password both come back as `InvalidCredential`, so a caller cannot
/// enumerate accounts from the response.
pub fn verify_credential(db: &Database, username: &str, password: &str) -> Result<User> {
    let Some((user, hash)) = db.credential_for(username)? else {
        return Err(Error::InvalidCredential);
    };
    if verify_hash(password, &hash)? {
        Ok(user)
    } else {
        Err(Error::InvalidCredential)
    }
}

pub fn create_user(
    db: &Database,
    username: &str,
    password: &str,
    email: Option<&str>,
    phone: Option<&str>,
    role: Role,
) -> Result<User> {
    let hash = hash_password(password)?;
    let id = db.create_user(username, &hash, role, email, phone)?;
    Ok(User {
        id,
        username: username.to_string(),
        role,
        email: email.map(str::to_string),
        phone: phone.map(str::to_string),
    })
}

pub fn is_admin(db: &Database, user_id: i64) -> Result<bool> {
    let user = db.get_user(user_id)?.ok_or(Error::UserNotFound(user_id))?;
    Ok(user.role.is_admin())
}

/// Startup invariant: the store must hold at least one admin. Provisions
/// the well-known default account when none exists and returns whether it
/// did so, letting the caller tell the operator to rotate the password.
pub fn ensure_default_admin(db: &Database) -> Result<bool> {
    if db.has_admin()? {
        return Ok(false);
    }
    create_user(
        db,
        DEFAULT_ADMIN_USERNAME,
        DEFAULT_ADMIN_PASSWORD,
        Some(DEFAULT_ADMIN_EMAIL),
        None,
        Role::Admin,
    )?;
    warn!(
        username = DEFAULT_ADMIN_USERNAME,
        "provisioned default admin account; change its password"
    );
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::tempdir;

    fn setup_test_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(&db_path).unwrap();
        (db, dir)
    }

    #[test]
    fn test_hash_is_salted() {
        let h1 = hash_password("hunter2").unwrap();
        let h2 = hash_password("hunter2").unwrap();
        assert!(h1.starts_with("$argon2id$"));
        assert_ne!(h1, h2);
    }

    #[test]
    fn test_verify_credential_ok() {
        let (db, _dir) = setup_test_db();
        create_user(&db, "alice", "hunter2", None, None, Role::Member).unwrap();

        let user = verify_credential(&db, "alice", "hunter2").unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(user.role, Role::Member);
    }

    #[test]
    fn test_verify_credential_wrong_password() {
        let (db, _dir) = setup_test_db();
        create_user(&db, "alice", "hunter2", None, None, Role::Member).unwrap();

        let result = verify_credential(&db, "alice", "hunter3");
        assert!(matches!(result, Err(Error::InvalidCredential)));
    }

    #[test]
    fn test_verify_credential_unknown_user_same_error() {
        let (db, _dir) = setup_test_db();

        let result = verify_credential(&db, "nobody", "whatever");
        assert!(matches!(result, Err(Error::InvalidCredential)));
    }

    #[test]
    fn test_duplicate_username_keeps_original_credential() {
        let (db, _dir) = setup_test_db();
        create_user(&db, "alice", "original", None, None, Role::Member).unwrap();

        let result = create_user(&db, "alice", "hijacked", None, None, Role::Admin);
        assert!(matches!(result, Err(Error::UsernameConflict(_))));

        // The original password still verifies
        assert!(verify_credential(&db, "alice", "original").is_ok());
        assert!(matches!(
            verify_credential(&db, "alice", "hijacked"),
            Err(Error::InvalidCredential)
        ));
    }

    #[test]
    fn test_is_admin() {
        let (db, _dir) = setup_test_db();
        let admin = create_user(&db, "root", "pw", None, None, Role::Admin).unwrap();
        let member = create_user(&db, "alice", "pw", None, None, Role::Member).unwrap();

        assert!(is_admin(&db, admin.id).unwrap());
        assert!(!is_admin(&db, member.id).unwrap());
        assert!(matches!(is_admin(&db, 999), Err(Error::UserNotFound(999))));
    }

    #[test]
    fn test_ensure_default_admin_provisions_once() {
        let (db, _dir) = setup_test_db();

        assert!(ensure_default_admin(&db).unwrap());
        assert!(!ensure_default_admin(&db).unwrap());
        assert_eq!(db.admin_ids().unwrap().len(), 1);

        let user =
            verify_credential(&db, DEFAULT_ADMIN_USERNAME, DEFAULT_ADMIN_PASSWORD).unwrap();
        assert!(user.role.is_admin());
    }

    #[test]
    fn test_ensure_default_admin_skipped_when_admin_exists() {
        let (db, _dir) = setup_test_db();
        create_user(&db, "root", "pw", None, None, Role::Admin).unwrap();

        assert!(!ensure_default_admin(&db).unwrap());
        assert!(db
            .get_user_by_username(DEFAULT_ADMIN_USERNAME)
            .unwrap()
            .is_none());
    }

    proptest! {
        // Argon2 is deliberately slow, so keep the case count down.
        #![proptest_config(ProptestConfig::with_cases(8))]

        #[test]
        fn prop_hash_verify_roundtrip(password in "[a-zA-Z0-9!@# ]{1,24}") {
            let hash = hash_password(&password).unwrap();
            prop_assert!(verify_hash(&password, &hash).unwrap());
        }
    }
}
