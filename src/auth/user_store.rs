//! Identity Store
//! Mission: Own user and role records with SQLite-enforced uniqueness

use crate::auth::models::{Role, User};
use chrono::Utc;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::time::Duration;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

/// Store-level failures. Conflict and not-found variants are recoverable
/// and reported verbatim to callers.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("username already taken")]
    UsernameConflict,
    #[error("role already exists")]
    RoleConflict,
    #[error("user not found")]
    UserNotFound,
    #[error("role not found")]
    RoleNotFound,
    #[error(transparent)]
    Db(#[from] rusqlite::Error),
}

/// Identity store with SQLite backend. Opens a connection per call;
/// uniqueness under concurrent writes is enforced by the database, not
/// by in-process locking.
#[derive(Debug, Clone)]
pub struct UserStore {
    db_path: String,
}

impl UserStore {
    /// Create a new store and initialize the schema.
    pub fn new(db_path: &str) -> Result<Self, StoreError> {
        let store = Self {
            db_path: db_path.to_string(),
        };
        store.init_db()?;
        Ok(store)
    }

    fn open(&self) -> Result<Connection, StoreError> {
        let conn = Connection::open(&self.db_path)?;
        // Concurrent writers wait out the file lock instead of failing
        // with SQLITE_BUSY.
        conn.busy_timeout(Duration::from_secs(5))?;
        Ok(conn)
    }

    /// Initialize database schema. Usernames are unique case-insensitively
    /// via NOCASE collation; role names are unique case-sensitively.
    fn init_db(&self) -> Result<(), StoreError> {
        let conn = self.open()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT NOT NULL COLLATE NOCASE UNIQUE,
                password_hash TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS roles (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL UNIQUE
            )",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS user_roles (
                user_id TEXT NOT NULL REFERENCES users(id),
                role_id TEXT NOT NULL REFERENCES roles(id),
                PRIMARY KEY (user_id, role_id)
            )",
            [],
        )?;

        Ok(())
    }

    /// Get user by username (case-insensitive).
    pub fn find_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let conn = self.open()?;

        let user = conn
            .query_row(
                "SELECT id, username, password_hash, created_at
                 FROM users WHERE username = ?1",
                params![username],
                row_to_user,
            )
            .optional()?;

        Ok(user)
    }

    /// Create a new user from an already-hashed credential.
    ///
    /// The UNIQUE constraint on `username` is the source of truth for
    /// duplicate detection: of two concurrent creates with the same name,
    /// exactly one succeeds and the other gets `UsernameConflict`.
    pub fn create_user(&self, username: &str, password_hash: &str) -> Result<User, StoreError> {
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now().to_rfc3339(),
        };

        let conn = self.open()?;
        let inserted = conn.execute(
            "INSERT INTO users (id, username, password_hash, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                user.id.to_string(),
                user.username,
                user.password_hash,
                user.created_at,
            ],
        );

        match inserted {
            Ok(_) => {
                info!(username = %user.username, "user created");
                Ok(user)
            }
            Err(e) if is_unique_violation(&e) => Err(StoreError::UsernameConflict),
            Err(e) => Err(e.into()),
        }
    }

    /// Create a new role.
    pub fn create_role(&self, name: &str) -> Result<Role, StoreError> {
        let role = Role {
            id: Uuid::new_v4(),
            name: name.to_string(),
        };

        let conn = self.open()?;
        let inserted = conn.execute(
            "INSERT INTO roles (id, name) VALUES (?1, ?2)",
            params![role.id.to_string(), role.name],
        );

        match inserted {
            Ok(_) => {
                info!(role = %role.name, "role created");
                Ok(role)
            }
            Err(e) if is_unique_violation(&e) => Err(StoreError::RoleConflict),
            Err(e) => Err(e.into()),
        }
    }

    /// Assign a role to a user. Already-assigned roles are a no-op.
    pub fn assign_role(&self, user_id: &Uuid, role_name: &str) -> Result<(), StoreError> {
        let conn = self.open()?;

        let user_exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1)",
            params![user_id.to_string()],
            |row| row.get(0),
        )?;
        if !user_exists {
            return Err(StoreError::UserNotFound);
        }

        let role_id: Option<String> = conn
            .query_row(
                "SELECT id FROM roles WHERE name = ?1",
                params![role_name],
                |row| row.get(0),
            )
            .optional()?;
        let Some(role_id) = role_id else {
            return Err(StoreError::RoleNotFound);
        };

        conn.execute(
            "INSERT OR IGNORE INTO user_roles (user_id, role_id) VALUES (?1, ?2)",
            params![user_id.to_string(), role_id],
        )?;

        Ok(())
    }

    /// Role names of a user, sorted. This is the snapshot embedded into
    /// tokens at issuance.
    pub fn roles_of(&self, user_id: &Uuid) -> Result<Vec<String>, StoreError> {
        let conn = self.open()?;

        let mut stmt = conn.prepare(
            "SELECT r.name FROM roles r
             JOIN user_roles ur ON ur.role_id = r.id
             WHERE ur.user_id = ?1
             ORDER BY r.name",
        )?;

        let roles = stmt
            .query_map(params![user_id.to_string()], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;

        Ok(roles)
    }

    /// List all users (admin surface).
    pub fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let conn = self.open()?;

        let mut stmt = conn.prepare(
            "SELECT id, username, password_hash, created_at FROM users ORDER BY username",
        )?;

        let users = stmt
            .query_map([], row_to_user)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(users)
    }
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let id: String = row.get(0)?;
    Ok(User {
        id: parse_uuid_col(0, &id)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn parse_uuid_col(idx: usize, raw: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _) if err.code == ErrorCode::ConstraintViolation
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn create_test_store() -> (UserStore, NamedTempFile) {
        let temp_file = NamedTempFile::new().unwrap();
        let db_path = temp_file.path().to_str().unwrap();
        let store = UserStore::new(db_path).unwrap();
        (store, temp_file)
    }

    #[test]
    fn test_create_and_retrieve_user() {
        let (store, _temp) = create_test_store();

        let created = store.create_user("alice", "hash1").unwrap();
        assert_eq!(created.username, "alice");

        let found = store.find_by_username("alice").unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.password_hash, "hash1");
    }

    #[test]
    fn test_username_lookup_is_case_insensitive() {
        let (store, _temp) = create_test_store();

        store.create_user("Alice", "hash1").unwrap();

        assert!(store.find_by_username("alice").unwrap().is_some());
        assert!(store.find_by_username("ALICE").unwrap().is_some());
        assert!(store.find_by_username("bob").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_username_conflicts_case_insensitively() {
        let (store, _temp) = create_test_store();

        store.create_user("alice", "hash1").unwrap();

        let dup = store.create_user("Alice", "hash2");
        assert!(matches!(dup, Err(StoreError::UsernameConflict)));
    }

    #[test]
    fn test_concurrent_creates_yield_one_conflict() {
        let (store, _temp) = create_test_store();

        let handles: Vec<_> = ["alice", "Alice"]
            .into_iter()
            .map(|name| {
                let store = store.clone();
                std::thread::spawn(move || store.create_user(name, "hash"))
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let successes = results.iter().filter(|r| r.is_ok()).count();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Err(StoreError::UsernameConflict)))
            .count();

        assert_eq!(successes, 1);
        assert_eq!(conflicts, 1);
    }

    #[test]
    fn test_role_assignment_and_membership() {
        let (store, _temp) = create_test_store();

        let user = store.create_user("alice", "hash").unwrap();
        store.create_role("Admin").unwrap();
        store.create_role("Editor").unwrap();

        store.assign_role(&user.id, "Admin").unwrap();
        store.assign_role(&user.id, "Editor").unwrap();
        // Assigning twice is a no-op
        store.assign_role(&user.id, "Admin").unwrap();

        let roles = store.roles_of(&user.id).unwrap();
        assert_eq!(roles, vec!["Admin", "Editor"]);
    }

    #[test]
    fn test_duplicate_role_conflicts() {
        let (store, _temp) = create_test_store();

        store.create_role("Admin").unwrap();
        assert!(matches!(
            store.create_role("Admin"),
            Err(StoreError::RoleConflict)
        ));
    }

    #[test]
    fn test_assign_role_missing_user_or_role() {
        let (store, _temp) = create_test_store();

        let user = store.create_user("alice", "hash").unwrap();

        assert!(matches!(
            store.assign_role(&user.id, "Ghost"),
            Err(StoreError::RoleNotFound)
        ));

        store.create_role("Admin").unwrap();
        assert!(matches!(
            store.assign_role(&Uuid::new_v4(), "Admin"),
            Err(StoreError::UserNotFound)
        ));
    }

    #[test]
    fn test_list_users() {
        let (store, _temp) = create_test_store();

        store.create_user("bob", "h").unwrap();
        store.create_user("alice", "h").unwrap();

        let users = store.list_users().unwrap();
        let names: Vec<_> = users.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, vec!["alice", "bob"]);
    }

    #[test]
    fn test_roles_of_user_without_roles_is_empty() {
        let (store, _temp) = create_test_store();

        let user = store.create_user("alice", "hash").unwrap();
        assert!(store.roles_of(&user.id).unwrap().is_empty());
    }
}
