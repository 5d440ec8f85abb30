//! SQLite-backed user directory and task store.
//!
//! Every task query and mutation is owner-scoped at the SQL level: the
//! owner id is part of the WHERE clause, so a foreign or unknown id is
//! indistinguishable from a missing row.

use crate::errors::{AppError, FieldErrors};
use crate::forms::ValidatedTask;
use crate::models::{Task, User};
use bcrypt::{hash, DEFAULT_COST};
use chrono::Utc;
use log::{error, info};
use rusqlite::{params, Connection, ErrorCode, Row};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Shared connection handle handed to handlers through `web::Data`.
pub type Db = Arc<Mutex<Connection>>;

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS users (
    id            INTEGER PRIMARY KEY AUTOINCREMENT,
    username      TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    created_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tasks (
    id          TEXT PRIMARY KEY,
    title       TEXT NOT NULL,
    description TEXT,
    complete    INTEGER NOT NULL DEFAULT 0,
    owner       INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_tasks_owner ON tasks(owner);
";

const TASK_SELECT_SQL: &str = "SELECT
    id,
    title,
    description,
    complete,
    owner,
    created_at
FROM tasks";

/// Opens the database file and prepares the schema.
pub fn open_db(path: impl AsRef<Path>) -> Result<Connection, AppError> {
    info!("event=db_open module=db status=start mode=file");
    let mut conn = Connection::open(path).inspect_err(|err| {
        error!("event=db_open module=db status=error mode=file error={err}");
    })?;
    bootstrap_connection(&mut conn)?;
    info!("event=db_open module=db status=ok mode=file");
    Ok(conn)
}

/// Opens an in-memory database with the schema applied. Used by tests.
pub fn open_db_in_memory() -> Result<Connection, AppError> {
    let mut conn = Connection::open_in_memory()?;
    bootstrap_connection(&mut conn)?;
    Ok(conn)
}

pub fn into_shared(conn: Connection) -> Db {
    Arc::new(Mutex::new(conn))
}

fn bootstrap_connection(conn: &mut Connection) -> Result<(), AppError> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_secs(5))?;
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

/// Inserts a new user, hashing the credential with bcrypt.
///
/// A username collision surfaces as a field error on `username`; the
/// UNIQUE constraint guarantees no partial row persists.
pub fn create_user(conn: &Connection, username: &str, password: &str) -> Result<User, AppError> {
    let password_hash = hash(password, DEFAULT_COST)
        .map_err(|err| AppError::Internal(format!("bcrypt hash failed: {err}")))?;
    let created_at = Utc::now().to_rfc3339();

    let inserted = conn.execute(
        "INSERT INTO users (username, password_hash, created_at) VALUES (?1, ?2, ?3);",
        params![username, password_hash, created_at],
    );
    match inserted {
        Ok(_) => Ok(User {
            id: conn.last_insert_rowid(),
            username: username.to_string(),
            password_hash,
            created_at,
        }),
        Err(rusqlite::Error::SqliteFailure(err, _))
            if err.code == ErrorCode::ConstraintViolation =>
        {
            Err(AppError::Validation(FieldErrors::single(
                "username",
                "A user with that username already exists.",
            )))
        }
        Err(err) => Err(err.into()),
    }
}

pub fn find_user(conn: &Connection, username: &str) -> Result<Option<User>, AppError> {
    let mut stmt = conn.prepare(
        "SELECT id, username, password_hash, created_at FROM users WHERE username = ?1;",
    )?;
    let mut rows = stmt.query([username])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(User {
            id: row.get("id")?,
            username: row.get("username")?,
            password_hash: row.get("password_hash")?,
            created_at: row.get("created_at")?,
        }));
    }
    Ok(None)
}

/// Inserts a task owned by `owner`. The id is assigned here, never by the caller.
pub fn insert_task(conn: &Connection, owner: i64, input: &ValidatedTask) -> Result<Task, AppError> {
    let task = Task {
        id: Uuid::new_v4(),
        title: input.title.clone(),
        description: input.description.clone(),
        complete: input.complete,
        owner,
        created_at: Utc::now().to_rfc3339(),
    };
    conn.execute(
        "INSERT INTO tasks (id, title, description, complete, owner, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
        params![
            task.id.to_string(),
            task.title,
            task.description,
            task.complete,
            task.owner,
            task.created_at,
        ],
    )?;
    Ok(task)
}

pub fn get_task(conn: &Connection, owner: i64, id: Uuid) -> Result<Option<Task>, AppError> {
    let sql = format!("{TASK_SELECT_SQL} WHERE id = ?1 AND owner = ?2;");
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query(params![id.to_string(), owner])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(task_from_row(row)?));
    }
    Ok(None)
}

/// Lists all tasks for `owner`, open tasks first, newest first.
pub fn list_tasks(conn: &Connection, owner: i64) -> Result<Vec<Task>, AppError> {
    let sql = format!(
        "{TASK_SELECT_SQL} WHERE owner = ?1 ORDER BY complete ASC, created_at DESC, id ASC;"
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([owner])?;
    let mut tasks = Vec::new();
    while let Some(row) = rows.next()? {
        tasks.push(task_from_row(row)?);
    }
    Ok(tasks)
}

/// Counts the owner's incomplete tasks, independent of any search filter.
pub fn count_incomplete(conn: &Connection, owner: i64) -> Result<i64, AppError> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM tasks WHERE owner = ?1 AND complete = 0;",
        [owner],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Replaces title/description/complete of an owned task. The owner column
/// is never part of the update.
pub fn update_task(
    conn: &Connection,
    owner: i64,
    id: Uuid,
    input: &ValidatedTask,
) -> Result<(), AppError> {
    let changed = conn.execute(
        "UPDATE tasks
         SET title = ?3, description = ?4, complete = ?5
         WHERE id = ?1 AND owner = ?2;",
        params![
            id.to_string(),
            owner,
            input.title,
            input.description,
            input.complete,
        ],
    )?;
    if changed == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}

pub fn delete_task(conn: &Connection, owner: i64, id: Uuid) -> Result<(), AppError> {
    let changed = conn.execute(
        "DELETE FROM tasks WHERE id = ?1 AND owner = ?2;",
        params![id.to_string(), owner],
    )?;
    if changed == 0 {
        return Err(AppError::NotFound);
    }
    Ok(())
}

fn task_from_row(row: &Row<'_>) -> Result<Task, AppError> {
    let id_text: String = row.get("id")?;
    let id = Uuid::parse_str(&id_text)
        .map_err(|_| AppError::Internal(format!("invalid uuid value `{id_text}` in tasks.id")))?;
    Ok(Task {
        id,
        title: row.get("title")?,
        description: row.get("description")?,
        complete: row.get("complete")?,
        owner: row.get("owner")?,
        created_at: row.get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::ValidatedTask;

    fn task_input(title: &str, complete: bool) -> ValidatedTask {
        ValidatedTask {
            title: title.to_string(),
            description: None,
            complete,
        }
    }

    #[test]
    fn create_and_find_user_round_trip() {
        let conn = open_db_in_memory().expect("in-memory db should open");
        let created = create_user(&conn, "alice", "correct-horse").expect("insert should succeed");

        let found = find_user(&conn, "alice")
            .expect("lookup should succeed")
            .expect("alice should exist");
        assert_eq!(found.id, created.id);
        assert_ne!(found.password_hash, "correct-horse");
        assert!(find_user(&conn, "nobody")
            .expect("lookup should succeed")
            .is_none());
    }

    #[test]
    fn duplicate_username_is_a_field_error_and_persists_nothing() {
        let conn = open_db_in_memory().expect("in-memory db should open");
        create_user(&conn, "alice", "correct-horse").expect("first insert should succeed");

        let err = create_user(&conn, "alice", "other-password")
            .expect_err("duplicate username must fail");
        match err {
            AppError::Validation(errors) => assert_eq!(errors.errors[0].field, "username"),
            other => panic!("expected validation error, got {other}"),
        }

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM users WHERE username = 'alice';",
                [],
                |row| row.get(0),
            )
            .expect("count should succeed");
        assert_eq!(count, 1);
    }

    #[test]
    fn tasks_are_scoped_to_their_owner() {
        let conn = open_db_in_memory().expect("in-memory db should open");
        let alice = create_user(&conn, "alice", "correct-horse").expect("insert alice");
        let bob = create_user(&conn, "bob", "correct-horse").expect("insert bob");

        let task =
            insert_task(&conn, alice.id, &task_input("Buy milk", false)).expect("insert task");

        // Bob sees nothing of Alice's task, through any operation.
        assert!(get_task(&conn, bob.id, task.id)
            .expect("get should succeed")
            .is_none());
        assert!(list_tasks(&conn, bob.id)
            .expect("list should succeed")
            .is_empty());
        assert!(matches!(
            update_task(&conn, bob.id, task.id, &task_input("Stolen", true)),
            Err(AppError::NotFound)
        ));
        assert!(matches!(
            delete_task(&conn, bob.id, task.id),
            Err(AppError::NotFound)
        ));

        // And the task is untouched for Alice.
        let still_there = get_task(&conn, alice.id, task.id)
            .expect("get should succeed")
            .expect("task should still exist");
        assert_eq!(still_there.title, "Buy milk");
        assert!(!still_there.complete);
    }

    #[test]
    fn update_replaces_mutable_fields_only() {
        let conn = open_db_in_memory().expect("in-memory db should open");
        let alice = create_user(&conn, "alice", "correct-horse").expect("insert alice");
        let task =
            insert_task(&conn, alice.id, &task_input("Buy milk", false)).expect("insert task");

        update_task(
            &conn,
            alice.id,
            task.id,
            &ValidatedTask {
                title: "Buy oat milk".to_string(),
                description: Some("the barista kind".to_string()),
                complete: true,
            },
        )
        .expect("update should succeed");

        let updated = get_task(&conn, alice.id, task.id)
            .expect("get should succeed")
            .expect("task should exist");
        assert_eq!(updated.title, "Buy oat milk");
        assert_eq!(updated.description.as_deref(), Some("the barista kind"));
        assert!(updated.complete);
        assert_eq!(updated.owner, alice.id);
    }

    #[test]
    fn delete_removes_the_row() {
        let conn = open_db_in_memory().expect("in-memory db should open");
        let alice = create_user(&conn, "alice", "correct-horse").expect("insert alice");
        let task =
            insert_task(&conn, alice.id, &task_input("Buy milk", false)).expect("insert task");

        delete_task(&conn, alice.id, task.id).expect("delete should succeed");
        assert!(get_task(&conn, alice.id, task.id)
            .expect("get should succeed")
            .is_none());
        assert!(matches!(
            delete_task(&conn, alice.id, task.id),
            Err(AppError::NotFound)
        ));
    }

    #[test]
    fn incomplete_count_ignores_complete_tasks() {
        let conn = open_db_in_memory().expect("in-memory db should open");
        let alice = create_user(&conn, "alice", "correct-horse").expect("insert alice");
        let bob = create_user(&conn, "bob", "correct-horse").expect("insert bob");

        insert_task(&conn, alice.id, &task_input("Buy milk", false)).expect("insert");
        insert_task(&conn, alice.id, &task_input("Walk dog", false)).expect("insert");
        insert_task(&conn, alice.id, &task_input("File taxes", true)).expect("insert");
        insert_task(&conn, bob.id, &task_input("Bob's errand", false)).expect("insert");

        assert_eq!(count_incomplete(&conn, alice.id).expect("count"), 2);
        assert_eq!(count_incomplete(&conn, bob.id).expect("count"), 1);
    }

    #[test]
    fn list_orders_open_tasks_first() {
        let conn = open_db_in_memory().expect("in-memory db should open");
        let alice = create_user(&conn, "alice", "correct-horse").expect("insert alice");

        insert_task(&conn, alice.id, &task_input("Done already", true)).expect("insert");
        insert_task(&conn, alice.id, &task_input("Still open", false)).expect("insert");

        let tasks = list_tasks(&conn, alice.id).expect("list should succeed");
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].title, "Still open");
        assert_eq!(tasks[1].title, "Done already");
    }

    #[test]
    fn file_backed_store_survives_reopen() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let path = dir.path().join("tasknest-test.db");

        let task_id = {
            let conn = open_db(&path).expect("file db should open");
            let alice = create_user(&conn, "alice", "correct-horse").expect("insert alice");
            insert_task(&conn, alice.id, &task_input("Buy milk", false))
                .expect("insert task")
                .id
        };

        let conn = open_db(&path).expect("file db should reopen");
        let alice = find_user(&conn, "alice")
            .expect("lookup should succeed")
            .expect("alice should persist");
        let task = get_task(&conn, alice.id, task_id)
            .expect("get should succeed")
            .expect("task should persist");
        assert_eq!(task.title, "Buy milk");
    }
}
