use rusqlite::{params, Connection, ErrorCode, OptionalExtension};

use crate::db::models::User;

#[derive(Debug, thiserror::Error)]
pub enum UserInsertError {
    #[error("That email is already registered")]
    EmailTaken,

    #[error("That username is already taken")]
    UsernameTaken,

    #[error("SQL error: {0}")]
    Sql(#[from] rusqlite::Error),
}

/// Insert a user. Uniqueness is enforced by the schema; the constraint
/// message tells which column collided.
pub fn insert_user(
    conn: &Connection,
    email: &str,
    username: &str,
    password_hash: &str,
) -> Result<i64, UserInsertError> {
    let result = conn.execute(
        "INSERT INTO users (email, username, password) VALUES (?1, ?2, ?3)",
        params![email, username, password_hash],
    );

    match result {
        Ok(_) => Ok(conn.last_insert_rowid()),
        Err(rusqlite::Error::SqliteFailure(err, Some(msg)))
            if err.code == ErrorCode::ConstraintViolation =>
        {
            if msg.contains("users.email") {
                Err(UserInsertError::EmailTaken)
            } else if msg.contains("users.username") {
                Err(UserInsertError::UsernameTaken)
            } else {
                Err(rusqlite::Error::SqliteFailure(err, Some(msg)).into())
            }
        }
        Err(e) => Err(e.into()),
    }
}

fn map_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        username: row.get(2)?,
        password_hash: row.get(3)?,
    })
}

pub fn find_by_username(conn: &Connection, username: &str) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        "SELECT id, email, username, password FROM users WHERE username = ?1",
        params![username],
        map_user,
    )
    .optional()
}

pub fn find_by_email(conn: &Connection, email: &str) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        "SELECT id, email, username, password FROM users WHERE email = ?1",
        params![email],
        map_user,
    )
    .optional()
}

/// Login accepts either handle; anything containing `@` is treated as an
/// email. Emails are stored lowercased.
pub fn find_by_login(conn: &Connection, login: &str) -> rusqlite::Result<Option<User>> {
    if login.contains('@') {
        find_by_email(conn, &login.to_lowercase())
    } else {
        find_by_username(conn, login)
    }
}

#[cfg(test)]
fn count(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
}
