use rusqlite::{params, Connection, OptionalExtension};

use crate::db::models::Category;

/// Insert any configured categories that are not there yet. Names
/// containing `,` are skipped since posts store categories comma-delimited.
pub fn seed(conn: &Connection, names: &[String]) -> rusqlite::Result<usize> {
    let mut stmt = conn.prepare("INSERT OR IGNORE INTO categories (name) VALUES (?1)")?;
    let mut inserted = 0;
    for name in names.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
        if name.contains(',') {
            tracing::warn!("Skipping category {:?}: names cannot contain ','", name);
            continue;
        }
        inserted += stmt.execute(params![name])?;
    }
    Ok(inserted)
}

pub fn all(conn: &Connection) -> rusqlite::Result<Vec<Category>> {
    let mut stmt = conn.prepare("SELECT id, name FROM categories ORDER BY id")?;
    let categories = stmt
        .query_map([], |row| {
            Ok(Category {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(categories)
}

pub fn find_by_name(conn: &Connection, name: &str) -> rusqlite::Result<Option<Category>> {
    conn.query_row(
        "SELECT id, name FROM categories WHERE name = ?1",
        params![name],
        |row| {
            Ok(Category {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        },
    )
    .optional()
}
