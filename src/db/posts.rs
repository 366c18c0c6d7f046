use rusqlite::{params, Connection, OptionalExtension, ToSql};

use crate::db::models::{join_categories, split_categories, CommentSummary, PostSummary};
use crate::votes::{tally_columns, Tally, TargetKind, VoteState};

/// Which posts a listing shows.
#[derive(Debug, Clone, Copy)]
pub enum PostFilter<'a> {
    All,
    ByAuthor(i64),
    LikedBy(i64),
    Category(&'a str),
}

pub fn insert_post(
    conn: &Connection,
    user_id: i64,
    title: &str,
    content: &str,
    categories: &[String],
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO posts (user_id, title, content, category) VALUES (?1, ?2, ?3, ?4)",
        params![user_id, title, content, join_categories(categories)],
    )?;
    Ok(conn.last_insert_rowid())
}

// ?1 is always the viewer id (0 for anonymous, which never matches a user).
fn post_columns() -> String {
    format!(
        "SELECT p.id, u.username, p.title, p.content, p.category, p.created_at,
                {},
                (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id)
         FROM posts p
         JOIN users u ON u.id = p.user_id",
        tally_columns(TargetKind::Post, "p.id", "?1")
    )
}

fn map_post(row: &rusqlite::Row<'_>) -> rusqlite::Result<PostSummary> {
    let category: String = row.get(4)?;
    Ok(PostSummary {
        id: row.get(0)?,
        author: row.get(1)?,
        title: row.get(2)?,
        content: row.get(3)?,
        categories: split_categories(&category),
        created_at: row.get(5)?,
        tally: Tally {
            likes: row.get(6)?,
            dislikes: row.get(7)?,
        },
        viewer_vote: VoteState::from_flag(row.get(8)?),
        comment_count: row.get(9)?,
    })
}

pub fn list_posts(
    conn: &Connection,
    filter: PostFilter<'_>,
    viewer: Option<i64>,
) -> rusqlite::Result<Vec<PostSummary>> {
    let viewer = viewer.unwrap_or(0);

    let (clause, arg): (&str, Option<&dyn ToSql>) = match &filter {
        PostFilter::All => ("", None),
        PostFilter::ByAuthor(user_id) => (" WHERE p.user_id = ?2", Some(user_id as &dyn ToSql)),
        PostFilter::LikedBy(user_id) => (
            " WHERE EXISTS (SELECT 1 FROM likes l
                            WHERE l.post_id = p.id AND l.user_id = ?2 AND l.is_like = 1)",
            Some(user_id as &dyn ToSql),
        ),
        PostFilter::Category(name) => (
            " WHERE instr(',' || p.category || ',', ',' || ?2 || ',') > 0",
            Some(name as &dyn ToSql),
        ),
    };

    let sql = format!("{}{clause} ORDER BY p.id DESC", post_columns());
    let mut stmt = conn.prepare(&sql)?;
    let rows = match arg {
        Some(arg) => stmt.query_map(params![viewer, arg], map_post)?,
        None => stmt.query_map(params![viewer], map_post)?,
    };
    let posts = rows.collect::<Result<Vec<_>, _>>()?;
    Ok(posts)
}

pub fn get_post(
    conn: &Connection,
    post_id: i64,
    viewer: Option<i64>,
) -> rusqlite::Result<Option<PostSummary>> {
    let sql = format!("{} WHERE p.id = ?2", post_columns());
    conn.query_row(&sql, params![viewer.unwrap_or(0), post_id], map_post)
        .optional()
}

pub fn post_exists(conn: &Connection, post_id: i64) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM posts WHERE id = ?1",
        params![post_id],
        |row| row.get(0),
    )
}

pub fn insert_comment(
    conn: &Connection,
    post_id: i64,
    user_id: i64,
    content: &str,
) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO comments (post_id, user_id, content) VALUES (?1, ?2, ?3)",
        params![post_id, user_id, content],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn list_comments(
    conn: &Connection,
    post_id: i64,
    viewer: Option<i64>,
) -> rusqlite::Result<Vec<CommentSummary>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT c.id, c.post_id, u.username, c.content, c.created_at,
                {}
         FROM comments c
         JOIN users u ON u.id = c.user_id
         WHERE c.post_id = ?1
         ORDER BY c.id ASC",
        tally_columns(TargetKind::Comment, "c.id", "?2")
    ))?;

    let comments = stmt
        .query_map(params![post_id, viewer.unwrap_or(0)], |row| {
            Ok(CommentSummary {
                id: row.get(0)?,
                post_id: row.get(1)?,
                author: row.get(2)?,
                content: row.get(3)?,
                created_at: row.get(4)?,
                tally: Tally {
                    likes: row.get(5)?,
                    dislikes: row.get(6)?,
                },
                viewer_vote: VoteState::from_flag(row.get(7)?),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(comments)
}

/// The post a comment belongs to, if the comment exists.
pub fn comment_post_id(conn: &Connection, comment_id: i64) -> rusqlite::Result<Option<i64>> {
    conn.query_row(
        "SELECT post_id FROM comments WHERE id = ?1",
        params![comment_id],
        |row| row.get(0),
    )
    .optional()
}
