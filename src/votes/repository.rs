// Applies the vote state machine to SQLite. Every write goes through one
// IMMEDIATE transaction so the read of the current vote and the write of
// the next one cannot interleave with another writer.
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use crate::votes::domain::{Direction, TargetKind, Tally, VoteOutcome, VoteState, VoteTarget};

#[derive(Debug, thiserror::Error)]
pub enum VoteError {
    #[error("{0} does not exist")]
    TargetNotFound(String),

    #[error("SQL error: {0}")]
    Sql(#[from] rusqlite::Error),
}

/// Record `direction` from `user_id` on `target`, toggling per
/// [`VoteState::apply`].
pub fn cast_vote(
    conn: &mut Connection,
    target: VoteTarget,
    user_id: i64,
    direction: Direction,
) -> Result<VoteOutcome, VoteError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let exists: bool = tx.query_row(
        &format!(
            "SELECT COUNT(*) > 0 FROM {} WHERE id = ?1",
            target.target_table()
        ),
        params![target.id()],
        |row| row.get(0),
    )?;
    if !exists {
        return Err(VoteError::TargetNotFound(target.to_string()));
    }

    let previous = current_state(&tx, target, user_id)?;
    let current = previous.apply(direction);

    match current.flag() {
        Some(flag) => {
            tx.execute(
                &format!(
                    "INSERT INTO {table} ({col}, user_id, is_like) VALUES (?1, ?2, ?3)
                     ON CONFLICT({col}, user_id) DO UPDATE SET is_like = excluded.is_like",
                    table = target.vote_table(),
                    col = target.vote_column(),
                ),
                params![target.id(), user_id, flag],
            )?;
        }
        None => {
            tx.execute(
                &format!(
                    "DELETE FROM {} WHERE {} = ?1 AND user_id = ?2",
                    target.vote_table(),
                    target.vote_column()
                ),
                params![target.id(), user_id],
            )?;
        }
    }

    tx.commit()?;

    tracing::debug!(%target, user_id, ?previous, ?current, "vote recorded");
    Ok(VoteOutcome { previous, current })
}

fn current_state(conn: &Connection, target: VoteTarget, user_id: i64) -> rusqlite::Result<VoteState> {
    let flag: Option<i64> = conn
        .query_row(
            &format!(
                "SELECT is_like FROM {} WHERE {} = ?1 AND user_id = ?2",
                target.vote_table(),
                target.vote_column()
            ),
            params![target.id(), user_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(VoteState::from_flag(flag))
}

/// The viewer's vote on `target`.
pub fn vote_state(conn: &Connection, target: VoteTarget, user_id: i64) -> rusqlite::Result<VoteState> {
    current_state(conn, target, user_id)
}

/// Three SQL expressions for a `kind` row whose id is `id_expr`: like
/// count, dislike count, and the `viewer_expr` user's flag (NULL when they
/// have not voted). Listing queries splice this in per row; [`tally`] runs
/// it for a single target.
pub fn tally_columns(kind: TargetKind, id_expr: &str, viewer_expr: &str) -> String {
    let table = kind.vote_table();
    let col = kind.vote_column();
    format!(
        "(SELECT COUNT(*) FROM {table} v WHERE v.{col} = {id_expr} AND v.is_like = 1),
         (SELECT COUNT(*) FROM {table} v WHERE v.{col} = {id_expr} AND v.is_like = -1),
         (SELECT v.is_like FROM {table} v WHERE v.{col} = {id_expr} AND v.user_id = {viewer_expr})"
    )
}

/// Count likes and dislikes for `target`. Not cached; computed per view.
pub fn tally(conn: &Connection, target: VoteTarget) -> rusqlite::Result<Tally> {
    conn.query_row(
        &format!("SELECT {}", tally_columns(target.kind(), "?1", "0")),
        params![target.id()],
        |row| {
            Ok(Tally {
                likes: row.get(0)?,
                dislikes: row.get(1)?,
            })
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;

    /// Two users, one post by alice, one comment by bob.
    fn seeded(conn: &Connection) {
        conn.execute_batch(
            "INSERT INTO users (email, username, password) VALUES ('a@x.io', 'alice', 'h');
             INSERT INTO users (email, username, password) VALUES ('b@x.io', 'bob', 'h');
             INSERT INTO posts (user_id, title, content, category) VALUES (1, 'Hi', 'Body', 'General');
             INSERT INTO comments (post_id, user_id, content) VALUES (1, 2, 'Reply');",
        )
        .unwrap();
    }

    fn rows_for(conn: &Connection, target: VoteTarget, user_id: i64) -> i64 {
        conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE {} = ?1 AND user_id = ?2",
                target.vote_table(),
                target.vote_column()
            ),
            params![target.id(), user_id],
            |row| row.get(0),
        )
        .unwrap()
    }

    #[test]
    fn like_then_like_again_clears_the_vote() {
        let pool = memory_pool();
        let mut conn = pool.get().unwrap();
        seeded(&conn);
        let post = VoteTarget::Post(1);

        let first = cast_vote(&mut conn, post, 2, Direction::Like).unwrap();
        assert_eq!(first.previous, VoteState::None);
        assert_eq!(first.current, VoteState::Liked);

        let second = cast_vote(&mut conn, post, 2, Direction::Like).unwrap();
        assert_eq!(second.current, VoteState::None);
        assert_eq!(rows_for(&conn, post, 2), 0);
        assert_eq!(tally(&conn, post).unwrap(), Tally::default());
    }

    #[test]
    fn switching_moves_one_count_to_the_other() {
        let pool = memory_pool();
        let mut conn = pool.get().unwrap();
        seeded(&conn);
        let post = VoteTarget::Post(1);

        cast_vote(&mut conn, post, 1, Direction::Like).unwrap();
        cast_vote(&mut conn, post, 2, Direction::Like).unwrap();
        let before = tally(&conn, post).unwrap();
        assert_eq!(before, Tally { likes: 2, dislikes: 0 });

        let outcome = cast_vote(&mut conn, post, 2, Direction::Dislike).unwrap();
        assert_eq!(outcome.previous, VoteState::Liked);
        assert_eq!(outcome.current, VoteState::Disliked);

        let after = tally(&conn, post).unwrap();
        assert_eq!(after.likes, before.likes - 1);
        assert_eq!(after.dislikes, before.dislikes + 1);
        assert_eq!(rows_for(&conn, post, 2), 1);
    }

    #[test]
    fn every_sequence_leaves_at_most_one_row_matching_the_model() {
        let pool = memory_pool();
        let mut conn = pool.get().unwrap();
        seeded(&conn);
        let directions = [Direction::Like, Direction::Dislike];

        for target in [VoteTarget::Post(1), VoteTarget::Comment(1)] {
            // All sequences of length 1..=4.
            for len in 1..=4u32 {
                for mask in 0..(1u32 << len) {
                    let mut model = VoteState::None;
                    for step in 0..len {
                        let direction = directions[((mask >> step) & 1) as usize];
                        let outcome = cast_vote(&mut conn, target, 1, direction).unwrap();
                        assert_eq!(outcome.previous, model);
                        model = model.apply(direction);
                        assert_eq!(outcome.current, model);
                    }

                    assert!(rows_for(&conn, target, 1) <= 1);
                    assert_eq!(vote_state(&conn, target, 1).unwrap(), model);

                    // Reset for the next sequence.
                    conn.execute(
                        &format!("DELETE FROM {}", target.vote_table()),
                        [],
                    )
                    .unwrap();
                }
            }
        }
    }

    #[test]
    fn missing_target_is_rejected_without_writes() {
        let pool = memory_pool();
        let mut conn = pool.get().unwrap();
        seeded(&conn);

        let err = cast_vote(&mut conn, VoteTarget::Post(42), 1, Direction::Like).unwrap_err();
        assert!(matches!(err, VoteError::TargetNotFound(_)));

        let err = cast_vote(&mut conn, VoteTarget::Comment(42), 1, Direction::Dislike).unwrap_err();
        assert!(matches!(err, VoteError::TargetNotFound(_)));

        let total: i64 = conn
            .query_row(
                "SELECT (SELECT COUNT(*) FROM likes) + (SELECT COUNT(*) FROM commentlikes)",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(total, 0);
    }

    #[test]
    fn post_and_comment_votes_are_independent() {
        let pool = memory_pool();
        let mut conn = pool.get().unwrap();
        seeded(&conn);

        cast_vote(&mut conn, VoteTarget::Post(1), 1, Direction::Dislike).unwrap();
        cast_vote(&mut conn, VoteTarget::Comment(1), 1, Direction::Like).unwrap();

        assert_eq!(
            tally(&conn, VoteTarget::Post(1)).unwrap(),
            Tally { likes: 0, dislikes: 1 }
        );
        assert_eq!(
            tally(&conn, VoteTarget::Comment(1)).unwrap(),
            Tally { likes: 1, dislikes: 0 }
        );
        assert_eq!(
            vote_state(&conn, VoteTarget::Comment(1), 2).unwrap(),
            VoteState::None
        );
    }

    #[test]
    fn concurrent_votes_serialize_to_the_model() {
        const THREADS: usize = 6;
        const VOTES_EACH: usize = 5;

        let tmp = tempfile::tempdir().unwrap();
        let pool = crate::db::create_pool(&tmp.path().join("forum.db")).unwrap();
        crate::db::run_migrations(&pool).unwrap();
        seeded(&pool.get().unwrap());

        for target in [VoteTarget::Post(1), VoteTarget::Comment(1)] {
            let outcomes: Vec<VoteOutcome> = std::thread::scope(|scope| {
                let workers: Vec<_> = (0..THREADS)
                    .map(|_| {
                        let pool = pool.clone();
                        scope.spawn(move || {
                            let mut conn = pool.get().unwrap();
                            (0..VOTES_EACH)
                                .map(|_| cast_vote(&mut conn, target, 2, Direction::Like).unwrap())
                                .collect::<Vec<_>>()
                        })
                    })
                    .collect();
                workers
                    .into_iter()
                    .flat_map(|w| w.join().unwrap())
                    .collect()
            });

            let total = THREADS * VOTES_EACH;
            let expected = (0..total).fold(VoteState::None, |state, _| state.apply(Direction::Like));

            let conn = pool.get().unwrap();
            assert!(rows_for(&conn, target, 2) <= 1);
            assert_eq!(vote_state(&conn, target, 2).unwrap(), expected);

            // Serialized toggles alternate None -> Liked -> None, so exactly
            // half of the votes (rounded up) saw no prior vote.
            let from_none = outcomes
                .iter()
                .filter(|o| o.previous == VoteState::None)
                .count();
            assert_eq!(outcomes.len(), total);
            assert_eq!(from_none, (total + 1) / 2);
            assert!(outcomes.iter().all(|o| o.current == o.previous.apply(Direction::Like)));
        }
    }
}
