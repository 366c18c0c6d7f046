use axum::extract::{Query, State};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;

use crate::db::posts;
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::routes::parse_id;
use crate::state::AppState;
use crate::votes::{self, Direction, VoteTarget};

#[derive(Deserialize)]
pub struct LikeQuery {
    pub post_id: Option<String>,
    pub like: Option<String>,
}

#[derive(Deserialize)]
pub struct CommentLikeQuery {
    #[serde(rename = "Comment_id")]
    pub comment_id: Option<String>,
    pub post_id: Option<String>,
    pub like: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/Like", get(like_post))
        .route("/CommentLike", get(like_comment))
}

fn parse_direction(raw: Option<&str>) -> AppResult<Direction> {
    raw.ok_or_else(|| AppError::BadRequest("Missing like direction".into()))?
        .parse()
        .map_err(|e: votes::InvalidDirection| AppError::BadRequest(e.to_string()))
}

/// GET /Like?post_id=&like={1,-1}
async fn like_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<LikeQuery>,
) -> AppResult<Response> {
    let post_id = parse_id(query.post_id.as_deref(), "post id")?;
    let direction = parse_direction(query.like.as_deref())?;

    let outcome = {
        let mut conn = state.db.get()?;
        votes::cast_vote(&mut conn, VoteTarget::Post(post_id), user.id, direction)?
    };
    tracing::info!(
        "User {} voted {:?} on post {}: {:?} -> {:?}",
        user.username,
        direction,
        post_id,
        outcome.previous,
        outcome.current
    );

    Ok(Redirect::to(&format!("/Post?id={}", post_id)).into_response())
}

/// GET /CommentLike?Comment_id=&post_id=&like={1,-1}
async fn like_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<CommentLikeQuery>,
) -> AppResult<Response> {
    let comment_id = parse_id(query.comment_id.as_deref(), "comment id")?;
    let post_id = parse_id(query.post_id.as_deref(), "post id")?;
    let direction = parse_direction(query.like.as_deref())?;

    let outcome = {
        let mut conn = state.db.get()?;
        // The comment must belong to the post it is voted from.
        if posts::comment_post_id(&conn, comment_id)? != Some(post_id) {
            return Err(AppError::NotFound);
        }
        votes::cast_vote(
            &mut conn,
            VoteTarget::Comment(comment_id),
            user.id,
            direction,
        )?
    };
    tracing::info!(
        "User {} voted {:?} on comment {}: {:?} -> {:?}",
        user.username,
        direction,
        comment_id,
        outcome.previous,
        outcome.current
    );

    Ok(Redirect::to(&format!("/Post?id={}#comment-{}", post_id, comment_id)).into_response())
}
