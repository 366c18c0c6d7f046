use askama::Template;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::db::models::{Category, PostSummary};
use crate::db::posts::{self, PostFilter};
use crate::db::categories;
use crate::error::AppResult;
use crate::extractors::MaybeUser;
use crate::state::AppState;

/// One listing page: the home feed, a category, or a user's own/liked posts.
#[derive(Template)]
#[template(path = "pages/feed.html")]
pub struct FeedTemplate {
    pub username: Option<String>,
    pub heading: String,
    pub empty_message: String,
    pub posts: Vec<PostSummary>,
    pub categories: Vec<Category>,
}

/// Wrapper to render askama templates as axum responses
pub struct Html<T: Template>(pub T);

impl<T: Template> IntoResponse for Html<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(body) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                body,
            )
                .into_response(),
            Err(e) => {
                tracing::error!("Template render error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
            }
        }
    }
}

/// Build a feed page for `filter` as seen by `viewer`.
pub fn feed(
    state: &AppState,
    viewer: &MaybeUser,
    filter: PostFilter<'_>,
    heading: impl Into<String>,
    empty_message: impl Into<String>,
) -> AppResult<Html<FeedTemplate>> {
    let conn = state.db.get()?;
    let posts = posts::list_posts(&conn, filter, viewer.id())?;
    let categories = categories::all(&conn)?;

    Ok(Html(FeedTemplate {
        username: viewer.username(),
        heading: heading.into(),
        empty_message: empty_message.into(),
        posts,
        categories,
    }))
}

/// GET /
pub async fn index(
    State(state): State<AppState>,
    viewer: MaybeUser,
) -> AppResult<Html<FeedTemplate>> {
    feed(
        &state,
        &viewer,
        PostFilter::All,
        "Latest posts",
        "Nothing here yet. Be the first to post!",
    )
}
