use askama::Template;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use serde::Deserialize;

use crate::db::models::{CommentSummary, PostSummary};
use crate::db::posts::{self, PostFilter};
use crate::db::categories;
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, MaybeUser};
use crate::routes::home::{feed, FeedTemplate, Html};
use crate::routes::parse_id;
use crate::state::AppState;

const MAX_TITLE_CHARS: usize = 200;
const MAX_CONTENT_CHARS: usize = 10_000;
const MAX_COMMENT_CHARS: usize = 2_000;

// --- Templates ---

pub struct CategoryOption {
    pub name: String,
    pub checked: bool,
}

#[derive(Template)]
#[template(path = "pages/create_post.html")]
pub struct CreatePostTemplate {
    pub username: Option<String>,
    pub error: Option<String>,
    pub title: String,
    pub content: String,
    pub categories: Vec<CategoryOption>,
}

#[derive(Template)]
#[template(path = "pages/post.html")]
pub struct PostTemplate {
    pub username: Option<String>,
    pub post: PostSummary,
    pub comments: Vec<CommentSummary>,
    pub comment_error: Option<String>,
    pub comment_draft: String,
}

// --- Forms and queries ---

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct CreatePostForm {
    pub title: String,
    pub content: String,
    pub category: Vec<String>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct CommentForm {
    pub post_id: String,
    pub content: String,
}

#[derive(Deserialize)]
pub struct PostQuery {
    pub id: Option<String>,
}

#[derive(Deserialize)]
pub struct CategoryQuery {
    #[serde(rename = "Catagory")]
    pub category: Option<String>,
}

// --- Router ---

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/createPost", get(create_post_page).post(create_post))
        .route("/Post", get(view_post))
        .route("/myposts", get(my_posts))
        .route("/LikedPosts", get(liked_posts))
        .route("/CategoryViewer", get(category_viewer))
        .route("/Comment", post(create_comment))
}

// --- Create ---

fn category_options(state: &AppState, selected: &[String]) -> AppResult<Vec<CategoryOption>> {
    let conn = state.db.get()?;
    Ok(categories::all(&conn)?
        .into_iter()
        .map(|c| CategoryOption {
            checked: selected.contains(&c.name),
            name: c.name,
        })
        .collect())
}

async fn create_post_page(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Html<CreatePostTemplate>> {
    Ok(Html(CreatePostTemplate {
        username: Some(user.username),
        error: None,
        title: String::new(),
        content: String::new(),
        categories: category_options(&state, &[])?,
    }))
}

impl CreatePostForm {
    /// Trimmed title and content plus de-duplicated categories, or the
    /// message to show.
    fn validate(&self, known: &[CategoryOption]) -> Result<(String, String, Vec<String>), String> {
        let title = self.title.trim().to_string();
        let content = self.content.trim().to_string();

        if title.is_empty() || content.is_empty() {
            return Err("Title and content are required".into());
        }
        if title.chars().count() > MAX_TITLE_CHARS {
            return Err(format!("Title must be {} characters or less", MAX_TITLE_CHARS));
        }
        if content.chars().count() > MAX_CONTENT_CHARS {
            return Err(format!(
                "Content must be {} characters or less",
                MAX_CONTENT_CHARS
            ));
        }

        let mut chosen: Vec<String> = Vec::new();
        for name in self.category.iter().map(|c| c.trim()) {
            if !known.iter().any(|k| k.name == name) {
                return Err(format!("Unknown category: {}", name));
            }
            if !chosen.iter().any(|c| c == name) {
                chosen.push(name.to_string());
            }
        }
        if chosen.is_empty() {
            return Err("Pick at least one category".into());
        }

        Ok((title, content, chosen))
    }
}

async fn create_post(
    State(state): State<AppState>,
    user: CurrentUser,
    axum_extra::extract::Form(form): axum_extra::extract::Form<CreatePostForm>,
) -> AppResult<Response> {
    let options = category_options(&state, &form.category)?;

    let (title, content, chosen) = match form.validate(&options) {
        Ok(fields) => fields,
        Err(msg) => {
            let page = CreatePostTemplate {
                username: Some(user.username),
                error: Some(msg),
                title: form.title,
                content: form.content,
                categories: options,
            };
            return Ok((StatusCode::BAD_REQUEST, Html(page)).into_response());
        }
    };

    let post_id = {
        let conn = state.db.get()?;
        posts::insert_post(&conn, user.id, &title, &content, &chosen)?
    };
    tracing::info!("User {} created post {}", user.username, post_id);

    Ok(Redirect::to(&format!("/Post?id={}", post_id)).into_response())
}

// --- Read ---

fn post_page(
    state: &AppState,
    post_id: i64,
    viewer: &MaybeUser,
    comment_error: Option<String>,
    comment_draft: String,
) -> AppResult<PostTemplate> {
    let conn = state.db.get()?;
    let post = posts::get_post(&conn, post_id, viewer.id())?.ok_or(AppError::NotFound)?;
    let comments = posts::list_comments(&conn, post_id, viewer.id())?;

    Ok(PostTemplate {
        username: viewer.username(),
        post,
        comments,
        comment_error,
        comment_draft,
    })
}

async fn view_post(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Query(query): Query<PostQuery>,
) -> AppResult<Html<PostTemplate>> {
    let post_id = parse_id(query.id.as_deref(), "post id")?;
    Ok(Html(post_page(&state, post_id, &viewer, None, String::new())?))
}

async fn my_posts(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Html<FeedTemplate>> {
    let filter = PostFilter::ByAuthor(user.id);
    feed(
        &state,
        &MaybeUser(Some(user)),
        filter,
        "My posts",
        "You haven't posted anything yet.",
    )
}

async fn liked_posts(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Html<FeedTemplate>> {
    let filter = PostFilter::LikedBy(user.id);
    feed(
        &state,
        &MaybeUser(Some(user)),
        filter,
        "Liked posts",
        "You haven't liked any posts yet.",
    )
}

async fn category_viewer(
    State(state): State<AppState>,
    viewer: MaybeUser,
    Query(query): Query<CategoryQuery>,
) -> AppResult<Html<FeedTemplate>> {
    let name = query
        .category
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing category".into()))?;

    let category = {
        let conn = state.db.get()?;
        categories::find_by_name(&conn, name)?.ok_or(AppError::NotFound)?
    };

    feed(
        &state,
        &viewer,
        PostFilter::Category(&category.name),
        category.name.clone(),
        format!("No posts in {} yet.", category.name),
    )
}

// --- Comments ---

async fn create_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<CommentForm>,
) -> AppResult<Response> {
    let post_id = parse_id(Some(&form.post_id), "post id")?;

    {
        let conn = state.db.get()?;
        if !posts::post_exists(&conn, post_id)? {
            return Err(AppError::NotFound);
        }
    }

    let content = form.content.trim();
    let problem = if content.is_empty() {
        Some("Comment cannot be empty".to_string())
    } else if content.chars().count() > MAX_COMMENT_CHARS {
        Some(format!(
            "Comment must be {} characters or less",
            MAX_COMMENT_CHARS
        ))
    } else {
        None
    };

    if let Some(msg) = problem {
        let viewer = MaybeUser(Some(user));
        let page = post_page(&state, post_id, &viewer, Some(msg), form.content.clone())?;
        return Ok((StatusCode::BAD_REQUEST, Html(page)).into_response());
    }

    let comment_id = {
        let conn = state.db.get()?;
        posts::insert_comment(&conn, post_id, user.id, content)?
    };
    tracing::info!(
        "User {} commented {} on post {}",
        user.username,
        comment_id,
        post_id
    );

    Ok(Redirect::to(&format!("/Post?id={}#comment-{}", post_id, comment_id)).into_response())
}
