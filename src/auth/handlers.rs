use askama::Template;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::Form;
use serde::Deserialize;

use crate::auth::password;
use crate::db::users::{self, UserInsertError};
use crate::error::AppResult;
use crate::extractors::{cookie_value, CurrentUser, MaybeUser};
use crate::routes::home::Html;
use crate::state::AppState;

const MIN_PASSWORD_LEN: usize = 6;
const USERNAME_LEN: std::ops::RangeInclusive<usize> = 3..=32;
const DUMMY_PASSWORD: &str = "agora-no-such-user";

// -- Templates --

#[derive(Template, Default)]
#[template(path = "pages/register.html")]
pub struct RegisterTemplate {
    pub username: Option<String>,
    pub error: Option<String>,
    pub email: String,
    pub name: String,
}

#[derive(Template, Default)]
#[template(path = "pages/login.html")]
pub struct LoginTemplate {
    pub username: Option<String>,
    pub error: Option<String>,
    pub login: String,
}

// -- Forms --

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct RegisterForm {
    pub email: String,
    pub username: String,
    pub password: String,
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

// -- Cookie helpers --

fn session_cookie(name: &str, token: &str, max_age_hours: u64) -> String {
    format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
        name,
        token,
        max_age_hours.saturating_mul(3600)
    )
}

fn clear_session_cookie(name: &str) -> String {
    format!("{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0", name)
}

// -- Validation --

impl RegisterForm {
    /// Trimmed, lowercased email and trimmed username, or the message to show.
    fn validate(&self) -> Result<(String, String), String> {
        let email = self.email.trim().to_lowercase();
        let username = self.username.trim().to_string();

        if email.is_empty() || username.is_empty() || self.password.is_empty() {
            return Err("All fields are required".into());
        }
        if !is_plausible_email(&email) {
            return Err("Enter a valid email address".into());
        }
        // `@` would send the username down the email path at login.
        if !USERNAME_LEN.contains(&username.chars().count())
            || username.chars().any(|c| c.is_whitespace() || c == '@')
        {
            return Err(format!(
                "Username must be {}-{} characters with no spaces or @",
                USERNAME_LEN.start(),
                USERNAME_LEN.end()
            ));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            ));
        }
        Ok((email, username))
    }
}

fn is_plausible_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

// -- Register --

/// GET /register
pub async fn register_page(MaybeUser(user): MaybeUser) -> Response {
    if user.is_some() {
        return Redirect::to("/").into_response();
    }
    Html(RegisterTemplate::default()).into_response()
}

/// POST /register
pub async fn register(
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> AppResult<Response> {
    let rejected = |error: String| {
        let page = RegisterTemplate {
            username: None,
            error: Some(error),
            email: form.email.trim().to_string(),
            name: form.username.trim().to_string(),
        };
        (StatusCode::BAD_REQUEST, Html(page)).into_response()
    };

    let (email, username) = match form.validate() {
        Ok(fields) => fields,
        Err(msg) => return Ok(rejected(msg)),
    };

    let hashed = password::hash(form.password.clone(), state.config.auth.bcrypt_cost).await?;

    let conn = state.db.get()?;
    match users::insert_user(&conn, &email, &username, &hashed) {
        Ok(id) => {
            tracing::info!("Registered user {} ({})", username, id);
            Ok(Redirect::to("/login").into_response())
        }
        Err(UserInsertError::Sql(e)) => Err(e.into()),
        Err(taken) => Ok(rejected(taken.to_string())),
    }
}

// -- Login --

/// GET /login
pub async fn login_page(MaybeUser(user): MaybeUser) -> Response {
    if user.is_some() {
        return Redirect::to("/").into_response();
    }
    Html(LoginTemplate::default()).into_response()
}

/// POST /login: accepts a username or email plus password.
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> AppResult<Response> {
    let login = form.username.trim().to_string();

    let rejected = |status: StatusCode, error: &str| {
        let page = LoginTemplate {
            username: None,
            error: Some(error.to_string()),
            login: login.clone(),
        };
        (status, Html(page)).into_response()
    };

    if login.is_empty() || form.password.is_empty() {
        return Ok(rejected(
            StatusCode::BAD_REQUEST,
            "Username and password are required",
        ));
    }

    let user = {
        let conn = state.db.get()?;
        users::find_by_login(&conn, &login)?
    };

    let verified = match &user {
        Some(user) => password::verify(form.password.clone(), user.password_hash.clone()).await?,
        None => {
            let dummy = state
                .dummy_hash
                .get_or_try_init(|| {
                    password::hash(DUMMY_PASSWORD.to_string(), state.config.auth.bcrypt_cost)
                })
                .await?;
            password::verify(form.password.clone(), dummy.clone()).await?;
            false
        }
    };

    let user = match user {
        Some(user) if verified => user,
        _ => {
            tracing::info!("Failed login for {}", login);
            return Ok(rejected(
                StatusCode::UNAUTHORIZED,
                "Invalid username or password",
            ));
        }
    };

    let token = {
        let mut sessions = state.sessions.lock().await;
        sessions.create(CurrentUser {
            id: user.id,
            username: user.username.clone(),
        })
    };
    tracing::info!("User {} logged in", user.username);

    let cookie = session_cookie(
        &state.config.auth.cookie_name,
        &token,
        state.config.auth.session_hours,
    );
    Ok((
        StatusCode::SEE_OTHER,
        [(header::LOCATION, "/".to_string()), (header::SET_COOKIE, cookie)],
    )
        .into_response())
}

// -- Logout --

/// GET /logout: drop the session and expire the cookie.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let cookie_name = &state.config.auth.cookie_name;

    if let Some(token) = cookie_value(&headers, cookie_name) {
        let ended = state.sessions.lock().await.destroy(token);
        if let Some(user) = ended {
            tracing::info!("User {} logged out", user.username);
        }
    }

    (
        StatusCode::SEE_OTHER,
        [
            (header::LOCATION, "/".to_string()),
            (header::SET_COOKIE, clear_session_cookie(cookie_name)),
        ],
    )
        .into_response()
}
