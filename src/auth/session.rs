use rand::Rng;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::extractors::CurrentUser;

struct Session {
    user: CurrentUser,
    expires_at: Instant,
}

/// In-memory session table: token → user, plus user → token so each user
/// holds at most one live session. Lives behind a mutex in `AppState`.
pub struct SessionStore {
    sessions: HashMap<String, Session>,
    by_user: HashMap<i64, String>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: HashMap::new(),
            by_user: HashMap::new(),
            ttl,
        }
    }

    /// Start a session for `user`, ending any session they already had.
    /// Returns the new token.
    pub fn create(&mut self, user: CurrentUser) -> String {
        self.clear_stale();

        if let Some(previous) = self.by_user.remove(&user.id) {
            self.sessions.remove(&previous);
            tracing::debug!("Replaced existing session for user {}", user.id);
        }

        let token = generate_token();
        self.by_user.insert(user.id, token.clone());
        self.sessions.insert(
            token.clone(),
            Session {
                user,
                expires_at: Instant::now() + self.ttl,
            },
        );
        token
    }

    /// Resolve a token. Expired sessions are dropped and read as absent.
    pub fn lookup(&mut self, token: &str) -> Option<CurrentUser> {
        let session = self.sessions.get(token)?;
        if Instant::now() >= session.expires_at {
            self.destroy(token);
            return None;
        }
        Some(session.user.clone())
    }

    /// End the session behind `token`, returning whose it was.
    pub fn destroy(&mut self, token: &str) -> Option<CurrentUser> {
        let session = self.sessions.remove(token)?;
        if self.by_user.get(&session.user.id).map(String::as_str) == Some(token) {
            self.by_user.remove(&session.user.id);
        }
        Some(session.user)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn clear_stale(&mut self) {
        let now = Instant::now();
        let by_user = &mut self.by_user;
        self.sessions.retain(|token, session| {
            let live = now < session.expires_at;
            if !live && by_user.get(&session.user.id) == Some(token) {
                by_user.remove(&session.user.id);
            }
            live
        });
    }
}

/// Cryptographically random 32-byte hex token.
fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i64, name: &str) -> CurrentUser {
        CurrentUser {
            id,
            username: name.to_string(),
        }
    }

    fn store() -> SessionStore {
        SessionStore::new(Duration::from_secs(3600))
    }

    #[test]
    fn generate_token_is_64_hex_chars() {
        let token = generate_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, generate_token());
    }

    #[test]
    fn create_then_lookup() {
        let mut sessions = store();
        let token = sessions.create(user(1, "alice"));

        let found = sessions.lookup(&token).unwrap();
        assert_eq!(found.id, 1);
        assert_eq!(found.username, "alice");
        assert!(sessions.lookup("nope").is_none());
    }

    #[test]
    fn new_login_replaces_previous_session() {
        let mut sessions = store();
        let first = sessions.create(user(1, "alice"));
        let second = sessions.create(user(1, "alice"));

        assert!(sessions.lookup(&first).is_none());
        assert!(sessions.lookup(&second).is_some());
        assert_eq!(sessions.len(), 1);
    }

    #[test]
    fn destroy_ends_the_session() {
        let mut sessions = store();
        let token = sessions.create(user(1, "alice"));
        sessions.create(user(2, "bob"));

        assert_eq!(sessions.destroy(&token).map(|u| u.id), Some(1));
        assert!(sessions.lookup(&token).is_none());
        assert!(sessions.destroy(&token).is_none());
        assert_eq!(sessions.len(), 1);
    }

    #[test]
    fn expired_sessions_read_as_absent() {
        let mut sessions = SessionStore::new(Duration::ZERO);
        let token = sessions.create(user(1, "alice"));

        assert!(sessions.lookup(&token).is_none());
        assert!(sessions.is_empty());
    }

    #[test]
    fn create_sweeps_expired_entries() {
        let mut sessions = SessionStore::new(Duration::ZERO);
        sessions.create(user(1, "alice"));
        sessions.create(user(2, "bob"));
        // alice's expired entry was swept when bob's was created
        assert_eq!(sessions.len(), 1);
    }
}
