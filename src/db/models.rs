use crate::timefmt;
use crate::votes::{Tally, VoteState};

#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// A post as shown in feeds and on its own page.
#[derive(Debug, Clone)]
pub struct PostSummary {
    pub id: i64,
    pub author: String,
    pub title: String,
    pub content: String,
    pub categories: Vec<String>,
    pub created_at: String,
    pub tally: Tally,
    pub viewer_vote: VoteState,
    pub comment_count: i64,
}

#[derive(Debug, Clone)]
pub struct CommentSummary {
    pub id: i64,
    pub post_id: i64,
    pub author: String,
    pub content: String,
    pub created_at: String,
    pub tally: Tally,
    pub viewer_vote: VoteState,
}

impl PostSummary {
    pub fn posted(&self) -> String {
        timefmt::humanize(&self.created_at)
    }

    pub fn excerpt(&self) -> String {
        excerpt(&self.content, 280)
    }
}

impl CommentSummary {
    pub fn posted(&self) -> String {
        timefmt::humanize(&self.created_at)
    }
}

/// Category labels are stored comma-delimited on the post row.
pub fn join_categories(names: &[String]) -> String {
    names.join(",")
}

pub fn split_categories(stored: &str) -> Vec<String> {
    stored
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn excerpt(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}…", text[..cut].trim_end()),
        None => text.to_string(),
    }
}
