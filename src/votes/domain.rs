// Vote state machine. Pure, no I/O.
use std::fmt;
use std::str::FromStr;

/// The direction a user asks for: `1` likes, `-1` dislikes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Like,
    Dislike,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("vote direction must be 1 or -1, got {0:?}")]
pub struct InvalidDirection(pub String);

impl Direction {
    /// Value stored in the `is_like` column.
    pub fn flag(self) -> i64 {
        match self {
            Direction::Like => 1,
            Direction::Dislike => -1,
        }
    }
}

impl FromStr for Direction {
    type Err = InvalidDirection;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1" => Ok(Direction::Like),
            "-1" => Ok(Direction::Dislike),
            other => Err(InvalidDirection(other.to_string())),
        }
    }
}

/// A user's current vote on one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VoteState {
    #[default]
    None,
    Liked,
    Disliked,
}

impl VoteState {
    /// Decode the stored flag. Anything other than 1 / -1 cannot be written
    /// (CHECK constraint), so it reads as no vote.
    pub fn from_flag(flag: Option<i64>) -> Self {
        match flag {
            Some(1) => VoteState::Liked,
            Some(-1) => VoteState::Disliked,
            _ => VoteState::None,
        }
    }

    pub fn flag(self) -> Option<i64> {
        match self {
            VoteState::None => None,
            VoteState::Liked => Some(1),
            VoteState::Disliked => Some(-1),
        }
    }

    /// Repeating the current direction clears the vote; anything else
    /// moves to the requested direction.
    pub fn apply(self, request: Direction) -> VoteState {
        match (self, request) {
            (VoteState::Liked, Direction::Like) => VoteState::None,
            (VoteState::Disliked, Direction::Dislike) => VoteState::None,
            (_, Direction::Like) => VoteState::Liked,
            (_, Direction::Dislike) => VoteState::Disliked,
        }
    }

    pub fn is_liked(self) -> bool {
        self == VoteState::Liked
    }

    pub fn is_disliked(self) -> bool {
        self == VoteState::Disliked
    }
}

/// What a vote is cast on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteTarget {
    Post(i64),
    Comment(i64),
}

/// The kind of row a vote table points at, without a specific id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Post,
    Comment,
}

impl TargetKind {
    pub(crate) fn vote_table(self) -> &'static str {
        match self {
            TargetKind::Post => "likes",
            TargetKind::Comment => "commentlikes",
        }
    }

    pub(crate) fn vote_column(self) -> &'static str {
        match self {
            TargetKind::Post => "post_id",
            TargetKind::Comment => "comment_id",
        }
    }

    pub(crate) fn target_table(self) -> &'static str {
        match self {
            TargetKind::Post => "posts",
            TargetKind::Comment => "comments",
        }
    }
}

impl VoteTarget {
    pub fn id(self) -> i64 {
        match self {
            VoteTarget::Post(id) | VoteTarget::Comment(id) => id,
        }
    }

    pub fn kind(self) -> TargetKind {
        match self {
            VoteTarget::Post(_) => TargetKind::Post,
            VoteTarget::Comment(_) => TargetKind::Comment,
        }
    }

    pub(crate) fn vote_table(self) -> &'static str {
        self.kind().vote_table()
    }

    pub(crate) fn vote_column(self) -> &'static str {
        self.kind().vote_column()
    }

    pub(crate) fn target_table(self) -> &'static str {
        self.kind().target_table()
    }
}

impl fmt::Display for VoteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoteTarget::Post(id) => write!(f, "post {}", id),
            VoteTarget::Comment(id) => write!(f, "comment {}", id),
        }
    }
}

/// Like/dislike counts for one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tally {
    pub likes: i64,
    pub dislikes: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteOutcome {
    pub previous: VoteState,
    pub current: VoteState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_only_the_two_tokens() {
        assert_eq!("1".parse::<Direction>(), Ok(Direction::Like));
        assert_eq!("-1".parse::<Direction>(), Ok(Direction::Dislike));
        for bad in ["0", "2", "like", "", "+1", "--1"] {
            assert!(bad.parse::<Direction>().is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn transition_table() {
        use Direction::*;
        use VoteState::*;

        let cases = [
            (VoteState::None, Like, Liked),
            (VoteState::None, Dislike, Disliked),
            (Liked, Like, VoteState::None),
            (Liked, Dislike, Disliked),
            (Disliked, Dislike, VoteState::None),
            (Disliked, Like, Liked),
        ];
        for (from, request, expected) in cases {
            assert_eq!(from.apply(request), expected, "{from:?} + {request:?}");
        }
    }

    #[test]
    fn double_like_toggles_off() {
        let state = VoteState::None
            .apply(Direction::Like)
            .apply(Direction::Like);
        assert_eq!(state, VoteState::None);
    }

    #[test]
    fn flag_encoding_matches_state() {
        for state in [VoteState::None, VoteState::Liked, VoteState::Disliked] {
            assert_eq!(VoteState::from_flag(state.flag()), state);
        }
        assert_eq!(VoteState::from_flag(Some(0)), VoteState::None);
    }

    #[test]
    fn target_maps_to_its_tables() {
        let post = VoteTarget::Post(3);
        assert_eq!(post.vote_table(), "likes");
        assert_eq!(post.vote_column(), "post_id");
        assert_eq!(post.target_table(), "posts");

        let comment = VoteTarget::Comment(9);
        assert_eq!(comment.vote_table(), "commentlikes");
        assert_eq!(comment.vote_column(), "comment_id");
        assert_eq!(comment.to_string(), "comment 9");
        assert_eq!(comment.kind(), TargetKind::Comment);
    }
}
