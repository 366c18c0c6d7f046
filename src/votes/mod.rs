pub mod domain;
pub mod repository;

pub use domain::{
    Direction, InvalidDirection, TargetKind, Tally, VoteOutcome, VoteState, VoteTarget,
};
pub use repository::{cast_vote, tally, tally_columns, vote_state, VoteError};
