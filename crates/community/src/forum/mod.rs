mod comment;
mod post;
mod vote;

pub use comment::Comment;
pub use post::Post;
pub use vote::{Vote, VoteTarget};
