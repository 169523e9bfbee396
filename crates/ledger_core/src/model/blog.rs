//! Blog user/post/comment models and associative read models.
//!
//! # Invariants
//! - `User::post_count` mirrors the number of posts published through the
//!   blog service.
//! - `Post::comment_status` is `NoComments` whenever the post has no comments
//!   left after a service-level delete.

use serde::{Deserialize, Serialize};

pub type UserId = i64;
pub type PostId = i64;
pub type CommentId = i64;

/// Denormalized comment presence flag kept on every post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentStatus {
    HasComments,
    NoComments,
}

impl CommentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HasComments => "has_comments",
            Self::NoComments => "no_comments",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "has_comments" => Some(Self::HasComments),
            "no_comments" => Some(Self::NoComments),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub nickname: String,
    pub post_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub user_id: UserId,
    pub title: String,
    pub content: String,
    pub view_count: i64,
    pub comment_status: CommentStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub post_id: PostId,
    pub user_id: UserId,
    pub content: String,
}

/// Comment joined with its author's username.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentView {
    pub comment: Comment,
    pub author_username: String,
}

/// Post with its comments in id order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostWithComments {
    pub post: Post,
    pub comments: Vec<CommentView>,
}

/// A user with every post they published, each with its comments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserPosts {
    pub user: User,
    pub posts: Vec<PostWithComments>,
}

/// Post detail with author and comments, used by ranking queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostDetail {
    pub post: Post,
    pub author_username: String,
    pub comments: Vec<CommentView>,
}

impl PostDetail {
    pub fn comment_count(&self) -> usize {
        self.comments.len()
    }
}
