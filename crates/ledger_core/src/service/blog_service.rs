//! Blog use-case service.
//!
//! # Responsibility
//! - Publish posts and maintain the author's `post_count`.
//! - Add/delete comments and maintain the post's `comment_status`.
//! - Serve the associative read models (user posts, most commented post).
//!
//! # Invariants
//! - Counter and status maintenance runs as an explicit step in the same
//!   transaction as the write that triggers it.
//! - A post is `no_comments` after its last comment is deleted.

use crate::model::blog::{
    Comment, CommentId, CommentStatus, Post, PostDetail, PostId, PostWithComments, User, UserId,
    UserPosts,
};
use crate::repo::blog_repo::{BlogRepository, SqliteBlogRepository};
use crate::repo::ledger_repo::{ensure_tables, RepoError};
use log::info;
use rusqlite::{Connection, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Service error for blog use-cases.
#[derive(Debug)]
pub enum BlogServiceError {
    UserNotFound(UserId),
    UnknownUsername(String),
    PostNotFound(PostId),
    CommentNotFound(CommentId),
    Repo(RepoError),
}

impl Display for BlogServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UserNotFound(id) => write!(f, "user not found: {id}"),
            Self::UnknownUsername(name) => write!(f, "user not found: `{name}`"),
            Self::PostNotFound(id) => write!(f, "post not found: {id}"),
            Self::CommentNotFound(id) => write!(f, "comment not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for BlogServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for BlogServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound { entity: "user", id } => Self::UserNotFound(id),
            RepoError::NotFound { entity: "post", id } => Self::PostNotFound(id),
            RepoError::NotFound {
                entity: "comment",
                id,
            } => Self::CommentNotFound(id),
            other => Self::Repo(other),
        }
    }
}

impl From<rusqlite::Error> for BlogServiceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(value.into())
    }
}

/// Outcome of deleting one comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentDeletion {
    pub comment: Comment,
    pub remaining_comments: i64,
    pub post_status: CommentStatus,
}

/// Blog facade bound to an explicitly passed connection.
pub struct BlogService<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> BlogService<'conn> {
    /// Creates a service over a migrated connection.
    pub fn try_new(conn: &'conn mut Connection) -> Result<Self, BlogServiceError> {
        ensure_tables(conn, &["users", "posts", "comments"])?;
        Ok(Self { conn })
    }

    fn reader(&self) -> SqliteBlogRepository<'_> {
        SqliteBlogRepository::new_unchecked(&*self.conn)
    }

    pub fn register_user(
        &self,
        username: &str,
        email: &str,
        nickname: &str,
    ) -> Result<User, BlogServiceError> {
        let user = self.reader().insert_user(username, email, nickname)?;
        info!(
            "event=user_register module=service status=ok user_id={}",
            user.id
        );
        Ok(user)
    }

    /// Returns the existing user with `username`, registering it otherwise.
    pub fn find_or_register_user(
        &self,
        username: &str,
        email: &str,
        nickname: &str,
    ) -> Result<User, BlogServiceError> {
        match self.reader().find_user_by_username(username)? {
            Some(user) => Ok(user),
            None => self.register_user(username, email, nickname),
        }
    }

    pub fn get_user(&self, user_id: UserId) -> Result<User, BlogServiceError> {
        Ok(self.reader().get_user(user_id)?)
    }

    pub fn get_post(&self, post_id: PostId) -> Result<Post, BlogServiceError> {
        Ok(self.reader().get_post(post_id)?)
    }

    /// Creates a post and bumps the author's `post_count` in one transaction.
    pub fn publish_post(
        &mut self,
        user_id: UserId,
        title: &str,
        content: &str,
    ) -> Result<Post, BlogServiceError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let post = {
            let repo = SqliteBlogRepository::new_unchecked(&tx);
            repo.get_user(user_id)?;
            let post = repo.insert_post(user_id, title, content)?;
            repo.increment_post_count(user_id)?;
            post
        };
        tx.commit()?;

        info!(
            "event=post_publish module=service status=ok post_id={} user_id={user_id}",
            post.id
        );
        Ok(post)
    }

    /// Adds a comment and marks the post as having comments.
    pub fn add_comment(
        &mut self,
        post_id: PostId,
        user_id: UserId,
        content: &str,
    ) -> Result<Comment, BlogServiceError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let comment = {
            let repo = SqliteBlogRepository::new_unchecked(&tx);
            repo.get_post(post_id)?;
            repo.get_user(user_id)?;
            let comment = repo.insert_comment(post_id, user_id, content)?;
            repo.set_comment_status(post_id, CommentStatus::HasComments)?;
            comment
        };
        tx.commit()?;

        info!(
            "event=comment_add module=service status=ok comment_id={} post_id={post_id}",
            comment.id
        );
        Ok(comment)
    }

    /// Deletes a comment; flips the post to `no_comments` when none remain.
    pub fn delete_comment(
        &mut self,
        comment_id: CommentId,
    ) -> Result<CommentDeletion, BlogServiceError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let deletion = {
            let repo = SqliteBlogRepository::new_unchecked(&tx);
            let comment = repo.get_comment(comment_id)?;
            repo.delete_comment(comment_id)?;

            let remaining_comments = repo.count_comments(comment.post_id)?;
            if remaining_comments == 0 {
                repo.set_comment_status(comment.post_id, CommentStatus::NoComments)?;
            }
            let post_status = repo.get_post(comment.post_id)?.comment_status;
            CommentDeletion {
                comment,
                remaining_comments,
                post_status,
            }
        };
        tx.commit()?;

        info!(
            "event=comment_delete module=service status=ok comment_id={comment_id} remaining={} post_status={}",
            deletion.remaining_comments,
            deletion.post_status.as_str()
        );
        Ok(deletion)
    }

    /// Loads a user with every post and each post's comments.
    pub fn user_posts_with_comments(&self, username: &str) -> Result<UserPosts, BlogServiceError> {
        let repo = self.reader();
        let user = repo
            .find_user_by_username(username)?
            .ok_or_else(|| BlogServiceError::UnknownUsername(username.to_string()))?;

        let posts = repo
            .list_posts_by_user(user.id)?
            .into_iter()
            .map(|post| -> Result<PostWithComments, RepoError> {
                let comments = repo.list_comment_views(post.id)?;
                Ok(PostWithComments { post, comments })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(UserPosts { user, posts })
    }

    /// Returns the post with the most comments, or `None` without comments.
    pub fn most_commented_post(&self) -> Result<Option<PostDetail>, BlogServiceError> {
        let repo = self.reader();
        let Some(post_id) = repo.most_commented_post_id()? else {
            return Ok(None);
        };

        let post = repo.get_post(post_id)?;
        let author = repo.get_user(post.user_id)?;
        let comments = repo.list_comment_views(post_id)?;
        Ok(Some(PostDetail {
            post,
            author_username: author.username,
            comments,
        }))
    }
}
