//! Blog repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist users, posts and comments.
//! - Expose the primitive counter/status writes the blog service composes
//!   into explicit post-operation steps.
//!
//! # Invariants
//! - No method here updates a counter as a side effect of another write.
//! - Comment listings are ordered by comment id.

use crate::model::blog::{
    Comment, CommentId, CommentStatus, CommentView, Post, PostId, User, UserId,
};
use crate::repo::ledger_repo::{ensure_tables, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};

const USER_SELECT_SQL: &str = "SELECT id, username, email, nickname, post_count FROM users";
const POST_SELECT_SQL: &str =
    "SELECT id, user_id, title, content, view_count, comment_status FROM posts";

/// Repository interface for blog persistence.
pub trait BlogRepository {
    fn insert_user(&self, username: &str, email: &str, nickname: &str) -> RepoResult<User>;
    fn get_user(&self, id: UserId) -> RepoResult<User>;
    fn find_user_by_username(&self, username: &str) -> RepoResult<Option<User>>;
    /// Adds one to `users.post_count`.
    fn increment_post_count(&self, user_id: UserId) -> RepoResult<()>;

    fn insert_post(&self, user_id: UserId, title: &str, content: &str) -> RepoResult<Post>;
    fn get_post(&self, id: PostId) -> RepoResult<Post>;
    fn list_posts_by_user(&self, user_id: UserId) -> RepoResult<Vec<Post>>;
    fn set_comment_status(&self, post_id: PostId, status: CommentStatus) -> RepoResult<()>;

    fn insert_comment(&self, post_id: PostId, user_id: UserId, content: &str)
        -> RepoResult<Comment>;
    fn get_comment(&self, id: CommentId) -> RepoResult<Comment>;
    fn delete_comment(&self, id: CommentId) -> RepoResult<()>;
    fn count_comments(&self, post_id: PostId) -> RepoResult<i64>;
    /// Comments on one post joined with commenter usernames.
    fn list_comment_views(&self, post_id: PostId) -> RepoResult<Vec<CommentView>>;
    /// Post with the most comments, lowest id on ties.
    fn most_commented_post_id(&self) -> RepoResult<Option<PostId>>;
}

/// SQLite-backed blog repository.
pub struct SqliteBlogRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteBlogRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(conn, &["users", "posts", "comments"])?;
        Ok(Self { conn })
    }

    pub(crate) fn new_unchecked(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl BlogRepository for SqliteBlogRepository<'_> {
    fn insert_user(&self, username: &str, email: &str, nickname: &str) -> RepoResult<User> {
        self.conn.execute(
            "INSERT INTO users (username, email, nickname) VALUES (?1, ?2, ?3);",
            params![username, email, nickname],
        )?;

        Ok(User {
            id: self.conn.last_insert_rowid(),
            username: username.to_string(),
            email: email.to_string(),
            nickname: nickname.to_string(),
            post_count: 0,
        })
    }

    fn get_user(&self, id: UserId) -> RepoResult<User> {
        self.conn
            .query_row(
                &format!("{USER_SELECT_SQL} WHERE id = ?1;"),
                params![id],
                parse_user_row,
            )
            .optional()?
            .ok_or_else(|| RepoError::not_found("user", id))
    }

    fn find_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        let user = self
            .conn
            .query_row(
                &format!("{USER_SELECT_SQL} WHERE username = ?1;"),
                params![username],
                parse_user_row,
            )
            .optional()?;
        Ok(user)
    }

    fn increment_post_count(&self, user_id: UserId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE users
             SET
                post_count = post_count + 1,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![user_id],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("user", user_id));
        }
        Ok(())
    }

    fn insert_post(&self, user_id: UserId, title: &str, content: &str) -> RepoResult<Post> {
        self.conn.execute(
            "INSERT INTO posts (user_id, title, content, comment_status)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                user_id,
                title,
                content,
                CommentStatus::NoComments.as_str()
            ],
        )?;

        Ok(Post {
            id: self.conn.last_insert_rowid(),
            user_id,
            title: title.to_string(),
            content: content.to_string(),
            view_count: 0,
            comment_status: CommentStatus::NoComments,
        })
    }

    fn get_post(&self, id: PostId) -> RepoResult<Post> {
        let mut stmt = self
            .conn
            .prepare(&format!("{POST_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query(params![id])?;
        match rows.next()? {
            Some(row) => parse_post_row(row),
            None => Err(RepoError::not_found("post", id)),
        }
    }

    fn list_posts_by_user(&self, user_id: UserId) -> RepoResult<Vec<Post>> {
        let mut stmt = self.conn.prepare(&format!(
            "{POST_SELECT_SQL} WHERE user_id = ?1 ORDER BY id ASC;"
        ))?;
        let mut rows = stmt.query(params![user_id])?;
        let mut posts = Vec::new();
        while let Some(row) = rows.next()? {
            posts.push(parse_post_row(row)?);
        }
        Ok(posts)
    }

    fn set_comment_status(&self, post_id: PostId, status: CommentStatus) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE posts
             SET
                comment_status = ?1,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?2;",
            params![status.as_str(), post_id],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("post", post_id));
        }
        Ok(())
    }

    fn insert_comment(
        &self,
        post_id: PostId,
        user_id: UserId,
        content: &str,
    ) -> RepoResult<Comment> {
        self.conn.execute(
            "INSERT INTO comments (post_id, user_id, content) VALUES (?1, ?2, ?3);",
            params![post_id, user_id, content],
        )?;

        Ok(Comment {
            id: self.conn.last_insert_rowid(),
            post_id,
            user_id,
            content: content.to_string(),
        })
    }

    fn get_comment(&self, id: CommentId) -> RepoResult<Comment> {
        self.conn
            .query_row(
                "SELECT id, post_id, user_id, content FROM comments WHERE id = ?1;",
                params![id],
                parse_comment_row,
            )
            .optional()?
            .ok_or_else(|| RepoError::not_found("comment", id))
    }

    fn delete_comment(&self, id: CommentId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM comments WHERE id = ?1;", params![id])?;
        if changed == 0 {
            return Err(RepoError::not_found("comment", id));
        }
        Ok(())
    }

    fn count_comments(&self, post_id: PostId) -> RepoResult<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM comments WHERE post_id = ?1;",
            params![post_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn list_comment_views(&self, post_id: PostId) -> RepoResult<Vec<CommentView>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                c.id AS id,
                c.post_id AS post_id,
                c.user_id AS user_id,
                c.content AS content,
                u.username AS author_username
             FROM comments c
             INNER JOIN users u ON u.id = c.user_id
             WHERE c.post_id = ?1
             ORDER BY c.id ASC;",
        )?;
        let views = stmt
            .query_map(params![post_id], |row| {
                Ok(CommentView {
                    comment: parse_comment_row(row)?,
                    author_username: row.get("author_username")?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(views)
    }

    fn most_commented_post_id(&self) -> RepoResult<Option<PostId>> {
        let post_id = self
            .conn
            .query_row(
                "SELECT post_id
                 FROM comments
                 GROUP BY post_id
                 ORDER BY COUNT(*) DESC, post_id ASC
                 LIMIT 1;",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(post_id)
    }
}

fn parse_user_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get("id")?,
        username: row.get("username")?,
        email: row.get("email")?,
        nickname: row.get("nickname")?,
        post_count: row.get("post_count")?,
    })
}

fn parse_post_row(row: &Row<'_>) -> RepoResult<Post> {
    let status_text: String = row.get("comment_status")?;
    let comment_status = CommentStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid comment status `{status_text}` in posts.comment_status"
        ))
    })?;

    Ok(Post {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        title: row.get("title")?,
        content: row.get("content")?,
        view_count: row.get("view_count")?,
        comment_status,
    })
}

fn parse_comment_row(row: &Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get("id")?,
        post_id: row.get("post_id")?,
        user_id: row.get("user_id")?,
        content: row.get("content")?,
    })
}
