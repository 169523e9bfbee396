use ledger_core::db::open_db_in_memory;
use ledger_core::{BlogService, BlogServiceError, CommentStatus};
use rusqlite::Connection;

fn post_count(conn: &mut Connection, user_id: i64) -> i64 {
    BlogService::try_new(conn)
        .unwrap()
        .get_user(user_id)
        .unwrap()
        .post_count
}

#[test]
fn publishing_posts_increments_author_post_count() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = BlogService::try_new(&mut conn).unwrap();
    let alice = service
        .register_user("alice", "alice@example.com", "Alice")
        .unwrap();
    assert_eq!(alice.post_count, 0);

    service
        .publish_post(alice.id, "ORM basics", "getting started")
        .unwrap();
    service
        .publish_post(alice.id, "Go practices", "project layout")
        .unwrap();

    assert_eq!(service.get_user(alice.id).unwrap().post_count, 2);
}

#[test]
fn publishing_for_unknown_user_persists_nothing() {
    let mut conn = open_db_in_memory().unwrap();
    let err = BlogService::try_new(&mut conn)
        .unwrap()
        .publish_post(77, "orphan", "no author")
        .unwrap_err();

    assert!(matches!(err, BlogServiceError::UserNotFound(77)));
    let posts: i64 = conn
        .query_row("SELECT COUNT(*) FROM posts;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(posts, 0);
}

#[test]
fn failed_counter_update_rolls_back_post_insert() {
    let mut conn = open_db_in_memory().unwrap();
    let user_id = BlogService::try_new(&mut conn)
        .unwrap()
        .register_user("bob", "bob@example.com", "Bob")
        .unwrap()
        .id;
    conn.execute_batch(
        "CREATE TRIGGER freeze_counters
         BEFORE UPDATE OF post_count ON users
         BEGIN
             SELECT RAISE(ABORT, 'counters frozen');
         END;",
    )
    .unwrap();

    let err = BlogService::try_new(&mut conn)
        .unwrap()
        .publish_post(user_id, "title", "body")
        .unwrap_err();
    assert!(matches!(err, BlogServiceError::Repo(_)));

    let posts: i64 = conn
        .query_row("SELECT COUNT(*) FROM posts;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(posts, 0);
    assert_eq!(post_count(&mut conn, user_id), 0);
}

#[test]
fn deleting_last_comment_marks_post_without_comments() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = BlogService::try_new(&mut conn).unwrap();
    let bob = service
        .register_user("bob", "bob@example.com", "Bob")
        .unwrap();
    let post = service.publish_post(bob.id, "hooks", "explicit").unwrap();
    assert_eq!(post.comment_status, CommentStatus::NoComments);

    let first = service.add_comment(post.id, bob.id, "first").unwrap();
    let second = service.add_comment(post.id, bob.id, "second").unwrap();
    assert_eq!(
        service.get_post(post.id).unwrap().comment_status,
        CommentStatus::HasComments
    );

    let deletion = service.delete_comment(first.id).unwrap();
    assert_eq!(deletion.remaining_comments, 1);
    assert_eq!(deletion.post_status, CommentStatus::HasComments);

    let deletion = service.delete_comment(second.id).unwrap();
    assert_eq!(deletion.remaining_comments, 0);
    assert_eq!(deletion.post_status, CommentStatus::NoComments);
    assert_eq!(
        service.get_post(post.id).unwrap().comment_status,
        CommentStatus::NoComments
    );
}

#[test]
fn deleting_unknown_comment_fails() {
    let mut conn = open_db_in_memory().unwrap();
    let err = BlogService::try_new(&mut conn)
        .unwrap()
        .delete_comment(5)
        .unwrap_err();
    assert!(matches!(err, BlogServiceError::CommentNotFound(5)));
}

#[test]
fn user_posts_include_comments_with_commenter_names() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = BlogService::try_new(&mut conn).unwrap();
    let alice = service
        .register_user("alice", "alice@example.com", "Alice")
        .unwrap();
    let bob = service
        .register_user("bob", "bob@example.com", "Bob")
        .unwrap();
    let first = service.publish_post(alice.id, "one", "1").unwrap();
    let second = service.publish_post(alice.id, "two", "2").unwrap();
    service.publish_post(bob.id, "bob's", "3").unwrap();
    service.add_comment(first.id, bob.id, "nice").unwrap();
    service.add_comment(first.id, alice.id, "thanks").unwrap();

    let view = service.user_posts_with_comments("alice").unwrap();

    assert_eq!(view.user.id, alice.id);
    assert_eq!(view.user.post_count, 2);
    assert_eq!(view.posts.len(), 2);
    assert_eq!(view.posts[0].post.id, first.id);
    assert_eq!(view.posts[1].post.id, second.id);
    let authors: Vec<&str> = view.posts[0]
        .comments
        .iter()
        .map(|c| c.author_username.as_str())
        .collect();
    assert_eq!(authors, vec!["bob", "alice"]);
    assert!(view.posts[1].comments.is_empty());
}

#[test]
fn unknown_username_is_reported() {
    let mut conn = open_db_in_memory().unwrap();
    let err = BlogService::try_new(&mut conn)
        .unwrap()
        .user_posts_with_comments("nobody")
        .unwrap_err();
    assert!(matches!(err, BlogServiceError::UnknownUsername(name) if name == "nobody"));
}

#[test]
fn most_commented_post_prefers_count_then_lowest_id() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = BlogService::try_new(&mut conn).unwrap();
    assert!(service.most_commented_post().unwrap().is_none());

    let alice = service
        .register_user("alice", "alice@example.com", "Alice")
        .unwrap();
    let bob = service
        .register_user("bob", "bob@example.com", "Bob")
        .unwrap();
    let first = service.publish_post(alice.id, "one", "1").unwrap();
    let second = service.publish_post(bob.id, "two", "2").unwrap();
    service.add_comment(first.id, bob.id, "a").unwrap();
    service.add_comment(second.id, alice.id, "b").unwrap();

    let tied = service.most_commented_post().unwrap().unwrap();
    assert_eq!(tied.post.id, first.id);

    service.add_comment(second.id, bob.id, "c").unwrap();
    let leader = service.most_commented_post().unwrap().unwrap();
    assert_eq!(leader.post.id, second.id);
    assert_eq!(leader.author_username, "bob");
    assert_eq!(leader.comment_count(), 2);
}

#[test]
fn find_or_register_user_reuses_existing_username() {
    let mut conn = open_db_in_memory().unwrap();
    let mut service = BlogService::try_new(&mut conn).unwrap();
    let first = service
        .find_or_register_user("alice", "alice@example.com", "Alice")
        .unwrap();
    service.publish_post(first.id, "ORM basics", "intro").unwrap();

    let again = service
        .find_or_register_user("alice", "alice@example.com", "Alice")
        .unwrap();

    assert_eq!(again.id, first.id);
    assert_eq!(again.post_count, 1);
    let users: i64 = conn
        .query_row("SELECT COUNT(*) FROM users;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(users, 1);
}
