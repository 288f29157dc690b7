mod contacts;
mod friend_requests;
mod posts;
mod users;

use super::models::{ContactRecord, FriendRequestRecord, PostRecord, UserRecord};
use anyhow::Result;
use rusqlite::Connection;

pub trait UserRepository {
    fn create(&self, record: &UserRecord) -> Result<()>;
    fn get(&self, id: &str) -> Result<Option<UserRecord>>;
    fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>>;
    fn exists(&self, id: &str) -> Result<bool>;
    fn list(&self, limit: usize, skip: usize) -> Result<Vec<UserRecord>>;
    fn count(&self) -> Result<usize>;
}

pub trait PostRepository {
    fn create(&self, record: &PostRecord) -> Result<()>;
    fn get(&self, id: &str) -> Result<Option<PostRecord>>;
    fn list_recent(&self, limit: usize, skip: usize) -> Result<Vec<PostRecord>>;
    fn list_by_author(&self, author_id: &str) -> Result<Vec<PostRecord>>;
    fn count(&self) -> Result<usize>;
}

pub trait ContactRepository {
    fn create(&self, record: &ContactRecord) -> Result<()>;
    /// Returns false when no matching edge existed.
    fn delete(&self, follower_id: &str, followee_id: &str) -> Result<bool>;
    fn exists(&self, follower_id: &str, followee_id: &str) -> Result<bool>;
    fn count_followers(&self, user_id: &str) -> Result<usize>;
    fn count_following(&self, user_id: &str) -> Result<usize>;
    fn list_followers(&self, user_id: &str, limit: usize, skip: usize)
        -> Result<Vec<ContactRecord>>;
    fn list_following(&self, user_id: &str, limit: usize, skip: usize)
        -> Result<Vec<ContactRecord>>;
    /// Ids of users who follow `user_id` back, ordered by id.
    fn mutual_follows(&self, user_id: &str) -> Result<Vec<String>>;
    /// (followee_id, follower_count) for users `user_id` does not follow,
    /// most followed first, ties broken by id.
    fn suggestions(&self, user_id: &str, limit: usize) -> Result<Vec<(String, usize)>>;
}

pub trait FriendRequestRepository {
    fn create(&self, record: &FriendRequestRecord) -> Result<()>;
    fn get(&self, id: &str) -> Result<Option<FriendRequestRecord>>;
    fn find_for_post_and_sender(
        &self,
        post_id: &str,
        sender_id: &str,
    ) -> Result<Option<FriendRequestRecord>>;
    /// Conditional transition out of 'pending'. Returns false when the
    /// request was already terminal (or gone), so racing transitions
    /// resolve to a single winner.
    fn update_status_if_pending(&self, id: &str, status: &str) -> Result<bool>;
    fn delete(&self, id: &str) -> Result<bool>;
    fn list_pending_for_post(&self, post_id: &str) -> Result<Vec<FriendRequestRecord>>;
    fn list_sent_by(&self, sender_id: &str) -> Result<Vec<FriendRequestRecord>>;
    fn list_received_by(
        &self,
        author_id: &str,
        status: Option<&str>,
        limit: usize,
        skip: usize,
    ) -> Result<Vec<FriendRequestRecord>>;
    fn count_received_by(&self, author_id: &str, status: Option<&str>) -> Result<usize>;
    fn list_by_status(&self, status: &str, limit: usize, skip: usize)
        -> Result<Vec<FriendRequestRecord>>;
    fn count_by_status(&self, status: &str) -> Result<usize>;
    fn sent_status_counts(&self, sender_id: &str) -> Result<Vec<(String, usize)>>;
    fn received_status_counts(&self, author_id: &str) -> Result<Vec<(String, usize)>>;
}

pub struct SqliteRepositories<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteRepositories<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    pub fn users(&self) -> impl UserRepository + '_ {
        users::SqliteUserRepository { conn: self.conn }
    }

    pub fn posts(&self) -> impl PostRepository + '_ {
        posts::SqlitePostRepository { conn: self.conn }
    }

    pub fn contacts(&self) -> impl ContactRepository + '_ {
        contacts::SqliteContactRepository { conn: self.conn }
    }

    pub fn friend_requests(&self) -> impl FriendRequestRepository + '_ {
        friend_requests::SqliteFriendRequestRepository { conn: self.conn }
    }

    pub fn conn(&self) -> &'conn Connection {
        self.conn
    }
}
