use crate::database::models::PostRecord;
use crate::database::repositories::{PostRepository, UserRepository};
use crate::database::Database;
use crate::error::{DomainError, DomainResult};
use crate::users::UserSummary;
use crate::utils::now_utc_iso;
use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const MAX_TITLE_LEN: usize = 100;
const MAX_CONTENT_LEN: usize = 1500;

pub const POST_TYPES: &[&str] = &["general", "financial", "invoice", "question", "announcement"];

#[derive(Clone)]
pub struct PostService {
    database: Database,
}

impl PostService {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    pub fn create(&self, input: CreatePostInput) -> DomainResult<PostView> {
        let title = input.title.trim().to_string();
        let content = input.content.trim().to_string();
        let post_type = input
            .post_type
            .as_deref()
            .unwrap_or("general")
            .trim()
            .to_string();

        if title.is_empty() || title.chars().count() > MAX_TITLE_LEN {
            return Err(DomainError::Validation(format!(
                "title must be between 1 and {MAX_TITLE_LEN} characters"
            )));
        }
        if content.is_empty() || content.chars().count() > MAX_CONTENT_LEN {
            return Err(DomainError::Validation(format!(
                "content must be between 1 and {MAX_CONTENT_LEN} characters"
            )));
        }
        if !POST_TYPES.contains(&post_type.as_str()) {
            return Err(DomainError::Validation(format!(
                "unknown post type '{post_type}'"
            )));
        }

        let author = self
            .database
            .with_repositories(|repos| repos.users().get(&input.author_id))?
            .ok_or_else(|| {
                DomainError::NotFound(format!("author {} not found", input.author_id))
            })?;

        let record = PostRecord {
            id: Uuid::new_v4().to_string(),
            author_id: author.id.clone(),
            title,
            content,
            post_type,
            invoice_id: input.invoice_id.clone(),
            created_at: now_utc_iso(),
        };

        self.database
            .with_repositories(|repos| repos.posts().create(&record))?;

        Ok(PostView::from_record(record, UserSummary::from_record(author)))
    }

    pub fn get(&self, post_id: &str) -> DomainResult<PostView> {
        let view = self.database.with_repositories(|repos| {
            let Some(record) = repos.posts().get(post_id)? else {
                return Ok(None);
            };
            let author = repos.users().get(&record.author_id)?.ok_or_else(|| {
                anyhow!("post {} references missing author {}", record.id, record.author_id)
            })?;
            Ok(Some(PostView::from_record(
                record,
                UserSummary::from_record(author),
            )))
        })?;
        view.ok_or_else(|| DomainError::NotFound(format!("post {post_id} not found")))
    }

    pub fn list(&self, limit: usize, skip: usize) -> DomainResult<PostPage> {
        let (views, total) = self.database.with_repositories(|repos| {
            let records = repos.posts().list_recent(limit, skip)?;
            let total = repos.posts().count()?;
            let mut views = Vec::with_capacity(records.len());
            for record in records {
                let author = repos.users().get(&record.author_id)?.ok_or_else(|| {
                    anyhow!(
                        "post {} references missing author {}",
                        record.id,
                        record.author_id
                    )
                })?;
                views.push(PostView::from_record(record, UserSummary::from_record(author)));
            }
            Ok((views, total))
        })?;
        Ok(PostPage {
            posts: views,
            total,
            has_more: skip + limit < total,
        })
    }

    pub fn list_by_author(&self, author_id: &str) -> DomainResult<Vec<PostView>> {
        let views = self.database.with_repositories(|repos| {
            let records = repos.posts().list_by_author(author_id)?;
            let mut views = Vec::with_capacity(records.len());
            for record in records {
                let author = repos.users().get(&record.author_id)?.ok_or_else(|| {
                    anyhow!(
                        "post {} references missing author {}",
                        record.id,
                        record.author_id
                    )
                })?;
                views.push(PostView::from_record(record, UserSummary::from_record(author)));
            }
            Ok(views)
        })?;
        Ok(views)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostInput {
    pub author_id: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub post_type: Option<String>,
    #[serde(default)]
    pub invoice_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostView {
    pub id: String,
    pub title: String,
    pub content: String,
    pub post_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invoice_id: Option<String>,
    pub created_at: String,
    pub author: UserSummary,
}

/// Compact projection used when a friend request references a post.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostSummary {
    pub id: String,
    pub title: String,
    pub author: UserSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostPage {
    pub posts: Vec<PostView>,
    pub total: usize,
    pub has_more: bool,
}

impl PostView {
    fn from_record(record: PostRecord, author: UserSummary) -> Self {
        Self {
            id: record.id,
            title: record.title,
            content: record.content,
            post_type: record.post_type,
            invoice_id: record.invoice_id,
            created_at: record.created_at,
            author,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::{CreateUserInput, UserService};
    use rusqlite::Connection;

    fn setup() -> (PostService, UserService) {
        let conn = Connection::open_in_memory().expect("in-memory db");
        let db = Database::from_connection(conn, true);
        db.ensure_migrations().expect("migrations");
        (PostService::new(db.clone()), UserService::new(db))
    }

    fn seed_user(users: &UserService, email: &str) -> String {
        users
            .create(CreateUserInput {
                first_name: "Test".into(),
                last_name: "User".into(),
                email: email.into(),
            })
            .expect("seed user")
            .id
    }

    #[test]
    fn create_resolves_author_and_defaults_type() {
        let (posts, users) = setup();
        let author_id = seed_user(&users, "author@example.com");
        let post = posts
            .create(CreatePostInput {
                author_id: author_id.clone(),
                title: "Invoice F001-123".into(),
                content: "Settling this invoice, who wants in?".into(),
                post_type: None,
                invoice_id: Some("inv-42".into()),
            })
            .expect("create post");
        assert_eq!(post.post_type, "general");
        assert_eq!(post.author.id, author_id);
        assert_eq!(post.invoice_id.as_deref(), Some("inv-42"));

        let fetched = posts.get(&post.id).unwrap();
        assert_eq!(fetched.title, "Invoice F001-123");
    }

    #[test]
    fn missing_author_is_not_found() {
        let (posts, _) = setup();
        let err = posts
            .create(CreatePostInput {
                author_id: "ghost".into(),
                title: "t".into(),
                content: "c".into(),
                post_type: None,
                invoice_id: None,
            })
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[test]
    fn unknown_post_type_is_rejected() {
        let (posts, users) = setup();
        let author_id = seed_user(&users, "author@example.com");
        let err = posts
            .create(CreatePostInput {
                author_id,
                title: "t".into(),
                content: "c".into(),
                post_type: Some("meme".into()),
                invoice_id: None,
            })
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn feed_paginates() {
        let (posts, users) = setup();
        let author_id = seed_user(&users, "author@example.com");
        for i in 0..3 {
            posts
                .create(CreatePostInput {
                    author_id: author_id.clone(),
                    title: format!("post {i}"),
                    content: "body".into(),
                    post_type: Some("financial".into()),
                    invoice_id: None,
                })
                .unwrap();
        }
        let page = posts.list(2, 0).unwrap();
        assert_eq!(page.posts.len(), 2);
        assert_eq!(page.total, 3);
        assert!(page.has_more);
        assert_eq!(posts.list_by_author(&author_id).unwrap().len(), 3);
    }
}
