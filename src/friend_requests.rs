use crate::contacts::ContactService;
use crate::database::models::FriendRequestRecord;
use crate::database::repositories::{
    FriendRequestRepository, PostRepository, SqliteRepositories, UserRepository,
};
use crate::database::{is_constraint_violation, Database};
use crate::error::{DomainError, DomainResult};
use crate::posts::PostSummary;
use crate::users::UserSummary;
use crate::utils::now_utc_iso;
use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

const MAX_MESSAGE_LEN: usize = 250;

/// Lifecycle states. `Pending` is the only state with outgoing transitions;
/// `Accepted` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Accepted => "accepted",
            RequestStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for RequestStatus {
    type Err = DomainError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "pending" => Ok(RequestStatus::Pending),
            "accepted" => Ok(RequestStatus::Accepted),
            "rejected" => Ok(RequestStatus::Rejected),
            other => Err(DomainError::Validation(format!(
                "unknown request status '{other}'"
            ))),
        }
    }
}

#[derive(Clone)]
pub struct FriendRequestService {
    database: Database,
    contacts: ContactService,
}

impl FriendRequestService {
    pub fn new(database: Database) -> Self {
        let contacts = ContactService::new(database.clone());
        Self { database, contacts }
    }

    pub fn send(&self, input: SendFriendRequestInput) -> DomainResult<FriendRequestView> {
        let message = input
            .message
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string);
        if let Some(message) = &message {
            if message.chars().count() > MAX_MESSAGE_LEN {
                return Err(DomainError::Validation(format!(
                    "message cannot exceed {MAX_MESSAGE_LEN} characters"
                )));
            }
        }

        let (post, sender) = self.database.with_repositories(|repos| {
            Ok((
                repos.posts().get(&input.post_id)?,
                repos.users().get(&input.sender_id)?,
            ))
        })?;
        let post = post
            .ok_or_else(|| DomainError::NotFound(format!("post {} not found", input.post_id)))?;
        let sender = sender.ok_or_else(|| {
            DomainError::NotFound(format!("sender {} not found", input.sender_id))
        })?;
        if post.author_id == sender.id {
            return Err(DomainError::Forbidden(
                "cannot send a friend request on your own post".into(),
            ));
        }

        let existing = self.database.with_repositories(|repos| {
            repos
                .friend_requests()
                .find_for_post_and_sender(&post.id, &sender.id)
        })?;
        if existing.is_some() {
            return Err(DomainError::Conflict(
                "a friend request for this post already exists".into(),
            ));
        }

        let record = FriendRequestRecord {
            id: Uuid::new_v4().to_string(),
            post_id: post.id.clone(),
            sender_id: sender.id.clone(),
            message,
            status: RequestStatus::Pending.as_str().to_string(),
            sent_at: now_utc_iso(),
        };
        // The unique index on (post, sender) decides racing sends.
        if let Err(err) = self
            .database
            .with_repositories(|repos| repos.friend_requests().create(&record))
        {
            if is_constraint_violation(&err) {
                return Err(DomainError::Conflict(
                    "a friend request for this post already exists".into(),
                ));
            }
            return Err(err.into());
        }

        self.resolve_view(record)
    }

    pub fn accept(&self, request_id: &str, acting_user_id: &str) -> DomainResult<FriendRequestView> {
        self.transition(request_id, acting_user_id, RequestStatus::Accepted)
    }

    pub fn reject(&self, request_id: &str, acting_user_id: &str) -> DomainResult<FriendRequestView> {
        self.transition(request_id, acting_user_id, RequestStatus::Rejected)
    }

    fn transition(
        &self,
        request_id: &str,
        acting_user_id: &str,
        target: RequestStatus,
    ) -> DomainResult<FriendRequestView> {
        let record = self.load(request_id)?;
        let post = self
            .database
            .with_repositories(|repos| repos.posts().get(&record.post_id))?
            .ok_or_else(|| {
                anyhow!(
                    "friend request {} references missing post {}",
                    record.id,
                    record.post_id
                )
            })?;
        if post.author_id != acting_user_id {
            return Err(DomainError::Forbidden(
                "only the post author can process this request".into(),
            ));
        }
        if record.status != RequestStatus::Pending.as_str() {
            return Err(DomainError::InvalidState(
                "friend request was already processed".into(),
            ));
        }

        // Conditional update so racing accept/reject calls resolve to a
        // single winner; the loser sees the request as already processed.
        let updated = self.database.with_repositories(|repos| {
            repos
                .friend_requests()
                .update_status_if_pending(request_id, target.as_str())
        })?;
        if !updated {
            return Err(DomainError::InvalidState(
                "friend request was already processed".into(),
            ));
        }

        if target == RequestStatus::Accepted {
            // Best-effort edge creation. The accepted status is
            // authoritative: an existing edge is fine, anything else is
            // logged and left for the graph to reconcile.
            match self.contacts.follow(&record.sender_id, &post.author_id) {
                Ok(_) | Err(DomainError::Conflict(_)) => {}
                Err(err) => {
                    tracing::warn!(
                        request_id = %request_id,
                        error = %err,
                        "friend request accepted but follow edge creation failed"
                    );
                }
            }
        }

        let record = self.load(request_id)?;
        self.resolve_view(record)
    }

    pub fn cancel(&self, request_id: &str, acting_user_id: &str) -> DomainResult<()> {
        let record = self.load(request_id)?;
        if record.sender_id != acting_user_id {
            return Err(DomainError::Forbidden(
                "only the sender can cancel this request".into(),
            ));
        }
        if record.status != RequestStatus::Pending.as_str() {
            return Err(DomainError::InvalidState(
                "only pending requests can be cancelled".into(),
            ));
        }
        let deleted = self
            .database
            .with_repositories(|repos| repos.friend_requests().delete(request_id))?;
        if !deleted {
            return Err(DomainError::NotFound(format!(
                "friend request {request_id} not found"
            )));
        }
        Ok(())
    }

    pub fn get(&self, request_id: &str) -> DomainResult<FriendRequestView> {
        let record = self.load(request_id)?;
        self.resolve_view(record)
    }

    pub fn stats(&self, user_id: &str) -> DomainResult<FriendRequestStats> {
        let (sent, received) = self.database.with_repositories(|repos| {
            Ok((
                repos.friend_requests().sent_status_counts(user_id)?,
                repos.friend_requests().received_status_counts(user_id)?,
            ))
        })?;
        Ok(FriendRequestStats {
            sent: StatusBuckets::from_counts(&sent),
            received: StatusBuckets::from_counts(&received),
        })
    }

    pub fn pending_for_post(&self, post_id: &str) -> DomainResult<Vec<FriendRequestView>> {
        let views = self.database.with_repositories(|repos| {
            let records = repos.friend_requests().list_pending_for_post(post_id)?;
            resolve_views(&repos, records)
        })?;
        Ok(views)
    }

    pub fn sent_by(&self, user_id: &str) -> DomainResult<Vec<FriendRequestView>> {
        let views = self.database.with_repositories(|repos| {
            let records = repos.friend_requests().list_sent_by(user_id)?;
            resolve_views(&repos, records)
        })?;
        Ok(views)
    }

    pub fn received_by(
        &self,
        author_id: &str,
        status: Option<RequestStatus>,
        limit: usize,
        skip: usize,
    ) -> DomainResult<FriendRequestPage> {
        let status_str = status.map(RequestStatus::as_str);
        let (views, total) = self.database.with_repositories(|repos| {
            let records =
                repos
                    .friend_requests()
                    .list_received_by(author_id, status_str, limit, skip)?;
            let total = repos
                .friend_requests()
                .count_received_by(author_id, status_str)?;
            Ok((resolve_views(&repos, records)?, total))
        })?;
        Ok(FriendRequestPage {
            requests: views,
            total,
            has_more: skip + limit < total,
        })
    }

    pub fn list_by_status(
        &self,
        status: RequestStatus,
        limit: usize,
        skip: usize,
    ) -> DomainResult<FriendRequestPage> {
        let (views, total) = self.database.with_repositories(|repos| {
            let records = repos
                .friend_requests()
                .list_by_status(status.as_str(), limit, skip)?;
            let total = repos.friend_requests().count_by_status(status.as_str())?;
            Ok((resolve_views(&repos, records)?, total))
        })?;
        Ok(FriendRequestPage {
            requests: views,
            total,
            has_more: skip + limit < total,
        })
    }

    fn load(&self, request_id: &str) -> DomainResult<FriendRequestRecord> {
        self.database
            .with_repositories(|repos| repos.friend_requests().get(request_id))?
            .ok_or_else(|| {
                DomainError::NotFound(format!("friend request {request_id} not found"))
            })
    }

    fn resolve_view(&self, record: FriendRequestRecord) -> DomainResult<FriendRequestView> {
        let view = self
            .database
            .with_repositories(|repos| resolve_views(&repos, vec![record]))?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("friend request view resolution produced no view"))?;
        Ok(view)
    }
}

fn resolve_views(
    repos: &SqliteRepositories<'_>,
    records: Vec<FriendRequestRecord>,
) -> anyhow::Result<Vec<FriendRequestView>> {
    let mut views = Vec::with_capacity(records.len());
    for record in records {
        let post = repos.posts().get(&record.post_id)?.ok_or_else(|| {
            anyhow!(
                "friend request {} references missing post {}",
                record.id,
                record.post_id
            )
        })?;
        let author = repos.users().get(&post.author_id)?.ok_or_else(|| {
            anyhow!("post {} references missing author {}", post.id, post.author_id)
        })?;
        let sender = repos.users().get(&record.sender_id)?.ok_or_else(|| {
            anyhow!(
                "friend request {} references missing sender {}",
                record.id,
                record.sender_id
            )
        })?;
        views.push(FriendRequestView {
            id: record.id,
            post: PostSummary {
                id: post.id,
                title: post.title,
                author: UserSummary::from_record(author),
            },
            sender: UserSummary::from_record(sender),
            message: record.message,
            status: record.status,
            sent_at: record.sent_at,
        });
    }
    Ok(views)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendFriendRequestInput {
    pub post_id: String,
    pub sender_id: String,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequestView {
    pub id: String,
    pub post: PostSummary,
    pub sender: UserSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub status: String,
    pub sent_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequestPage {
    pub requests: Vec<FriendRequestView>,
    pub total: usize,
    pub has_more: bool,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct StatusBuckets {
    pub pending: usize,
    pub accepted: usize,
    pub rejected: usize,
}

impl StatusBuckets {
    fn from_counts(counts: &[(String, usize)]) -> Self {
        let mut buckets = Self::default();
        for (status, count) in counts {
            match status.as_str() {
                "pending" => buckets.pending = *count,
                "accepted" => buckets.accepted = *count,
                "rejected" => buckets.rejected = *count,
                _ => {}
            }
        }
        buckets
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FriendRequestStats {
    pub sent: StatusBuckets,
    pub received: StatusBuckets,
}
