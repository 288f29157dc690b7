use crate::database::models::ContactRecord;
use crate::database::repositories::{ContactRepository, SqliteRepositories, UserRepository};
use crate::database::{is_constraint_violation, Database};
use crate::error::{DomainError, DomainResult};
use crate::users::UserSummary;
use crate::utils::now_utc_iso;
use anyhow::anyhow;
use serde::{Deserialize, Serialize};

#[derive(Clone)]
pub struct ContactService {
    database: Database,
}

impl ContactService {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    /// Creates a directed follow edge. The composite primary key on
    /// (follower, followee) is the backstop for concurrent attempts: the
    /// loser of the race observes a conflict, never a broken edge set.
    pub fn follow(&self, follower_id: &str, followee_id: &str) -> DomainResult<ContactView> {
        if follower_id == followee_id {
            return Err(DomainError::Validation(
                "users cannot follow themselves".into(),
            ));
        }

        let (follower, followee) = self.database.with_repositories(|repos| {
            Ok((
                repos.users().get(follower_id)?,
                repos.users().get(followee_id)?,
            ))
        })?;
        let follower = follower
            .ok_or_else(|| DomainError::NotFound(format!("follower {follower_id} not found")))?;
        let followee = followee
            .ok_or_else(|| DomainError::NotFound(format!("followee {followee_id} not found")))?;

        let already = self
            .database
            .with_repositories(|repos| repos.contacts().exists(follower_id, followee_id))?;
        if already {
            return Err(DomainError::Conflict(
                "follow relationship already exists".into(),
            ));
        }

        let record = ContactRecord {
            follower_id: follower_id.to_string(),
            followee_id: followee_id.to_string(),
            created_at: now_utc_iso(),
        };
        if let Err(err) = self
            .database
            .with_repositories(|repos| repos.contacts().create(&record))
        {
            if is_constraint_violation(&err) {
                return Err(DomainError::Conflict(
                    "follow relationship already exists".into(),
                ));
            }
            return Err(err.into());
        }

        Ok(ContactView {
            follower: UserSummary::from_record(follower),
            followee: UserSummary::from_record(followee),
            created_at: record.created_at,
        })
    }

    pub fn unfollow(&self, follower_id: &str, followee_id: &str) -> DomainResult<()> {
        let deleted = self
            .database
            .with_repositories(|repos| repos.contacts().delete(follower_id, followee_id))?;
        if !deleted {
            return Err(DomainError::NotFound(
                "follow relationship not found".into(),
            ));
        }
        Ok(())
    }

    /// The followee's side of edge deletion: drops the edge pointing at
    /// `user_id` from `follower_id`.
    pub fn remove_follower(&self, user_id: &str, follower_id: &str) -> DomainResult<()> {
        self.unfollow(follower_id, user_id)
    }

    pub fn is_following(&self, follower_id: &str, followee_id: &str) -> DomainResult<bool> {
        Ok(self
            .database
            .with_repositories(|repos| repos.contacts().exists(follower_id, followee_id))?)
    }

    pub fn counts(&self, user_id: &str) -> DomainResult<ContactCounts> {
        let (followers, following) = self.database.with_repositories(|repos| {
            Ok((
                repos.contacts().count_followers(user_id)?,
                repos.contacts().count_following(user_id)?,
            ))
        })?;
        Ok(ContactCounts {
            followers,
            following,
        })
    }

    pub fn followers(&self, user_id: &str, limit: usize, skip: usize) -> DomainResult<ContactPage> {
        let (items, total) = self.database.with_repositories(|repos| {
            let records = repos.contacts().list_followers(user_id, limit, skip)?;
            let total = repos.contacts().count_followers(user_id)?;
            Ok((resolve_views(&repos, records)?, total))
        })?;
        Ok(ContactPage {
            contacts: items,
            total,
            has_more: skip + limit < total,
        })
    }

    pub fn following(&self, user_id: &str, limit: usize, skip: usize) -> DomainResult<ContactPage> {
        let (items, total) = self.database.with_repositories(|repos| {
            let records = repos.contacts().list_following(user_id, limit, skip)?;
            let total = repos.contacts().count_following(user_id)?;
            Ok((resolve_views(&repos, records)?, total))
        })?;
        Ok(ContactPage {
            contacts: items,
            total,
            has_more: skip + limit < total,
        })
    }

    pub fn mutual_follows(&self, user_id: &str) -> DomainResult<Vec<UserSummary>> {
        let summaries = self.database.with_repositories(|repos| {
            let ids = repos.contacts().mutual_follows(user_id)?;
            let mut summaries = Vec::with_capacity(ids.len());
            for id in ids {
                let user = repos
                    .users()
                    .get(&id)?
                    .ok_or_else(|| anyhow!("contact edge references missing user {id}"))?;
                summaries.push(UserSummary::from_record(user));
            }
            Ok(summaries)
        })?;
        Ok(summaries)
    }

    pub fn suggestions(&self, user_id: &str, limit: usize) -> DomainResult<Vec<SuggestedUser>> {
        let suggestions = self.database.with_repositories(|repos| {
            let ranked = repos.contacts().suggestions(user_id, limit)?;
            let mut suggestions = Vec::with_capacity(ranked.len());
            for (id, follower_count) in ranked {
                let user = repos
                    .users()
                    .get(&id)?
                    .ok_or_else(|| anyhow!("contact edge references missing user {id}"))?;
                suggestions.push(SuggestedUser {
                    user: UserSummary::from_record(user),
                    follower_count,
                });
            }
            Ok(suggestions)
        })?;
        Ok(suggestions)
    }

    pub fn recent_activity(&self, user_id: &str, limit: usize) -> DomainResult<Vec<ActivityEntry>> {
        let entries = self.database.with_repositories(|repos| {
            let records = repos.contacts().list_following(user_id, limit, 0)?;
            let mut entries = Vec::with_capacity(records.len());
            for record in records {
                let target = repos.users().get(&record.followee_id)?.ok_or_else(|| {
                    anyhow!("contact edge references missing user {}", record.followee_id)
                })?;
                entries.push(ActivityEntry {
                    kind: "follow".into(),
                    target: UserSummary::from_record(target),
                    timestamp: record.created_at,
                });
            }
            Ok(entries)
        })?;
        Ok(entries)
    }
}

fn resolve_views(
    repos: &SqliteRepositories<'_>,
    records: Vec<ContactRecord>,
) -> anyhow::Result<Vec<ContactView>> {
    let mut views = Vec::with_capacity(records.len());
    for record in records {
        let follower = repos.users().get(&record.follower_id)?.ok_or_else(|| {
            anyhow!("contact edge references missing user {}", record.follower_id)
        })?;
        let followee = repos.users().get(&record.followee_id)?.ok_or_else(|| {
            anyhow!("contact edge references missing user {}", record.followee_id)
        })?;
        views.push(ContactView {
            follower: UserSummary::from_record(follower),
            followee: UserSummary::from_record(followee),
            created_at: record.created_at,
        });
    }
    Ok(views)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactView {
    pub follower: UserSummary,
    pub followee: UserSummary,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactPage {
    pub contacts: Vec<ContactView>,
    pub total: usize,
    pub has_more: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ContactCounts {
    pub followers: usize,
    pub following: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedUser {
    pub user: UserSummary,
    pub follower_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEntry {
    #[serde(rename = "type")]
    pub kind: String,
    pub target: UserSummary,
    pub timestamp: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::{CreateUserInput, UserService};
    use rusqlite::Connection;

    fn setup() -> (ContactService, UserService) {
        let conn = Connection::open_in_memory().expect("in-memory db");
        let db = Database::from_connection(conn, true);
        db.ensure_migrations().expect("migrations");
        (ContactService::new(db.clone()), UserService::new(db))
    }

    fn seed_user(users: &UserService, name: &str) -> String {
        users
            .create(CreateUserInput {
                first_name: name.into(),
                last_name: "Test".into(),
                email: format!("{name}@example.com"),
            })
            .expect("seed user")
            .id
    }

    #[test]
    fn follow_creates_edge_and_updates_counts() {
        let (contacts, users) = setup();
        let a = seed_user(&users, "a");
        let b = seed_user(&users, "b");

        let before = contacts.counts(&b).unwrap();
        let view = contacts.follow(&a, &b).unwrap();
        assert_eq!(view.follower.id, a);
        assert_eq!(view.followee.id, b);

        assert!(contacts.is_following(&a, &b).unwrap());
        assert!(!contacts.is_following(&b, &a).unwrap());
        let after = contacts.counts(&b).unwrap();
        assert_eq!(after.followers, before.followers + 1);
        assert_eq!(contacts.counts(&a).unwrap().following, 1);
    }

    #[test]
    fn self_follow_is_a_validation_error() {
        let (contacts, users) = setup();
        let a = seed_user(&users, "a");
        let err = contacts.follow(&a, &a).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn duplicate_follow_is_a_conflict_and_state_is_unchanged() {
        let (contacts, users) = setup();
        let a = seed_user(&users, "a");
        let b = seed_user(&users, "b");
        contacts.follow(&a, &b).unwrap();
        let err = contacts.follow(&a, &b).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        assert_eq!(contacts.counts(&b).unwrap().followers, 1);
    }

    #[test]
    fn follow_requires_both_users() {
        let (contacts, users) = setup();
        let a = seed_user(&users, "a");
        let err = contacts.follow(&a, "ghost").unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
        let err = contacts.follow("ghost", &a).unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[test]
    fn unfollow_removes_the_edge() {
        let (contacts, users) = setup();
        let a = seed_user(&users, "a");
        let b = seed_user(&users, "b");
        contacts.follow(&a, &b).unwrap();
        contacts.unfollow(&a, &b).unwrap();
        assert!(!contacts.is_following(&a, &b).unwrap());

        let err = contacts.unfollow(&a, &b).unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[test]
    fn remove_follower_acts_from_the_followee_side() {
        let (contacts, users) = setup();
        let a = seed_user(&users, "a");
        let b = seed_user(&users, "b");
        contacts.follow(&a, &b).unwrap();
        contacts.remove_follower(&b, &a).unwrap();
        assert!(!contacts.is_following(&a, &b).unwrap());
    }

    #[test]
    fn mutual_follows_require_both_directions() {
        let (contacts, users) = setup();
        let a = seed_user(&users, "a");
        let b = seed_user(&users, "b");
        let c = seed_user(&users, "c");

        contacts.follow(&a, &b).unwrap();
        contacts.follow(&b, &a).unwrap();
        contacts.follow(&a, &c).unwrap();

        let mutuals_a: Vec<_> = contacts
            .mutual_follows(&a)
            .unwrap()
            .into_iter()
            .map(|u| u.id)
            .collect();
        assert_eq!(mutuals_a, vec![b.clone()]);

        let mutuals_b: Vec<_> = contacts
            .mutual_follows(&b)
            .unwrap()
            .into_iter()
            .map(|u| u.id)
            .collect();
        assert_eq!(mutuals_b, vec![a]);
    }

    #[test]
    fn suggestions_rank_by_global_follower_count() {
        let (contacts, users) = setup();
        let a = seed_user(&users, "a");
        let b = seed_user(&users, "b");
        let c = seed_user(&users, "c");
        let d = seed_user(&users, "d");
        let followers: Vec<String> = (0..5)
            .map(|i| seed_user(&users, &format!("f{i}")))
            .collect();

        // b gets 5 followers, c gets 3, d gets 1; a follows none of them.
        for f in &followers {
            contacts.follow(f, &b).unwrap();
        }
        for f in followers.iter().take(3) {
            contacts.follow(f, &c).unwrap();
        }
        contacts.follow(&followers[0], &d).unwrap();

        let ranked = contacts.suggestions(&a, 3).unwrap();
        let ids: Vec<_> = ranked.iter().map(|s| s.user.id.as_str()).collect();
        assert_eq!(ids, vec![b.as_str(), c.as_str(), d.as_str()]);
        assert_eq!(ranked[0].follower_count, 5);
        assert_eq!(ranked[1].follower_count, 3);
        assert_eq!(ranked[2].follower_count, 1);
    }

    #[test]
    fn followers_page_reports_totals() {
        let (contacts, users) = setup();
        let a = seed_user(&users, "a");
        let followers: Vec<String> = (0..3)
            .map(|i| seed_user(&users, &format!("f{i}")))
            .collect();
        for f in &followers {
            contacts.follow(f, &a).unwrap();
        }

        let page = contacts.followers(&a, 2, 0).unwrap();
        assert_eq!(page.contacts.len(), 2);
        assert_eq!(page.total, 3);
        assert!(page.has_more);

        let rest = contacts.followers(&a, 2, 2).unwrap();
        assert_eq!(rest.contacts.len(), 1);
        assert!(!rest.has_more);

        // Most recent follower comes back first.
        assert_eq!(page.contacts[0].follower.id, followers[2]);
    }

    #[test]
    fn activity_reports_outgoing_follows() {
        let (contacts, users) = setup();
        let a = seed_user(&users, "a");
        let b = seed_user(&users, "b");
        let c = seed_user(&users, "c");
        contacts.follow(&a, &b).unwrap();
        contacts.follow(&a, &c).unwrap();

        let activity = contacts.recent_activity(&a, 10).unwrap();
        assert_eq!(activity.len(), 2);
        assert!(activity.iter().all(|e| e.kind == "follow"));
        // Newest first.
        assert_eq!(activity[0].target.id, c);
    }
}
