use crate::database::models::UserRecord;
use crate::database::repositories::UserRepository;
use crate::database::{is_constraint_violation, Database};
use crate::error::{DomainError, DomainResult};
use crate::utils::now_utc_iso;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const MAX_NAME_LEN: usize = 50;

#[derive(Clone)]
pub struct UserService {
    database: Database,
}

impl UserService {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    pub fn create(&self, input: CreateUserInput) -> DomainResult<UserView> {
        let first_name = input.first_name.trim().to_string();
        let last_name = input.last_name.trim().to_string();
        let email = input.email.trim().to_lowercase();

        if first_name.is_empty() || first_name.chars().count() > MAX_NAME_LEN {
            return Err(DomainError::Validation(format!(
                "first name must be between 1 and {MAX_NAME_LEN} characters"
            )));
        }
        if last_name.is_empty() || last_name.chars().count() > MAX_NAME_LEN {
            return Err(DomainError::Validation(format!(
                "last name must be between 1 and {MAX_NAME_LEN} characters"
            )));
        }
        if !looks_like_email(&email) {
            return Err(DomainError::Validation("invalid email format".into()));
        }

        let existing = self
            .database
            .with_repositories(|repos| repos.users().find_by_email(&email))?;
        if existing.is_some() {
            return Err(DomainError::Conflict(
                "a user with this email already exists".into(),
            ));
        }

        let record = UserRecord {
            id: Uuid::new_v4().to_string(),
            first_name,
            last_name,
            email,
            created_at: now_utc_iso(),
        };

        // The unique index on email is the backstop for concurrent signups.
        if let Err(err) = self
            .database
            .with_repositories(|repos| repos.users().create(&record))
        {
            if is_constraint_violation(&err) {
                return Err(DomainError::Conflict(
                    "a user with this email already exists".into(),
                ));
            }
            return Err(err.into());
        }

        Ok(UserView::from_record(record))
    }

    pub fn get(&self, user_id: &str) -> DomainResult<UserView> {
        let record = self
            .database
            .with_repositories(|repos| repos.users().get(user_id))?
            .ok_or_else(|| DomainError::NotFound(format!("user {user_id} not found")))?;
        Ok(UserView::from_record(record))
    }

    pub fn exists(&self, user_id: &str) -> DomainResult<bool> {
        Ok(self
            .database
            .with_repositories(|repos| repos.users().exists(user_id))?)
    }

    pub fn list(&self, limit: usize, skip: usize) -> DomainResult<UserPage> {
        let (records, total) = self.database.with_repositories(|repos| {
            let records = repos.users().list(limit, skip)?;
            let total = repos.users().count()?;
            Ok((records, total))
        })?;
        Ok(UserPage {
            users: records.into_iter().map(UserView::from_record).collect(),
            total,
            has_more: skip + limit < total,
        })
    }
}

fn looks_like_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !value.contains(char::is_whitespace)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub created_at: String,
}

/// Identity projection attached wherever a record references a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPage {
    pub users: Vec<UserView>,
    pub total: usize,
    pub has_more: bool,
}

impl UserView {
    fn from_record(record: UserRecord) -> Self {
        Self {
            id: record.id,
            first_name: record.first_name,
            last_name: record.last_name,
            email: record.email,
            created_at: record.created_at,
        }
    }
}

impl UserSummary {
    pub(crate) fn from_record(record: UserRecord) -> Self {
        Self {
            id: record.id,
            first_name: record.first_name,
            last_name: record.last_name,
            email: record.email,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn setup_service() -> UserService {
        let conn = Connection::open_in_memory().expect("in-memory db");
        let db = Database::from_connection(conn, true);
        db.ensure_migrations().expect("migrations");
        UserService::new(db)
    }

    fn input(email: &str) -> CreateUserInput {
        CreateUserInput {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: email.into(),
        }
    }

    #[test]
    fn create_normalizes_and_stores_user() {
        let service = setup_service();
        let user = service
            .create(input("  Ada@Example.COM "))
            .expect("create user");
        assert_eq!(user.email, "ada@example.com");
        assert!(service.exists(&user.id).unwrap());
        assert_eq!(service.get(&user.id).unwrap().first_name, "Ada");
    }

    #[test]
    fn duplicate_email_is_a_conflict() {
        let service = setup_service();
        service.create(input("ada@example.com")).unwrap();
        let err = service.create(input("ada@example.com")).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn malformed_email_is_rejected() {
        let service = setup_service();
        for bad in ["not-an-email", "missing@dot", "@example.com", "a b@x.com"] {
            let err = service.create(input(bad)).unwrap_err();
            assert!(matches!(err, DomainError::Validation(_)), "{bad}");
        }
    }

    #[test]
    fn list_paginates_newest_first() {
        let service = setup_service();
        for i in 0..3 {
            service.create(input(&format!("user{i}@example.com"))).unwrap();
        }
        let page = service.list(2, 0).unwrap();
        assert_eq!(page.users.len(), 2);
        assert_eq!(page.total, 3);
        assert!(page.has_more);
        let rest = service.list(2, 2).unwrap();
        assert_eq!(rest.users.len(), 1);
        assert!(!rest.has_more);
    }
}
