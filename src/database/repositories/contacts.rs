use crate::database::models::ContactRecord;
use anyhow::Result;
use rusqlite::{params, Connection, Row};

pub(super) struct SqliteContactRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

fn map_contact(row: &Row<'_>) -> rusqlite::Result<ContactRecord> {
    Ok(ContactRecord {
        follower_id: row.get(0)?,
        followee_id: row.get(1)?,
        created_at: row.get(2)?,
    })
}

impl<'conn> super::ContactRepository for SqliteContactRepository<'conn> {
    fn create(&self, record: &ContactRecord) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO contacts (follower_id, followee_id, created_at)
            VALUES (?1, ?2, ?3)
            "#,
            params![record.follower_id, record.followee_id, record.created_at],
        )?;
        Ok(())
    }

    fn delete(&self, follower_id: &str, followee_id: &str) -> Result<bool> {
        let affected = self.conn.execute(
            r#"
            DELETE FROM contacts
            WHERE follower_id = ?1 AND followee_id = ?2
            "#,
            params![follower_id, followee_id],
        )?;
        Ok(affected > 0)
    }

    fn exists(&self, follower_id: &str, followee_id: &str) -> Result<bool> {
        let count: i64 = self.conn.query_row(
            r#"
            SELECT COUNT(*)
            FROM contacts
            WHERE follower_id = ?1 AND followee_id = ?2
            "#,
            params![follower_id, followee_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn count_followers(&self, user_id: &str) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM contacts WHERE followee_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn count_following(&self, user_id: &str) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM contacts WHERE follower_id = ?1",
            params![user_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn list_followers(
        &self,
        user_id: &str,
        limit: usize,
        skip: usize,
    ) -> Result<Vec<ContactRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT follower_id, followee_id, created_at
            FROM contacts
            WHERE followee_id = ?1
            ORDER BY datetime(created_at) DESC, rowid DESC
            LIMIT ?2 OFFSET ?3
            "#,
        )?;
        let rows = stmt.query_map(params![user_id, limit, skip], map_contact)?;
        let mut contacts = Vec::new();
        for row in rows {
            contacts.push(row?);
        }
        Ok(contacts)
    }

    fn list_following(
        &self,
        user_id: &str,
        limit: usize,
        skip: usize,
    ) -> Result<Vec<ContactRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT follower_id, followee_id, created_at
            FROM contacts
            WHERE follower_id = ?1
            ORDER BY datetime(created_at) DESC, rowid DESC
            LIMIT ?2 OFFSET ?3
            "#,
        )?;
        let rows = stmt.query_map(params![user_id, limit, skip], map_contact)?;
        let mut contacts = Vec::new();
        for row in rows {
            contacts.push(row?);
        }
        Ok(contacts)
    }

    fn mutual_follows(&self, user_id: &str) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT outgoing.followee_id
            FROM contacts outgoing
            INNER JOIN contacts incoming
                ON incoming.follower_id = outgoing.followee_id
                AND incoming.followee_id = outgoing.follower_id
            WHERE outgoing.follower_id = ?1
            ORDER BY outgoing.followee_id ASC
            "#,
        )?;
        let rows = stmt.query_map(params![user_id], |row| row.get::<_, String>(0))?;
        let mut ids = Vec::new();
        for row in rows {
            ids.push(row?);
        }
        Ok(ids)
    }

    fn suggestions(&self, user_id: &str, limit: usize) -> Result<Vec<(String, usize)>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT followee_id, COUNT(*) AS follower_count
            FROM contacts
            WHERE followee_id <> ?1
              AND followee_id NOT IN (
                  SELECT followee_id FROM contacts WHERE follower_id = ?1
              )
            GROUP BY followee_id
            ORDER BY follower_count DESC, followee_id ASC
            LIMIT ?2
            "#,
        )?;
        let rows = stmt.query_map(params![user_id, limit], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as usize))
        })?;
        let mut ranked = Vec::new();
        for row in rows {
            ranked.push(row?);
        }
        Ok(ranked)
    }
}
