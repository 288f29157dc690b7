use crate::database::models::FriendRequestRecord;
use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};

pub(super) struct SqliteFriendRequestRepository<'conn> {
    pub(super) conn: &'conn Connection,
}

fn map_request(row: &Row<'_>) -> rusqlite::Result<FriendRequestRecord> {
    Ok(FriendRequestRecord {
        id: row.get(0)?,
        post_id: row.get(1)?,
        sender_id: row.get(2)?,
        message: row.get(3)?,
        status: row.get(4)?,
        sent_at: row.get(5)?,
    })
}

impl<'conn> SqliteFriendRequestRepository<'conn> {
    fn collect(
        &self,
        stmt: &mut rusqlite::Statement<'_>,
        params: impl rusqlite::Params,
    ) -> Result<Vec<FriendRequestRecord>> {
        let rows = stmt.query_map(params, map_request)?;
        let mut requests = Vec::new();
        for row in rows {
            requests.push(row?);
        }
        Ok(requests)
    }
}

impl<'conn> super::FriendRequestRepository for SqliteFriendRequestRepository<'conn> {
    fn create(&self, record: &FriendRequestRecord) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO friend_requests (id, post_id, sender_id, message, status, sent_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                record.id,
                record.post_id,
                record.sender_id,
                record.message,
                record.status,
                record.sent_at,
            ],
        )?;
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<FriendRequestRecord>> {
        Ok(self
            .conn
            .query_row(
                r#"
                SELECT id, post_id, sender_id, message, status, sent_at
                FROM friend_requests
                WHERE id = ?1
                "#,
                params![id],
                map_request,
            )
            .optional()?)
    }

    fn find_for_post_and_sender(
        &self,
        post_id: &str,
        sender_id: &str,
    ) -> Result<Option<FriendRequestRecord>> {
        Ok(self
            .conn
            .query_row(
                r#"
                SELECT id, post_id, sender_id, message, status, sent_at
                FROM friend_requests
                WHERE post_id = ?1 AND sender_id = ?2
                "#,
                params![post_id, sender_id],
                map_request,
            )
            .optional()?)
    }

    fn update_status_if_pending(&self, id: &str, status: &str) -> Result<bool> {
        let affected = self.conn.execute(
            r#"
            UPDATE friend_requests
            SET status = ?2
            WHERE id = ?1 AND status = 'pending'
            "#,
            params![id, status],
        )?;
        Ok(affected > 0)
    }

    fn delete(&self, id: &str) -> Result<bool> {
        let affected = self
            .conn
            .execute("DELETE FROM friend_requests WHERE id = ?1", params![id])?;
        Ok(affected > 0)
    }

    fn list_pending_for_post(&self, post_id: &str) -> Result<Vec<FriendRequestRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, post_id, sender_id, message, status, sent_at
            FROM friend_requests
            WHERE post_id = ?1 AND status = 'pending'
            ORDER BY datetime(sent_at) DESC, rowid DESC
            "#,
        )?;
        self.collect(&mut stmt, params![post_id])
    }

    fn list_sent_by(&self, sender_id: &str) -> Result<Vec<FriendRequestRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, post_id, sender_id, message, status, sent_at
            FROM friend_requests
            WHERE sender_id = ?1
            ORDER BY datetime(sent_at) DESC, rowid DESC
            "#,
        )?;
        self.collect(&mut stmt, params![sender_id])
    }

    fn list_received_by(
        &self,
        author_id: &str,
        status: Option<&str>,
        limit: usize,
        skip: usize,
    ) -> Result<Vec<FriendRequestRecord>> {
        match status {
            Some(status) => {
                let mut stmt = self.conn.prepare(
                    r#"
                    SELECT fr.id, fr.post_id, fr.sender_id, fr.message, fr.status, fr.sent_at
                    FROM friend_requests fr
                    INNER JOIN posts p ON p.id = fr.post_id
                    WHERE p.author_id = ?1 AND fr.status = ?2
                    ORDER BY datetime(fr.sent_at) DESC, fr.rowid DESC
                    LIMIT ?3 OFFSET ?4
                    "#,
                )?;
                self.collect(&mut stmt, params![author_id, status, limit, skip])
            }
            None => {
                let mut stmt = self.conn.prepare(
                    r#"
                    SELECT fr.id, fr.post_id, fr.sender_id, fr.message, fr.status, fr.sent_at
                    FROM friend_requests fr
                    INNER JOIN posts p ON p.id = fr.post_id
                    WHERE p.author_id = ?1
                    ORDER BY datetime(fr.sent_at) DESC, fr.rowid DESC
                    LIMIT ?2 OFFSET ?3
                    "#,
                )?;
                self.collect(&mut stmt, params![author_id, limit, skip])
            }
        }
    }

    fn count_received_by(&self, author_id: &str, status: Option<&str>) -> Result<usize> {
        let count: i64 = match status {
            Some(status) => self.conn.query_row(
                r#"
                SELECT COUNT(*)
                FROM friend_requests fr
                INNER JOIN posts p ON p.id = fr.post_id
                WHERE p.author_id = ?1 AND fr.status = ?2
                "#,
                params![author_id, status],
                |row| row.get(0),
            )?,
            None => self.conn.query_row(
                r#"
                SELECT COUNT(*)
                FROM friend_requests fr
                INNER JOIN posts p ON p.id = fr.post_id
                WHERE p.author_id = ?1
                "#,
                params![author_id],
                |row| row.get(0),
            )?,
        };
        Ok(count as usize)
    }

    fn list_by_status(
        &self,
        status: &str,
        limit: usize,
        skip: usize,
    ) -> Result<Vec<FriendRequestRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, post_id, sender_id, message, status, sent_at
            FROM friend_requests
            WHERE status = ?1
            ORDER BY datetime(sent_at) DESC, rowid DESC
            LIMIT ?2 OFFSET ?3
            "#,
        )?;
        self.collect(&mut stmt, params![status, limit, skip])
    }

    fn count_by_status(&self, status: &str) -> Result<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM friend_requests WHERE status = ?1",
            params![status],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    fn sent_status_counts(&self, sender_id: &str) -> Result<Vec<(String, usize)>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT status, COUNT(*) AS count
            FROM friend_requests
            WHERE sender_id = ?1
            GROUP BY status
            ORDER BY status ASC
            "#,
        )?;
        let rows = stmt.query_map(params![sender_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as usize))
        })?;
        let mut counts = Vec::new();
        for row in rows {
            counts.push(row?);
        }
        Ok(counts)
    }

    fn received_status_counts(&self, author_id: &str) -> Result<Vec<(String, usize)>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT fr.status, COUNT(*) AS count
            FROM friend_requests fr
            INNER JOIN posts p ON p.id = fr.post_id
            WHERE p.author_id = ?1
            GROUP BY fr.status
            ORDER BY fr.status ASC
            "#,
        )?;
        let rows = stmt.query_map(params![author_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as usize))
        })?;
        let mut counts = Vec::new();
        for row in rows {
            counts.push(row?);
        }
        Ok(counts)
    }
}
