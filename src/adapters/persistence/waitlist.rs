use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    domain::entities::waitlist_entry::{
        AtomicEnrollment, InsertedEntry, NewWaitlistEntry, WaitlistEntry, WaitlistRole,
    },
    use_cases::waitlist::WaitlistRepo,
};

/// Advisory lock key serializing atomic enrollments ("WAITLIST" in ASCII).
const ENROLL_LOCK_KEY: i64 = 0x5741_4954_4c49_5354;

// Entry as stored in the db.
#[derive(sqlx::FromRow, Debug)]
pub struct WaitlistEntryDb {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: Option<String>,
    pub institution: Option<String>,
    pub position: Option<i64>,
    pub referral_code: String,
    pub created_at: DateTime<Utc>,
}

impl WaitlistEntryDb {
    fn into_entry(self) -> WaitlistEntry {
        let role = self.role.as_deref().and_then(|raw| {
            let parsed = WaitlistRole::parse(raw);
            if parsed.is_none() {
                tracing::warn!(
                    entity_id = %self.id,
                    raw_role = raw,
                    "Unknown waitlist role in db, treating as absent"
                );
            }
            parsed
        });
        WaitlistEntry {
            id: self.id,
            email: self.email,
            name: self.name,
            role,
            institution: self.institution,
            position: self.position,
            referral_code: self.referral_code,
            enrolled_at: self.created_at,
        }
    }
}

#[async_trait]
impl WaitlistRepo for PostgresPersistence {
    async fn find_by_email(&self, email: &str) -> AppResult<Vec<WaitlistEntry>> {
        let rows = sqlx::query_as::<_, WaitlistEntryDb>(
            r#"
                SELECT id, email, name, role, institution, position, referral_code, created_at
                FROM waitlist
                WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_all(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(rows.into_iter().map(WaitlistEntryDb::into_entry).collect())
    }

    async fn insert(&self, entry: &NewWaitlistEntry) -> AppResult<InsertedEntry> {
        let id = Uuid::new_v4();
        let (id, enrolled_at) = sqlx::query_as::<_, (Uuid, DateTime<Utc>)>(
            r#"
                INSERT INTO waitlist (id, email, name, role, institution, position, referral_code)
                VALUES ($1, $2, $3, $4, $5, NULL, $6)
                RETURNING id, created_at
            "#,
        )
        .bind(id)
        .bind(&entry.email)
        .bind(&entry.name)
        .bind(entry.role.map(|r| r.as_str()))
        .bind(&entry.institution)
        .bind(&entry.referral_code)
        .fetch_one(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(InsertedEntry { id, enrolled_at })
    }

    async fn get_enrolled_at(&self, id: Uuid) -> AppResult<DateTime<Utc>> {
        let enrolled_at: DateTime<Utc> =
            sqlx::query_scalar("SELECT created_at FROM waitlist WHERE id = $1")
                .bind(id)
                .fetch_one(self.pool())
                .await
                .map_err(AppError::from)?;
        Ok(enrolled_at)
    }

    async fn count_enrolled_before(&self, enrolled_at: DateTime<Utc>) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM waitlist WHERE created_at < $1")
            .bind(enrolled_at)
            .fetch_one(self.pool())
            .await
            .map_err(AppError::from)?;
        Ok(count)
    }

    async fn set_position(&self, id: Uuid, position: i64) -> AppResult<()> {
        let result = sqlx::query("UPDATE waitlist SET position = $2 WHERE id = $1")
            .bind(id)
            .bind(position)
            .execute(self.pool())
            .await
            .map_err(AppError::from)?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    async fn enroll_atomic(&self, entry: &NewWaitlistEntry) -> AppResult<AtomicEnrollment> {
        let mut tx = self.pool().begin().await.map_err(AppError::from)?;

        // Released on commit/rollback. Everything below runs one enrollment at a time.
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(ENROLL_LOCK_KEY)
            .execute(&mut *tx)
            .await
            .map_err(AppError::from)?;

        // clock_timestamp(), not now(): now() is frozen at transaction start,
        // which may predate rows committed while this one waited for the lock.
        let id = Uuid::new_v4();
        let inserted = sqlx::query_as::<_, (Uuid, DateTime<Utc>)>(
            r#"
                INSERT INTO waitlist (id, email, name, role, institution, position, referral_code, created_at)
                VALUES ($1, $2, $3, $4, $5, NULL, $6, clock_timestamp())
                ON CONFLICT (email) DO NOTHING
                RETURNING id, created_at
            "#,
        )
        .bind(id)
        .bind(&entry.email)
        .bind(&entry.name)
        .bind(entry.role.map(|r| r.as_str()))
        .bind(&entry.institution)
        .bind(&entry.referral_code)
        .fetch_optional(&mut *tx)
        .await
        .map_err(AppError::from)?;

        let Some((id, enrolled_at)) = inserted else {
            tx.rollback().await.map_err(AppError::from)?;
            return Ok(AtomicEnrollment::Duplicate);
        };

        let earlier: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM waitlist WHERE created_at < $1")
            .bind(enrolled_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(AppError::from)?;
        let position = earlier + 1;

        sqlx::query("UPDATE waitlist SET position = $2 WHERE id = $1")
            .bind(id)
            .bind(position)
            .execute(&mut *tx)
            .await
            .map_err(AppError::from)?;

        tx.commit().await.map_err(AppError::from)?;

        Ok(AtomicEnrollment::Enrolled {
            id,
            enrolled_at,
            position,
        })
    }

    async fn count_all(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM waitlist")
            .fetch_one(self.pool())
            .await
            .map_err(AppError::from)?;
        Ok(count)
    }

    async fn count_unranked(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM waitlist WHERE position IS NULL")
            .fetch_one(self.pool())
            .await
            .map_err(AppError::from)?;
        Ok(count)
    }
}
