use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::app_error::{AppError, AppResult, PersistenceStage};
use crate::application::referral::{Clock, derive_referral_code};
use crate::domain::entities::{
    enrollment_strategy::EnrollmentStrategy,
    waitlist_email::WaitlistEmailKind,
    waitlist_entry::{AtomicEnrollment, InsertedEntry, NewWaitlistEntry, WaitlistEntry, WaitlistRole},
};

/// The store of waitlist entries. Every method is one independent round trip;
/// nothing spans two calls except `enroll_atomic`.
#[async_trait]
pub trait WaitlistRepo: Send + Sync {
    async fn find_by_email(&self, email: &str) -> AppResult<Vec<WaitlistEntry>>;
    async fn insert(&self, entry: &NewWaitlistEntry) -> AppResult<InsertedEntry>;
    async fn get_enrolled_at(&self, id: Uuid) -> AppResult<DateTime<Utc>>;
    async fn count_enrolled_before(&self, enrolled_at: DateTime<Utc>) -> AppResult<i64>;
    async fn set_position(&self, id: Uuid, position: i64) -> AppResult<()>;
    /// Duplicate check, insert, rank and position write in one store-side
    /// transaction.
    async fn enroll_atomic(&self, entry: &NewWaitlistEntry) -> AppResult<AtomicEnrollment>;
    async fn count_all(&self) -> AppResult<i64>;
    async fn count_unranked(&self) -> AppResult<i64>;
}

/// Delivers waitlist messages. Failures are reported, never retried here.
#[async_trait]
pub trait WaitlistNotifier: Send + Sync {
    async fn send(&self, kind: WaitlistEmailKind, result: &EnrollmentResult) -> AppResult<()>;
}

#[derive(Debug, Clone)]
pub struct EnrollmentSubmission {
    pub email: String,
    pub name: Option<String>,
    pub role: Option<WaitlistRole>,
    pub institution: Option<String>,
}

impl EnrollmentSubmission {
    fn to_new_entry(&self, referral_code: String) -> NewWaitlistEntry {
        NewWaitlistEntry {
            email: self.email.clone(),
            name: self.name.clone(),
            role: self.role,
            institution: self.institution.clone(),
            referral_code,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnrollmentResult {
    pub name: Option<String>,
    pub email: String,
    pub position: i64,
    pub referral_code: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitlistStanding {
    /// `None` when the entry was stored but never ranked.
    pub position: Option<i64>,
    pub total: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitlistStats {
    pub total_entries: i64,
    pub unranked_entries: i64,
}

#[derive(Clone)]
pub struct WaitlistUseCases {
    repo: Arc<dyn WaitlistRepo>,
    notifier: Arc<dyn WaitlistNotifier>,
    clock: Arc<dyn Clock>,
    strategy: EnrollmentStrategy,
    round_trip_timeout: Duration,
    enroll_lock: Arc<Mutex<()>>,
}

impl WaitlistUseCases {
    pub fn new(
        repo: Arc<dyn WaitlistRepo>,
        notifier: Arc<dyn WaitlistNotifier>,
        clock: Arc<dyn Clock>,
        strategy: EnrollmentStrategy,
        round_trip_timeout: Duration,
    ) -> Self {
        Self {
            repo,
            notifier,
            clock,
            strategy,
            round_trip_timeout,
            enroll_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Adds a new entry and ranks it. The welcome notification is dispatched
    /// on a detached task after the result is final.
    #[instrument(skip(self, submission), fields(email = %submission.email, strategy = %self.strategy))]
    pub async fn enroll(&self, submission: EnrollmentSubmission) -> AppResult<EnrollmentResult> {
        let result = match self.strategy {
            EnrollmentStrategy::Naive => self.enroll_step_by_step(&submission).await?,
            EnrollmentStrategy::Serialized => {
                let _guard = self.enroll_lock.lock().await;
                self.enroll_step_by_step(&submission).await?
            }
            EnrollmentStrategy::Atomic => self.enroll_in_one_round_trip(&submission).await?,
        };

        info!(
            position = result.position,
            referral_code = %result.referral_code,
            "Waitlist enrollment completed"
        );

        self.dispatch_welcome(result.clone());
        Ok(result)
    }

    async fn enroll_step_by_step(&self, submission: &EnrollmentSubmission) -> AppResult<EnrollmentResult> {
        let existing = self
            .round_trip(
                PersistenceStage::DuplicateCheck,
                self.repo.find_by_email(&submission.email),
            )
            .await?;
        if !existing.is_empty() {
            return Err(AppError::DuplicateEmail);
        }

        let referral_code = derive_referral_code(&submission.email, self.clock.now());
        let new_entry = submission.to_new_entry(referral_code);

        let inserted = self
            .round_trip(PersistenceStage::Insert, self.repo.insert(&new_entry))
            .await?;

        // From here on the row exists. A failure leaves it unranked.
        let enrolled_at = self
            .round_trip(PersistenceStage::ReadBack, self.repo.get_enrolled_at(inserted.id))
            .await?;

        let earlier = self
            .round_trip(
                PersistenceStage::Count,
                self.repo.count_enrolled_before(enrolled_at),
            )
            .await?;
        let position = earlier + 1;

        if let Err(err) = self
            .round_trip(
                PersistenceStage::WriteBack,
                self.repo.set_position(inserted.id, position),
            )
            .await
        {
            warn!(
                entry_id = %inserted.id,
                position,
                error = %err,
                "Failed to store waitlist position, returning the computed one"
            );
        }

        Ok(EnrollmentResult {
            name: new_entry.name,
            email: new_entry.email,
            position,
            referral_code: new_entry.referral_code,
        })
    }

    async fn enroll_in_one_round_trip(
        &self,
        submission: &EnrollmentSubmission,
    ) -> AppResult<EnrollmentResult> {
        let referral_code = derive_referral_code(&submission.email, self.clock.now());
        let new_entry = submission.to_new_entry(referral_code);

        match self
            .round_trip(PersistenceStage::Atomic, self.repo.enroll_atomic(&new_entry))
            .await?
        {
            AtomicEnrollment::Duplicate => Err(AppError::DuplicateEmail),
            AtomicEnrollment::Enrolled { id, position, .. } => {
                debug!(entry_id = %id, position, "Entry inserted and ranked atomically");
                Ok(EnrollmentResult {
                    name: new_entry.name,
                    email: new_entry.email,
                    position,
                    referral_code: new_entry.referral_code,
                })
            }
        }
    }

    /// Fire-and-forget. The handle is only useful to tests that want to wait
    /// for delivery; dropping it does not cancel the task.
    pub fn dispatch_welcome(&self, result: EnrollmentResult) -> JoinHandle<()> {
        let notifier = Arc::clone(&self.notifier);
        tokio::spawn(async move {
            match notifier
                .send(WaitlistEmailKind::ImmediateWelcome, &result)
                .await
            {
                Ok(()) => debug!(email = %result.email, "Welcome notification sent"),
                Err(err) => warn!(
                    email = %result.email,
                    error = %err,
                    "Welcome notification failed"
                ),
            }
        })
    }

    /// Sends one message to an existing member and waits for delivery.
    #[instrument(skip(self))]
    pub async fn send_email(&self, kind: WaitlistEmailKind, email: &str) -> AppResult<()> {
        let rows = self
            .round_trip(PersistenceStage::Query, self.repo.find_by_email(email))
            .await?;
        let entry = rows.into_iter().next().ok_or(AppError::NotFound)?;

        let recipient = EnrollmentResult {
            name: entry.name,
            email: entry.email,
            position: entry.position.unwrap_or(0),
            referral_code: entry.referral_code,
        };
        self.notifier.send(kind, &recipient).await?;
        info!(%kind, "Waitlist email sent");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn position_of(&self, email: &str) -> AppResult<Option<WaitlistStanding>> {
        let rows = self
            .round_trip(PersistenceStage::Query, self.repo.find_by_email(email))
            .await?;
        let Some(entry) = rows.into_iter().next() else {
            return Ok(None);
        };
        let total = self
            .round_trip(PersistenceStage::Query, self.repo.count_all())
            .await?;
        Ok(Some(WaitlistStanding {
            position: entry.position,
            total,
        }))
    }

    #[instrument(skip(self))]
    pub async fn is_enrolled(&self, email: &str) -> AppResult<bool> {
        let rows = self
            .round_trip(PersistenceStage::Query, self.repo.find_by_email(email))
            .await?;
        Ok(!rows.is_empty())
    }

    #[instrument(skip(self))]
    pub async fn stats(&self) -> AppResult<WaitlistStats> {
        let total_entries = self
            .round_trip(PersistenceStage::Query, self.repo.count_all())
            .await?;
        let unranked_entries = self
            .round_trip(PersistenceStage::Query, self.repo.count_unranked())
            .await?;
        Ok(WaitlistStats {
            total_entries,
            unranked_entries,
        })
    }

    async fn round_trip<T>(
        &self,
        stage: PersistenceStage,
        call: impl Future<Output = AppResult<T>>,
    ) -> AppResult<T> {
        match tokio::time::timeout(self.round_trip_timeout, call).await {
            Ok(res) => res.map_err(|err| err.at_stage(stage)),
            Err(_) => Err(AppError::persistence(
                stage,
                format!("timed out after {}ms", self.round_trip_timeout.as_millis()),
            )),
        }
    }
}
