//! In-memory stand-ins for the waitlist store and the welcome notifier.
//!
//! Every store call yields to the scheduler before touching state, so
//! concurrently spawned enrollments interleave at each round trip the way they
//! would against a remote database.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult, PersistenceStage},
    application::{
        referral::Clock,
        use_cases::waitlist::{EnrollmentResult, WaitlistRepo, WaitlistNotifier},
    },
    domain::entities::{
        waitlist_email::WaitlistEmailKind,
        waitlist_entry::{AtomicEnrollment, InsertedEntry, NewWaitlistEntry, WaitlistEntry},
    },
};

/// First server timestamp handed out by the in-memory store.
const STORE_EPOCH_MILLIS: i64 = 1_700_000_000_000;

// ============================================================================
// InMemoryWaitlistRepo
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MockOp {
    FindByEmail,
    Insert,
    GetEnrolledAt,
    CountBefore,
    SetPosition,
    EnrollAtomic,
    CountAll,
    CountUnranked,
}

/// In-memory implementation of WaitlistRepo for testing.
///
/// Server timestamps come from a logical clock that ticks one millisecond per
/// insert, stamped when the insert starts. A row only becomes visible once the
/// insert "commits", which can be delayed per email to open the window in
/// which a concurrent signup ranks itself without seeing it.
pub struct InMemoryWaitlistRepo {
    rows: Mutex<Vec<WaitlistEntry>>,
    ticks: Mutex<i64>,
    failing: Mutex<HashSet<MockOp>>,
    commit_delays: Mutex<HashMap<String, Duration>>,
    latency: Option<Duration>,
    unique_email: bool,
}

impl Default for InMemoryWaitlistRepo {
    fn default() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            ticks: Mutex::new(0),
            failing: Mutex::new(HashSet::new()),
            commit_delays: Mutex::new(HashMap::new()),
            latency: None,
            unique_email: true,
        }
    }
}

impl InMemoryWaitlistRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleeps this long on every call.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Drops the UNIQUE(email) constraint so the check-then-insert race shows.
    pub fn without_unique_email(mut self) -> Self {
        self.unique_email = false;
        self
    }

    pub fn with_entries(entries: Vec<WaitlistEntry>) -> Self {
        let repo = Self::default();
        *repo.ticks.lock().unwrap() = entries.len() as i64;
        *repo.rows.lock().unwrap() = entries;
        repo
    }

    pub fn fail_on(&self, op: MockOp) {
        self.failing.lock().unwrap().insert(op);
    }

    pub fn delay_commit(&self, email: &str, delay: Duration) {
        self.commit_delays
            .lock()
            .unwrap()
            .insert(email.to_string(), delay);
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn rows_for(&self, email: &str) -> usize {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.email == email)
            .count()
    }

    async fn round_trip(&self, op: MockOp) -> AppResult<()> {
        match self.latency {
            Some(latency) => tokio::time::sleep(latency).await,
            None => tokio::task::yield_now().await,
        }
        if self.failing.lock().unwrap().contains(&op) {
            return Err(AppError::persistence(
                PersistenceStage::Query,
                format!("injected failure on {op:?}"),
            ));
        }
        Ok(())
    }

    fn next_timestamp(&self) -> DateTime<Utc> {
        let mut ticks = self.ticks.lock().unwrap();
        let stamp = store_time(*ticks);
        *ticks += 1;
        stamp
    }

    fn commit_delay(&self, email: &str) -> Option<Duration> {
        self.commit_delays.lock().unwrap().get(email).copied()
    }

    fn to_row(entry: &NewWaitlistEntry, id: Uuid, enrolled_at: DateTime<Utc>) -> WaitlistEntry {
        WaitlistEntry {
            id,
            email: entry.email.clone(),
            name: entry.name.clone(),
            role: entry.role,
            institution: entry.institution.clone(),
            position: None,
            referral_code: entry.referral_code.clone(),
            enrolled_at,
        }
    }
}

/// Server timestamp of the `tick`-th insert.
pub fn store_time(tick: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(STORE_EPOCH_MILLIS).unwrap() + ChronoDuration::milliseconds(tick)
}

#[async_trait]
impl WaitlistRepo for InMemoryWaitlistRepo {
    async fn find_by_email(&self, email: &str) -> AppResult<Vec<WaitlistEntry>> {
        self.round_trip(MockOp::FindByEmail).await?;
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.email == email)
            .cloned()
            .collect())
    }

    async fn insert(&self, entry: &NewWaitlistEntry) -> AppResult<InsertedEntry> {
        self.round_trip(MockOp::Insert).await?;
        let id = Uuid::new_v4();
        let enrolled_at = self.next_timestamp();

        if let Some(delay) = self.commit_delay(&entry.email) {
            tokio::time::sleep(delay).await;
        }

        let mut rows = self.rows.lock().unwrap();
        if self.unique_email && rows.iter().any(|r| r.email == entry.email) {
            return Err(AppError::DuplicateEmail);
        }
        rows.push(Self::to_row(entry, id, enrolled_at));
        Ok(InsertedEntry { id, enrolled_at })
    }

    async fn get_enrolled_at(&self, id: Uuid) -> AppResult<DateTime<Utc>> {
        self.round_trip(MockOp::GetEnrolledAt).await?;
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.enrolled_at)
            .ok_or(AppError::NotFound)
    }

    async fn count_enrolled_before(&self, enrolled_at: DateTime<Utc>) -> AppResult<i64> {
        self.round_trip(MockOp::CountBefore).await?;
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.enrolled_at < enrolled_at)
            .count() as i64)
    }

    async fn set_position(&self, id: Uuid, position: i64) -> AppResult<()> {
        self.round_trip(MockOp::SetPosition).await?;
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(AppError::NotFound)?;
        row.position = Some(position);
        Ok(())
    }

    async fn enroll_atomic(&self, entry: &NewWaitlistEntry) -> AppResult<AtomicEnrollment> {
        self.round_trip(MockOp::EnrollAtomic).await?;
        if let Some(delay) = self.commit_delay(&entry.email) {
            tokio::time::sleep(delay).await;
        }

        // One lock for the whole check/insert/rank, like a serializable transaction.
        let mut rows = self.rows.lock().unwrap();
        if rows.iter().any(|r| r.email == entry.email) {
            return Ok(AtomicEnrollment::Duplicate);
        }

        let id = Uuid::new_v4();
        let enrolled_at = self.next_timestamp();
        let position = rows.iter().filter(|r| r.enrolled_at < enrolled_at).count() as i64 + 1;

        let mut row = Self::to_row(entry, id, enrolled_at);
        row.position = Some(position);
        rows.push(row);

        Ok(AtomicEnrollment::Enrolled {
            id,
            enrolled_at,
            position,
        })
    }

    async fn count_all(&self) -> AppResult<i64> {
        self.round_trip(MockOp::CountAll).await?;
        Ok(self.rows.lock().unwrap().len() as i64)
    }

    async fn count_unranked(&self) -> AppResult<i64> {
        self.round_trip(MockOp::CountUnranked).await?;
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.position.is_none())
            .count() as i64)
    }
}

// ============================================================================
// Notifiers
// ============================================================================

pub type SentEmail = (WaitlistEmailKind, EnrollmentResult);

/// Forwards every message to a channel so tests can await delivery.
pub struct RecordingNotifier {
    tx: mpsc::UnboundedSender<SentEmail>,
}

impl RecordingNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SentEmail>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl WaitlistNotifier for RecordingNotifier {
    async fn send(&self, kind: WaitlistEmailKind, result: &EnrollmentResult) -> AppResult<()> {
        let _ = self.tx.send((kind, result.clone()));
        Ok(())
    }
}

/// Always fails, like an unreachable mail API.
pub struct FailingNotifier;

#[async_trait]
impl WaitlistNotifier for FailingNotifier {
    async fn send(&self, _kind: WaitlistEmailKind, _result: &EnrollmentResult) -> AppResult<()> {
        Err(AppError::Notification("connection refused".into()))
    }
}

pub struct PanickingNotifier;

#[async_trait]
impl WaitlistNotifier for PanickingNotifier {
    async fn send(&self, _kind: WaitlistEmailKind, _result: &EnrollmentResult) -> AppResult<()> {
        panic!("notifier blew up");
    }
}

// ============================================================================
// Clock
// ============================================================================

/// A clock frozen at one instant.
#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    pub fn at_millis(ms: i64) -> Self {
        Self(Utc.timestamp_millis_opt(ms).unwrap())
    }
}

impl Default for FixedClock {
    fn default() -> Self {
        Self::at_millis(STORE_EPOCH_MILLIS)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_new_entry;

    #[tokio::test]
    async fn insert_stamps_increasing_timestamps() {
        let repo = InMemoryWaitlistRepo::new();
        let a = repo.insert(&create_test_new_entry("a@example.edu")).await.unwrap();
        let b = repo.insert(&create_test_new_entry("b@example.edu")).await.unwrap();
        assert!(a.enrolled_at < b.enrolled_at);
        assert_eq!(repo.count_enrolled_before(b.enrolled_at).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn unique_email_is_enforced_by_default() {
        let repo = InMemoryWaitlistRepo::new();
        repo.insert(&create_test_new_entry("a@example.edu")).await.unwrap();
        let err = repo
            .insert(&create_test_new_entry("a@example.edu"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateEmail));
    }

    #[tokio::test]
    async fn injected_failures_surface_as_persistence_errors() {
        let repo = InMemoryWaitlistRepo::new();
        repo.fail_on(MockOp::CountAll);
        assert!(matches!(
            repo.count_all().await,
            Err(AppError::Persistence { .. })
        ));
        assert!(repo.count_unranked().await.is_ok());
    }
}
