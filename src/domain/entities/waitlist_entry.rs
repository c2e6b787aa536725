use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Self-described role picked on the signup form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitlistRole {
    Student,
    Researcher,
    Professor,
    Other,
}

impl WaitlistRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitlistRole::Student => "student",
            WaitlistRole::Researcher => "researcher",
            WaitlistRole::Professor => "professor",
            WaitlistRole::Other => "other",
        }
    }

    /// Case-insensitive parse. `None` for anything outside the known set.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "student" => Some(WaitlistRole::Student),
            "researcher" => Some(WaitlistRole::Researcher),
            "professor" => Some(WaitlistRole::Professor),
            "other" => Some(WaitlistRole::Other),
            _ => None,
        }
    }
}

impl std::fmt::Display for WaitlistRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A row of the waitlist table.
#[derive(Debug, Clone)]
pub struct WaitlistEntry {
    pub id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub role: Option<WaitlistRole>,
    pub institution: Option<String>,
    pub position: Option<i64>,
    pub referral_code: String,
    pub enrolled_at: DateTime<Utc>,
}

/// Insert payload. `position` is always unknown at insert time.
#[derive(Debug, Clone)]
pub struct NewWaitlistEntry {
    pub email: String,
    pub name: Option<String>,
    pub role: Option<WaitlistRole>,
    pub institution: Option<String>,
    pub referral_code: String,
}

/// What the store hands back after an insert.
#[derive(Debug, Clone, Copy)]
pub struct InsertedEntry {
    pub id: Uuid,
    pub enrolled_at: DateTime<Utc>,
}

/// Outcome of the single-round-trip insert-and-rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtomicEnrollment {
    Enrolled {
        id: Uuid,
        enrolled_at: DateTime<Utc>,
        position: i64,
    },
    Duplicate,
}
