use serde::{Deserialize, Serialize};

/// The messages a waitlist member can receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WaitlistEmailKind {
    Welcome,
    SneakPeek,
    Collaboration,
    Launch,
    /// Sent right after joining. Same content as `Welcome`.
    ImmediateWelcome,
}

impl WaitlistEmailKind {
    pub const ALL: [WaitlistEmailKind; 5] = [
        WaitlistEmailKind::Welcome,
        WaitlistEmailKind::SneakPeek,
        WaitlistEmailKind::Collaboration,
        WaitlistEmailKind::Launch,
        WaitlistEmailKind::ImmediateWelcome,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WaitlistEmailKind::Welcome => "welcome",
            WaitlistEmailKind::SneakPeek => "sneakPeek",
            WaitlistEmailKind::Collaboration => "collaboration",
            WaitlistEmailKind::Launch => "launch",
            WaitlistEmailKind::ImmediateWelcome => "immediateWelcome",
        }
    }
}

impl std::fmt::Display for WaitlistEmailKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for WaitlistEmailKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WaitlistEmailKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unknown email type: {s}"))
    }
}
