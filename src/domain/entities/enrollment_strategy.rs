/// How the duplicate-check / insert / rank / write-back steps are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnrollmentStrategy {
    /// Each step is its own round trip with nothing spanning them.
    /// Concurrent enrollments can both pass the duplicate check and can
    /// compute the same position.
    Naive,
    /// Same round trips, but a process-wide mutex is held across them.
    Serialized,
    /// One store-side transaction inserts and ranks the row.
    #[default]
    Atomic,
}

impl EnrollmentStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollmentStrategy::Naive => "naive",
            EnrollmentStrategy::Serialized => "serialized",
            EnrollmentStrategy::Atomic => "atomic",
        }
    }
}

impl std::fmt::Display for EnrollmentStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for EnrollmentStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "naive" => Ok(EnrollmentStrategy::Naive),
            "serialized" => Ok(EnrollmentStrategy::Serialized),
            "atomic" => Ok(EnrollmentStrategy::Atomic),
            _ => Err(format!(
                "Invalid enrollment strategy: {}. Must be 'naive', 'serialized' or 'atomic'",
                s
            )),
        }
    }
}
