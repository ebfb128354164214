use crate::domain::{ParticipantId, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Reasons a participant can be reported for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportReason {
    Nudity,
    Harassment,
    Spam,
    Hate,
    Underage,
    Other,
}

impl ReportReason {
    pub const ALL: [ReportReason; 6] = [
        ReportReason::Nudity,
        ReportReason::Harassment,
        ReportReason::Spam,
        ReportReason::Hate,
        ReportReason::Underage,
        ReportReason::Other,
    ];

    /// Severe reports block the peer immediately
    pub fn is_severe(&self) -> bool {
        matches!(self, ReportReason::Nudity | ReportReason::Underage)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportReason::Nudity => "nudity",
            ReportReason::Harassment => "harassment",
            ReportReason::Spam => "spam",
            ReportReason::Hate => "hate",
            ReportReason::Underage => "underage",
            ReportReason::Other => "other",
        }
    }
}

impl fmt::Display for ReportReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
#[error("Unknown report reason: {0}")]
pub struct UnknownReason(pub String);

impl FromStr for ReportReason {
    type Err = UnknownReason;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == wanted)
            .ok_or_else(|| UnknownReason(s.to_string()))
    }
}

/// Record handed to the external moderation sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub reason: ReportReason,
    pub peer_id: ParticipantId,
    pub reporter_id: ParticipantId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub at: Timestamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity() {
        assert!(ReportReason::Underage.is_severe());
        assert!(ReportReason::Nudity.is_severe());
        assert!(!ReportReason::Spam.is_severe());
        assert!(!ReportReason::Other.is_severe());
    }

    #[test]
    fn test_parse() {
        assert_eq!("Underage".parse::<ReportReason>(), Ok(ReportReason::Underage));
        assert_eq!(" hate ".parse::<ReportReason>(), Ok(ReportReason::Hate));
        assert!("rude".parse::<ReportReason>().is_err());
    }

    #[test]
    fn test_serialization() {
        let json = serde_json::to_string(&ReportReason::Harassment).unwrap();
        assert_eq!(json, "\"harassment\"");
    }
}
