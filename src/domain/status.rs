//! Crawl status state machine.
//!
//! Every work item (a discovered listing, or a stored description awaiting
//! field extraction) carries one of these states in the store. The legal
//! lifecycle is `NEW -> IN_PROGRESS -> DONE | <failure label>`. Failure
//! labels form a small closed set plus one truncated free-text fallback so
//! that operators can triage "page unreachable" apart from "page reachable
//! but nothing to extract".

use std::fmt;

/// Maximum number of characters kept from a free-form error message.
pub const ERROR_DETAIL_MAX: usize = 50;

const LABEL_NEW: &str = "NEW";
const LABEL_IN_PROGRESS: &str = "IN_PROGRESS";
const LABEL_DONE: &str = "DONE";
const LABEL_NO_DESCRIPTION: &str = "NO_DESCRIPTION_FOUND";
const LABEL_DNS: &str = "DNS_ERROR";
const LABEL_TIMEOUT: &str = "TIMEOUT";
const ERROR_PREFIX: &str = "ERROR: ";

/// Lifecycle state of a work item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlStatus {
    /// Discovered but not yet claimed by any batch.
    New,
    /// Claimed by exactly one batch; a crash can strand rows here until an
    /// operator runs the reset operation.
    InProgress,
    /// Fetched and extracted; derived payload persisted. Terminal.
    Done,
    /// Fetch or extraction failed. Terminal until an explicit reset.
    Failed(FailureKind),
}

/// Classified failure recorded on a work item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// The page was fetched but held nothing usable.
    EmptyContent,
    /// DNS resolution failed.
    Dns,
    /// The request deadline elapsed.
    Timeout,
    /// The server answered with a non-success HTTP status.
    Http(u16),
    /// Anything else, reduced to the first line of the message.
    Other(String),
}

impl FailureKind {
    /// Build the fallback variant from an arbitrary error message, keeping
    /// only the first line capped at [`ERROR_DETAIL_MAX`] characters.
    pub fn other(detail: impl AsRef<str>) -> Self {
        let first_line = detail.as_ref().lines().next().unwrap_or("").trim();
        Self::Other(first_line.chars().take(ERROR_DETAIL_MAX).collect())
    }

    /// The label stored in the status column.
    pub fn label(&self) -> String {
        match self {
            Self::EmptyContent => LABEL_NO_DESCRIPTION.to_string(),
            Self::Dns => LABEL_DNS.to_string(),
            Self::Timeout => LABEL_TIMEOUT.to_string(),
            Self::Http(code) => code.to_string(),
            Self::Other(detail) => format!("{ERROR_PREFIX}{detail}"),
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl CrawlStatus {
    /// The label stored in the status column.
    pub fn as_label(&self) -> String {
        match self {
            Self::New => LABEL_NEW.to_string(),
            Self::InProgress => LABEL_IN_PROGRESS.to_string(),
            Self::Done => LABEL_DONE.to_string(),
            Self::Failed(kind) => kind.label(),
        }
    }

    /// Parse a stored label back into a status. Total: labels that are not
    /// part of the closed set become the truncated fallback variant, so a
    /// hand-edited or legacy column never fails a read.
    pub fn from_label(label: &str) -> Self {
        match label {
            LABEL_NEW => Self::New,
            LABEL_IN_PROGRESS => Self::InProgress,
            LABEL_DONE => Self::Done,
            LABEL_NO_DESCRIPTION => Self::Failed(FailureKind::EmptyContent),
            LABEL_DNS => Self::Failed(FailureKind::Dns),
            LABEL_TIMEOUT => Self::Failed(FailureKind::Timeout),
            other => {
                if let Ok(code) = other.parse::<u16>() {
                    Self::Failed(FailureKind::Http(code))
                } else if let Some(detail) = other.strip_prefix(ERROR_PREFIX) {
                    Self::Failed(FailureKind::other(detail))
                } else {
                    Self::Failed(FailureKind::other(other))
                }
            }
        }
    }

    /// Can transition from self to `to`?
    pub fn can_transition_to(&self, to: &CrawlStatus) -> bool {
        matches!(
            (self, to),
            (Self::New, Self::InProgress)
                | (Self::InProgress, Self::Done)
                | (Self::InProgress, Self::Failed(_))
        )
    }

    /// Is this a terminal state?
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed(_))
    }
}

impl fmt::Display for CrawlStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_round_trip() {
        let statuses = [
            CrawlStatus::New,
            CrawlStatus::InProgress,
            CrawlStatus::Done,
            CrawlStatus::Failed(FailureKind::EmptyContent),
            CrawlStatus::Failed(FailureKind::Dns),
            CrawlStatus::Failed(FailureKind::Timeout),
            CrawlStatus::Failed(FailureKind::Http(404)),
            CrawlStatus::Failed(FailureKind::other("connection reset by peer")),
        ];
        for status in statuses {
            assert_eq!(CrawlStatus::from_label(&status.as_label()), status);
        }
    }

    #[test]
    fn http_status_codes_become_numeric_labels() {
        assert_eq!(CrawlStatus::Failed(FailureKind::Http(500)).as_label(), "500");
        assert_eq!(
            CrawlStatus::from_label("403"),
            CrawlStatus::Failed(FailureKind::Http(403))
        );
    }

    #[test]
    fn other_keeps_first_line_capped() {
        let long = format!("{}\nsecond line is dropped", "x".repeat(200));
        let kind = FailureKind::other(&long);
        match &kind {
            FailureKind::Other(detail) => {
                assert_eq!(detail.chars().count(), ERROR_DETAIL_MAX);
                assert!(!detail.contains('\n'));
            }
            _ => panic!("expected Other"),
        }
        assert!(kind.label().starts_with("ERROR: "));
    }

    #[test]
    fn unknown_label_falls_back_instead_of_failing() {
        let status = CrawlStatus::from_label("SOMETHING_LEGACY");
        assert_eq!(
            status,
            CrawlStatus::Failed(FailureKind::Other("SOMETHING_LEGACY".to_string()))
        );
    }

    #[test]
    fn transitions() {
        let new = CrawlStatus::New;
        let in_progress = CrawlStatus::InProgress;
        let done = CrawlStatus::Done;
        let failed = CrawlStatus::Failed(FailureKind::Timeout);

        assert!(new.can_transition_to(&in_progress));
        assert!(in_progress.can_transition_to(&done));
        assert!(in_progress.can_transition_to(&failed));

        assert!(!new.can_transition_to(&done));
        assert!(!done.can_transition_to(&in_progress));
        assert!(!failed.can_transition_to(&done));
    }

    #[test]
    fn terminal_states() {
        assert!(CrawlStatus::Done.is_terminal());
        assert!(CrawlStatus::Failed(FailureKind::Dns).is_terminal());
        assert!(!CrawlStatus::New.is_terminal());
        assert!(!CrawlStatus::InProgress.is_terminal());
    }
}
