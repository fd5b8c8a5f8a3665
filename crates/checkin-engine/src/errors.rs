//! Engine error types.

use checkin_core::{ClockError, MarkError, PlatformError};
use checkin_store::StoreError;

/// Why a challenge operation did not go through.
///
/// The first five variants are rejections of user input and turn into a
/// threaded reply. The rest are infrastructure failures and are logged.
#[derive(Debug, thiserror::Error)]
pub enum ChallengeError {
    /// No record exists for the current week.
    #[error("challenge not started for this week")]
    ChallengeNotStarted,

    /// Author is not in the week's frozen participant set.
    #[error("unknown participant: {0}")]
    UnknownParticipant(String),

    /// Request arrived at or after the daily cutoff.
    #[error("submissions closed for today")]
    SubmissionClosed,

    /// Mention did not contain a link.
    #[error("missing qualifying link")]
    MissingQualifyingContent,

    /// Today has no slot in the configured week length.
    #[error("no challenge slot today")]
    NoSlotToday,

    /// Record store failed.
    #[error("store unavailable: {0}")]
    Store(#[from] StoreError),

    /// Chat platform call failed.
    #[error("platform call failed: {0}")]
    Platform(#[from] PlatformError),

    /// Event timestamp could not be interpreted.
    #[error("clock error: {0}")]
    Clock(#[from] ClockError),
}

impl ChallengeError {
    /// Whether this is a rejection of the request rather than a failure.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::ChallengeNotStarted
                | Self::UnknownParticipant(_)
                | Self::SubmissionClosed
                | Self::MissingQualifyingContent
                | Self::NoSlotToday
        )
    }

    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::ChallengeNotStarted => "not_started",
            Self::UnknownParticipant(_) => "unknown_participant",
            Self::SubmissionClosed => "submission_closed",
            Self::MissingQualifyingContent => "missing_link",
            Self::NoSlotToday => "no_slot_today",
            Self::Store(_) => "store",
            Self::Platform(_) => "platform",
            Self::Clock(_) => "clock",
        }
    }
}

impl From<MarkError> for ChallengeError {
    fn from(err: MarkError) -> Self {
        match err {
            MarkError::UnknownParticipant(name) => Self::UnknownParticipant(name),
            MarkError::NoSlotToday => Self::NoSlotToday,
        }
    }
}
