use thiserror::Error;

/// Failure taxonomy for one pipeline run.
///
/// Only `Configuration` is fatal. Every other variant is caught at the stage
/// that produced it and turned into a fallback (empty history, next cascade
/// attempt) or a reported publish outcome.
#[derive(Debug, Error)]
pub enum DiaryError {
    #[error("configuration invalid: {0}")]
    Configuration(String),
    #[error("history fetch failed: {0}")]
    HistoryFetch(String),
    #[error("response did not match expected schema: {0}")]
    Parse(String),
    #[error("generation attempt `{source_id}` failed: {reason}")]
    GenerationAttempt { source_id: String, reason: String },
    #[error("publish failed: {0}")]
    Publish(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiaryErrorCode {
    E001ConfigMissing,
    E002HistoryFetchFailed,
    E003ParseFailed,
    E004GenerationAttemptFailed,
    E005PublishFailed,
    E006AuditWriteFailed,
}

impl DiaryErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::E001ConfigMissing => "E001_CONFIG_MISSING",
            Self::E002HistoryFetchFailed => "E002_HISTORY_FETCH_FAILED",
            Self::E003ParseFailed => "E003_PARSE_FAILED",
            Self::E004GenerationAttemptFailed => "E004_GENERATION_ATTEMPT_FAILED",
            Self::E005PublishFailed => "E005_PUBLISH_FAILED",
            Self::E006AuditWriteFailed => "E006_AUDIT_WRITE_FAILED",
        }
    }
}

impl DiaryError {
    pub fn code(&self) -> DiaryErrorCode {
        match self {
            Self::Configuration(_) => DiaryErrorCode::E001ConfigMissing,
            Self::HistoryFetch(_) => DiaryErrorCode::E002HistoryFetchFailed,
            Self::Parse(_) => DiaryErrorCode::E003ParseFailed,
            Self::GenerationAttempt { .. } => DiaryErrorCode::E004GenerationAttemptFailed,
            Self::Publish(_) => DiaryErrorCode::E005PublishFailed,
        }
    }
}
