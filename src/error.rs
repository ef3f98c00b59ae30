//! Error taxonomy shared by the capture, submission and analysis workflows.
//!
//! Every variant is recoverable: workflows turn them into a
//! [`Notification`](crate::notify::Notification) and return the UI to its
//! pre-operation state.

use crate::models::ParcelId;

/// Shown when the backend rejects a parcel without saying why.
pub const GENERIC_SUBMISSION_MESSAGE: &str = "Failed to save parcel";
/// Shown when an analysis fails without a backend message.
pub const GENERIC_ANALYSIS_MESSAGE: &str = "Analysis failed";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The location provider failed or gave no fix within the wait bound.
    #[error("Location unavailable: {reason}")]
    LocationUnavailable { reason: String },

    /// Fewer than three boundary points when finalizing.
    #[error("At least 3 corners are required, {count} recorded")]
    InsufficientVertices { count: usize },

    /// The ring crosses itself or has fewer than three distinct vertices.
    #[error("Boundary must not cross itself")]
    SelfIntersecting,

    /// A draw completion arrived while no draw was in progress.
    #[error("No drawing in progress")]
    NotDrawing,

    /// Finish was requested while a freehand draw was active.
    #[error("No corner recording in progress")]
    NotRecording,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Submit was attempted before a boundary was defined.
    #[error("Draw or record a field boundary first")]
    MissingGeometry,

    /// The backend rejected or never received the parcel.
    #[error("{}", .message.as_deref().unwrap_or(GENERIC_SUBMISSION_MESSAGE))]
    SubmissionFailed { message: Option<String> },

    /// The analysis call failed; no result was produced.
    #[error("{}", .message.as_deref().unwrap_or(GENERIC_ANALYSIS_MESSAGE))]
    AnalysisFailed { message: Option<String> },

    /// Any other collaborator call (list, get, update, delete) failed.
    #[error("{message}")]
    RequestFailed { message: String },

    #[error("A submission is already in progress")]
    SubmissionInFlight,

    #[error("Analysis already running for parcel {0}")]
    AnalysisInFlight(ParcelId),

    #[error("Operation cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Message as the backend supplied it, if any.
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            Self::SubmissionFailed { message } | Self::AnalysisFailed { message } => {
                message.as_deref()
            }
            Self::RequestFailed { message } => Some(message),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_message_is_shown_verbatim() {
        let err = Error::AnalysisFailed {
            message: Some("quota exceeded".to_string()),
        };
        assert_eq!(err.to_string(), "quota exceeded");
        assert_eq!(err.backend_message(), Some("quota exceeded"));
    }

    #[test]
    fn test_generic_message_without_backend_text() {
        let err = Error::SubmissionFailed { message: None };
        assert_eq!(err.to_string(), GENERIC_SUBMISSION_MESSAGE);
        assert_eq!(err.backend_message(), None);
    }
}
