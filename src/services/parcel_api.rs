//! Trait and error type for the crop-health backend.

use anyhow::Result;
use reqwest::StatusCode;
use std::fmt;

use crate::geometry::AreaMetrics;
use crate::models::{AnalysisResult, Parcel, ParcelId, ParcelRecord, ParcelUpdate, RunOptions};

/// The backend answered with a non-success status.
///
/// Carried inside `anyhow::Error` so callers can `downcast_ref` it and show
/// `message` verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendRejection {
    pub status: StatusCode,
    pub message: Option<String>,
}

impl fmt::Display for BackendRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.message {
            Some(message) => write!(f, "backend returned {}: {message}", self.status),
            None => write!(f, "backend returned {}", self.status),
        }
    }
}

impl std::error::Error for BackendRejection {}

impl BackendRejection {
    /// Backend-supplied message of `err`, if it is a rejection carrying one.
    pub fn message_of(err: &anyhow::Error) -> Option<String> {
        err.downcast_ref::<Self>().and_then(|r| r.message.clone())
    }
}

/// REST surface of the backend collaborator.
#[async_trait::async_trait]
pub trait ParcelApi: Send + Sync {
    /// `POST /api/lands`; returns the new parcel's id.
    async fn create_parcel(&self, parcel: &Parcel) -> Result<ParcelId>;

    /// `POST /api/lands/{id}/compute`; long-running.
    async fn compute(&self, id: ParcelId, options: RunOptions) -> Result<AnalysisResult>;

    /// `GET /api/lands/{id}/area`.
    async fn area(&self, id: ParcelId) -> Result<AreaMetrics>;

    async fn list_parcels(&self) -> Result<Vec<ParcelRecord>>;

    async fn get_parcel(&self, id: ParcelId) -> Result<ParcelRecord>;

    async fn update_parcel(&self, id: ParcelId, update: &ParcelUpdate) -> Result<()>;

    async fn delete_parcel(&self, id: ParcelId) -> Result<()>;
}
