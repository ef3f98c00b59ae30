//! Parcel submission.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::geometry::Boundary;
use crate::models::{Parcel, ParcelId};
use crate::services::{BackendRejection, ParcelApi};

/// Creates parcels, one request at a time.
pub struct ParcelSubmitter<A: ?Sized> {
    api: Arc<A>,
    in_flight: AtomicBool,
}

/// Clears the in-flight flag however the submission ends.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<A: ParcelApi + ?Sized> ParcelSubmitter<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self {
            api,
            in_flight: AtomicBool::new(false),
        }
    }

    /// `true` while a create request is pending; the submit control stays
    /// disabled meanwhile.
    pub fn is_submitting(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Validates and creates a parcel, returning the backend's id.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`] for a blank name and [`Error::MissingGeometry`]
    /// without a boundary, both before any request is made.
    /// [`Error::SubmissionInFlight`] while another submission is pending.
    /// [`Error::SubmissionFailed`] when the backend rejects the parcel or
    /// cannot be reached.
    pub async fn submit(
        &self,
        name: &str,
        description: Option<&str>,
        boundary: Option<&Boundary>,
        cancel: &CancelToken,
    ) -> Result<ParcelId> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::InvalidInput("parcel name is required".to_string()));
        }
        let boundary = boundary.ok_or(Error::MissingGeometry)?;

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(Error::SubmissionInFlight);
        }
        let _guard = InFlight(&self.in_flight);

        let parcel = Parcel {
            name: name.to_string(),
            description: description
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
            boundary: boundary.clone(),
        };

        match cancel.guard(self.api.create_parcel(&parcel)).await? {
            Ok(id) => {
                info!(parcel_id = %id, name, vertices = boundary.vertex_count(), "Parcel created");
                Ok(id)
            }
            Err(e) => {
                warn!(error = %e, name, "Parcel submission failed");
                Err(Error::SubmissionFailed {
                    message: BackendRejection::message_of(&e),
                })
            }
        }
    }
}
