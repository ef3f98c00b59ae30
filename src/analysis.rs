//! Health analysis and area lookup for existing parcels.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{info, warn};

use crate::cancel::CancelToken;
use crate::error::{Error, Result};
use crate::geometry::AreaMetrics;
use crate::models::{AnalysisResult, ParcelId, RunOptions};
use crate::services::{BackendRejection, ParcelApi};

/// Area figure as displayed; a failed lookup becomes a placeholder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AreaDisplay {
    Loaded(AreaMetrics),
    Unavailable,
}

impl fmt::Display for AreaDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Loaded(area) => write!(
                f,
                "{:.2} ha ({:.2} acres)",
                area.area_hectares, area.area_acres
            ),
            Self::Unavailable => f.write_str("Area unavailable"),
        }
    }
}

/// Runs backend analyses, at most one in flight per parcel.
pub struct AnalysisRunner<A: ?Sized> {
    api: Arc<A>,
    running: Mutex<HashSet<ParcelId>>,
}

/// Marks a parcel busy until dropped.
struct Running<'a> {
    set: &'a Mutex<HashSet<ParcelId>>,
    id: ParcelId,
}

impl Drop for Running<'_> {
    fn drop(&mut self) {
        if let Ok(mut set) = self.set.lock() {
            set.remove(&self.id);
        }
    }
}

impl<A: ParcelApi + ?Sized> AnalysisRunner<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self {
            api,
            running: Mutex::new(HashSet::new()),
        }
    }

    /// Busy indicator for `id`.
    pub fn is_running(&self, id: ParcelId) -> bool {
        self.running
            .lock()
            .map(|set| set.contains(&id))
            .unwrap_or(false)
    }

    fn begin(&self, id: ParcelId) -> Result<Running<'_>> {
        let mut set = self
            .running
            .lock()
            .map_err(|_| Error::AnalysisFailed { message: None })?;
        if !set.insert(id) {
            return Err(Error::AnalysisInFlight(id));
        }
        Ok(Running {
            set: &self.running,
            id,
        })
    }

    /// Requests a fresh analysis of `id`.
    ///
    /// Yields a complete [`AnalysisResult`] or an error, never a partial
    /// result. The busy flag is cleared on every exit path.
    ///
    /// # Errors
    ///
    /// [`Error::AnalysisInFlight`] if `id` is already being analysed,
    /// [`Error::Cancelled`] when `cancel` fires first, and
    /// [`Error::AnalysisFailed`] for any backend failure, carrying the
    /// backend's message when it sent one.
    pub async fn run(
        &self,
        id: ParcelId,
        options: RunOptions,
        cancel: &CancelToken,
    ) -> Result<AnalysisResult> {
        let _running = self.begin(id)?;
        let started = Instant::now();
        info!(parcel_id = %id, reference_date = ?options.reference_date, "Analysis started");

        match cancel.guard(self.api.compute(id, options)).await? {
            Ok(result) => {
                info!(
                    parcel_id = %id,
                    zones = result.zones.len(),
                    avg_health = result.stats.avg_health,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Analysis complete"
                );
                Ok(result)
            }
            Err(e) => {
                warn!(parcel_id = %id, error = %e, "Analysis failed");
                Err(Error::AnalysisFailed {
                    message: BackendRejection::message_of(&e),
                })
            }
        }
    }

    /// Looks up the parcel's area; failures only degrade the display.
    pub async fn fetch_area(&self, id: ParcelId) -> AreaDisplay {
        match self.api.area(id).await {
            Ok(area) => AreaDisplay::Loaded(area),
            Err(e) => {
                warn!(parcel_id = %id, error = %e, "Area lookup failed");
                AreaDisplay::Unavailable
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AnalysisStats;
    use crate::services::fake::FakeApi;
    use chrono::Utc;
    use reqwest::StatusCode;
    use std::sync::atomic::Ordering;

    fn result() -> AnalysisResult {
        AnalysisResult {
            zones: vec![],
            stats: AnalysisStats::default(),
            computed_at: Utc::now(),
            reference_date: None,
        }
    }

    #[tokio::test]
    async fn test_backend_error_message_and_busy_cleared() {
        let api = Arc::new(FakeApi::default());
        api.compute_results
            .lock()
            .unwrap()
            .push_back(Err(anyhow::Error::new(BackendRejection {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: Some("quota exceeded".to_string()),
            })));
        let runner = AnalysisRunner::new(api);

        let err = runner
            .run(ParcelId(5), RunOptions::default(), &CancelToken::new())
            .await
            .unwrap_err();
        assert!(
            matches!(&err, Error::AnalysisFailed { message: Some(m) } if m == "quota exceeded")
        );
        assert!(!runner.is_running(ParcelId(5)));
    }

    #[tokio::test]
    async fn test_duplicate_run_rejected_other_parcels_allowed() {
        let api = Arc::new(FakeApi::gated());
        {
            let mut queue = api.compute_results.lock().unwrap();
            queue.push_back(Ok(result()));
            queue.push_back(Ok(result()));
        }
        let runner = Arc::new(AnalysisRunner::new(api.clone()));

        let first = {
            let runner = runner.clone();
            tokio::spawn(async move {
                runner
                    .run(ParcelId(1), RunOptions::default(), &CancelToken::new())
                    .await
            })
        };
        while !runner.is_running(ParcelId(1)) {
            tokio::task::yield_now().await;
        }

        let err = runner
            .run(ParcelId(1), RunOptions::default(), &CancelToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AnalysisInFlight(ParcelId(1))));

        let second = {
            let runner = runner.clone();
            tokio::spawn(async move {
                runner
                    .run(ParcelId(2), RunOptions::default(), &CancelToken::new())
                    .await
            })
        };

        api.release();
        api.release();
        assert!(first.await.unwrap().is_ok());
        assert!(second.await.unwrap().is_ok());
        assert_eq!(api.compute_calls.load(Ordering::SeqCst), 2);
        assert!(!runner.is_running(ParcelId(1)));
    }

    #[tokio::test]
    async fn test_cancel_clears_busy() {
        let api = Arc::new(FakeApi::gated());
        let runner = Arc::new(AnalysisRunner::new(api));
        let cancel = CancelToken::new();

        let task = {
            let runner = runner.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move {
                runner
                    .run(ParcelId(9), RunOptions::default(), &cancel)
                    .await
            })
        };
        while !runner.is_running(ParcelId(9)) {
            tokio::task::yield_now().await;
        }
        cancel.cancel();

        assert!(matches!(task.await.unwrap(), Err(Error::Cancelled)));
        assert!(!runner.is_running(ParcelId(9)));
    }

    #[tokio::test]
    async fn test_area_failure_is_placeholder() {
        let api = Arc::new(FakeApi::default());
        api.area_results
            .lock()
            .unwrap()
            .push_back(Ok(AreaMetrics::from_hectares(10.0)));
        let runner = AnalysisRunner::new(api);

        let loaded = runner.fetch_area(ParcelId(1)).await;
        assert_eq!(loaded.to_string(), "10.00 ha (24.71 acres)");

        let missing = runner.fetch_area(ParcelId(1)).await;
        assert_eq!(missing, AreaDisplay::Unavailable);
        assert_eq!(missing.to_string(), "Area unavailable");
    }
}
