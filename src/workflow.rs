//! The two user workflows, each an explicit context object.
//!
//! [`CaptureWorkflow`] owns a capture session, the map showing its outline,
//! and creates one parcel from it; [`ResultsWorkflow`] analyses existing
//! parcels and owns the display they are rendered on. Errors are turned into notifications here and the
//! workflow is left as it was before the failed operation.

use std::sync::Arc;
use tracing::warn;

use crate::analysis::{AnalysisRunner, AreaDisplay};
use crate::cancel::CancelToken;
use crate::capture::{CaptureEvent, CaptureOptions, CaptureSession};
use crate::error::Result;
use crate::geometry::Point;
use crate::location::LocationProvider;
use crate::models::{ParcelId, RunOptions};
use crate::notify::{Level, Notification, Notifier};
use crate::render::{BoundaryView, MapSurface, ResultView, StatsView};
use crate::services::ParcelApi;
use crate::submit::ParcelSubmitter;

/// UI inputs of the capture workflow.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureCommand {
    StartDraw,
    DrawCompleted(Vec<Point>),
    /// Take a fix from the location provider.
    RecordCorner,
    /// Record a position the caller already has, e.g. a cached fix.
    RecordPoint(Point),
    Finish,
    Clear,
    Submit {
        name: String,
        description: Option<String>,
    },
}

pub struct CaptureWorkflow<A: ?Sized, S> {
    session: CaptureSession,
    submitter: ParcelSubmitter<A>,
    view: BoundaryView<S>,
    location: Arc<dyn LocationProvider>,
    notifier: Arc<dyn Notifier>,
    cancel: CancelToken,
}

impl<A: ParcelApi + ?Sized, S: MapSurface> CaptureWorkflow<A, S> {
    pub fn new(
        api: Arc<A>,
        location: Arc<dyn LocationProvider>,
        surface: S,
        notifier: Arc<dyn Notifier>,
        options: CaptureOptions,
    ) -> Self {
        Self {
            session: CaptureSession::new(options),
            submitter: ParcelSubmitter::new(api),
            view: BoundaryView::new(surface),
            location,
            notifier,
            cancel: CancelToken::new(),
        }
    }

    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    pub fn view(&self) -> &BoundaryView<S> {
        &self.view
    }

    /// Token for the pending submission; a cancelled token is replaced on the
    /// next command.
    pub fn canceller(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Handles one command. Returns the new parcel id after a successful
    /// submit. Errors have already been shown to the user when returned.
    pub async fn handle(&mut self, command: CaptureCommand) -> Result<Option<ParcelId>> {
        if self.cancel.is_cancelled() {
            self.cancel = CancelToken::new();
        }
        let outcome = self.apply(command).await;
        if let Err(e) = &outcome {
            self.notifier.notify(Notification::from(e));
        }
        self.redraw();
        outcome
    }

    /// Requests `fixes` positions in turn, recording each as a corner.
    ///
    /// A failed fix is tolerated while a corner has failed at most `retries`
    /// times in a row; the next request counts as the retry. Returns the
    /// number of corners recorded.
    pub async fn record_corners(&mut self, fixes: usize, retries: usize) -> Result<usize> {
        let mut recorded = 0;
        let mut failures = 0;
        for _ in 0..fixes {
            match self.handle(CaptureCommand::RecordCorner).await {
                Ok(_) => {
                    recorded += 1;
                    failures = 0;
                }
                Err(e) if failures < retries => {
                    failures += 1;
                    warn!(attempt = failures, error = %e, "Retrying corner");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(recorded)
    }

    fn redraw(&mut self) {
        let path = match self.session.boundary() {
            Some(boundary) => boundary.ring(),
            None => self.session.corners(),
        };
        self.view.show(path);
    }

    async fn apply(&mut self, command: CaptureCommand) -> Result<Option<ParcelId>> {
        match command {
            CaptureCommand::StartDraw => self.session.dispatch(CaptureEvent::StartDraw)?,
            CaptureCommand::DrawCompleted(vertices) => {
                self.session
                    .dispatch(CaptureEvent::DrawCompleted(vertices))?;
                self.announce_boundary();
            }
            CaptureCommand::RecordCorner => {
                let count = self.session.record_corner(self.location.as_ref()).await?;
                self.notifier.notify(Notification::new(
                    Level::Info,
                    format!("Corner {count} recorded"),
                ));
            }
            CaptureCommand::RecordPoint(point) => {
                let count = self.session.record_point(point);
                self.notifier.notify(Notification::new(
                    Level::Info,
                    format!("Corner {count} recorded"),
                ));
            }
            CaptureCommand::Finish => {
                self.session.dispatch(CaptureEvent::Finish)?;
                self.announce_boundary();
            }
            CaptureCommand::Clear => self.session.dispatch(CaptureEvent::Clear)?,
            CaptureCommand::Submit { name, description } => {
                let id = self
                    .submitter
                    .submit(
                        &name,
                        description.as_deref(),
                        self.session.boundary(),
                        &self.cancel,
                    )
                    .await?;
                self.notifier.notify(Notification::new(
                    Level::Success,
                    format!("Parcel '{}' saved", name.trim()),
                ));
                self.session.clear();
                return Ok(Some(id));
            }
        }
        Ok(None)
    }

    fn announce_boundary(&self) {
        if let Some(boundary) = self.session.boundary() {
            let area = boundary.area_preview();
            self.notifier.notify(Notification::new(
                Level::Info,
                format!(
                    "Boundary defined: {} corners, about {:.2} ha",
                    boundary.vertex_count(),
                    area.area_hectares
                ),
            ));
        }
    }
}

pub struct ResultsWorkflow<A: ?Sized, S> {
    runner: AnalysisRunner<A>,
    view: ResultView<S>,
    notifier: Arc<dyn Notifier>,
    cancel: CancelToken,
}

impl<A: ParcelApi + ?Sized, S: MapSurface> ResultsWorkflow<A, S> {
    pub fn new(api: Arc<A>, surface: S, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            runner: AnalysisRunner::new(api),
            view: ResultView::new(surface),
            notifier,
            cancel: CancelToken::new(),
        }
    }

    pub fn view(&self) -> &ResultView<S> {
        &self.view
    }

    pub fn is_busy(&self, id: ParcelId) -> bool {
        self.runner.is_running(id)
    }

    /// Token for the pending analysis, e.g. to cancel when navigating away.
    pub fn canceller(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Runs an analysis and displays it, superseding the previous result.
    ///
    /// On failure the previous display is kept and the error is notified.
    pub async fn analyze(&mut self, id: ParcelId, options: RunOptions) -> Result<&StatsView> {
        if self.cancel.is_cancelled() {
            self.cancel = CancelToken::new();
        }
        self.notifier.notify(Notification::new(
            Level::Info,
            format!("Analyzing parcel {id}..."),
        ));

        let result = match self.runner.run(id, options, &self.cancel).await {
            Ok(result) => result,
            Err(e) => {
                self.notifier.notify(Notification::from(&e));
                return Err(e);
            }
        };

        self.notifier.notify(Notification::new(
            Level::Success,
            format!("Analysis complete: {} zones", result.zones.len()),
        ));
        if result.stats.critical_count > 0 {
            self.notifier.notify(Notification::new(
                Level::Warning,
                format!(
                    "{} critical zones detected in parcel {id}",
                    result.stats.critical_count
                ),
            ));
        }
        Ok(self.view.render(&result))
    }

    pub async fn area(&self, id: ParcelId) -> AreaDisplay {
        self.runner.fetch_area(id).await
    }
}
