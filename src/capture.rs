//! Field boundary capture.
//!
//! A [`CaptureSession`] follows one of two paths to a defined boundary:
//!
//! ```text
//! Idle --start_freehand_draw--> Drawing --complete_draw--> Defined
//! Idle --record_corner--> RecordingCorners --finish (>= 3)--> Defined
//! ```
//!
//! Only one path is active at a time: entering one path while the session
//! holds state from the other (or a finished boundary) clears it first.
//! `clear` returns to `Idle` from anywhere.

use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::geometry::{Boundary, Point};
use crate::location::{LOCATION_TIMEOUT, LocationProvider, locate};

#[derive(Debug, Clone, Copy)]
pub struct CaptureOptions {
    /// Wait bound for each corner fix.
    pub location_timeout: Duration,
    /// Reject self-crossing or degenerate rings when defining a boundary.
    pub require_simple_ring: bool,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            location_timeout: LOCATION_TIMEOUT,
            require_simple_ring: false,
        }
    }
}

/// How a boundary was captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMode {
    Freehand,
    Corners,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CaptureState {
    Idle,
    Drawing,
    RecordingCorners(Vec<Point>),
    Defined { boundary: Boundary, mode: CaptureMode },
}

/// Inputs driving the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureEvent {
    StartDraw,
    /// The draw tool closed a polygon with these vertices.
    DrawCompleted(Vec<Point>),
    CornerRecorded(Point),
    Finish,
    Clear,
}

/// One boundary capture, owned by the capture workflow.
pub struct CaptureSession {
    state: CaptureState,
    options: CaptureOptions,
    corner_count: watch::Sender<usize>,
}

impl Default for CaptureSession {
    fn default() -> Self {
        Self::new(CaptureOptions::default())
    }
}

impl CaptureSession {
    pub fn new(options: CaptureOptions) -> Self {
        let (corner_count, _) = watch::channel(0);
        Self {
            state: CaptureState::Idle,
            options,
            corner_count,
        }
    }

    pub fn state(&self) -> &CaptureState {
        &self.state
    }

    pub fn options(&self) -> CaptureOptions {
        self.options
    }

    /// The defined boundary, if capture is complete.
    pub fn boundary(&self) -> Option<&Boundary> {
        match &self.state {
            CaptureState::Defined { boundary, .. } => Some(boundary),
            _ => None,
        }
    }

    /// Corners recorded so far on the GPS path.
    pub fn corners(&self) -> &[Point] {
        match &self.state {
            CaptureState::RecordingCorners(corners) => corners,
            _ => &[],
        }
    }

    /// Receives the corner count after every change.
    pub fn subscribe_corner_count(&self) -> watch::Receiver<usize> {
        self.corner_count.subscribe()
    }

    /// Applies one event. On error the state is left as it was.
    pub fn dispatch(&mut self, event: CaptureEvent) -> Result<()> {
        debug!(?event, state = ?self.state_name(), "Capture event");
        match event {
            CaptureEvent::StartDraw => {
                if self.state != CaptureState::Drawing {
                    self.reset();
                    self.state = CaptureState::Drawing;
                }
            }
            CaptureEvent::DrawCompleted(vertices) => {
                if self.state != CaptureState::Drawing {
                    return Err(Error::NotDrawing);
                }
                let boundary = self.accept(Boundary::from_vertices(vertices)?)?;
                info!(vertices = boundary.vertex_count(), "Boundary drawn");
                self.state = CaptureState::Defined {
                    boundary,
                    mode: CaptureMode::Freehand,
                };
            }
            CaptureEvent::CornerRecorded(point) => {
                if let CaptureState::RecordingCorners(corners) = &mut self.state {
                    corners.push(point);
                } else {
                    self.reset();
                    self.state = CaptureState::RecordingCorners(vec![point]);
                }
                let count = self.corners().len();
                self.corner_count.send_replace(count);
                info!(count, lng = point.lng, lat = point.lat, "Corner recorded");
            }
            CaptureEvent::Finish => match &self.state {
                CaptureState::RecordingCorners(corners) => {
                    let boundary = self.accept(Boundary::close(corners.clone())?)?;
                    info!(corners = boundary.vertex_count(), "Boundary recorded");
                    self.state = CaptureState::Defined {
                        boundary,
                        mode: CaptureMode::Corners,
                    };
                }
                CaptureState::Defined { .. } => {}
                CaptureState::Drawing => return Err(Error::NotRecording),
                CaptureState::Idle => return Err(Error::InsufficientVertices { count: 0 }),
            },
            CaptureEvent::Clear => self.reset(),
        }
        Ok(())
    }

    fn accept(&self, boundary: Boundary) -> Result<Boundary> {
        if self.options.require_simple_ring && !boundary.is_simple() {
            return Err(Error::SelfIntersecting);
        }
        Ok(boundary)
    }

    fn reset(&mut self) {
        if self.state != CaptureState::Idle {
            debug!(from = self.state_name(), "Capture cleared");
        }
        self.state = CaptureState::Idle;
        self.corner_count.send_replace(0);
    }

    fn state_name(&self) -> &'static str {
        match self.state {
            CaptureState::Idle => "idle",
            CaptureState::Drawing => "drawing",
            CaptureState::RecordingCorners(_) => "recording_corners",
            CaptureState::Defined { .. } => "defined",
        }
    }

    /// Enters `Drawing`, discarding any other capture state.
    pub fn start_freehand_draw(&mut self) {
        // StartDraw cannot fail
        let _ = self.dispatch(CaptureEvent::StartDraw);
    }

    /// Stores the polygon the draw tool produced.
    pub fn complete_draw(&mut self, vertices: Vec<Point>) -> Result<&Boundary> {
        self.dispatch(CaptureEvent::DrawCompleted(vertices))?;
        self.boundary().ok_or(Error::MissingGeometry)
    }

    /// Takes a fix from `provider` and appends it as the next corner.
    ///
    /// Returns the corner count. A failed fix leaves the session unchanged;
    /// the caller decides whether to retry or use [`Self::record_point`].
    pub async fn record_corner(&mut self, provider: &dyn LocationProvider) -> Result<usize> {
        let point = locate(provider, self.options.location_timeout).await?;
        Ok(self.record_point(point))
    }

    /// Appends an already known position, such as a cached fix.
    pub fn record_point(&mut self, point: Point) -> usize {
        // CornerRecorded cannot fail
        let _ = self.dispatch(CaptureEvent::CornerRecorded(point));
        self.corners().len()
    }

    /// Closes the recorded corners into the boundary ring.
    pub fn finish(&mut self) -> Result<&Boundary> {
        self.dispatch(CaptureEvent::Finish)?;
        self.boundary().ok_or(Error::MissingGeometry)
    }

    /// Back to `Idle`; idempotent.
    pub fn clear(&mut self) {
        let _ = self.dispatch(CaptureEvent::Clear);
    }
}
