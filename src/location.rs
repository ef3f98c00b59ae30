//! Location providers for recording boundary corners.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::VecDeque;
use std::io::Read;
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

use crate::error::Error;
use crate::geometry::Point;

/// Longest wait for a single fix.
pub const LOCATION_TIMEOUT: Duration = Duration::from_secs(10);

/// Supplies the device's current position.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn current_location(&self) -> Result<Point>;
}

/// Asks `provider` for a fix, giving up after `timeout`.
///
/// # Errors
///
/// [`Error::LocationUnavailable`] on provider failure or timeout. Nothing is
/// retried here.
pub async fn locate(provider: &dyn LocationProvider, timeout: Duration) -> crate::Result<Point> {
    match tokio::time::timeout(timeout, provider.current_location()).await {
        Ok(Ok(point)) => {
            debug!(lng = point.lng, lat = point.lat, "Location fix");
            Ok(point)
        }
        Ok(Err(e)) => Err(Error::LocationUnavailable {
            reason: e.to_string(),
        }),
        Err(_) => Err(Error::LocationUnavailable {
            reason: format!("no fix within {}s", timeout.as_secs_f32()),
        }),
    }
}

/// Always reports the same position, e.g. a cached last-known fix.
pub struct FixedLocation(pub Point);

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn current_location(&self) -> Result<Point> {
        Ok(self.0)
    }
}

#[derive(Deserialize)]
struct FixRow {
    #[serde(alias = "lon", alias = "longitude")]
    lng: Option<f64>,
    #[serde(alias = "latitude")]
    lat: Option<f64>,
}

/// Replays fixes from a CSV log with `lng,lat` columns, one per request.
///
/// A row with an empty coordinate is a lost fix: the request for it fails
/// and the next request moves on to the following row.
pub struct TrackLog {
    fixes: Mutex<VecDeque<Option<Point>>>,
}

impl TrackLog {
    pub fn from_reader(reader: impl Read) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut fixes = VecDeque::new();
        for row in rdr.deserialize() {
            let row: FixRow = row?;
            fixes.push_back(row.lng.zip(row.lat).map(|(lng, lat)| Point::new(lng, lat)));
        }
        Ok(Self {
            fixes: Mutex::new(fixes),
        })
    }

    pub fn open(path: &str) -> Result<Self> {
        Self::from_reader(std::fs::File::open(path)?)
    }

    /// Rows not yet replayed, lost fixes included.
    pub fn remaining(&self) -> usize {
        self.fixes.lock().map(|f| f.len()).unwrap_or(0)
    }
}

#[async_trait]
impl LocationProvider for TrackLog {
    async fn current_location(&self) -> Result<Point> {
        let mut fixes = self
            .fixes
            .lock()
            .map_err(|_| anyhow!("track log lock poisoned"))?;
        match fixes.pop_front() {
            Some(Some(point)) => Ok(point),
            Some(None) => Err(anyhow!("no fix recorded")),
            None => Err(anyhow!("track log has no more fixes")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Stalled;

    #[async_trait]
    impl LocationProvider for Stalled {
        async fn current_location(&self) -> Result<Point> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Point::new(0.0, 0.0))
        }
    }

    #[tokio::test]
    async fn test_timeout_is_location_unavailable() {
        let err = locate(&Stalled, Duration::from_millis(20)).await.unwrap_err();
        assert!(matches!(err, Error::LocationUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_track_log_replays_in_order() {
        let log = TrackLog::from_reader("lng, lat\n0,0\n0,1\n".as_bytes()).unwrap();
        assert_eq!(log.remaining(), 2);
        assert_eq!(log.current_location().await.unwrap(), Point::new(0.0, 0.0));
        assert_eq!(log.current_location().await.unwrap(), Point::new(0.0, 1.0));

        let err = locate(&log, LOCATION_TIMEOUT).await.unwrap_err();
        assert!(matches!(err, Error::LocationUnavailable { .. }));
    }

    #[test]
    fn test_track_log_accepts_long_column_names() {
        let log = TrackLog::from_reader("latitude,longitude\n45.5,9.2\n".as_bytes()).unwrap();
        let fixes = log.fixes.lock().unwrap();
        assert_eq!(fixes[0], Some(Point::new(9.2, 45.5)));
    }

    #[tokio::test]
    async fn test_track_log_lost_fix_fails_once() {
        let log = TrackLog::from_reader("lng,lat
0,0
,
1,1
".as_bytes()).unwrap();
        assert_eq!(log.remaining(), 3);
        assert!(log.current_location().await.is_ok());

        let err = locate(&log, LOCATION_TIMEOUT).await.unwrap_err();
        assert!(matches!(err, Error::LocationUnavailable { reason } if reason == "no fix recorded"));
        assert_eq!(log.current_location().await.unwrap(), Point::new(1.0, 1.0));
    }
}
