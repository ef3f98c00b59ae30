//! Scripted [`ParcelApi`] for unit tests.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Semaphore;

use super::ParcelApi;
use crate::geometry::AreaMetrics;
use crate::models::{AnalysisResult, Parcel, ParcelId, ParcelRecord, ParcelUpdate, RunOptions};

#[derive(Default)]
pub(crate) struct FakeApi {
    pub created: Mutex<Vec<Parcel>>,
    pub create_results: Mutex<VecDeque<Result<ParcelId>>>,
    pub compute_results: Mutex<VecDeque<Result<AnalysisResult>>>,
    pub area_results: Mutex<VecDeque<Result<AreaMetrics>>>,
    pub compute_calls: AtomicUsize,
    /// When set, create and compute wait for a permit before answering.
    pub gate: Option<Semaphore>,
}

impl FakeApi {
    pub fn gated() -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Default::default()
        }
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }

    async fn wait_gate(&self) {
        if let Some(gate) = &self.gate {
            gate.acquire().await.expect("gate closed").forget();
        }
    }

    fn next<T>(queue: &Mutex<VecDeque<Result<T>>>) -> Result<T> {
        queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(anyhow!("no scripted response")))
    }
}

#[async_trait]
impl ParcelApi for FakeApi {
    async fn create_parcel(&self, parcel: &Parcel) -> Result<ParcelId> {
        self.created.lock().unwrap().push(parcel.clone());
        self.wait_gate().await;
        Self::next(&self.create_results)
    }

    async fn compute(&self, _id: ParcelId, _options: RunOptions) -> Result<AnalysisResult> {
        self.compute_calls.fetch_add(1, Ordering::SeqCst);
        self.wait_gate().await;
        Self::next(&self.compute_results)
    }

    async fn area(&self, _id: ParcelId) -> Result<AreaMetrics> {
        Self::next(&self.area_results)
    }

    async fn list_parcels(&self) -> Result<Vec<ParcelRecord>> {
        Ok(Vec::new())
    }

    async fn get_parcel(&self, id: ParcelId) -> Result<ParcelRecord> {
        Err(anyhow!("parcel {id} not scripted"))
    }

    async fn update_parcel(&self, _id: ParcelId, _update: &ParcelUpdate) -> Result<()> {
        Ok(())
    }

    async fn delete_parcel(&self, _id: ParcelId) -> Result<()> {
        Ok(())
    }
}
