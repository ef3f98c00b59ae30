//! Parcel management: listing, inspection, edits and deletion.

use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::models::{ParcelId, ParcelRecord, ParcelUpdate};
use crate::services::{BackendRejection, ParcelApi};

fn request_failed(action: &str, err: anyhow::Error) -> Error {
    warn!(action, error = %err, "Parcel request failed");
    Error::RequestFailed {
        message: BackendRejection::message_of(&err)
            .unwrap_or_else(|| format!("Could not {action}")),
    }
}

pub struct ParcelManager<A: ?Sized> {
    api: Arc<A>,
}

impl<A: ParcelApi + ?Sized> ParcelManager<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self { api }
    }

    pub async fn list(&self) -> Result<Vec<ParcelRecord>> {
        self.api
            .list_parcels()
            .await
            .map_err(|e| request_failed("load parcels", e))
    }

    pub async fn get(&self, id: ParcelId) -> Result<ParcelRecord> {
        self.api
            .get_parcel(id)
            .await
            .map_err(|e| request_failed("load parcel", e))
    }

    /// # Errors
    ///
    /// [`Error::InvalidInput`] for an empty update or a blank new name.
    pub async fn update(&self, id: ParcelId, update: ParcelUpdate) -> Result<()> {
        if update.is_empty() {
            return Err(Error::InvalidInput("nothing to update".to_string()));
        }
        if update.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err(Error::InvalidInput("parcel name is required".to_string()));
        }
        self.api
            .update_parcel(id, &update)
            .await
            .map_err(|e| request_failed("update parcel", e))?;
        info!(parcel_id = %id, "Parcel updated");
        Ok(())
    }

    pub async fn delete(&self, id: ParcelId) -> Result<()> {
        self.api
            .delete_parcel(id)
            .await
            .map_err(|e| request_failed("delete parcel", e))?;
        info!(parcel_id = %id, "Parcel deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fake::FakeApi;

    #[tokio::test]
    async fn test_update_validation() {
        let manager = ParcelManager::new(Arc::new(FakeApi::default()));
        assert!(matches!(
            manager.update(ParcelId(1), ParcelUpdate::default()).await,
            Err(Error::InvalidInput(_))
        ));
        let blank = ParcelUpdate {
            name: Some(" ".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            manager.update(ParcelId(1), blank).await,
            Err(Error::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_lookup_has_fallback_message() {
        let manager = ParcelManager::new(Arc::new(FakeApi::default()));
        let err = manager.get(ParcelId(3)).await.unwrap_err();
        assert_eq!(err.to_string(), "Could not load parcel");
    }
}
