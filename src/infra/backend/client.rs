use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::{Method, Request, Response, Url};
use serde::Deserialize;
use tracing::debug;

use crate::fetch::{HttpClient, error_message, json_request};
use crate::geometry::AreaMetrics;
use crate::models::{
    AnalysisResult, ComputeResponse, Parcel, ParcelId, ParcelRecord, ParcelUpdate, RunOptions,
};
use crate::services::parcel_api::{BackendRejection, ParcelApi};

#[derive(Deserialize)]
struct Created {
    id: ParcelId,
}

/// REST client for the crop-health backend.
pub struct BackendClient<C> {
    http: C,
    base_url: Url,
}

impl<C: HttpClient> BackendClient<C> {
    pub fn new(http: C, base_url: &str) -> Result<Self> {
        let mut base = base_url.trim_end_matches('/').to_string();
        base.push('/');
        let base_url = Url::parse(&base).with_context(|| format!("invalid API URL '{base_url}'"))?;
        Ok(Self { http, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    fn lands(&self, id: ParcelId, suffix: &str) -> Result<Url> {
        self.endpoint(&format!("api/lands/{id}{suffix}"))
    }

    async fn send(&self, req: Request) -> Result<Response> {
        let method = req.method().clone();
        let url = req.url().clone();

        let response = self
            .http
            .execute(req)
            .await
            .map_err(|e| anyhow!("Failed to send {} {}: {}", method, url, e))?;

        let status = response.status();
        debug!(%method, %url, %status, "Backend responded");
        if !status.is_success() {
            let message = error_message(response).await;
            return Err(BackendRejection { status, message }.into());
        }
        Ok(response)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T> {
        let response = self.send(Request::new(Method::GET, url)).await?;
        response
            .json()
            .await
            .map_err(|e| anyhow!("Failed to parse response: {}", e))
    }
}

#[async_trait]
impl<C: HttpClient> ParcelApi for BackendClient<C> {
    #[tracing::instrument(skip(self, parcel), fields(name = %parcel.name))]
    async fn create_parcel(&self, parcel: &Parcel) -> Result<ParcelId> {
        let req = json_request(Method::POST, self.endpoint("api/lands")?, &parcel.to_body())?;
        let created: Created = self
            .send(req)
            .await?
            .json()
            .await
            .map_err(|e| anyhow!("Failed to parse created parcel: {}", e))?;
        Ok(created.id)
    }

    #[tracing::instrument(skip(self), fields(parcel_id = %id))]
    async fn compute(&self, id: ParcelId, options: RunOptions) -> Result<AnalysisResult> {
        let url = self.lands(id, "/compute")?;
        let req = json_request(Method::POST, url, &options.to_body())?;
        let raw: ComputeResponse = self
            .send(req)
            .await?
            .json()
            .await
            .map_err(|e| anyhow!("Failed to parse analysis response: {}", e))?;
        AnalysisResult::try_from(raw).map_err(|e| anyhow!("Rejected analysis payload: {}", e))
    }

    #[tracing::instrument(skip(self), fields(parcel_id = %id))]
    async fn area(&self, id: ParcelId) -> Result<AreaMetrics> {
        self.get_json(self.lands(id, "/area")?).await
    }

    async fn list_parcels(&self) -> Result<Vec<ParcelRecord>> {
        self.get_json(self.endpoint("api/lands")?).await
    }

    async fn get_parcel(&self, id: ParcelId) -> Result<ParcelRecord> {
        self.get_json(self.lands(id, "")?).await
    }

    #[tracing::instrument(skip(self, update), fields(parcel_id = %id))]
    async fn update_parcel(&self, id: ParcelId, update: &ParcelUpdate) -> Result<()> {
        let req = json_request(Method::PUT, self.lands(id, "")?, update)?;
        self.send(req).await?;
        Ok(())
    }

    #[tracing::instrument(skip(self), fields(parcel_id = %id))]
    async fn delete_parcel(&self, id: ParcelId) -> Result<()> {
        self.send(Request::new(Method::DELETE, self.lands(id, "")?))
            .await?;
        Ok(())
    }
}
