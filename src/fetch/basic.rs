use super::client::HttpClient;
use async_trait::async_trait;
use std::time::Duration;

/// [`HttpClient`] backed by a plain `reqwest::Client`.
pub struct BasicClient(reqwest::Client);

impl BasicClient {
    /// `timeout` bounds whole requests; `None` leaves long analysis calls
    /// unbounded. Connecting is always limited to ten seconds.
    pub fn new(timeout: Option<Duration>) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder().connect_timeout(Duration::from_secs(10));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self(builder.build()?))
    }
}

#[async_trait]
impl HttpClient for BasicClient {
    async fn execute(&self, req: reqwest::Request) -> reqwest::Result<reqwest::Response> {
        self.0.execute(req).await
    }
}
