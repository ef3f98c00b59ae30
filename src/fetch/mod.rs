//! HTTP plumbing behind the backend client.
//!
//! Requests are built here and sent through an [`HttpClient`], which tests
//! replace with a scripted implementation.

mod basic;
mod client;

pub use basic::BasicClient;
pub use client::HttpClient;

use anyhow::Result;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use reqwest::{Method, Request, Response, Url};
use serde::{Deserialize, Serialize};

/// Builds a request with a JSON body.
pub fn json_request(method: Method, url: Url, body: &impl Serialize) -> Result<Request> {
    let mut req = Request::new(method, url);
    req.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    *req.body_mut() = Some(serde_json::to_vec(body)?.into());
    Ok(req)
}

#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// Reads the `{"error": "..."}` message of a failed response, if there is one.
pub async fn error_message(resp: Response) -> Option<String> {
    let text = resp.text().await.ok()?;
    serde_json::from_str::<ErrorBody>(&text)
        .ok()
        .and_then(|b| b.error)
        .filter(|m| !m.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_request_sets_body_and_content_type() {
        let url = Url::parse("http://localhost:5000/api/lands").unwrap();
        let req = json_request(Method::POST, url, &serde_json::json!({"name": "a"})).unwrap();

        assert_eq!(req.method(), Method::POST);
        assert_eq!(req.headers()[CONTENT_TYPE], "application/json");
        let body = req.body().and_then(|b| b.as_bytes()).unwrap();
        assert_eq!(body, br#"{"name":"a"}"#);
    }
}
