//! HTTP client for the ZIGMA dashboard server.

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Envelope every `/api` route answers with.
#[derive(Debug, serde::Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub error_code: Option<String>,
}

impl<T> ApiResponse<T> {
    /// The payload of a successful response, or the server's error message.
    pub fn into_data(self) -> Result<T> {
        if self.success {
            return self
                .data
                .ok_or_else(|| anyhow::anyhow!("API returned success but no data"));
        }
        let message = self.error.unwrap_or_else(|| "Unknown error".into());
        match self.error_code {
            Some(code) => Err(anyhow::anyhow!("{} ({})", message, code)),
            None => Err(anyhow::anyhow!("{}", message)),
        }
    }
}

/// HTTP client for the dashboard API.
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new API client pointing at the given base URL.
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send("GET", path, self.client.get(self.url(path))).await
    }

    pub async fn get_with_query<Q: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        query: &Q,
    ) -> Result<T> {
        self.send("GET", path, self.client.get(self.url(path)).query(query))
            .await
    }

    pub async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        self.send("POST", path, self.client.post(self.url(path)).json(body))
            .await
    }

    pub async fn put<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        self.send("PUT", path, self.client.put(self.url(path)).json(body))
            .await
    }

    /// Error statuses still carry the envelope, so the body is parsed first.
    async fn send<T: DeserializeOwned>(
        &self,
        method: &str,
        path: &str,
        request: RequestBuilder,
    ) -> Result<T> {
        let url = self.url(path);
        let resp = request
            .send()
            .await
            .with_context(|| format!("{} {} failed", method, url))?;

        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        match serde_json::from_str::<ApiResponse<T>>(&body) {
            Ok(envelope) => envelope.into_data(),
            Err(_) if !status.is_success() => anyhow::bail!("API error ({}): {}", status, body),
            Err(e) => Err(e).with_context(|| format!("Failed to parse response from {}", url)),
        }
    }

    /// Raw JSON from an endpoint without the envelope (health).
    pub async fn get_raw(&self, path: &str) -> Result<serde_json::Value> {
        let url = self.url(path);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body);
        }

        resp.json()
            .await
            .with_context(|| format!("Failed to parse response from {}", url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> ApiResponse<serde_json::Value> {
        serde_json::from_str(body).unwrap()
    }

    #[test]
    fn test_success_envelope() {
        let data = parse(r#"{"success":true,"data":{"role":"admin"}}"#)
            .into_data()
            .unwrap();
        assert_eq!(data["role"], "admin");
    }

    #[test]
    fn test_error_envelope_carries_code() {
        let err = parse(
            r#"{"success":false,"error":"You cannot change your own role","error_code":"SelfRoleChange"}"#,
        )
        .into_data()
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "You cannot change your own role (SelfRoleChange)"
        );
    }

    #[test]
    fn test_success_without_data() {
        assert!(parse(r#"{"success":true}"#).into_data().is_err());
    }
}
