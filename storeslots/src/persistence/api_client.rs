use std::future::Future;

use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};

use crate::error::{PersistenceError, PersistenceResult};

use super::{
    ConfigKey, ConfigurationBackend, ConfigurationDocument, PageType, SaveDraftRequest,
    StoredConfiguration,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub token: String,
    pub store_id: String,
    pub expires_at: i64,
}

/// HTTP client for the configuration service.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: &str) -> Self {
        self.token = Some(token.to_string());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn bearer(&self) -> PersistenceResult<&str> {
        self.token
            .as_deref()
            .ok_or_else(|| PersistenceError::Unauthorized("No editor token configured".into()))
    }

    // ── Auth ────────────────────────────────────────────────────────────

    pub async fn issue_token(
        &self,
        api_key: &str,
        store_id: &str,
        editor: &str,
    ) -> PersistenceResult<TokenResponse> {
        let resp = self
            .client
            .post(format!("{}/api/auth/token", self.base_url))
            .json(&serde_json::json!({
                "apiKey": api_key,
                "storeId": store_id,
                "editor": editor,
            }))
            .send()
            .await?;

        Ok(check(resp).await?.json::<TokenResponse>().await?)
    }

    // ── Configurations ──────────────────────────────────────────────────

    /// `Ok(None)` on 404; every other failure is an `Err`.
    pub async fn get_configuration(
        &self,
        key: &ConfigKey,
    ) -> PersistenceResult<Option<StoredConfiguration>> {
        let mut req = self.client.get(format!(
            "{}/api/configurations/{}/{}/{}",
            self.base_url, key.variant, key.store_id, key.page_type
        ));
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }
        let resp = req.send().await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(check(resp).await?.json::<StoredConfiguration>().await?))
    }

    pub async fn put_draft(
        &self,
        store_id: &str,
        page_type: PageType,
        document: &ConfigurationDocument,
        expected_version: Option<i64>,
    ) -> PersistenceResult<StoredConfiguration> {
        let resp = self
            .client
            .put(format!(
                "{}/api/configurations/draft/{}/{}",
                self.base_url, store_id, page_type
            ))
            .bearer_auth(self.bearer()?)
            .json(&SaveDraftRequest {
                configuration: document.clone(),
                expected_version,
            })
            .send()
            .await?;

        if resp.status() == StatusCode::CONFLICT {
            let body = resp.text().await.unwrap_or_default();
            return Err(PersistenceError::Conflict {
                expected: expected_version.unwrap_or_default(),
                actual: extract_current_version(&body),
            });
        }
        Ok(check(resp).await?.json::<StoredConfiguration>().await?)
    }

    pub async fn publish_draft(
        &self,
        store_id: &str,
        page_type: PageType,
    ) -> PersistenceResult<StoredConfiguration> {
        let resp = self
            .client
            .post(format!(
                "{}/api/configurations/publish/{}/{}",
                self.base_url, store_id, page_type
            ))
            .bearer_auth(self.bearer()?)
            .send()
            .await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(PersistenceError::NothingToPublish {
                store_id: store_id.to_string(),
                page_type: page_type.to_string(),
            });
        }
        Ok(check(resp).await?.json::<StoredConfiguration>().await?)
    }

    pub async fn delete_draft(&self, store_id: &str, page_type: PageType) -> PersistenceResult<bool> {
        let resp = self
            .client
            .delete(format!(
                "{}/api/configurations/draft/{}/{}",
                self.base_url, store_id, page_type
            ))
            .bearer_auth(self.bearer()?)
            .send()
            .await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        check(resp).await?;
        Ok(true)
    }

    // ── WebSocket ───────────────────────────────────────────────────────

    pub fn ws_url(&self) -> PersistenceResult<String> {
        let ws_base = self
            .base_url
            .replace("http://", "ws://")
            .replace("https://", "wss://");
        Ok(format!("{}/api/configurations/ws?token={}", ws_base, self.bearer()?))
    }
}

impl ConfigurationBackend for ApiClient {
    fn fetch(
        &self,
        key: &ConfigKey,
    ) -> impl Future<Output = PersistenceResult<Option<StoredConfiguration>>> + Send {
        async move { self.get_configuration(key).await }
    }

    fn save_draft(
        &self,
        store_id: &str,
        page_type: PageType,
        document: &ConfigurationDocument,
        expected_version: Option<i64>,
    ) -> impl Future<Output = PersistenceResult<StoredConfiguration>> + Send {
        async move {
            self.put_draft(store_id, page_type, document, expected_version)
                .await
        }
    }

    fn publish(
        &self,
        store_id: &str,
        page_type: PageType,
    ) -> impl Future<Output = PersistenceResult<StoredConfiguration>> + Send {
        async move { self.publish_draft(store_id, page_type).await }
    }

    fn discard_draft(
        &self,
        store_id: &str,
        page_type: PageType,
    ) -> impl Future<Output = PersistenceResult<bool>> + Send {
        async move { self.delete_draft(store_id, page_type).await }
    }
}

/// Pass successful responses through; turn the rest into typed errors.
async fn check(resp: Response) -> PersistenceResult<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let message = extract_error(&body);
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(PersistenceError::Unauthorized(message));
    }
    Err(PersistenceError::Server {
        status: status.as_u16(),
        message,
    })
}

fn extract_error(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error")?.as_str().map(|s| s.to_string()))
        .unwrap_or_else(|| body.to_string())
}

fn extract_current_version(body: &str) -> Option<i64> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("currentVersion")?.as_i64())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_bodies_are_unwrapped() {
        assert_eq!(extract_error(r#"{"error":"Invalid tree"}"#), "Invalid tree");
        assert_eq!(extract_error("Bad Gateway"), "Bad Gateway");
        assert_eq!(
            extract_current_version(r#"{"error":"Version conflict","currentVersion":7}"#),
            Some(7)
        );
        assert_eq!(extract_current_version(r#"{"error":"gone"}"#), None);
    }

    #[test]
    fn ws_url_needs_a_token() {
        let client = ApiClient::new("https://slots.example.com/");
        assert!(matches!(client.ws_url(), Err(PersistenceError::Unauthorized(_))));

        let client = client.with_token("abc");
        assert_eq!(client.base_url(), "https://slots.example.com");
        assert_eq!(
            client.ws_url().unwrap(),
            "wss://slots.example.com/api/configurations/ws?token=abc"
        );
    }
}
