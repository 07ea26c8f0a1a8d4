//! HTTP client for the Devin sessions API

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::{RemediationAgent, RemoteSession};
use crate::error::{Result, SentinelError};
use crate::http::{bearer, blocking, build_agent, decode, encode_url_path_segment};
use crate::SessionHandle;

/// Remediation agent backed by the Devin REST API
#[derive(Clone)]
pub struct DevinClient {
    base_url: String,
    api_key: String,
    client: ureq::Agent,
}

impl DevinClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            // Session creation can take up to a minute
            client: build_agent(Duration::from_secs(60)),
        }
    }

    fn request(&self, method: &str, url: &str) -> ureq::Request {
        self.client
            .request(method, url)
            .set("Authorization", &bearer(&self.api_key))
            .set("Content-Type", "application/json")
    }

    fn session_url(&self, prefix: &str, session_id: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_url,
            prefix,
            encode_url_path_segment(session_id)
        )
    }
}

#[async_trait]
impl RemediationAgent for DevinClient {
    async fn create_session(&self, prompt: &str, idempotency_key: &str) -> Result<SessionHandle> {
        let this = self.clone();
        let url = format!("{}/sessions", self.base_url);
        let body = json!({ "prompt": prompt, "idempotency_key": idempotency_key });

        blocking(move || {
            #[derive(Deserialize)]
            struct Response {
                session_id: Option<String>,
                url: Option<String>,
            }

            let response: Response = decode(this.request("POST", &url).send_json(body)?)?;
            let session_id = response
                .session_id
                .filter(|id| !id.is_empty())
                .ok_or_else(|| SentinelError::Decode("'session_id' missing".to_string()))?;
            Ok(SessionHandle {
                session_id,
                url: response.url,
            })
        })
        .await
    }

    async fn session_status(&self, session_id: &str) -> Result<RemoteSession> {
        let this = self.clone();
        let url = self.session_url("session", session_id);

        blocking(move || decode(this.request("GET", &url).call()?)).await
    }

    async fn post_message(&self, session_id: &str, text: &str) -> Result<()> {
        let this = self.clone();
        let url = format!("{}/message", self.session_url("sessions", session_id));
        let body = json!({ "message": text });

        blocking(move || {
            this.request("POST", &url).send_json(body)?;
            Ok(())
        })
        .await
    }

    async fn list_sessions(&self, limit: usize) -> Result<Vec<RemoteSession>> {
        let this = self.clone();
        let url = format!("{}/sessions", self.base_url);

        blocking(move || {
            #[derive(Deserialize)]
            struct Response {
                #[serde(default)]
                sessions: Vec<RemoteSession>,
            }

            let response: Response = decode(
                this.request("GET", &url)
                    .query("limit", &limit.to_string())
                    .call()?,
            )?;
            Ok(response.sessions)
        })
        .await
    }

    async fn delete_session(&self, session_id: &str) -> Result<()> {
        let this = self.clone();
        let url = self.session_url("sessions", session_id);

        blocking(move || {
            this.request("DELETE", &url).call()?;
            Ok(())
        })
        .await
    }
}
