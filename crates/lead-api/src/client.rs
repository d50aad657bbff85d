use async_trait::async_trait;
use lead_core::events::ChatMessage;
use lead_core::stats::{ManagerData, NightStats};
use lead_core::{Candidate, LeadRecord, LeadType, SaveLead, SearchResult, StatusChange};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{ApiError, Result};

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";
const REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_NOT_FOUND: &str = "Lead not found";
const DEFAULT_REJECTION: &str = "Unknown error";

/// Backend contract used by the client surfaces.
#[async_trait]
pub trait LeadApi: Send + Sync {
    /// Look a lead up by business id, or by exact row when `row_index` is set.
    async fn get_lead(
        &self,
        lead_type: LeadType,
        id: &str,
        row_index: Option<u32>,
    ) -> Result<SearchResult>;

    /// Create or update a lead; returns the server's confirmation text.
    async fn save_lead(&self, lead: &SaveLead) -> Result<String>;

    async fn delete_lead(&self, lead_type: LeadType, id: &str) -> Result<String>;

    /// Exchange manager credentials for a session token.
    async fn manager_login(&self, user_id: &str, password: &str) -> Result<String>;

    async fn manager_data(&self, token: &str) -> Result<ManagerData>;

    async fn update_status(&self, change: &StatusChange) -> Result<String>;

    async fn night_stats(&self) -> Result<NightStats>;

    async fn chat_history(&self) -> Result<Vec<ChatMessage>>;

    async fn send_chat(&self, message: &OutgoingChat) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingChat {
    pub sender: String,
    pub message: String,
    pub role: String,
    pub dept: Option<LeadType>,
}

/// `{status, message?, token?, data?, candidates?}` answer shape.
#[derive(Debug, Default, Deserialize)]
struct ApiEnvelope {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    data: Option<LeadRecord>,
    #[serde(default)]
    candidates: Option<Vec<Candidate>>,
}

impl ApiEnvelope {
    fn is_success(&self) -> bool {
        self.status == "success"
    }

    fn into_ack(self) -> Result<String> {
        if self.is_success() {
            Ok(self.message.unwrap_or_default())
        } else {
            Err(ApiError::Rejected(
                self.message
                    .unwrap_or_else(|| DEFAULT_REJECTION.to_string()),
            ))
        }
    }
}

#[derive(Clone)]
pub struct HttpLeadApi {
    client: Client,
    base_url: String,
}

impl HttpLeadApi {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|err| ApiError::Transport(format!("failed to create HTTP client: {err}")))?;
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

    /// Error answers often arrive with 4xx/5xx but still carry the envelope.
    async fn read_envelope(response: Response) -> Result<ApiEnvelope> {
        let status = response.status();
        let body = response.text().await?;
        match serde_json::from_str::<ApiEnvelope>(&body) {
            Ok(envelope) if envelope.status.is_empty() && !status.is_success() => {
                Err(ApiError::Status {
                    status: status.as_u16(),
                })
            }
            Ok(envelope) => Ok(envelope),
            Err(err) if status.is_success() => Err(ApiError::Decode(err.to_string())),
            Err(_) => Err(ApiError::Status {
                status: status.as_u16(),
            }),
        }
    }

    fn ensure_success(response: &Response) -> Result<()> {
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ApiError::Status {
                status: status.as_u16(),
            })
        }
    }
}

#[async_trait]
impl LeadApi for HttpLeadApi {
    async fn get_lead(
        &self,
        lead_type: LeadType,
        id: &str,
        row_index: Option<u32>,
    ) -> Result<SearchResult> {
        debug!("get_lead: type={lead_type} id={id} row_index={row_index:?}");
        let mut request = self
            .client
            .get(self.url("/api/get-lead"))
            .query(&[("type", lead_type.as_str()), ("id", id)]);
        if let Some(row_index) = row_index {
            request = request.query(&[("row_index", row_index.to_string())]);
        }
        let envelope = Self::read_envelope(request.send().await?).await?;

        match envelope.status.as_str() {
            "success" => {
                let mut record = envelope
                    .data
                    .ok_or_else(|| ApiError::Decode("success answer without data".to_string()))?;
                if record.row_index.is_none() {
                    record.row_index = row_index;
                }
                Ok(SearchResult::Single(record))
            }
            "multiple" => {
                let candidates = envelope.candidates.unwrap_or_default();
                info!("get_lead_ambiguous: id={id} matches={}", candidates.len());
                Ok(SearchResult::Multiple(candidates))
            }
            _ => Ok(SearchResult::NotFound {
                message: envelope
                    .message
                    .unwrap_or_else(|| DEFAULT_NOT_FOUND.to_string()),
            }),
        }
    }

    async fn save_lead(&self, lead: &SaveLead) -> Result<String> {
        debug!(
            "save_lead: type={} is_edit={} id={}",
            lead.lead_type(),
            lead.is_edit,
            lead.business_id
        );
        let response = self
            .client
            .post(self.url("/api/save-lead"))
            .form(&lead.form_pairs())
            .send()
            .await?;
        Self::read_envelope(response).await?.into_ack()
    }

    async fn delete_lead(&self, lead_type: LeadType, id: &str) -> Result<String> {
        let response = self
            .client
            .post(self.url("/api/delete-lead"))
            .form(&[("type", lead_type.as_str()), ("id", id)])
            .send()
            .await?;
        Self::read_envelope(response).await?.into_ack()
    }

    async fn manager_login(&self, user_id: &str, password: &str) -> Result<String> {
        let response = self
            .client
            .post(self.url("/api/manager/login"))
            .form(&[("user_id", user_id), ("password", password)])
            .send()
            .await?;
        let envelope = Self::read_envelope(response).await?;
        if !envelope.is_success() {
            return Err(ApiError::Rejected(
                envelope
                    .message
                    .unwrap_or_else(|| "Invalid credentials".to_string()),
            ));
        }
        envelope
            .token
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| ApiError::Decode("login answer without token".to_string()))
    }

    async fn manager_data(&self, token: &str) -> Result<ManagerData> {
        // `_t` defeats caches on mobile browsers sharing the backend.
        let cache_buster = chrono::Utc::now().timestamp_millis().to_string();
        let response = self
            .client
            .get(self.url("/api/manager/data"))
            .query(&[("token", token), ("_t", cache_buster.as_str())])
            .send()
            .await?;
        Self::ensure_success(&response)?;
        let data: ManagerData = response.json().await?;
        debug!(
            "manager_data: billing={} insurance={}",
            data.billing.len(),
            data.insurance.len()
        );
        Ok(data)
    }

    async fn update_status(&self, change: &StatusChange) -> Result<String> {
        info!(
            "update_status: type={} id={} status={}",
            change.lead_type, change.id, change.status
        );
        let response = self
            .client
            .post(self.url("/api/manager/update_status"))
            .form(&[
                ("type", change.lead_type.as_str()),
                ("id", change.id.as_str()),
                ("status", change.status.as_str()),
            ])
            .send()
            .await?;
        Self::ensure_success(&response)?;
        Self::read_envelope(response).await?.into_ack()
    }

    async fn night_stats(&self) -> Result<NightStats> {
        let response = self
            .client
            .get(self.url("/api/public/night-stats"))
            .send()
            .await?;
        Self::ensure_success(&response)?;
        Ok(response.json().await?)
    }

    async fn chat_history(&self) -> Result<Vec<ChatMessage>> {
        let response = self.client.get(self.url("/api/chat/history")).send().await?;
        Self::ensure_success(&response)?;
        let value: Value = response.json().await?;
        let Value::Array(items) = value else {
            return Ok(Vec::new());
        };
        let total = items.len();
        let messages: Vec<ChatMessage> = items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect();
        if messages.len() != total {
            warn!(
                "chat_history_skipped: {} of {total} entries unreadable",
                total - messages.len()
            );
        }
        Ok(messages)
    }

    async fn send_chat(&self, message: &OutgoingChat) -> Result<()> {
        let mut form = vec![
            ("sender", message.sender.as_str()),
            ("message", message.message.as_str()),
            ("role", message.role.as_str()),
        ];
        if let Some(dept) = message.dept {
            form.push(("dept", dept.as_str()));
        }
        let response = self
            .client
            .post(self.url("/api/chat/send"))
            .form(&form)
            .send()
            .await?;
        Self::ensure_success(&response)
    }
}
