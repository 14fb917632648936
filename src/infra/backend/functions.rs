use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::info;

use crate::error::{Error, Result};
use crate::fetch::{HttpClient, post_json};

/// Body for the `create-short-url` function.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortUrlRequest {
    pub survey_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in_days: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortUrl {
    pub short_code: String,
    pub short_url: Option<String>,
    pub expires_at: Option<String>,
}

/// Calls the serverless functions that wrap privileged database RPCs.
///
/// Each function answers `{success, ...}` or `{error}`; non-success statuses
/// surface as the matching [`Error`] variant.
pub struct FunctionsClient<C> {
    http: C,
    base_url: String,
}

impl<C: HttpClient> FunctionsClient<C> {
    pub fn new(http: C, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, function: &str) -> Result<Url> {
        Url::parse(&format!("{}/{function}", self.base_url))
            .map_err(|e| Error::Config(format!("invalid functions url '{}': {e}", self.base_url)))
    }

    async fn invoke(&self, function: &str, body: &Value) -> Result<Value> {
        let response = post_json(&self.http, self.url(function)?, body).await?;
        if let Some(message) = response.get("error").and_then(Value::as_str) {
            return Err(Error::UnexpectedResponse(message.to_string()));
        }
        if response.get("success").and_then(Value::as_bool) == Some(false) {
            return Err(Error::UnexpectedResponse(format!(
                "{function} reported failure"
            )));
        }
        Ok(response)
    }

    #[tracing::instrument(skip(self), fields(survey_id = %request.survey_id))]
    pub async fn create_short_url(&self, request: &ShortUrlRequest) -> Result<ShortUrl> {
        if request.survey_id.trim().is_empty() {
            return Err(Error::Validation("surveyId is required".into()));
        }
        if request.expires_in_days == Some(0) {
            return Err(Error::Validation("expiresInDays must be positive".into()));
        }

        let response = self
            .invoke("create-short-url", &serde_json::to_value(request)?)
            .await?;
        let short_url: ShortUrl = serde_json::from_value(response)?;
        info!(short_code = %short_url.short_code, "Short URL created");
        Ok(short_url)
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_user(&self, user_id: &str) -> Result<()> {
        if user_id.trim().is_empty() {
            return Err(Error::Validation("userId is required".into()));
        }
        self.invoke("delete-user", &json!({ "userId": user_id }))
            .await?;
        info!("User deleted");
        Ok(())
    }

    /// Asks the backend to refresh the materialized statistics views.
    #[tracing::instrument(skip(self))]
    pub async fn refresh_stats_cache(&self) -> Result<()> {
        self.invoke("refresh-stats-cache", &json!({})).await?;
        info!("Statistics cache refreshed");
        Ok(())
    }
}
