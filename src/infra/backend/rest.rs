use async_trait::async_trait;
use reqwest::Url;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::fetch::{HttpClient, fetch_json};
use crate::services::stats_api::StatsSource;

/// Reads the statistics view through the backend's REST interface:
/// `GET {base}/rest/v1/{view}?select=*&instructor_id=eq.{id}`.
pub struct RestStatsClient<C> {
    http: C,
    base_url: String,
    view: String,
}

impl<C: HttpClient> RestStatsClient<C> {
    pub fn new(http: C, base_url: impl Into<String>, view: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            view: view.into(),
        }
    }

    pub fn rows_url(&self, instructor_id: &str) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/rest/v1/{}", self.base_url, self.view))
            .map_err(|e| Error::Config(format!("invalid backend url '{}': {e}", self.base_url)))?;
        url.query_pairs_mut()
            .append_pair("select", "*")
            .append_pair("instructor_id", &format!("eq.{instructor_id}"))
            .append_pair("order", "education_year.asc,education_round.asc");
        Ok(url)
    }
}

#[async_trait]
impl<C: HttpClient> StatsSource for RestStatsClient<C> {
    #[tracing::instrument(skip(self), fields(view = %self.view))]
    async fn fetch_rows(&self, instructor_id: &str) -> Result<Vec<Value>> {
        let url = self.rows_url(instructor_id)?;
        debug!(url = %url, "Fetching statistics rows");

        match fetch_json(&self.http, url).await? {
            Value::Array(rows) => {
                info!(rows = rows.len(), "Statistics rows fetched");
                Ok(rows)
            }
            other => Err(Error::UnexpectedResponse(format!(
                "expected an array of rows, got {}",
                json_kind(&other)
            ))),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
