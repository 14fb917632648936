mod basic;
mod client;
pub mod auth;

pub use basic::BasicClient;
pub use client::HttpClient;

use reqwest::{Method, Request, Response, Url};
use serde_json::Value;

use crate::error::{Error, Result};

/// Sends `req` and turns a non-success status into the matching [`Error`],
/// using the body's `error` / `message` field when there is one.
pub async fn execute_checked<C: HttpClient + ?Sized>(client: &C, req: Request) -> Result<Response> {
    let resp = client.execute(req).await?;
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    Err(Error::from_status(status.as_u16(), error_message(&body)))
}

pub async fn fetch_json<C: HttpClient + ?Sized>(client: &C, url: Url) -> Result<Value> {
    let req = Request::new(Method::GET, url);
    let resp = execute_checked(client, req).await?;
    Ok(serde_json::from_slice(&resp.bytes().await?)?)
}

pub async fn post_json<C: HttpClient + ?Sized>(client: &C, url: Url, body: &Value) -> Result<Value> {
    let mut req = Request::new(Method::POST, url);
    req.headers_mut().insert(
        reqwest::header::CONTENT_TYPE,
        reqwest::header::HeaderValue::from_static("application/json"),
    );
    *req.body_mut() = Some(serde_json::to_vec(body)?.into());

    let resp = execute_checked(client, req).await?;
    let bytes = resp.bytes().await?;
    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    Ok(serde_json::from_slice(&bytes)?)
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .or_else(|| v.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_prefers_error_field() {
        assert_eq!(error_message(r#"{"error":"surveyId is required"}"#), "surveyId is required");
        assert_eq!(error_message(r#"{"message":"JWT expired"}"#), "JWT expired");
        assert_eq!(error_message("  upstream down "), "upstream down");
    }
}
