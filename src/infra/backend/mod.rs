//! Clients for the hosted backend: the REST statistics view and the
//! serverless functions that proxy database RPCs.

mod functions;
mod rest;

pub use functions::{FunctionsClient, ShortUrl, ShortUrlRequest};
pub use rest::RestStatsClient;

use std::time::Duration;

use chrono::Utc;

use crate::config::AppConfig;
use crate::error::Result;
use crate::fetch::BasicClient;
use crate::fetch::auth::ApiKey;
use crate::session::AppContext;

/// Transport carrying both the project key and the session bearer token.
pub type AuthedClient = ApiKey<ApiKey<BasicClient>>;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Builds an authenticated transport for the current session.
///
/// Fails with [`crate::error::Error::SessionExpired`] once the token is stale.
pub fn authed_client(config: &AppConfig, ctx: &AppContext) -> Result<AuthedClient> {
    let token = ctx.access_token(Utc::now())?;
    let basic = BasicClient::with_timeouts(REQUEST_TIMEOUT, CONNECT_TIMEOUT)?;
    ApiKey::new(ApiKey::bearer(basic, token)?, "apikey", &config.anon_key)
}
