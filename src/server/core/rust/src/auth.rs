/* src/server/core/rust/src/auth.rs */

use serde::{Deserialize, Serialize};

use crate::cookies::{ANONYMOUS_COOKIE, OAUTH_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE};
use crate::errors::TrellisError;
use crate::request::{BoxFuture, RequestContext};

/// Credentials attached to a request after authorization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestAuth {
  pub oauth_token: String,
  #[serde(default)]
  pub refresh_token: Option<String>,
  /// Access token lifetime in seconds, when known.
  #[serde(default)]
  pub expires_in: Option<u64>,
  #[serde(default)]
  pub anonymous: bool,
  /// True when the tokens were issued during this request and must be persisted.
  #[serde(default, skip_serializing)]
  pub set_cookies: bool,
}

/// Authorization step run before every page render.
pub trait Authorizer: Send + Sync {
  fn authorize(&self, ctx: &RequestContext) -> BoxFuture<Result<RequestAuth, TrellisError>>;
}

#[derive(Deserialize)]
struct AnonymousGrant {
  access_token: String,
  #[serde(default)]
  refresh_token: Option<String>,
  #[serde(default)]
  expires_in: Option<u64>,
}

/// Reuses the token cookies when the browser sent them, otherwise requests an
/// anonymous token from `anonymous_auth_url`.
pub struct CookieAuthorizer {
  client: reqwest::Client,
  anonymous_auth_url: Option<String>,
}

impl CookieAuthorizer {
  pub fn new(anonymous_auth_url: Option<String>) -> Self {
    Self { client: reqwest::Client::new(), anonymous_auth_url }
  }

  fn from_cookies(ctx: &RequestContext) -> Option<RequestAuth> {
    let oauth_token = ctx.cookie(OAUTH_TOKEN_COOKIE).filter(|t| !t.is_empty())?;
    Some(RequestAuth {
      oauth_token,
      refresh_token: ctx.cookie(REFRESH_TOKEN_COOKIE),
      expires_in: None,
      anonymous: ctx.cookie(ANONYMOUS_COOKIE).is_some_and(|v| v == "true"),
      set_cookies: false,
    })
  }
}

impl Authorizer for CookieAuthorizer {
  fn authorize(&self, ctx: &RequestContext) -> BoxFuture<Result<RequestAuth, TrellisError>> {
    if let Some(auth) = Self::from_cookies(ctx) {
      return Box::pin(async move { Ok(auth) });
    }

    let client = self.client.clone();
    let url = self.anonymous_auth_url.clone();
    Box::pin(async move {
      let url = url.ok_or_else(|| TrellisError::unauthorized("No oauth_token cookie"))?;
      tracing::debug!(%url, "requesting anonymous token");
      let resp = client.post(&url).send().await?.error_for_status()?;
      let grant: AnonymousGrant = resp.json().await?;
      Ok(RequestAuth {
        oauth_token: grant.access_token,
        refresh_token: grant.refresh_token,
        expires_in: grant.expires_in,
        anonymous: true,
        set_cookies: true,
      })
    })
  }
}
