/* src/server/core/rust/src/cookies.rs */

use std::fmt;

use crate::auth::RequestAuth;

pub const OAUTH_TOKEN_COOKIE: &str = "oauth_token";
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";
pub const ANONYMOUS_COOKIE: &str = "anonymous";

/// Access token lifetime when the authorizer did not report one.
pub const DEFAULT_ACCESS_TOKEN_TTL_SECS: u64 = 60 * 60;
/// Refresh token and anonymous flag outlive the access token.
pub const REFRESH_TOKEN_TTL_SECS: u64 = 60 * 60 * 24 * 14;

/// A `Set-Cookie` directive with a relative expiration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetCookie {
  pub name: String,
  pub value: String,
  pub max_age_secs: u64,
  pub secure: bool,
}

impl fmt::Display for SetCookie {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}={}; Max-Age={}; Path=/; HttpOnly", self.name, self.value, self.max_age_secs)?;
    if self.secure {
      f.write_str("; Secure")?;
    }
    Ok(())
  }
}

/// Cookies that persist a freshly issued token set.
/// Empty unless the authorizer generated the tokens during this request.
pub fn auth_cookies(auth: &RequestAuth, secure: bool) -> Vec<SetCookie> {
  if !auth.set_cookies {
    return Vec::new();
  }
  let cookie = |name: &str, value: String, max_age_secs: u64| SetCookie {
    name: name.to_string(),
    value,
    max_age_secs,
    secure,
  };
  vec![
    cookie(
      OAUTH_TOKEN_COOKIE,
      auth.oauth_token.clone(),
      auth.expires_in.unwrap_or(DEFAULT_ACCESS_TOKEN_TTL_SECS),
    ),
    cookie(
      REFRESH_TOKEN_COOKIE,
      auth.refresh_token.clone().unwrap_or_default(),
      REFRESH_TOKEN_TTL_SECS,
    ),
    cookie(ANONYMOUS_COOKIE, auth.anonymous.to_string(), REFRESH_TOKEN_TTL_SECS),
  ]
}

/// Read a single cookie value out of a `Cookie` request header.
pub fn parse_cookie(header: &str, name: &str) -> Option<String> {
  header
    .split(';')
    .filter_map(|pair| pair.trim().split_once('='))
    .find(|(k, _)| k.trim() == name)
    .map(|(_, v)| v.trim().to_string())
}
