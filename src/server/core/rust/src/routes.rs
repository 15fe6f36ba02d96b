/* src/server/core/rust/src/routes.rs */

use std::sync::Arc;

use futures_util::StreamExt;
use reqwest::Method;
use serde_json::Value;

use crate::auth::{Authorizer, CookieAuthorizer};
use crate::config::AppConfig;
use crate::cookies::{OAUTH_TOKEN_COOKIE, SetCookie, auth_cookies};
use crate::errors::TrellisError;
use crate::locale::negotiate_locale;
use crate::proxy::{ApiProxy, HttpApiProxy, ProxyRequest};
use crate::query::parse_queries;
use crate::render::{RenderMap, RenderRequest, select_render_fn};
use crate::request::RequestContext;

pub const API_PATH: &str = "/api";
/// Catch-all page route, in hapi path syntax.
pub const WILDCARD_PATH: &str = "/{wild*}";

/// External services the route handlers delegate to.
#[derive(Clone)]
pub struct Collaborators {
  pub api_proxy: Arc<dyn ApiProxy>,
  pub authorizer: Arc<dyn Authorizer>,
}

impl Collaborators {
  /// HTTP proxy and cookie authorizer built from configuration.
  pub fn from_config(config: &AppConfig) -> Self {
    Self {
      api_proxy: Arc::new(HttpApiProxy::new(config.api_root())),
      authorizer: Arc::new(CookieAuthorizer::new(config.anonymous_auth_url.clone())),
    }
  }
}

/// Route descriptor: which methods on which path run which handler.
pub struct RouteDef {
  pub methods: Vec<Method>,
  pub path: &'static str,
  pub handler: RouteHandler,
}

pub enum RouteHandler {
  ApiProxy(ApiProxyRoute),
  Render(RenderRoute),
}

impl RouteDef {
  pub fn is_catch_all(&self) -> bool {
    self.path.ends_with("*}")
  }
}

fn bad_implementation(err: &TrellisError) -> TrellisError {
  TrellisError::bad_implementation(err.message())
}

pub struct ApiProxyRoute {
  proxy: Arc<dyn ApiProxy>,
}

impl ApiProxyRoute {
  /// Forward the request and serialize the first emitted batch.
  pub async fn handle(&self, ctx: &RequestContext, body: &[u8]) -> Result<Value, TrellisError> {
    let queries = parse_queries(&ctx.method, ctx.raw_query.as_deref(), body)
      .map_err(|e| bad_implementation(&e))?;
    let request = ProxyRequest {
      method: ctx.method.clone(),
      queries,
      oauth_token: ctx.cookie(OAUTH_TOKEN_COOKIE),
    };

    let mut batches = self.proxy.proxy(request);
    match batches.next().await {
      Some(Ok(batch)) => serde_json::to_value(batch).map_err(|e| bad_implementation(&e.into())),
      Some(Err(e)) => {
        tracing::warn!(error = %e, "api proxy failed");
        Err(bad_implementation(&e))
      }
      None => Err(TrellisError::bad_implementation("API proxy completed without a result")),
    }
  }
}

/// A rendered page plus the cookies to persist alongside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOutcome {
  pub locale: String,
  pub body: String,
  pub status_code: u16,
  pub cookies: Vec<SetCookie>,
}

pub struct RenderRoute {
  render_map: Arc<RenderMap>,
  authorizer: Arc<dyn Authorizer>,
  locale_codes: Vec<String>,
  api_root_url: String,
  photo_scaler_salt: String,
  cookie_secure: bool,
}

impl RenderRoute {
  /// Negotiate locale, authorize, then render with the locale's render function.
  pub async fn handle(&self, ctx: &RequestContext) -> Result<RenderOutcome, TrellisError> {
    let locale =
      negotiate_locale(ctx.raw_query.as_deref(), ctx.accept_language.as_deref(), &self.locale_codes);
    let render = select_render_fn(&self.render_map, &locale).ok_or_else(|| {
      TrellisError::bad_implementation(format!("No render function for locale {locale}"))
    })?;

    let result = async {
      let auth = self.authorizer.authorize(ctx).await?;
      let cookies = auth_cookies(&auth, self.cookie_secure);
      let request = RenderRequest {
        url: ctx.url(),
        locale: locale.clone(),
        auth,
        api_root_url: self.api_root_url.clone(),
        photo_scaler_salt: self.photo_scaler_salt.clone(),
      };
      let rendered = render(request).await?;
      Ok::<_, TrellisError>((rendered, cookies))
    }
    .await;

    match result {
      Ok((rendered, cookies)) => Ok(RenderOutcome {
        locale,
        body: rendered.result,
        status_code: rendered.status_code,
        cookies,
      }),
      Err(e) => {
        tracing::warn!(path = %ctx.path, %locale, error = %e, "page render failed");
        Err(bad_implementation(&e))
      }
    }
  }
}

/// Build the ordered route table: the API proxy first, then the page catch-all.
pub fn get_routes(
  render_map: RenderMap,
  config: &AppConfig,
  collaborators: Collaborators,
) -> Vec<RouteDef> {
  let api = RouteDef {
    methods: vec![Method::GET, Method::POST, Method::DELETE, Method::PATCH],
    path: API_PATH,
    handler: RouteHandler::ApiProxy(ApiProxyRoute { proxy: collaborators.api_proxy }),
  };

  let pages = RouteDef {
    methods: vec![Method::GET],
    path: WILDCARD_PATH,
    handler: RouteHandler::Render(RenderRoute {
      render_map: Arc::new(render_map),
      authorizer: collaborators.authorizer,
      locale_codes: config.locale_codes.clone(),
      api_root_url: config.api_root().to_string(),
      photo_scaler_salt: config.photo_scaler_salt.clone(),
      cookie_secure: config.cookie_secure,
    }),
  };

  vec![api, pages]
}
