/* src/server/core/rust/src/lib.rs */

pub mod auth;
pub mod config;
pub mod cookies;
pub mod errors;
pub mod locale;
pub mod proxy;
pub mod query;
pub mod render;
pub mod request;
pub mod routes;

// Re-exports for ergonomic use
pub use auth::{Authorizer, CookieAuthorizer, RequestAuth};
pub use config::AppConfig;
pub use cookies::SetCookie;
pub use errors::TrellisError;
pub use locale::{DEFAULT_LOCALE, negotiate_locale};
pub use proxy::{ApiProxy, HttpApiProxy, ProxyRequest};
pub use query::{Query, QueryResponse, parse_queries};
pub use render::{RenderFn, RenderMap, RenderRequest, RenderResult};
pub use request::{BoxFuture, BoxStream, RequestContext};
pub use routes::{
  API_PATH, ApiProxyRoute, Collaborators, RenderOutcome, RenderRoute, RouteDef, RouteHandler,
  WILDCARD_PATH, get_routes,
};
