/* src/client/sync/src/lib.rs */

pub mod actions;
pub mod fetch;
pub mod middleware;
pub mod routes;
pub mod store;

pub use actions::{
  Action, Location, api_complete, api_error, api_request, api_success, configure_auth,
  location_sync,
};
pub use fetch::{ApiFetcher, FetchStream, HttpApiFetcher};
pub use middleware::{Subscription, SyncMiddleware};
pub use routes::{ClientRoute, QueryFn, RouteMatch, active_route_queries};
pub use store::{ApiState, Middleware, RoutingState, Store, StoreState, reduce};
