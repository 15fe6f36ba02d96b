/* src/client/sync/src/middleware.rs */

use std::sync::{Arc, Mutex, PoisonError};

use futures_util::StreamExt;
use futures_util::stream::{AbortHandle, Abortable};
use trellis_server::Query;

use crate::actions::{
  Action, Location, api_complete, api_error, api_request, api_success, location_sync,
};
use crate::fetch::{ApiFetcher, FetchStream};
use crate::routes::{ClientRoute, active_route_queries};
use crate::store::{Middleware, Store, StoreState};

/// Handle to an in-flight fetch. Unsubscribing stops delivery of its results;
/// the upstream request itself is not aborted.
#[derive(Debug, Clone)]
pub struct Subscription {
  handle: AbortHandle,
  generation: u64,
}

impl Subscription {
  /// Generation of the `API_REQUEST` that started this fetch.
  pub fn generation(&self) -> u64 {
    self.generation
  }

  pub fn unsubscribe(&self) {
    self.handle.abort();
  }

  pub fn is_unsubscribed(&self) -> bool {
    self.handle.is_aborted()
  }
}

/// Keeps API data in step with the current location.
///
/// - location actions: once pending transitions settle, request the queries of
///   the matched route chain (nothing is dispatched when there are none, or
///   when a newer location has replaced it meanwhile)
/// - `CONFIGURE_AUTH` without `meta`: re-sync the current location next tick
/// - `API_REQUEST`: replace the current fetch; at most one is ever live
pub struct SyncMiddleware {
  routes: Arc<Vec<ClientRoute>>,
  fetcher: Arc<dyn ApiFetcher>,
  current: Mutex<Option<Subscription>>,
}

impl SyncMiddleware {
  pub fn new(routes: Vec<ClientRoute>, fetcher: Arc<dyn ApiFetcher>) -> Self {
    Self { routes: Arc::new(routes), fetcher, current: Mutex::new(None) }
  }

  /// The live fetch, if any.
  pub fn current_subscription(&self) -> Option<Subscription> {
    self.current.lock().unwrap_or_else(PoisonError::into_inner).clone()
  }

  fn on_location(&self, store: &Arc<Store>, location: Location) {
    let routes = self.routes.clone();
    let store = store.clone();
    tokio::spawn(async move {
      // Let the router finish applying the transition first
      tokio::task::yield_now().await;
      let queries = active_route_queries(&routes, &location);
      if queries.is_empty() {
        tracing::trace!(path = %location.pathname, "no queries for location");
        return;
      }
      // A newer navigation owns the data now
      let target = location.clone();
      let still_current = move |s: &StoreState| s.routing.location.as_ref() == Some(&target);
      if !store.dispatch_if(api_request(queries), still_current) {
        tracing::debug!(path = %location.pathname, "location superseded before its request");
      }
    });
  }

  fn on_configure_auth(store: &Arc<Store>) {
    let store = store.clone();
    tokio::spawn(async move {
      tokio::task::yield_now().await;
      if let Some(location) = store.state().routing.location {
        store.dispatch(location_sync(location));
      }
    });
  }

  fn on_api_request(&self, store: &Arc<Store>, queries: Vec<Query>, generation: u64) {
    let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
    // A newer request reached us first; it already owns the subscription
    if current.as_ref().is_some_and(|sub| sub.generation > generation) {
      tracing::debug!(generation, "skipped out-of-order api request");
      return;
    }
    if let Some(previous) = current.take() {
      previous.unsubscribe();
      tracing::debug!("superseded in-flight fetch");
    }

    let auth = store.state().auth;
    let (handle, registration) = AbortHandle::new_pair();
    let stream = Abortable::new(self.fetcher.fetch(queries, auth), registration);
    *current = Some(Subscription { handle, generation });
    drop(current);

    tokio::spawn(deliver(stream, store.clone(), generation));
  }
}

/// Drive one fetch, dispatching its results until it ends or is superseded.
/// Each result is reduced only while `generation` is still the latest request,
/// checked under the store lock.
async fn deliver(mut stream: Abortable<FetchStream>, store: Arc<Store>, generation: u64) {
  let is_latest = move |s: &StoreState| s.api.generation == generation;
  while let Some(item) = stream.next().await {
    if stream.is_aborted() {
      return;
    }
    let action = match item {
      Ok(batch) => api_success(batch),
      Err(e) => {
        tracing::warn!(error = %e, "api fetch failed");
        api_error(e.message())
      }
    };
    if !store.dispatch_if(action, is_latest) {
      tracing::debug!(generation, "dropped result of superseded fetch");
      return;
    }
  }
  if !stream.is_aborted() {
    store.dispatch_if(api_complete(), is_latest);
  }
}

impl Middleware for SyncMiddleware {
  fn after_dispatch(&self, store: &Arc<Store>, action: &Action, generation: u64) {
    match action {
      Action::LocationChange(loc) | Action::ServerRender(loc) | Action::LocationSync(loc) => {
        self.on_location(store, loc.clone());
      }
      Action::ConfigureAuth { meta: None, .. } => Self::on_configure_auth(store),
      Action::ApiRequest { queries, .. } => {
        self.on_api_request(store, queries.clone(), generation);
      }
      _ => {}
    }
  }
}
