/* src/client/sync/src/store.rs */

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast;
use trellis_server::RequestAuth;

use crate::actions::{Action, Location};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RoutingState {
  pub location: Option<Location>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ApiState {
  /// Latest value per query ref
  pub data: BTreeMap<String, Value>,
  /// Latest per-query failure, cleared when the ref next succeeds
  pub errors: BTreeMap<String, String>,
  pub last_error: Option<String>,
  pub in_flight: bool,
  /// Bumped by every `API_REQUEST`; results of older requests are stale
  pub generation: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StoreState {
  pub routing: RoutingState,
  pub auth: Option<RequestAuth>,
  pub api: ApiState,
}

/// Pure state transition for one action.
pub fn reduce(state: &mut StoreState, action: &Action) {
  match action {
    Action::LocationChange(loc) | Action::ServerRender(loc) | Action::LocationSync(loc) => {
      state.routing.location = Some(loc.clone());
    }
    Action::ConfigureAuth { auth, .. } => state.auth = Some(auth.clone()),
    Action::ApiRequest { .. } => {
      state.api.generation += 1;
      state.api.in_flight = true;
      state.api.last_error = None;
    }
    Action::ApiSuccess { responses } => {
      for resp in responses {
        match (&resp.value, &resp.error) {
          (_, Some(err)) => {
            state.api.errors.insert(resp.reference.clone(), err.clone());
          }
          (Some(value), None) => {
            state.api.errors.remove(&resp.reference);
            state.api.data.insert(resp.reference.clone(), value.clone());
          }
          (None, None) => {}
        }
      }
    }
    Action::ApiError { message } => state.api.last_error = Some(message.clone()),
    Action::ApiComplete => state.api.in_flight = false,
  }
}

/// Reacts to actions after the reducer has applied them.
/// `generation` is `api.generation` as it stood right after this action was reduced.
pub trait Middleware: Send + Sync {
  fn after_dispatch(&self, store: &Arc<Store>, action: &Action, generation: u64);
}

/// Single-state store: reduce, notify watchers, then run middlewares.
/// Middlewares may spawn tasks, so dispatch must run inside a Tokio runtime.
pub struct Store {
  state: Mutex<StoreState>,
  middlewares: Vec<Arc<dyn Middleware>>,
  watchers: broadcast::Sender<Action>,
}

impl Store {
  pub fn new(initial: StoreState, middlewares: Vec<Arc<dyn Middleware>>) -> Arc<Self> {
    let (watchers, _) = broadcast::channel(256);
    Arc::new(Self { state: Mutex::new(initial), middlewares, watchers })
  }

  pub fn dispatch(self: &Arc<Self>, action: Action) {
    self.dispatch_if(action, |_| true);
  }

  /// Dispatch only if `guard` holds for the current state. The guard and the
  /// reducer run under the same lock, so no other action lands in between.
  /// Returns whether the action was dispatched.
  pub fn dispatch_if(
    self: &Arc<Self>,
    action: Action,
    guard: impl FnOnce(&StoreState) -> bool,
  ) -> bool {
    let generation = {
      let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
      if !guard(&state) {
        tracing::trace!(action = action.kind(), "dropped by guard");
        return false;
      }
      reduce(&mut state, &action);
      state.api.generation
    };
    tracing::trace!(action = action.kind(), generation, "dispatched");
    // No receivers is fine
    let _ = self.watchers.send(action.clone());
    for middleware in &self.middlewares {
      middleware.after_dispatch(self, &action, generation);
    }
    true
  }

  pub fn state(&self) -> StoreState {
    self.state.lock().unwrap_or_else(PoisonError::into_inner).clone()
  }

  /// Stream of every action dispatched from now on.
  pub fn watch(&self) -> broadcast::Receiver<Action> {
    self.watchers.subscribe()
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;
  use trellis_server::{Query, QueryResponse};

  use super::*;
  use crate::actions::{api_complete, api_error, api_request, api_success, configure_auth};

  #[test]
  fn location_actions_update_routing() {
    let mut state = StoreState::default();
    reduce(&mut state, &Action::ServerRender(Location::new("/a")));
    assert_eq!(state.routing.location, Some(Location::new("/a")));
    reduce(&mut state, &Action::LocationChange(Location::new("/b")));
    assert_eq!(state.routing.location, Some(Location::new("/b")));
  }

  #[test]
  fn api_lifecycle() {
    let mut state = StoreState::default();
    reduce(&mut state, &api_request(vec![Query::new("a", "x")]));
    assert!(state.api.in_flight);

    reduce(
      &mut state,
      &api_success(vec![QueryResponse::value("a", json!(1)), QueryResponse::error("b", "nope")]),
    );
    assert_eq!(state.api.data["a"], json!(1));
    assert_eq!(state.api.errors["b"], "nope");

    reduce(&mut state, &api_success(vec![QueryResponse::value("b", json!(2))]));
    assert!(state.api.errors.is_empty());

    reduce(&mut state, &api_error("timeout"));
    assert_eq!(state.api.last_error.as_deref(), Some("timeout"));
    reduce(&mut state, &api_complete());
    assert!(!state.api.in_flight);
  }

  #[test]
  fn every_api_request_bumps_generation() {
    let mut state = StoreState::default();
    reduce(&mut state, &api_request(vec![Query::new("a", "x")]));
    reduce(&mut state, &api_complete());
    reduce(&mut state, &api_request(vec![Query::new("a", "x")]));
    assert_eq!(state.api.generation, 2);
  }

  #[tokio::test]
  async fn guarded_dispatch_skips_reducer_and_watchers() {
    let store = Store::new(StoreState::default(), Vec::new());
    let mut watch = store.watch();
    store.dispatch(api_request(vec![Query::new("a", "x")]));
    store.dispatch(api_request(vec![Query::new("a", "y")]));

    let first_generation = 1;
    let landed = store.dispatch_if(
      api_success(vec![QueryResponse::value("a", json!("stale"))]),
      move |s| s.api.generation == first_generation,
    );
    assert!(!landed);
    assert!(store.state().api.data.is_empty());

    assert!(store.dispatch_if(api_complete(), |s| s.api.generation == 2));
    let kinds: Vec<_> = std::iter::from_fn(|| watch.try_recv().ok()).map(|a| a.kind()).collect();
    assert_eq!(kinds, vec!["API_REQUEST", "API_REQUEST", "API_COMPLETE"]);
  }

  #[test]
  fn newer_value_replaces_older_for_same_ref() {
    let mut state = StoreState::default();
    reduce(&mut state, &api_success(vec![QueryResponse::value("a", json!("old"))]));
    reduce(&mut state, &api_success(vec![QueryResponse::value("a", json!("new"))]));
    assert_eq!(state.api.data["a"], json!("new"));
  }

  struct Counter(Mutex<Vec<&'static str>>);

  impl Middleware for Counter {
    fn after_dispatch(&self, store: &Arc<Store>, action: &Action, _generation: u64) {
      // Reducer has already run when middlewares see the action
      assert!(store.state().auth.is_some() || !matches!(action, Action::ConfigureAuth { .. }));
      self.0.lock().unwrap().push(action.kind());
    }
  }

  #[tokio::test]
  async fn dispatch_runs_reducer_watchers_then_middleware() {
    let counter = Arc::new(Counter(Mutex::new(Vec::new())));
    let store = Store::new(StoreState::default(), vec![counter.clone() as Arc<dyn Middleware>]);
    let mut watch = store.watch();

    store.dispatch(configure_auth(RequestAuth::default()));
    assert_eq!(watch.recv().await.unwrap().kind(), "CONFIGURE_AUTH");
    assert_eq!(*counter.0.lock().unwrap(), vec!["CONFIGURE_AUTH"]);
  }
}
