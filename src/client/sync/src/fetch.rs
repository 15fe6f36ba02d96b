/* src/client/sync/src/fetch.rs */

use futures_util::StreamExt;
use reqwest::header::COOKIE;
use trellis_server::cookies::OAUTH_TOKEN_COOKIE;
use trellis_server::{BoxStream, Query, QueryResponse, RequestAuth, TrellisError};

pub type FetchStream = BoxStream<Result<Vec<QueryResponse>, TrellisError>>;

/// Data source for the sync middleware. The returned stream must be lazy:
/// nothing is sent until it is first polled.
pub trait ApiFetcher: Send + Sync {
  fn fetch(&self, queries: Vec<Query>, auth: Option<RequestAuth>) -> FetchStream;
}

/// Fetches through the application's own `/api` proxy route.
pub struct HttpApiFetcher {
  client: reqwest::Client,
  api_url: String,
}

impl HttpApiFetcher {
  /// `api_url` is the full URL of the proxy route, e.g. `http://localhost:8000/api`.
  pub fn new(api_url: impl Into<String>) -> Self {
    Self { client: reqwest::Client::new(), api_url: api_url.into() }
  }
}

impl ApiFetcher for HttpApiFetcher {
  fn fetch(&self, queries: Vec<Query>, auth: Option<RequestAuth>) -> FetchStream {
    let client = self.client.clone();
    let url = self.api_url.clone();

    futures_util::stream::once(async move {
      let encoded = serde_json::to_string(&queries)?;
      let mut builder = client.get(&url).query(&[("queries", encoded)]);
      if let Some(auth) = auth {
        builder = builder.header(COOKIE, format!("{OAUTH_TOKEN_COOKIE}={}", auth.oauth_token));
      }
      let resp = builder.send().await?.error_for_status()?;
      let batch: Vec<QueryResponse> = resp.json().await?;
      Ok::<_, TrellisError>(batch)
    })
    .boxed()
  }
}
