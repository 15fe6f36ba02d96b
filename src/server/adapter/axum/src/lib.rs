/* src/server/adapter/axum/src/lib.rs */

mod error;
mod handler;

use trellis_server::RouteDef;

/// Re-export trellis-server core for convenience
pub use trellis_server;

/// Extension trait that converts a route table into an Axum router.
pub trait IntoAxumRouter {
  fn into_axum_router(self) -> axum::Router;
  fn serve(
    self,
    addr: &str,
  ) -> impl std::future::Future<Output = Result<(), Box<dyn std::error::Error>>> + Send;
}

impl IntoAxumRouter for Vec<RouteDef> {
  fn into_axum_router(self) -> axum::Router {
    handler::build_router(self)
  }

  async fn serve(self, addr: &str) -> Result<(), Box<dyn std::error::Error>> {
    serve_router(self.into_axum_router(), addr).await
  }
}

/// Bind `addr` and serve a router that may carry extra layers or services.
pub async fn serve_router(
  router: axum::Router,
  addr: &str,
) -> Result<(), Box<dyn std::error::Error>> {
  let listener = tokio::net::TcpListener::bind(addr).await?;
  let local_addr = listener.local_addr()?;
  tracing::info!("Trellis server running on http://localhost:{}", local_addr.port());
  axum::serve(listener, router).await?;
  Ok(())
}

#[cfg(test)]
mod tests;
