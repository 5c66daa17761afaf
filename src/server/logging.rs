use axum::body::Body;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use std::time::Instant;

/// Logs the start and completion of every request.
pub async fn log_requests(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let started_at = Instant::now();

    tracing::info!("→ {} {} started", method, uri);
    let response = next.run(request).await;
    tracing::info!(
        "← {} {} completed [{}] in {}ms",
        method,
        uri,
        response.status().as_u16(),
        started_at.elapsed().as_millis()
    );

    response
}
