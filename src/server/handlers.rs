use axum::extract::{RawQuery, State};
use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use super::error::ApiError;
use super::params::FeedParams;
use super::AppState;
use crate::feed::write_atom;
use crate::filter::EntryFilter;
use crate::pipeline::{fetch_filtered, PipelineError};
use crate::rss::{convert_feed, write_rss};

const ATOM_CONTENT_TYPE: &str = "application/atom+xml; charset=utf-8";
const RSS_CONTENT_TYPE: &str = "application/rss+xml; charset=utf-8";

pub async fn root() -> &'static str {
    "Root"
}

pub async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "Not Found" })),
    )
        .into_response()
}

/// `GET /rss`: the filtered source feed, re-serialized as Atom.
pub async fn rss(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Response, ApiError> {
    let params = FeedParams::from_query(query.as_deref()).ok_or(ApiError::BadParams)?;
    let filter = EntryFilter::new(params.filter_spec(), state.probes.clone());

    let filtered = fetch_filtered(&state.fetcher, &filter, &params.url).await?;
    let body = write_atom(&filtered.feed).map_err(|e| PipelineError::Unknown(e.into()))?;

    tracing::info!(
        url = %params.url,
        kept = filtered.feed.entries.len(),
        total = filtered.source_entries,
        "Served filtered feed"
    );
    Ok(feed_response(ATOM_CONTENT_TYPE, &filtered.headers, body))
}

/// `GET /podcast`: the filtered feed merged with the catalog, as podcast RSS.
pub async fn podcast(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Response, ApiError> {
    let params = FeedParams::from_query(query.as_deref()).ok_or(ApiError::BadParams)?;
    let filter = EntryFilter::new(params.filter_spec(), state.probes.clone());

    let filtered = fetch_filtered(&state.fetcher, &filter, &params.url).await?;

    let mut channel = convert_feed(&filtered.feed);
    if let Some(title) = params.title {
        channel.title = title;
    }
    if let Some(description) = params.description {
        channel.description = description;
    }

    let merged = state
        .podcasts
        .merge(&params.url, &channel)
        .await
        .map_err(|e| PipelineError::Unknown(e.into()))?;
    let body = write_rss(&merged).map_err(|e| PipelineError::Unknown(e.into()))?;

    tracing::info!(
        url = %params.url,
        entries = merged.items.len(),
        from_source = channel.items.len(),
        total = filtered.source_entries,
        "Served podcast feed"
    );
    Ok(feed_response(RSS_CONTENT_TYPE, &filtered.headers, body))
}

fn feed_response(content_type: &'static str, passthrough: &[(String, String)], body: String) -> Response {
    let mut response = (StatusCode::OK, body).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));

    for (name, value) in passthrough {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => tracing::debug!(header = %name, "Skipping unrepresentable upstream header"),
        }
    }
    response
}
