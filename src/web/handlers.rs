//! Request handlers. Each one delegates to [`StatusService`].

use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::Uri,
    Json,
};
use serde::Deserialize;

use crate::models::{ItemFilter, ItemSummary};
use crate::web::error::ApiError;
use crate::web::status::{HealthView, StatusService, StatusView};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TitlesQuery {
    pub search_title: Option<String>,
    pub search_category: Option<String>,
}

/// GET /healthcheck
pub async fn healthcheck(State(service): State<Arc<StatusService>>) -> Json<HealthView> {
    Json(service.health())
}

/// GET /status
pub async fn status(
    State(service): State<Arc<StatusService>>,
) -> Result<Json<StatusView>, ApiError> {
    Ok(Json(service.status().await?))
}

/// GET /titles?searchTitle=..&searchCategory=..
pub async fn titles(
    State(service): State<Arc<StatusService>>,
    query: Result<Query<TitlesQuery>, QueryRejection>,
) -> Result<Json<Vec<ItemSummary>>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let filter = ItemFilter::new(query.search_title, query.search_category);

    Ok(Json(service.titles(&filter).await?))
}

pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::not_found(format!("No route for {}", uri.path()))
}
