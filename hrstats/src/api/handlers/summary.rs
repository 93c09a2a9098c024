//! HTTP handlers for summary endpoints.

use axum::{
    Json,
    extract::{Path, Query, State},
};

use crate::AppState;
use crate::api::models::summary::{SummaryQuery, SummaryResponse};
use crate::errors::Result;
use crate::types::{EntityId, EntityKind};

// GET /api/v1/sites/{site_id}/summary - operations then spaces
#[tracing::instrument(skip_all, fields(site_id = %site_id))]
pub async fn get_overview(
    State(state): State<AppState>,
    Path(site_id): Path<String>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<SummaryResponse>> {
    let scope = query.scope(&site_id)?;
    let rows = state.aggregator.summarize_overview(&scope).await;
    Ok(Json(SummaryResponse::new(scope, rows)))
}

// GET /api/v1/sites/{site_id}/summary/{kind} - every listed entity of one type
#[tracing::instrument(skip_all, fields(site_id = %site_id, kind = %kind))]
pub async fn get_category_summary(
    State(state): State<AppState>,
    Path((site_id, kind)): Path<(String, String)>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<SummaryResponse>> {
    let scope = query.scope(&site_id)?;
    let kind: EntityKind = kind.parse()?;
    let rows = state.aggregator.summarize_all(&scope, kind).await;
    Ok(Json(SummaryResponse::new(scope, rows)))
}

// GET /api/v1/sites/{site_id}/summary/{kind}/{entity_id} - one entity, plus its in-country row
#[tracing::instrument(skip_all, fields(site_id = %site_id, kind = %kind, entity_id = %entity_id))]
pub async fn get_entity_summary(
    State(state): State<AppState>,
    Path((site_id, kind, entity_id)): Path<(String, String, String)>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<SummaryResponse>> {
    let scope = query.scope(&site_id)?;
    let kind: EntityKind = kind.parse()?;
    let id = EntityId::parse(&entity_id)?;
    let rows = state.aggregator.summarize_entity(&scope, kind, &id).await;
    Ok(Json(SummaryResponse::new(scope, rows)))
}
