//! HTTP API.
//!
//! - **[`handlers`]**: Axum route handlers
//! - **[`models`]**: Query parameters and response bodies
//!
//! # API Structure
//!
//! - `GET /healthz`: liveness
//! - `GET /api/v1/sites/{site_id}/summary`: operations then spaces
//! - `GET /api/v1/sites/{site_id}/summary/{kind}`: every listed entity of one type
//! - `GET /api/v1/sites/{site_id}/summary/{kind}/{entity_id}`: one entity
//!
//! Every summary route accepts `period` (default `day`) and `date` (default `yesterday`).

pub mod handlers;
pub mod models;
