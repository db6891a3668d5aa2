//! Rule handlers, generic over the rule kind's form.
//!
//! Each handler is instantiated once per kind in [`super::routes`]; the kind
//! itself comes from [`RuleForm::KIND`].

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Serialize;
use tracing::instrument;

use petshop_core::RuleId;

use super::payload::{ApiJson, RulePayload};
use crate::error::AppError;
use crate::models::{ListQuery, OverrideForm, RuleForm, RuleSummary, RuleView};
use crate::state::AppState;

/// Body of successful create, update and delete responses.
#[derive(Debug, Serialize)]
pub struct IdResponse {
    pub id: RuleId,
}

/// Body of a successful override change.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideResponse {
    pub id: RuleId,
    pub active_override: Option<bool>,
    pub version: i32,
}

/// `GET /{kind}`
#[instrument(skip(state), fields(kind = %F::KIND))]
pub async fn index<F: RuleForm>(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<RuleSummary>>, AppError> {
    let filter = query.validate()?;
    let rules = state.rules().list(F::KIND, filter).await?;
    Ok(Json(rules))
}

/// `POST /{kind}`
#[instrument(skip(state, payload), fields(kind = %F::KIND))]
pub async fn create<F: RuleForm>(
    State(state): State<AppState>,
    payload: RulePayload<F>,
) -> Result<(StatusCode, Json<IdResponse>), AppError> {
    let RulePayload { form, image } = payload;
    let input = form.validate()?;

    let id = state.rules().create(input, image).await?;

    Ok((StatusCode::CREATED, Json(IdResponse { id })))
}

/// `GET /{kind}/{id}`
#[instrument(skip(state), fields(kind = %F::KIND))]
pub async fn show<F: RuleForm>(
    State(state): State<AppState>,
    Path(id): Path<RuleId>,
) -> Result<Json<RuleView>, AppError> {
    let view = state.rules().get(F::KIND, id).await?;
    Ok(Json(view))
}

/// `PUT /{kind}/{id}`
#[instrument(skip(state, payload), fields(kind = %F::KIND))]
pub async fn update<F: RuleForm>(
    State(state): State<AppState>,
    Path(id): Path<RuleId>,
    payload: RulePayload<F>,
) -> Result<Json<IdResponse>, AppError> {
    let RulePayload { form, image } = payload;
    let input = form.validate()?;

    state.rules().update(id, input, image).await?;

    Ok(Json(IdResponse { id }))
}

/// `PUT /{kind}/{id}/override`
#[instrument(skip(state, form), fields(kind = %F::KIND))]
pub async fn set_override<F: RuleForm>(
    State(state): State<AppState>,
    Path(id): Path<RuleId>,
    ApiJson(form): ApiJson<OverrideForm>,
) -> Result<Json<OverrideResponse>, AppError> {
    let active_override = form.validate()?;

    let version = state
        .rules()
        .set_override(F::KIND, id, active_override, form.expected_version)
        .await?;

    Ok(Json(OverrideResponse {
        id,
        active_override,
        version,
    }))
}

/// `DELETE /{kind}/{id}`
#[instrument(skip(state), fields(kind = %F::KIND))]
pub async fn destroy<F: RuleForm>(
    State(state): State<AppState>,
    Path(id): Path<RuleId>,
) -> Result<Json<IdResponse>, AppError> {
    state.rules().delete(F::KIND, id).await?;
    Ok(Json(IdResponse { id }))
}
