//! Company (seller) CRUD handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::dtos::{CreateCompanyRequest, UpdateCompanyRequest};
use crate::models::Company;
use crate::startup::AppState;

pub async fn create_company(
    State(state): State<AppState>,
    Json(payload): Json<CreateCompanyRequest>,
) -> Result<(StatusCode, Json<Company>), AppError> {
    payload.validate()?;
    let company = state.repository.create_company(payload.into()).await?;
    Ok((StatusCode::CREATED, Json(company)))
}

pub async fn list_companies(
    State(state): State<AppState>,
) -> Result<Json<Vec<Company>>, AppError> {
    Ok(Json(state.repository.list_companies().await?))
}

pub async fn get_company(
    State(state): State<AppState>,
    Path(company_id): Path<Uuid>,
) -> Result<Json<Company>, AppError> {
    let company = state
        .repository
        .get_company(company_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Company not found")))?;
    Ok(Json(company))
}

pub async fn update_company(
    State(state): State<AppState>,
    Path(company_id): Path<Uuid>,
    Json(payload): Json<UpdateCompanyRequest>,
) -> Result<Json<Company>, AppError> {
    payload.validate()?;
    let company = state
        .repository
        .update_company(company_id, payload.into())
        .await?;
    Ok(Json(company))
}

pub async fn delete_company(
    State(state): State<AppState>,
    Path(company_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.repository.delete_company(company_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
