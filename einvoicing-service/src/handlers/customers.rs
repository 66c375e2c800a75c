//! Customer (buyer) CRUD handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::dtos::{CreateCustomerRequest, UpdateCustomerRequest};
use crate::models::Customer;
use crate::startup::AppState;

pub async fn create_customer(
    State(state): State<AppState>,
    Json(payload): Json<CreateCustomerRequest>,
) -> Result<(StatusCode, Json<Customer>), AppError> {
    payload.validate()?;
    let customer = state.repository.create_customer(payload.into()).await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

pub async fn list_customers(
    State(state): State<AppState>,
) -> Result<Json<Vec<Customer>>, AppError> {
    Ok(Json(state.repository.list_customers().await?))
}

pub async fn get_customer(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
) -> Result<Json<Customer>, AppError> {
    let customer = state
        .repository
        .get_customer(customer_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Customer not found")))?;
    Ok(Json(customer))
}

pub async fn update_customer(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
    Json(payload): Json<UpdateCustomerRequest>,
) -> Result<Json<Customer>, AppError> {
    payload.validate()?;
    let customer = state
        .repository
        .update_customer(customer_id, payload.into())
        .await?;
    Ok(Json(customer))
}

pub async fn delete_customer(
    State(state): State<AppState>,
    Path(customer_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state.repository.delete_customer(customer_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
