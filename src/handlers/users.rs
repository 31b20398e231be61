//! Customer registration.

use axum::{extract::State, http::StatusCode};

use crate::{
    error::AppError,
    extract::Json,
    models::actor::{CustomerResponse, JoinCustomerRequest},
    services::account_service,
    state::AppState,
};

/// Register a customer.
///
/// # Endpoint
///
/// `POST /api/users/join`
///
/// # Response
///
/// - **201 Created**: the customer, without credentials
/// - **400**: invalid field or unknown city
/// - **409**: email already registered as a customer
pub async fn join(
    State(state): State<AppState>,
    Json(request): Json<JoinCustomerRequest>,
) -> Result<(StatusCode, Json<CustomerResponse>), AppError> {
    let customer =
        account_service::register_customer(state.store.as_ref(), &state.passwords, request)
            .await?;

    Ok((StatusCode::CREATED, Json(CustomerResponse::from(customer))))
}
