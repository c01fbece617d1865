//! Order placement and lookup endpoints.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use esales_core::{CheckoutRequest, OrderView};
use serde::Serialize;

use crate::error::{ApiError, ApiResult};
use crate::services::PlacementOutcome;
use crate::AppState;

/// Message for any persistence failure during placement.
pub const ORDER_CREATE_FAILED: &str = "Error creating order";

/// Body of `POST /api/orders` once the order reached a final status.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderResponse {
    pub success: bool,
    pub order_number: String,
    pub message: String,
}

impl From<PlacementOutcome> for PlaceOrderResponse {
    fn from(outcome: PlacementOutcome) -> Self {
        PlaceOrderResponse {
            success: outcome.success,
            order_number: outcome.order_number,
            message: outcome.message,
        }
    }
}

/// `POST /api/orders`
///
/// 200 when the payment completed, 400 with `success: false` when it failed.
pub async fn place_order(
    State(state): State<AppState>,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<PlaceOrderResponse>)> {
    let Json(request) = payload.map_err(|rejection| ApiError::validation(rejection.body_text()))?;

    let outcome = state
        .orders
        .place_order(request)
        .await
        .map_err(|e| ApiError::from(e).with_server_message(ORDER_CREATE_FAILED))?;

    let status = if outcome.success {
        StatusCode::OK
    } else {
        StatusCode::BAD_REQUEST
    };

    Ok((status, Json(outcome.into())))
}

/// `GET /api/orders/{orderNumber}`
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_number): Path<String>,
) -> ApiResult<Json<OrderView>> {
    let view = state.orders.get_order_view(&order_number).await?;
    Ok(Json(view))
}
