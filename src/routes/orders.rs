use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, patch},
};
use uuid::Uuid;

use crate::{
    dto::identity::CustomerQuery,
    dto::orders::{CheckoutRequest, OrderDto, OrderList, UpdateOrderStatusRequest},
    error::AppResult,
    response::ApiResponse,
    services::order_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders).post(checkout))
        .route("/{id}", get(get_order))
        .route("/{id}/status", patch(update_order_status))
}

#[utoipa::path(
    get,
    path = "/api/orders",
    params(
        ("external_id" = Option<String>, Query, description = "External account id"),
    ),
    responses(
        (status = 200, description = "The customer's orders, newest first", body = ApiResponse<OrderList>),
        (status = 400, description = "Missing or non-numeric external_id"),
    ),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<CustomerQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    order_service::list_orders(&state, &query.into())
        .await
        .map(Json)
}

#[utoipa::path(
    post,
    path = "/api/orders",
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Order created from the current cart", body = ApiResponse<OrderDto>),
        (status = 400, description = "Missing or non-numeric external_id"),
        (status = 409, description = "Cart is empty"),
    ),
    tag = "Orders"
)]
pub async fn checkout(
    State(state): State<AppState>,
    Json(payload): Json<CheckoutRequest>,
) -> AppResult<Json<ApiResponse<OrderDto>>> {
    order_service::checkout(&state, payload).await.map(Json)
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    responses(
        (status = 200, description = "Order with its frozen-price items", body = ApiResponse<OrderDto>),
        (status = 404, description = "Order not found"),
    ),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderDto>>> {
    order_service::get_order(&state, id).await.map(Json)
}

#[utoipa::path(
    patch,
    path = "/api/orders/{id}/status",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Order with advanced status", body = ApiResponse<OrderDto>),
        (status = 400, description = "Unknown status or invalid transition"),
        (status = 404, description = "Order not found"),
    ),
    tag = "Orders"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> AppResult<Json<ApiResponse<OrderDto>>> {
    order_service::update_status(&state, id, payload)
        .await
        .map(Json)
}
