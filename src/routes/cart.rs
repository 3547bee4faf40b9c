use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, post},
};

use crate::{
    dto::cart::{AddToCartRequest, CartDto, ClearCartRequest},
    dto::identity::CustomerQuery,
    error::AppResult,
    response::ApiResponse,
    services::cart_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_cart))
        .route("/add", post(add_to_cart))
        .route("/clear", post(clear_cart))
}

#[utoipa::path(
    get,
    path = "/api/cart",
    params(
        ("external_id" = Option<String>, Query, description = "External account id"),
        ("username" = Option<String>, Query, description = "Display username, stored on first sight"),
        ("full_name" = Option<String>, Query, description = "Display name, stored on first sight"),
    ),
    responses(
        (status = 200, description = "Current cart with derived total", body = ApiResponse<CartDto>),
        (status = 400, description = "Missing or non-numeric external_id"),
    ),
    tag = "Cart"
)]
pub async fn get_cart(
    State(state): State<AppState>,
    Query(query): Query<CustomerQuery>,
) -> AppResult<Json<ApiResponse<CartDto>>> {
    cart_service::get_cart(&state, &query.into()).await.map(Json)
}

#[utoipa::path(
    post,
    path = "/api/cart/add",
    request_body = AddToCartRequest,
    responses(
        (status = 200, description = "Updated cart", body = ApiResponse<CartDto>),
        (status = 400, description = "Bad identity or quantity"),
        (status = 404, description = "Product not found or inactive"),
    ),
    tag = "Cart"
)]
pub async fn add_to_cart(
    State(state): State<AppState>,
    Json(payload): Json<AddToCartRequest>,
) -> AppResult<Json<ApiResponse<CartDto>>> {
    cart_service::add_item(&state, payload).await.map(Json)
}

#[utoipa::path(
    post,
    path = "/api/cart/clear",
    request_body = ClearCartRequest,
    responses(
        (status = 200, description = "Emptied cart; clearing an empty cart is a no-op", body = ApiResponse<CartDto>),
        (status = 400, description = "Missing or non-numeric external_id"),
    ),
    tag = "Cart"
)]
pub async fn clear_cart(
    State(state): State<AppState>,
    Json(payload): Json<ClearCartRequest>,
) -> AppResult<Json<ApiResponse<CartDto>>> {
    cart_service::clear(&state, payload).await.map(Json)
}
