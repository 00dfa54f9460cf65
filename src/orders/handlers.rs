// HTTP handlers for order endpoints

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::auth::middleware::AuthenticatedUser;
use crate::orders::{
    CreateOrderRequest, CreateOrderResponse, OrderError, OrderResponse, ReengagementHint,
    ReorderResponse,
};
use crate::response::ApiResponse;
use crate::AppState;

fn body_or_error<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, OrderError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| OrderError::ValidationError(rejection.body_text()))
}

fn order_id_or_error(path: Result<Path<Uuid>, PathRejection>) -> Result<Uuid, OrderError> {
    path.map(|Path(id)| id)
        .map_err(|_| OrderError::ValidationError("Invalid order id".to_string()))
}

/// Handler for POST /api/orders
/// Creates a new order for the authenticated user
#[utoipa::path(
    post,
    path = "/api/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created; payload wrapped in the response envelope. loyaltyUpgrade is best-effort and may be null while the tier refresh is still running", body = CreateOrderResponse),
        (status = 400, description = "Empty cart, malformed request or stale total", example = json!({"success": false, "error": "Cart is empty", "timestamp": 0})),
        (status = 401, description = "No authenticated principal"),
        (status = 404, description = "Principal has no persisted user"),
        (status = 500, description = "Order could not be persisted", example = json!({"success": false, "error": "Failed to create order", "timestamp": 0}))
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn create_order_handler(
    State(state): State<AppState>,
    user: Option<AuthenticatedUser>,
    body: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<CreateOrderResponse>>), OrderError> {
    let principal = user.map(|AuthenticatedUser(p)| p);
    let principal = principal.as_ref().ok_or(OrderError::Unauthorized)?;
    let request = body_or_error(body)?;

    let created = state
        .order_service
        .create_order(Some(principal), request)
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(created))))
}

/// Handler for POST /api/orders/{order_id}/reorder
/// Places a new order from a previous one at current prices
#[utoipa::path(
    post,
    path = "/api/orders/{order_id}/reorder",
    params(
        ("order_id" = String, Path, description = "Id of the order to repeat")
    ),
    responses(
        (status = 201, description = "New order created", body = ReorderResponse),
        (status = 400, description = "None of the order's products are still available"),
        (status = 401, description = "No authenticated principal"),
        (status = 403, description = "Order belongs to another user"),
        (status = 404, description = "Order not found")
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn reorder_handler(
    State(state): State<AppState>,
    user: Option<AuthenticatedUser>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<(StatusCode, Json<ApiResponse<ReorderResponse>>), OrderError> {
    let principal = user.map(|AuthenticatedUser(p)| p);
    let principal = principal.as_ref().ok_or(OrderError::Unauthorized)?;
    let order_id = order_id_or_error(path)?;

    let reordered = state
        .order_service
        .quick_reorder(Some(principal), order_id)
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(reordered))))
}

/// Handler for GET /api/orders
/// Retrieves order history for the authenticated user
#[utoipa::path(
    get,
    path = "/api/orders",
    responses(
        (status = 200, description = "Caller's orders, newest first", body = Vec<OrderResponse>),
        (status = 401, description = "No authenticated principal")
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn get_order_history_handler(
    State(state): State<AppState>,
    user: Option<AuthenticatedUser>,
) -> Result<Json<ApiResponse<Vec<OrderResponse>>>, OrderError> {
    let principal = user.map(|AuthenticatedUser(p)| p);
    let orders = state.order_service.get_user_orders(principal.as_ref()).await?;

    Ok(Json(ApiResponse::ok(orders)))
}

/// Handler for GET /api/orders/{order_id}
/// Retrieves a specific order by ID
#[utoipa::path(
    get,
    path = "/api/orders/{order_id}",
    params(
        ("order_id" = String, Path, description = "Order id")
    ),
    responses(
        (status = 200, description = "Order found", body = OrderResponse),
        (status = 401, description = "No authenticated principal"),
        (status = 403, description = "Order belongs to another user"),
        (status = 404, description = "Order not found")
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn get_order_by_id_handler(
    State(state): State<AppState>,
    user: Option<AuthenticatedUser>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<ApiResponse<OrderResponse>>, OrderError> {
    let principal = user.map(|AuthenticatedUser(p)| p);
    let principal = principal.as_ref().ok_or(OrderError::Unauthorized)?;
    let order_id = order_id_or_error(path)?;

    let order = state
        .order_service
        .get_order_by_id(Some(principal), order_id)
        .await?;

    Ok(Json(ApiResponse::ok(order)))
}

/// Handler for GET /api/users/me/reengagement
/// Returns a win-back hint, or null data when the caller is not eligible
#[utoipa::path(
    get,
    path = "/api/users/me/reengagement",
    responses(
        (status = 200, description = "Hint for an eligible caller, null otherwise", body = ReengagementHint),
        (status = 401, description = "No authenticated principal")
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn reengagement_hint_handler(
    State(state): State<AppState>,
    user: Option<AuthenticatedUser>,
) -> Result<Json<ApiResponse<Option<ReengagementHint>>>, OrderError> {
    let principal = user.map(|AuthenticatedUser(p)| p);
    let hint = state
        .order_service
        .reengagement_hint(principal.as_ref())
        .await?;

    Ok(Json(ApiResponse::ok(hint)))
}
