pub mod auth;
pub mod business_rules;
pub mod db;
pub mod models;
pub mod orders;
pub mod response;
pub mod validation;

#[cfg(test)]
pub(crate) mod test_support;

use axum::{
    extract::FromRef,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use auth::TokenService;
use orders::{
    create_order_handler, get_order_by_id_handler, get_order_history_handler,
    reengagement_hint_handler, reorder_handler, OrderService,
};

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        orders::handlers::create_order_handler,
        orders::handlers::reorder_handler,
        orders::handlers::get_order_history_handler,
        orders::handlers::get_order_by_id_handler,
        orders::handlers::reengagement_hint_handler,
    ),
    components(
        schemas(
            orders::CreateOrderRequest,
            orders::CartLine,
            orders::Size,
            orders::OrderStatus,
            orders::CreateOrderResponse,
            orders::ReorderResponse,
            orders::ReengagementHint,
            orders::OrderResponse,
            orders::OrderItemResponse,
            business_rules::LoyaltyTier,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "orders", description = "Order placement, re-ordering and order history")
    ),
    info(
        title = "Roastery Orders API",
        version = "1.0.0",
        description = "Order creation and pricing for the roastery storefront"
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub order_service: OrderService,
    pub token_service: Arc<TokenService>,
}

impl FromRef<AppState> for Arc<TokenService> {
    fn from_ref(state: &AppState) -> Self {
        state.token_service.clone()
    }
}

/// Creates and configures the application router
/// Maps all API endpoints to their handlers and adds CORS middleware
pub fn create_router(state: AppState) -> Router {
    use tower_http::cors::{Any, CorsLayer};

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/orders", post(create_order_handler).get(get_order_history_handler))
        .route("/api/orders/:order_id", get(get_order_by_id_handler))
        .route("/api/orders/:order_id/reorder", post(reorder_handler))
        .route("/api/users/me/reengagement", get(reengagement_hint_handler))
        .layer(cors)
        .with_state(state)
}
