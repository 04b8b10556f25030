pub mod handlers;
pub mod handlers_catalog;
pub mod handlers_orders;

pub use handlers::health_check;

use crate::auth::{AccessPolicy, TokenKeys};
use crate::config::AppConfig;
use crate::service::DeliveryService;
use axum::{
    extract::FromRef,
    routing::{delete, get, put},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// 共享状态
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub deliveries: Arc<DeliveryService>,
    pub tokens: Arc<TokenKeys>,
    pub policy: Arc<AccessPolicy>,
}

impl AppState {
    pub fn new(pool: PgPool, config: &AppConfig) -> Self {
        Self {
            deliveries: Arc::new(DeliveryService::new(pool.clone())),
            tokens: Arc::new(TokenKeys::new(&config.auth.token_secret)),
            policy: Arc::new(AccessPolicy::from_config(&config.access)),
            pool,
        }
    }
}

impl FromRef<AppState> for Arc<TokenKeys> {
    fn from_ref(state: &AppState) -> Self {
        state.tokens.clone()
    }
}

/// 构建路由
///
/// - `GET /health`
/// - `/api/delivery`, `/api/delivery/:id`
/// - `/api/orders`, `/api/orders/incoming`, `/api/orders/:id`
/// - `/api/fournisseurs`, `/api/services`, `/api/conformite-status`
/// - `/api/stock`, `/api/users`, `/api/export`
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        // 到货单
        .route(
            "/api/delivery",
            get(handlers::list_deliveries).post(handlers::create_delivery),
        )
        .route(
            "/api/delivery/:id",
            get(handlers::get_delivery)
                .put(handlers::update_delivery)
                .delete(handlers::delete_delivery),
        )
        // 采购单
        .route(
            "/api/orders",
            get(handlers_orders::list_orders).post(handlers_orders::create_order),
        )
        .route("/api/orders/incoming", get(handlers_orders::list_incoming))
        .route(
            "/api/orders/:id",
            get(handlers_orders::get_order)
                .put(handlers_orders::update_order)
                .delete(handlers_orders::delete_order),
        )
        // 基础资料
        .route(
            "/api/fournisseurs",
            get(handlers_catalog::list_suppliers).post(handlers_catalog::create_supplier),
        )
        .route(
            "/api/fournisseurs/:id",
            put(handlers_catalog::update_supplier).delete(handlers_catalog::delete_supplier),
        )
        .route(
            "/api/services",
            get(handlers_catalog::list_departments).post(handlers_catalog::create_department),
        )
        .route("/api/services/:id", delete(handlers_catalog::delete_department))
        .route(
            "/api/conformite-status",
            get(handlers_catalog::list_conformity_statuses).post(handlers_catalog::create_conformity_status),
        )
        .route(
            "/api/conformite-status/:id",
            delete(handlers_catalog::delete_conformity_status),
        )
        .route(
            "/api/stock",
            get(handlers_catalog::list_stock).post(handlers_catalog::create_stock_item),
        )
        .route(
            "/api/users",
            get(handlers_catalog::list_users).post(handlers_catalog::create_user),
        )
        .route(
            "/api/users/:id",
            put(handlers_catalog::update_user).delete(handlers_catalog::delete_user),
        )
        .route("/api/export", get(handlers_catalog::export))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}
