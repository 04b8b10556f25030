use super::handlers::parse_param;
use super::AppState;
use crate::auth::{Action, AuthUser, Resource};
use crate::db::queries;
use crate::error::AppError;
use crate::models::{IncomingOrder, Order, OrderInput, OrderLineInput, OrderUpdate};
use crate::service::incoming;
use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use sqlx::PgPool;

#[derive(Debug, Default, Deserialize)]
pub struct OrderQuery {
    pub fulfilled: Option<String>,
}

fn not_found(order_id: i64) -> AppError {
    AppError::NotFound(format!("order {} not found", order_id))
}

async fn load_order(pool: &PgPool, order_id: i64) -> Result<Order, AppError> {
    let ids = [order_id];
    let (order, lines) = futures::try_join!(
        queries::get_order(pool, order_id),
        queries::list_order_lines(pool, &ids),
    )?;
    let mut order = order.ok_or_else(|| not_found(order_id))?;
    order.items = lines;
    Ok(order)
}

/// 采购单列表 (`?fulfilled=true|false`)
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderQuery>,
) -> Result<Json<Vec<Order>>, AppError> {
    state.policy.authorize(&user, Resource::Orders, Action::Read)?;
    let fulfilled: Option<bool> = parse_param("fulfilled", query.fulfilled)?;

    let mut orders = queries::list_orders(&state.pool, fulfilled).await?;
    let ids: Vec<i64> = orders.iter().map(|o| o.id).collect();
    let lines = queries::list_order_lines(&state.pool, &ids).await?;
    queries::attach_order_lines(&mut orders, lines);
    Ok(Json(orders))
}

pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<i64>,
) -> Result<Json<Order>, AppError> {
    state.policy.authorize(&user, Resource::Orders, Action::Read)?;
    Ok(Json(load_order(&state.pool, order_id).await?))
}

pub async fn create_order(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<OrderInput>,
) -> Result<(StatusCode, Json<Order>), AppError> {
    state.policy.authorize(&user, Resource::Orders, Action::Write)?;
    let order = input.validate().map_err(AppError::Validation)?;

    let mut tx = state.pool.begin().await?;
    let order_id = queries::insert_order(&mut *tx, &order).await?;
    tx.commit().await?;

    tracing::info!("采购单 {} 已创建: numBC={}, {} 行", order_id, order.num_bc, order.items.len());
    Ok((StatusCode::CREATED, Json(load_order(&state.pool, order_id).await?)))
}

/// 修改采购单 (提供 items 时整体替换明细)
pub async fn update_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<i64>,
    Json(update): Json<OrderUpdate>,
) -> Result<Json<Order>, AppError> {
    state.policy.authorize(&user, Resource::Orders, Action::Write)?;
    let update = update.validate().map_err(AppError::Validation)?;

    let mut tx = state.pool.begin().await?;
    if queries::update_order(&mut *tx, order_id, &update).await? == 0 {
        return Err(not_found(order_id));
    }
    if let Some(items) = update.items {
        let lines: Vec<_> = items.into_iter().map(OrderLineInput::into_line).collect();
        queries::replace_order_lines(&mut *tx, order_id, &lines).await?;
    }
    tx.commit().await?;

    tracing::info!("采购单 {} 已修改", order_id);
    Ok(Json(load_order(&state.pool, order_id).await?))
}

pub async fn delete_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.policy.authorize(&user, Resource::Orders, Action::Write)?;
    if queries::delete_order(&state.pool, order_id).await? == 0 {
        return Err(not_found(order_id));
    }
    tracing::info!("采购单 {} 已删除", order_id);
    Ok(StatusCode::NO_CONTENT)
}

/// 待收货分类
pub async fn list_incoming(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<IncomingOrder>>, AppError> {
    state.policy.authorize(&user, Resource::Orders, Action::Read)?;
    Ok(Json(incoming::list_incoming(&state.pool).await?))
}
