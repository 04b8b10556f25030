use super::handlers::non_empty;
use super::AppState;
use crate::auth::{Action, AuthUser, Resource};
use crate::db::queries_catalog;
use crate::error::AppError;
use crate::models::{
    ConformityStatus, ConformityStatusInput, Department, DepartmentInput, StockItem, StockItemInput, Supplier,
    SupplierInput, User, UserInput,
};
use crate::service::export::{self, ExportKind};
use axum::{
    extract::{Json, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;

/// 唯一约束冲突转为 409
fn unique_conflict(err: sqlx::Error, message: impl Into<String>) -> AppError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return AppError::Conflict(message.into());
        }
    }
    AppError::Database(err)
}

fn deleted_or_not_found(affected: u64, what: &str, id: i64) -> Result<StatusCode, AppError> {
    if affected == 0 {
        Err(AppError::NotFound(format!("{} {} not found", what, id)))
    } else {
        tracing::info!("{} {} 已删除", what, id);
        Ok(StatusCode::NO_CONTENT)
    }
}

// ---------------------------------------------------------------------------
// 供应商
// ---------------------------------------------------------------------------

pub async fn list_suppliers(State(state): State<AppState>, user: AuthUser) -> Result<Json<Vec<Supplier>>, AppError> {
    state.policy.authorize(&user, Resource::Suppliers, Action::Read)?;
    Ok(Json(queries_catalog::list_suppliers(&state.pool).await?))
}

pub async fn create_supplier(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<SupplierInput>,
) -> Result<(StatusCode, Json<Supplier>), AppError> {
    state.policy.authorize(&user, Resource::Suppliers, Action::Write)?;
    let name = non_empty(input.name.clone()).ok_or_else(|| AppError::Validation(vec!["name is required".to_string()]))?;
    let supplier = queries_catalog::insert_supplier(&state.pool, &name, &input).await?;
    Ok((StatusCode::CREATED, Json(supplier)))
}

pub async fn update_supplier(
    State(state): State<AppState>,
    user: AuthUser,
    Path(supplier_id): Path<i64>,
    Json(input): Json<SupplierInput>,
) -> Result<Json<Supplier>, AppError> {
    state.policy.authorize(&user, Resource::Suppliers, Action::Write)?;
    queries_catalog::update_supplier(&state.pool, supplier_id, &input)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("supplier {} not found", supplier_id)))
}

pub async fn delete_supplier(
    State(state): State<AppState>,
    user: AuthUser,
    Path(supplier_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.policy.authorize(&user, Resource::Suppliers, Action::Write)?;
    let affected = queries_catalog::delete_supplier(&state.pool, supplier_id).await?;
    deleted_or_not_found(affected, "supplier", supplier_id)
}

// ---------------------------------------------------------------------------
// 部门
// ---------------------------------------------------------------------------

pub async fn list_departments(State(state): State<AppState>, user: AuthUser) -> Result<Json<Vec<Department>>, AppError> {
    state.policy.authorize(&user, Resource::Departments, Action::Read)?;
    Ok(Json(queries_catalog::list_departments(&state.pool).await?))
}

pub async fn create_department(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<DepartmentInput>,
) -> Result<(StatusCode, Json<Department>), AppError> {
    state.policy.authorize(&user, Resource::Departments, Action::Write)?;
    let name = non_empty(input.name).ok_or_else(|| AppError::Validation(vec!["name is required".to_string()]))?;
    let department = queries_catalog::insert_department(&state.pool, &name)
        .await
        .map_err(|e| unique_conflict(e, format!("service '{}' already exists", name)))?;
    Ok((StatusCode::CREATED, Json(department)))
}

pub async fn delete_department(
    State(state): State<AppState>,
    user: AuthUser,
    Path(department_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.policy.authorize(&user, Resource::Departments, Action::Write)?;
    let affected = queries_catalog::delete_department(&state.pool, department_id).await?;
    deleted_or_not_found(affected, "service", department_id)
}

// ---------------------------------------------------------------------------
// 合格状态标签
// ---------------------------------------------------------------------------

pub async fn list_conformity_statuses(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<ConformityStatus>>, AppError> {
    state.policy.authorize(&user, Resource::ConformityStatuses, Action::Read)?;
    Ok(Json(queries_catalog::list_conformity_statuses(&state.pool).await?))
}

pub async fn create_conformity_status(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<ConformityStatusInput>,
) -> Result<(StatusCode, Json<ConformityStatus>), AppError> {
    state.policy.authorize(&user, Resource::ConformityStatuses, Action::Write)?;
    let label = non_empty(input.label).ok_or_else(|| AppError::Validation(vec!["label is required".to_string()]))?;
    let status = queries_catalog::insert_conformity_status(&state.pool, &label)
        .await
        .map_err(|e| unique_conflict(e, format!("label '{}' already exists", label)))?;
    Ok((StatusCode::CREATED, Json(status)))
}

pub async fn delete_conformity_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(status_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.policy.authorize(&user, Resource::ConformityStatuses, Action::Write)?;
    let affected = queries_catalog::delete_conformity_status(&state.pool, status_id).await?;
    deleted_or_not_found(affected, "conformity status", status_id)
}

// ---------------------------------------------------------------------------
// 库存
// ---------------------------------------------------------------------------

pub async fn list_stock(State(state): State<AppState>, user: AuthUser) -> Result<Json<Vec<StockItem>>, AppError> {
    state.policy.authorize(&user, Resource::Stock, Action::Read)?;
    Ok(Json(queries_catalog::list_stock_items(&state.pool).await?))
}

pub async fn create_stock_item(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<StockItemInput>,
) -> Result<(StatusCode, Json<StockItem>), AppError> {
    state.policy.authorize(&user, Resource::Stock, Action::Write)?;
    let item = input.validate().map_err(AppError::Validation)?;
    let stored = queries_catalog::insert_stock_item(&state.pool, &item).await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

// ---------------------------------------------------------------------------
// 用户
// ---------------------------------------------------------------------------

pub async fn list_users(State(state): State<AppState>, user: AuthUser) -> Result<Json<Vec<User>>, AppError> {
    state.policy.authorize(&user, Resource::Admin, Action::Read)?;
    Ok(Json(queries_catalog::list_users(&state.pool).await?))
}

pub async fn create_user(
    State(state): State<AppState>,
    user: AuthUser,
    Json(input): Json<UserInput>,
) -> Result<(StatusCode, Json<User>), AppError> {
    state.policy.authorize(&user, Resource::Admin, Action::Write)?;
    let email = non_empty(input.email.clone()).ok_or_else(|| AppError::Validation(vec!["email is required".to_string()]))?;
    let created = queries_catalog::insert_user(&state.pool, &email, &input)
        .await
        .map_err(|e| unique_conflict(e, format!("user '{}' already exists", email)))?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn update_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(user_id): Path<i64>,
    Json(input): Json<UserInput>,
) -> Result<Json<User>, AppError> {
    state.policy.authorize(&user, Resource::Admin, Action::Write)?;
    queries_catalog::update_user(&state.pool, user_id, &input)
        .await
        .map_err(|e| unique_conflict(e, "email already in use"))?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("user {} not found", user_id)))
}

pub async fn delete_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(user_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    state.policy.authorize(&user, Resource::Admin, Action::Write)?;
    let affected = queries_catalog::delete_user(&state.pool, user_id).await?;
    deleted_or_not_found(affected, "user", user_id)
}

// ---------------------------------------------------------------------------
// 导出
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// `GET /api/export?type=users|services|fournisseurs`, 返回 CSV 附件
pub async fn export(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ExportQuery>,
) -> Result<Response, AppError> {
    state.policy.authorize(&user, Resource::Admin, Action::Read)?;
    let kind: ExportKind = query.kind.unwrap_or_default().parse()?;
    let body = export::export(&state.pool, kind).await?;

    let disposition = format!("attachment; filename=\"{}\"", kind.file_name());
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}
