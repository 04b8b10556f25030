use crate::models::{ConformityStatus, Department, NewStockItem, StockItem, Supplier, SupplierInput, User, UserInput};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// 供应商
// ---------------------------------------------------------------------------

pub async fn list_suppliers(pool: &PgPool) -> Result<Vec<Supplier>, sqlx::Error> {
    sqlx::query_as::<_, Supplier>(
        r#"
        SELECT id, name, email, phone, address, supplier_type, logo
        FROM fournisseurs
        ORDER BY name ASC, id ASC
        "#,
    )
    .fetch_all(pool)
    .await
}

pub async fn insert_supplier(pool: &PgPool, name: &str, input: &SupplierInput) -> Result<Supplier, sqlx::Error> {
    sqlx::query_as::<_, Supplier>(
        r#"
        INSERT INTO fournisseurs (name, email, phone, address, supplier_type, logo)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, name, email, phone, address, supplier_type, logo
        "#,
    )
    .bind(name)
    .bind(&input.email)
    .bind(&input.phone)
    .bind(&input.address)
    .bind(&input.supplier_type)
    .bind(&input.logo)
    .fetch_one(pool)
    .await
}

/// 修改供应商 (未提供的字段保持原值，未上传新徽标时保留旧徽标)
pub async fn update_supplier(pool: &PgPool, supplier_id: i64, input: &SupplierInput) -> Result<Option<Supplier>, sqlx::Error> {
    sqlx::query_as::<_, Supplier>(
        r#"
        UPDATE fournisseurs
        SET name = COALESCE($2, name),
            email = COALESCE($3, email),
            phone = COALESCE($4, phone),
            address = COALESCE($5, address),
            supplier_type = COALESCE($6, supplier_type),
            logo = COALESCE($7, logo)
        WHERE id = $1
        RETURNING id, name, email, phone, address, supplier_type, logo
        "#,
    )
    .bind(supplier_id)
    .bind(&input.name)
    .bind(&input.email)
    .bind(&input.phone)
    .bind(&input.address)
    .bind(&input.supplier_type)
    .bind(&input.logo)
    .fetch_optional(pool)
    .await
}

pub async fn delete_supplier(pool: &PgPool, supplier_id: i64) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM fournisseurs WHERE id = $1")
        .bind(supplier_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

// ---------------------------------------------------------------------------
// 部门
// ---------------------------------------------------------------------------

pub async fn list_departments(pool: &PgPool) -> Result<Vec<Department>, sqlx::Error> {
    sqlx::query_as::<_, Department>("SELECT id, name FROM services ORDER BY name ASC")
        .fetch_all(pool)
        .await
}

pub async fn insert_department(pool: &PgPool, name: &str) -> Result<Department, sqlx::Error> {
    sqlx::query_as::<_, Department>("INSERT INTO services (name) VALUES ($1) RETURNING id, name")
        .bind(name)
        .fetch_one(pool)
        .await
}

pub async fn delete_department(pool: &PgPool, department_id: i64) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM services WHERE id = $1")
        .bind(department_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

// ---------------------------------------------------------------------------
// 合格状态标签
// ---------------------------------------------------------------------------

pub async fn list_conformity_statuses(pool: &PgPool) -> Result<Vec<ConformityStatus>, sqlx::Error> {
    sqlx::query_as::<_, ConformityStatus>("SELECT id, label FROM conformite_status ORDER BY id ASC")
        .fetch_all(pool)
        .await
}

pub async fn insert_conformity_status(pool: &PgPool, label: &str) -> Result<ConformityStatus, sqlx::Error> {
    sqlx::query_as::<_, ConformityStatus>("INSERT INTO conformite_status (label) VALUES ($1) RETURNING id, label")
        .bind(label)
        .fetch_one(pool)
        .await
}

pub async fn delete_conformity_status(pool: &PgPool, status_id: i64) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM conformite_status WHERE id = $1")
        .bind(status_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

// ---------------------------------------------------------------------------
// 库存
// ---------------------------------------------------------------------------

pub async fn list_stock_items(pool: &PgPool) -> Result<Vec<StockItem>, sqlx::Error> {
    sqlx::query_as::<_, StockItem>("SELECT id, name, quantity, unit FROM stock_items ORDER BY name ASC, id ASC")
        .fetch_all(pool)
        .await
}

pub async fn insert_stock_item(pool: &PgPool, item: &NewStockItem) -> Result<StockItem, sqlx::Error> {
    sqlx::query_as::<_, StockItem>(
        r#"
        INSERT INTO stock_items (name, quantity, unit)
        VALUES ($1, $2, $3)
        RETURNING id, name, quantity, unit
        "#,
    )
    .bind(&item.name)
    .bind(item.quantity)
    .bind(&item.unit)
    .fetch_one(pool)
    .await
}

// ---------------------------------------------------------------------------
// 用户
// ---------------------------------------------------------------------------

pub async fn list_users(pool: &PgPool) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT id, email, name, role, access, created_at FROM users ORDER BY email ASC")
        .fetch_all(pool)
        .await
}

pub async fn insert_user(pool: &PgPool, email: &str, input: &UserInput) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (email, name, role, access)
        VALUES ($1, $2, COALESCE($3, 'user'), COALESCE($4, '{}'::TEXT[]))
        RETURNING id, email, name, role, access, created_at
        "#,
    )
    .bind(email)
    .bind(&input.name)
    .bind(&input.role)
    .bind(&input.access)
    .fetch_one(pool)
    .await
}

pub async fn update_user(pool: &PgPool, user_id: i64, input: &UserInput) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET email = COALESCE($2, email),
            name = COALESCE($3, name),
            role = COALESCE($4, role),
            access = COALESCE($5, access)
        WHERE id = $1
        RETURNING id, email, name, role, access, created_at
        "#,
    )
    .bind(user_id)
    .bind(&input.email)
    .bind(&input.name)
    .bind(&input.role)
    .bind(&input.access)
    .fetch_optional(pool)
    .await
}

pub async fn delete_user(pool: &PgPool, user_id: i64) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}
