use csv::Writer;
use sqlx::PgPool;
use std::str::FromStr;

use crate::db::queries_catalog;
use crate::error::AppError;
use crate::models::{Department, Supplier, User};

/// 可导出的列表
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Users,
    Services,
    Fournisseurs,
}

impl ExportKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ExportKind::Users => "users",
            ExportKind::Services => "services",
            ExportKind::Fournisseurs => "fournisseurs",
        }
    }

    pub fn file_name(self) -> String {
        format!("{}.csv", self.as_str())
    }
}

impl FromStr for ExportKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "users" => Ok(ExportKind::Users),
            "services" => Ok(ExportKind::Services),
            "fournisseurs" => Ok(ExportKind::Fournisseurs),
            other => Err(AppError::BadRequest(format!("invalid export type: {}", other))),
        }
    }
}

fn option_to_csv(val: &Option<String>) -> String {
    val.clone().unwrap_or_default()
}

pub fn users_to_csv(users: &[User]) -> Result<Vec<u8>, AppError> {
    let mut writer = Writer::from_writer(Vec::new());
    writer.write_record(["id", "email", "name", "role", "access", "created_at"])?;
    for user in users {
        writer.write_record(&[
            user.id.to_string(),
            user.email.clone(),
            option_to_csv(&user.name),
            user.role.clone(),
            user.access.join(";"),
            user.created_at.to_rfc3339(),
        ])?;
    }
    finish(writer)
}

pub fn departments_to_csv(departments: &[Department]) -> Result<Vec<u8>, AppError> {
    let mut writer = Writer::from_writer(Vec::new());
    writer.write_record(["id", "name"])?;
    for department in departments {
        writer.write_record(&[department.id.to_string(), department.name.clone()])?;
    }
    finish(writer)
}

pub fn suppliers_to_csv(suppliers: &[Supplier]) -> Result<Vec<u8>, AppError> {
    let mut writer = Writer::from_writer(Vec::new());
    writer.write_record(["id", "name", "email", "phone", "address", "type", "logo"])?;
    for supplier in suppliers {
        writer.write_record(&[
            supplier.id.to_string(),
            supplier.name.clone(),
            option_to_csv(&supplier.email),
            option_to_csv(&supplier.phone),
            option_to_csv(&supplier.address),
            option_to_csv(&supplier.supplier_type),
            option_to_csv(&supplier.logo),
        ])?;
    }
    finish(writer)
}

fn finish(writer: Writer<Vec<u8>>) -> Result<Vec<u8>, AppError> {
    writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("csv flush failed: {}", e.error())))
}

/// 查询并导出一份列表
pub async fn export(pool: &PgPool, kind: ExportKind) -> Result<Vec<u8>, AppError> {
    let bytes = match kind {
        ExportKind::Users => users_to_csv(&queries_catalog::list_users(pool).await?)?,
        ExportKind::Services => departments_to_csv(&queries_catalog::list_departments(pool).await?)?,
        ExportKind::Fournisseurs => suppliers_to_csv(&queries_catalog::list_suppliers(pool).await?)?,
    };
    tracing::info!("导出 {} 完成, {} 字节", kind.file_name(), bytes.len());
    Ok(bytes)
}
