use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 合格
pub const CONFORME: &str = "conforme";
/// 争议
pub const LITIGE: &str = "litige";
/// 缺货待补
pub const BACK_ORDER: &str = "back_order";
/// 未检验
pub const NON_CONTROLE: &str = "non_controle";
/// 其他 (不计入任何分类)
pub const AUTRE: &str = "autre";

/// 同时存在争议和缺货时的整单标签
pub const LITIGE_BACK_ORDER: &str = "litige, back_order";

/// 标签目录 (conformite_status)，仅供前端选择，不约束明细取值
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ConformityStatus {
    pub id: i64,
    pub label: String,
}

#[derive(Debug, Deserialize)]
pub struct ConformityStatusInput {
    pub label: Option<String>,
}
