use bigdecimal::BigDecimal;
use serde::Serialize;

use super::Order;

/// 待收货分类
pub const A_RECEVOIR: &str = "a_recevoir";
pub const RECEPTIONNE: &str = "receptionne";

/// 采购单收货状态
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IncomingOrder {
    #[serde(flatten)]
    pub order: Order,
    pub categorie: &'static str,
    /// litige / back_order / non_controle, 可同时存在多个
    pub flags: Vec<&'static str>,
    pub livraisons_count: usize,
    pub progression: Vec<LineProgress>,
}

/// 单行收货进度
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineProgress {
    pub name: String,
    pub reference: String,
    #[serde(with = "super::serde_helpers::decimal_number")]
    pub ordered: BigDecimal,
    /// 全部到货数量 (不区分状态)
    #[serde(with = "super::serde_helpers::decimal_number")]
    pub received: BigDecimal,
    #[serde(with = "super::serde_helpers::decimal_number")]
    pub remaining: BigDecimal,
}
