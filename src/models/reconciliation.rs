use bigdecimal::{BigDecimal, Zero};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::conformity::{BACK_ORDER, CONFORME, LITIGE, NON_CONTROLE};
use super::Delivery;

/// 按参考号汇总的到货对账记录 (按需计算，从不落库)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationRecord {
    pub name: String,
    pub reference: String,
    /// 所有明细数量之和 (不区分状态)
    #[serde(with = "super::serde_helpers::decimal_number")]
    pub total: BigDecimal,
    #[serde(with = "super::serde_helpers::decimal_number")]
    pub good: BigDecimal,
    #[serde(with = "super::serde_helpers::decimal_number")]
    pub disputed: BigDecimal,
    #[serde(with = "super::serde_helpers::decimal_number")]
    pub back_ordered: BigDecimal,
    #[serde(with = "super::serde_helpers::decimal_number")]
    pub uninspected: BigDecimal,
    pub remarks: Vec<String>,
}

impl ReconciliationRecord {
    pub fn new(name: impl Into<String>, reference: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reference: reference.into(),
            total: BigDecimal::zero(),
            good: BigDecimal::zero(),
            disputed: BigDecimal::zero(),
            back_ordered: BigDecimal::zero(),
            uninspected: BigDecimal::zero(),
            remarks: Vec::new(),
        }
    }

    /// 累加一行明细: total 无条件累加，最多命中一个状态桶
    pub fn add(&mut self, quantite: &BigDecimal, conformite: &str, remarques: Option<&str>) {
        self.total += quantite;
        match conformite {
            CONFORME => self.good += quantite,
            LITIGE => self.disputed += quantite,
            BACK_ORDER => self.back_ordered += quantite,
            NON_CONTROLE => self.uninspected += quantite,
            // autre 或未知标签只计入 total
            _ => {}
        }
        if let Some(r) = remarques.filter(|r| !r.is_empty()) {
            self.remarks.push(r.to_string());
        }
    }

    /// 已占用的订购额度 (合格 + 争议)
    pub fn consumed(&self) -> BigDecimal {
        &self.good + &self.disputed
    }
}

/// 对账查询结果: 原始到货单 + 按参考号汇总
#[derive(Debug, Clone, Serialize)]
pub struct ReconciliationReport {
    pub livraisons: Vec<Delivery>,
    pub rapport: Vec<ReconciliationRecord>,
}

/// 超量到货明细
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacityViolation {
    pub nom: String,
    pub reference: String,
    #[serde(with = "super::serde_helpers::decimal_number")]
    pub ordered: BigDecimal,
    #[serde(with = "super::serde_helpers::decimal_number")]
    pub already_delivered: BigDecimal,
    #[serde(with = "super::serde_helpers::decimal_number")]
    pub incoming: BigDecimal,
}

impl fmt::Display for CapacityViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "total delivered quantity for \"{}\" ({}) would exceed the ordered quantity {}: already delivered {}, incoming {}",
            self.nom, self.reference, self.ordered, self.already_delivered, self.incoming
        )
    }
}
