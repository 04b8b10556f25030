use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

/// 采购单 (bon de commande)
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: i64,
    #[serde(rename = "numBC")]
    pub num_bc: String,
    pub fournisseur_id: i64,
    pub service_id: i64,
    pub destination: Option<String>,
    pub fulfilled: bool,
    pub created_at: DateTime<Utc>,
    #[sqlx(skip)]
    #[serde(default)]
    pub items: Vec<OrderLine>,
}

/// 采购单明细行: (名称, 参考号, 订购数量)
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq)]
pub struct OrderLine {
    #[serde(skip)]
    pub order_id: i64,
    pub name: String,
    pub reference: String,
    #[serde(with = "super::serde_helpers::decimal_number")]
    pub quantite: BigDecimal,
}

impl OrderLine {
    pub fn new(name: impl Into<String>, reference: impl Into<String>, quantite: BigDecimal) -> Self {
        Self {
            order_id: 0,
            name: name.into(),
            reference: reference.into(),
            quantite,
        }
    }

    /// 解析旧格式 `"<name> | Ref: <reference> | Qté: <quantity>"`
    ///
    /// 缺失的部分得到空字符串，无法解析的数量按 0 处理，从不报错。
    pub fn parse_encoded(raw: &str) -> Self {
        let mut parts = raw.split('|').map(str::trim);
        let name = parts.next().unwrap_or_default();
        let reference = parts.next().map(|p| strip_label(p, "Ref:")).unwrap_or_default();
        let quantite = parts
            .next()
            .map(|p| strip_label(p, "Qté:"))
            .and_then(|q| BigDecimal::from_str(q).ok())
            .unwrap_or_else(BigDecimal::zero);

        Self::new(name, reference, quantite)
    }

    /// 编码为旧格式字符串
    pub fn encode(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for OrderLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} | Ref: {} | Qté: {}", self.name, self.reference, self.quantite)
    }
}

fn strip_label<'a>(part: &'a str, label: &str) -> &'a str {
    match part.strip_prefix(label) {
        Some(rest) => rest.strip_prefix(' ').unwrap_or(rest),
        None => part,
    }
}

/// 请求中的明细行: 旧格式字符串或结构化对象
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OrderLineInput {
    Encoded(String),
    Structured {
        #[serde(default, alias = "nom")]
        name: String,
        #[serde(default)]
        reference: String,
        #[serde(default = "BigDecimal::zero", alias = "quantity")]
        quantite: BigDecimal,
    },
}

impl OrderLineInput {
    pub fn into_line(self) -> OrderLine {
        match self {
            OrderLineInput::Encoded(raw) => OrderLine::parse_encoded(&raw),
            OrderLineInput::Structured { name, reference, quantite } => {
                OrderLine::new(name, reference, quantite)
            }
        }
    }
}

/// 创建采购单请求体
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderInput {
    pub fournisseur_id: Option<i64>,
    pub service_id: Option<i64>,
    #[serde(rename = "numBC")]
    pub num_bc: Option<String>,
    pub destination: Option<String>,
    #[serde(default)]
    pub items: Vec<OrderLineInput>,
}

/// 校验后的采购单
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub fournisseur_id: i64,
    pub service_id: i64,
    pub num_bc: String,
    pub destination: Option<String>,
    pub items: Vec<OrderLine>,
}

impl OrderInput {
    pub fn validate(self) -> Result<NewOrder, Vec<String>> {
        let mut missing = Vec::new();
        if self.fournisseur_id.is_none() {
            missing.push("fournisseurId is required".to_string());
        }
        if self.service_id.is_none() {
            missing.push("serviceId is required".to_string());
        }
        let num_bc = self.num_bc.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        if num_bc.is_none() {
            missing.push("numBC is required".to_string());
        }
        if self.items.is_empty() {
            missing.push("items must contain at least one line".to_string());
        }

        match (self.fournisseur_id, self.service_id, num_bc) {
            (Some(fournisseur_id), Some(service_id), Some(num_bc)) if missing.is_empty() => Ok(NewOrder {
                fournisseur_id,
                service_id,
                num_bc,
                destination: self.destination,
                items: self.items.into_iter().map(OrderLineInput::into_line).collect(),
            }),
            _ => Err(missing),
        }
    }
}

/// 修改采购单请求体 (未提供的字段保持不变)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderUpdate {
    pub fournisseur_id: Option<i64>,
    pub service_id: Option<i64>,
    #[serde(rename = "numBC")]
    pub num_bc: Option<String>,
    pub destination: Option<String>,
    pub fulfilled: Option<bool>,
    pub items: Option<Vec<OrderLineInput>>,
}

impl OrderUpdate {
    /// 与新增相同的约束: 提供 numBC 时不能为空, 提供 items 时至少一行
    pub fn validate(mut self) -> Result<Self, Vec<String>> {
        let mut errors = Vec::new();
        if let Some(num_bc) = self.num_bc.take() {
            let num_bc = num_bc.trim().to_string();
            if num_bc.is_empty() {
                errors.push("numBC must not be empty".to_string());
            }
            self.num_bc = Some(num_bc);
        }
        if self.items.as_ref().is_some_and(|items| items.is_empty()) {
            errors.push("items must contain at least one line".to_string());
        }

        if errors.is_empty() {
            Ok(self)
        } else {
            Err(errors)
        }
    }
}
