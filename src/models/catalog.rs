use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 供应商 (fournisseur)
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Supplier {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    #[serde(rename = "type")]
    pub supplier_type: Option<String>,
    /// 徽标地址 (文件本身由外部存储)
    pub logo: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SupplierInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    #[serde(rename = "type")]
    pub supplier_type: Option<String>,
    pub logo: Option<String>,
}

/// 内部部门 (service)
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Department {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DepartmentInput {
    pub name: Option<String>,
}

/// 库存条目
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct StockItem {
    pub id: i64,
    pub name: String,
    pub quantity: i32,
    pub unit: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StockItemInput {
    pub name: Option<String>,
    pub quantity: Option<serde_json::Value>,
    pub unit: Option<String>,
}

/// 校验后的库存条目
#[derive(Debug, Clone, PartialEq)]
pub struct NewStockItem {
    pub name: String,
    pub quantity: i32,
    pub unit: String,
}

impl StockItemInput {
    /// name/unit 非空，quantity 为非负整数
    pub fn validate(self) -> Result<NewStockItem, Vec<String>> {
        let mut errors = Vec::new();
        let name = self.name.filter(|n| !n.is_empty());
        if name.is_none() {
            errors.push("name must not be empty".to_string());
        }
        let unit = self.unit.filter(|u| !u.is_empty());
        if unit.is_none() {
            errors.push("unit must not be empty".to_string());
        }
        let quantity = self
            .quantity
            .as_ref()
            .and_then(serde_json::Value::as_i64)
            .filter(|q| *q >= 0)
            .and_then(|q| i32::try_from(q).ok());
        if quantity.is_none() {
            errors.push("quantity must be a non-negative integer".to_string());
        }

        match (name, quantity, unit) {
            (Some(name), Some(quantity), Some(unit)) => Ok(NewStockItem { name, quantity, unit }),
            _ => Err(errors),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn input(v: serde_json::Value) -> StockItemInput {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn accepts_valid_stock_item() {
        let item = input(json!({"name": "Gants", "quantity": 12, "unit": "boîte"})).validate().unwrap();
        assert_eq!(item, NewStockItem { name: "Gants".into(), quantity: 12, unit: "boîte".into() });
    }

    #[test]
    fn rejects_fractional_and_negative_quantities() {
        assert!(input(json!({"name": "a", "quantity": 1.5, "unit": "u"})).validate().is_err());
        assert!(input(json!({"name": "a", "quantity": -1, "unit": "u"})).validate().is_err());
        assert!(input(json!({"name": "a", "quantity": "3", "unit": "u"})).validate().is_err());
    }

    #[test]
    fn reports_all_problems() {
        let errors = input(json!({"name": "", "unit": ""})).validate().unwrap_err();
        assert_eq!(errors.len(), 3);
    }
}
