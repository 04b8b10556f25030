use bigdecimal::{BigDecimal, ToPrimitive};
use serde::{Deserialize, Deserializer, Serializer};

/// 数量以 JSON 数字输出 (整数不带小数点), 读取时数字和字符串均可
pub mod decimal_number {
    use super::*;

    pub fn serialize<S>(value: &BigDecimal, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if value.is_integer() {
            if let Some(n) = value.to_i64() {
                return serializer.serialize_i64(n);
            }
        }
        match value.to_f64().filter(|f| f.is_finite()) {
            Some(f) => serializer.serialize_f64(f),
            None => serializer.serialize_str(&value.to_string()),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BigDecimal, D::Error>
    where
        D: Deserializer<'de>,
    {
        BigDecimal::deserialize(deserializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;
    use std::str::FromStr;

    #[derive(Serialize, Deserialize)]
    struct Qty {
        #[serde(with = "decimal_number")]
        q: BigDecimal,
    }

    #[test]
    fn integers_and_fractions_are_numbers() {
        let whole = serde_json::to_value(Qty { q: BigDecimal::from(6) }).unwrap();
        assert_eq!(whole, serde_json::json!({"q": 6}));

        let half = serde_json::to_value(Qty { q: BigDecimal::from_str("2.5").unwrap() }).unwrap();
        assert_eq!(half, serde_json::json!({"q": 2.5}));
    }

    #[test]
    fn reads_number_or_string() {
        let from_number: Qty = serde_json::from_str(r#"{"q": 3}"#).unwrap();
        let from_string: Qty = serde_json::from_str(r#"{"q": "3"}"#).unwrap();
        assert_eq!(from_number.q, BigDecimal::from(3));
        assert_eq!(from_string.q, BigDecimal::from(3));
    }
}
