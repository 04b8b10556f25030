use bigdecimal::{BigDecimal, Zero};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 到货单 (livraison)
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Delivery {
    pub id: i64,
    pub fournisseur_id: i64,
    pub fournisseur_nom: Option<String>,
    pub service_id: i64,
    pub service_nom: Option<String>,
    pub date_livraison: NaiveDate,
    pub heure_arrivee: String,
    #[serde(rename = "numBC")]
    pub num_bc: Option<String>,
    #[serde(rename = "numBL")]
    pub num_bl: Option<String>,
    #[serde(rename = "type")]
    pub type_livraison: String,
    pub temp_frais: Option<f64>,
    pub temp_congele: Option<f64>,
    /// 整单合格状态，由明细推导，不可直接写入
    pub conformite: String,
    pub remarques: Option<String>,
    pub created_at: DateTime<Utc>,
    #[sqlx(skip)]
    #[serde(default)]
    pub articles: Vec<DeliveryArticle>,
}

/// 到货明细行
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryArticle {
    pub id: i64,
    pub livraison_id: i64,
    pub nom: String,
    pub reference: String,
    #[serde(with = "super::serde_helpers::decimal_number")]
    pub quantite: BigDecimal,
    pub conformite: String,
    pub remarques: Option<String>,
}

/// 到货请求体 (新增和修改共用)
///
/// 客户端提交的 `conformite` 字段被忽略。
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryInput {
    pub fournisseur_id: Option<i64>,
    pub service_id: Option<i64>,
    pub date_livraison: Option<NaiveDate>,
    pub heure_arrivee: Option<String>,
    #[serde(rename = "numBC")]
    pub num_bc: Option<String>,
    #[serde(rename = "numBL")]
    pub num_bl: Option<String>,
    #[serde(rename = "type")]
    pub type_livraison: Option<String>,
    pub temp_frais: Option<f64>,
    pub temp_congele: Option<f64>,
    pub remarques: Option<String>,
    #[serde(default)]
    pub articles: Vec<ArticleInput>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleInput {
    #[serde(default)]
    pub nom: String,
    #[serde(default)]
    pub reference: String,
    #[serde(alias = "quantite")]
    pub quantite_recue: Option<BigDecimal>,
    pub conformite: Option<String>,
    pub remarques: Option<String>,
}

/// 校验后的到货单
#[derive(Debug, Clone)]
pub struct NewDelivery {
    pub fournisseur_id: i64,
    pub service_id: i64,
    pub date_livraison: NaiveDate,
    pub heure_arrivee: String,
    pub num_bc: Option<String>,
    pub num_bl: Option<String>,
    pub type_livraison: String,
    pub temp_frais: Option<f64>,
    pub temp_congele: Option<f64>,
    pub remarques: Option<String>,
    pub articles: Vec<NewArticle>,
}

#[derive(Debug, Clone)]
pub struct NewArticle {
    pub nom: String,
    pub reference: String,
    pub quantite: BigDecimal,
    pub conformite: String,
    pub remarques: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl DeliveryInput {
    /// 校验必填字段，所有错误一次性返回 (明细行按序号和名称列出)
    pub fn validate(self) -> Result<NewDelivery, Vec<String>> {
        let mut errors = Vec::new();

        if self.fournisseur_id.is_none() {
            errors.push("fournisseurId is required".to_string());
        }
        if self.service_id.is_none() {
            errors.push("serviceId is required".to_string());
        }
        if self.date_livraison.is_none() {
            errors.push("dateLivraison is required".to_string());
        }
        let heure_arrivee = non_blank(self.heure_arrivee);
        if heure_arrivee.is_none() {
            errors.push("heureArrivee is required".to_string());
        }
        let type_livraison = non_blank(self.type_livraison);
        if type_livraison.is_none() {
            errors.push("type is required".to_string());
        }

        let mut articles = Vec::with_capacity(self.articles.len());
        for (idx, a) in self.articles.into_iter().enumerate() {
            let label = if a.nom.is_empty() { a.reference.clone() } else { a.nom.clone() };
            let quantite = match a.quantite_recue {
                Some(q) if q >= BigDecimal::zero() => Some(q),
                Some(_) => {
                    errors.push(format!("article #{} \"{}\": quantiteRecue must not be negative", idx + 1, label));
                    None
                }
                None => {
                    errors.push(format!("article #{} \"{}\": quantiteRecue is required", idx + 1, label));
                    None
                }
            };
            // 按原样保存, 对账按标签精确匹配
            let conformite = a.conformite.filter(|c| !c.trim().is_empty());
            if conformite.is_none() {
                errors.push(format!("article #{} \"{}\": conformite is required", idx + 1, label));
            }
            if let (Some(quantite), Some(conformite)) = (quantite, conformite) {
                articles.push(NewArticle {
                    nom: a.nom,
                    reference: a.reference,
                    quantite,
                    conformite,
                    remarques: a.remarques,
                });
            }
        }

        match (self.fournisseur_id, self.service_id, self.date_livraison, heure_arrivee, type_livraison) {
            (Some(fournisseur_id), Some(service_id), Some(date_livraison), Some(heure_arrivee), Some(type_livraison))
                if errors.is_empty() =>
            {
                Ok(NewDelivery {
                    fournisseur_id,
                    service_id,
                    date_livraison,
                    heure_arrivee,
                    num_bc: non_blank(self.num_bc),
                    num_bl: non_blank(self.num_bl),
                    type_livraison,
                    temp_frais: self.temp_frais,
                    temp_congele: self.temp_congele,
                    remarques: self.remarques,
                    articles,
                })
            }
            _ => Err(errors),
        }
    }
}

/// 到货单列表过滤条件
#[derive(Debug, Clone, Default)]
pub struct DeliveryFilter {
    pub date_debut: Option<NaiveDate>,
    pub date_fin: Option<NaiveDate>,
    pub fournisseur_id: Option<i64>,
    pub service_id: Option<i64>,
    pub conformite: Option<String>,
    pub q: Option<String>,
    pub num_bcs: Option<Vec<String>>,
}

impl DeliveryFilter {
    /// `numBCs` 参数: JSON 数组字符串，非法 JSON 时视为单个值
    pub fn parse_num_bcs(raw: &str) -> Vec<String> {
        serde_json::from_str::<Vec<String>>(raw).unwrap_or_else(|_| vec![raw.to_string()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn valid_input() -> DeliveryInput {
        serde_json::from_value(serde_json::json!({
            "fournisseurId": 1,
            "serviceId": 2,
            "dateLivraison": "2024-03-04",
            "heureArrivee": "08:30",
            "numBC": "BC-1",
            "type": "frais",
            "conformite": "conforme",
            "articles": [
                {"nom": "Widget", "reference": "W1", "quantiteRecue": 6, "conformite": "conforme"}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn valid_input_passes() {
        let delivery = valid_input().validate().unwrap();
        assert_eq!(delivery.num_bc.as_deref(), Some("BC-1"));
        assert_eq!(delivery.articles.len(), 1);
        assert_eq!(delivery.articles[0].quantite, BigDecimal::from_str("6").unwrap());
    }

    #[test]
    fn quantite_alias_is_accepted() {
        let article: ArticleInput =
            serde_json::from_str(r#"{"nom": "Widget", "reference": "W1", "quantite": 2, "conformite": "litige"}"#)
                .unwrap();
        assert_eq!(article.quantite_recue, Some(BigDecimal::from(2)));
    }

    #[test]
    fn blank_order_reference_is_standalone() {
        let mut input = valid_input();
        input.num_bc = Some("  ".to_string());
        assert!(input.validate().unwrap().num_bc.is_none());
    }

    #[test]
    fn missing_article_fields_are_reported_per_article() {
        let mut input = valid_input();
        input.articles.push(ArticleInput {
            nom: "Bolt".to_string(),
            reference: "B2".to_string(),
            quantite_recue: None,
            conformite: None,
            remarques: None,
        });
        let errors = input.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| e.starts_with("article #2 \"Bolt\"")));
    }

    #[test]
    fn negative_quantity_is_rejected() {
        let mut input = valid_input();
        input.articles[0].quantite_recue = Some(BigDecimal::from(-1));
        let errors = input.validate().unwrap_err();
        assert_eq!(errors, vec!["article #1 \"Widget\": quantiteRecue must not be negative".to_string()]);
    }

    #[test]
    fn article_outcome_is_stored_as_sent() {
        let mut input = valid_input();
        input.articles[0].conformite = Some(" litige".to_string());
        let delivery = input.validate().unwrap();
        assert_eq!(delivery.articles[0].conformite, " litige");

        let mut input = valid_input();
        input.articles[0].conformite = Some("   ".to_string());
        let errors = input.validate().unwrap_err();
        assert_eq!(errors, vec!["article #1 \"Widget\": conformite is required".to_string()]);
    }

    #[test]
    fn missing_header_fields_are_reported() {
        let errors = DeliveryInput::default().validate().unwrap_err();
        assert_eq!(errors.len(), 5);
    }

    #[test]
    fn num_bcs_accepts_json_or_plain_value() {
        assert_eq!(DeliveryFilter::parse_num_bcs(r#"["BC-1","BC-2"]"#), vec!["BC-1", "BC-2"]);
        assert_eq!(DeliveryFilter::parse_num_bcs("BC-9"), vec!["BC-9"]);
    }
}
