use bigdecimal::{BigDecimal, Zero};
use indexmap::IndexMap;
use std::collections::HashMap;

use crate::models::{CapacityViolation, Delivery, DeliveryArticle, NewArticle, OrderLine, ReconciliationRecord};

/// 按参考号汇总明细 (保持首次出现顺序)
pub fn aggregate_articles<'a, I>(articles: I) -> IndexMap<String, ReconciliationRecord>
where
    I: IntoIterator<Item = &'a DeliveryArticle>,
{
    let mut report: IndexMap<String, ReconciliationRecord> = IndexMap::new();
    for article in articles {
        report
            .entry(article.reference.clone())
            .or_insert_with(|| ReconciliationRecord::new(article.nom.clone(), article.reference.clone()))
            .add(&article.quantite, &article.conformite, article.remarques.as_deref());
    }
    report
}

/// 汇总某采购单号下所有到货单 (num_bc 不一致的到货单被忽略)
pub fn aggregate_deliveries(num_bc: &str, deliveries: &[Delivery]) -> IndexMap<String, ReconciliationRecord> {
    aggregate_articles(
        deliveries
            .iter()
            .filter(|d| d.num_bc.as_deref() == Some(num_bc))
            .flat_map(|d| d.articles.iter()),
    )
}

/// 参考号 → 订购数量，同一参考号以第一行为准
pub fn ordered_quantities(lines: &[OrderLine]) -> HashMap<&str, &BigDecimal> {
    let mut ordered = HashMap::with_capacity(lines.len());
    for line in lines {
        ordered.entry(line.reference.as_str()).or_insert(&line.quantite);
    }
    ordered
}

/// 超量校验: 已占用 (合格 + 争议) + 本次到货 不得超过订购数量
///
/// 同一参考号的多行本次到货先合并。订购数量为 0 (采购单不存在、未列出该参考号、
/// 或该行编码损坏) 时不做校验。返回全部超量明细。
pub fn check_capacity(
    order_lines: &[OrderLine],
    prior: &IndexMap<String, ReconciliationRecord>,
    incoming: &[NewArticle],
) -> Result<(), Vec<CapacityViolation>> {
    let ordered = ordered_quantities(order_lines);

    let mut incoming_by_ref: IndexMap<&str, (&str, BigDecimal)> = IndexMap::new();
    for article in incoming {
        let entry = incoming_by_ref
            .entry(article.reference.as_str())
            .or_insert_with(|| (article.nom.as_str(), BigDecimal::zero()));
        entry.1 += &article.quantite;
    }

    let mut violations = Vec::new();
    for (reference, (nom, quantity)) in incoming_by_ref {
        let Some(&ordered_qty) = ordered.get(reference) else {
            continue;
        };
        if *ordered_qty <= BigDecimal::zero() {
            continue;
        }

        let already = prior.get(reference).map(ReconciliationRecord::consumed).unwrap_or_else(BigDecimal::zero);
        if &already + &quantity > *ordered_qty {
            violations.push(CapacityViolation {
                nom: nom.to_string(),
                reference: reference.to_string(),
                ordered: ordered_qty.clone(),
                already_delivered: already,
                incoming: quantity,
            });
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

/// 订购数量减去已占用数量 (不低于 0)
pub fn remaining_quantity(ordered: &BigDecimal, prior: Option<&ReconciliationRecord>) -> BigDecimal {
    let consumed = prior.map(ReconciliationRecord::consumed).unwrap_or_else(BigDecimal::zero);
    let remaining = ordered - &consumed;
    if remaining < BigDecimal::zero() {
        BigDecimal::zero()
    } else {
        remaining
    }
}
