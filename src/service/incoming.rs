use bigdecimal::{BigDecimal, Zero};
use sqlx::PgPool;
use std::collections::HashMap;

use crate::db::queries;
use crate::error::AppError;
use crate::models::conformity::{BACK_ORDER, CONFORME, LITIGE, NON_CONTROLE};
use crate::models::incoming::{A_RECEVOIR, RECEPTIONNE};
use crate::models::{Delivery, DeliveryFilter, IncomingOrder, LineProgress, Order};
use crate::service::reconciliation::{aggregate_articles, remaining_quantity};

/// 根据关联到货单给采购单分类
///
/// 至少一张关联到货单的整单状态为 conforme 时为 receptionne, 否则为 a_recevoir。
/// 任一关联明细为 litige / back_order / non_controle 时带上对应标记, 与分类互不影响。
pub fn classify(order: Order, linked: &[&Delivery]) -> IncomingOrder {
    let articles: Vec<_> = linked.iter().flat_map(|d| d.articles.iter()).collect();

    let categorie = if linked.iter().any(|d| d.conformite == CONFORME) {
        RECEPTIONNE
    } else {
        A_RECEVOIR
    };

    let flags = [LITIGE, BACK_ORDER, NON_CONTROLE]
        .into_iter()
        .filter(|flag| articles.iter().any(|a| a.conformite == *flag))
        .collect();

    let aggregated = aggregate_articles(articles.iter().copied());
    let progression = order
        .items
        .iter()
        .map(|line| {
            let prior = aggregated.get(&line.reference);
            LineProgress {
                name: line.name.clone(),
                reference: line.reference.clone(),
                ordered: line.quantite.clone(),
                received: prior.map(|r| r.total.clone()).unwrap_or_else(BigDecimal::zero),
                remaining: remaining_quantity(&line.quantite, prior),
            }
        })
        .collect();

    IncomingOrder {
        order,
        categorie,
        flags,
        livraisons_count: linked.len(),
        progression,
    }
}

/// 全部采购单的收货状态
pub async fn list_incoming(pool: &PgPool) -> Result<Vec<IncomingOrder>, AppError> {
    let mut orders = queries::list_orders(pool, None).await?;
    if orders.is_empty() {
        return Ok(Vec::new());
    }

    let order_ids: Vec<i64> = orders.iter().map(|o| o.id).collect();
    let filter = DeliveryFilter {
        num_bcs: Some(orders.iter().map(|o| o.num_bc.clone()).collect()),
        ..Default::default()
    };
    let (lines, mut deliveries) = futures::try_join!(
        queries::list_order_lines(pool, &order_ids),
        queries::list_deliveries(pool, &filter),
    )?;
    queries::attach_order_lines(&mut orders, lines);

    let delivery_ids: Vec<i64> = deliveries.iter().map(|d| d.id).collect();
    let articles = queries::list_delivery_articles(pool, &delivery_ids).await?;
    queries::attach_articles(&mut deliveries, articles);

    let mut by_num_bc: HashMap<&str, Vec<&Delivery>> = HashMap::new();
    for delivery in &deliveries {
        if let Some(num_bc) = delivery.num_bc.as_deref() {
            by_num_bc.entry(num_bc).or_default().push(delivery);
        }
    }

    let incoming: Vec<IncomingOrder> = orders
        .into_iter()
        .map(|order| {
            let linked = by_num_bc.get(order.num_bc.as_str()).cloned().unwrap_or_default();
            classify(order, &linked)
        })
        .collect();

    tracing::debug!("待收货分类完成: {} 张采购单, {} 张到货单", incoming.len(), deliveries.len());
    Ok(incoming)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::conformity::AUTRE;
    use crate::models::{DeliveryArticle, OrderLine};
    use chrono::{NaiveDate, Utc};

    fn order(lines: Vec<OrderLine>) -> Order {
        Order {
            id: 1,
            num_bc: "BC-1".to_string(),
            fournisseur_id: 1,
            service_id: 1,
            destination: None,
            fulfilled: false,
            created_at: Utc::now(),
            items: lines,
        }
    }

    fn delivery(id: i64, articles: &[(&str, i64, &str)]) -> Delivery {
        let conformite = crate::service::resolve_conformity(articles.iter().map(|(_, _, c)| *c));
        Delivery {
            id,
            fournisseur_id: 1,
            fournisseur_nom: None,
            service_id: 1,
            service_nom: None,
            date_livraison: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            heure_arrivee: "08:30".to_string(),
            num_bc: Some("BC-1".to_string()),
            num_bl: None,
            type_livraison: "frais".to_string(),
            temp_frais: None,
            temp_congele: None,
            conformite: conformite.to_string(),
            remarques: None,
            created_at: Utc::now(),
            articles: articles
                .iter()
                .enumerate()
                .map(|(idx, (reference, qty, conformite))| DeliveryArticle {
                    id: idx as i64,
                    livraison_id: id,
                    nom: format!("Article {}", reference),
                    reference: reference.to_string(),
                    quantite: BigDecimal::from(*qty),
                    conformite: conformite.to_string(),
                    remarques: None,
                })
                .collect(),
        }
    }

    #[test]
    fn order_without_delivery_is_pending() {
        let incoming = classify(order(vec![OrderLine::new("Widget", "W1", BigDecimal::from(10))]), &[]);
        assert_eq!(incoming.categorie, A_RECEVOIR);
        assert!(incoming.flags.is_empty());
        assert_eq!(incoming.progression[0].remaining, BigDecimal::from(10));
        assert_eq!(incoming.progression[0].received, BigDecimal::zero());
    }

    #[test]
    fn all_conforme_is_received() {
        let d = delivery(1, &[("W1", 6, CONFORME), ("W2", 1, CONFORME)]);
        let incoming = classify(order(vec![OrderLine::new("Widget", "W1", BigDecimal::from(10))]), &[&d]);
        assert_eq!(incoming.categorie, RECEPTIONNE);
        assert_eq!(incoming.livraisons_count, 1);
        assert_eq!(incoming.progression[0].received, BigDecimal::from(6));
        assert_eq!(incoming.progression[0].remaining, BigDecimal::from(4));
    }

    #[test]
    fn flags_accumulate_across_deliveries() {
        let d1 = delivery(1, &[("W1", 2, LITIGE)]);
        let d2 = delivery(2, &[("W1", 1, BACK_ORDER), ("W2", 1, NON_CONTROLE)]);
        let incoming = classify(order(vec![]), &[&d1, &d2]);
        assert_eq!(incoming.categorie, A_RECEVOIR);
        assert_eq!(incoming.flags, vec![LITIGE, BACK_ORDER, NON_CONTROLE]);
    }

    #[test]
    fn other_line_does_not_block_conforme_delivery() {
        let d = delivery(1, &[("W1", 6, CONFORME), ("W2", 1, AUTRE)]);
        assert_eq!(d.conformite, CONFORME);
        let incoming = classify(order(vec![OrderLine::new("Widget", "W1", BigDecimal::from(10))]), &[&d]);
        assert_eq!(incoming.categorie, RECEPTIONNE);
        assert!(incoming.flags.is_empty());
    }

    #[test]
    fn conforme_and_disputed_deliveries_mix() {
        let ok = delivery(1, &[("W1", 4, CONFORME)]);
        let disputed = delivery(2, &[("W1", 2, LITIGE)]);
        for linked in [[&ok, &disputed], [&disputed, &ok]] {
            let incoming = classify(order(vec![OrderLine::new("Widget", "W1", BigDecimal::from(10))]), &linked);
            assert_eq!(incoming.categorie, RECEPTIONNE);
            assert_eq!(incoming.flags, vec![LITIGE]);
            assert_eq!(incoming.progression[0].remaining, BigDecimal::from(4));
        }
    }

    #[test]
    fn only_disputed_delivery_stays_pending() {
        let d = delivery(1, &[("W1", 2, LITIGE), ("W1", 3, CONFORME)]);
        let incoming = classify(order(vec![]), &[&d]);
        assert_eq!(incoming.categorie, A_RECEVOIR);
        assert_eq!(incoming.flags, vec![LITIGE]);
    }

    #[test]
    fn back_ordered_quantity_stays_remaining() {
        let d = delivery(1, &[("W1", 4, CONFORME), ("W1", 6, BACK_ORDER)]);
        let incoming = classify(order(vec![OrderLine::new("Widget", "W1", BigDecimal::from(10))]), &[&d]);
        assert_eq!(incoming.progression[0].received, BigDecimal::from(10));
        assert_eq!(incoming.progression[0].remaining, BigDecimal::from(6));
    }
}
