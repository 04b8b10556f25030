// Property-based tests for the reconciliation aggregator and conformity resolver.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000

use bigdecimal::{BigDecimal, Zero};
use proptest::prelude::*;

use logistique_bc_rust::models::conformity::{AUTRE, BACK_ORDER, CONFORME, LITIGE, NON_CONTROLE};
use logistique_bc_rust::models::{DeliveryArticle, NewArticle, OrderLine};
use logistique_bc_rust::service::reconciliation::{aggregate_articles, check_capacity};
use logistique_bc_rust::service::resolve_conformity;

fn config_256() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

fn arb_outcome() -> impl Strategy<Value = String> {
    prop_oneof![
        4 => Just(CONFORME.to_string()),
        2 => Just(LITIGE.to_string()),
        2 => Just(BACK_ORDER.to_string()),
        1 => Just(NON_CONTROLE.to_string()),
        1 => Just(AUTRE.to_string()),
        1 => r"[a-z_]{1,8}",
    ]
}

fn arb_article() -> impl Strategy<Value = DeliveryArticle> {
    (prop::sample::select(vec!["W1", "W2", "G1"]), 0i64..500, 0u32..3, arb_outcome()).prop_map(
        |(reference, qty, scale, conformite)| DeliveryArticle {
            id: 0,
            livraison_id: 0,
            nom: format!("Article {}", reference),
            reference: reference.to_string(),
            quantite: BigDecimal::new(qty.into(), scale as i64),
            conformite,
            remarques: None,
        },
    )
}

fn is_known(outcome: &str) -> bool {
    [CONFORME, LITIGE, BACK_ORDER, NON_CONTROLE].contains(&outcome)
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    #[test]
    fn total_is_sum_of_line_quantities(articles in prop::collection::vec(arb_article(), 0..40)) {
        let report = aggregate_articles(&articles);
        for (reference, record) in &report {
            let expected = articles
                .iter()
                .filter(|a| &a.reference == reference)
                .fold(BigDecimal::zero(), |acc, a| acc + &a.quantite);
            prop_assert_eq!(&record.total, &expected);
        }
        let distinct: std::collections::HashSet<_> = articles.iter().map(|a| a.reference.as_str()).collect();
        prop_assert_eq!(report.len(), distinct.len());
    }

    #[test]
    fn buckets_never_exceed_total(articles in prop::collection::vec(arb_article(), 0..40)) {
        let report = aggregate_articles(&articles);
        for (reference, record) in &report {
            let buckets = &record.good + &record.disputed + &record.back_ordered + &record.uninspected;
            prop_assert!(buckets <= record.total);

            let all_known = articles
                .iter()
                .filter(|a| &a.reference == reference)
                .all(|a| is_known(&a.conformite));
            if all_known {
                prop_assert_eq!(&buckets, &record.total);
            }
        }
    }

    #[test]
    fn non_controle_dominates(mut outcomes in prop::collection::vec(arb_outcome(), 0..12), pos in 0usize..12) {
        let pos = pos.min(outcomes.len());
        outcomes.insert(pos, NON_CONTROLE.to_string());
        prop_assert_eq!(resolve_conformity(outcomes.iter().map(String::as_str)), NON_CONTROLE);
    }

    #[test]
    fn accepted_delivery_stays_within_order(
        prior in prop::collection::vec(arb_article(), 0..20),
        qty in 0i64..200,
        ordered in 1i64..300,
    ) {
        let order = vec![OrderLine::new("Widget", "W1", BigDecimal::from(ordered))];
        let aggregated = aggregate_articles(&prior);
        let incoming = vec![NewArticle {
            nom: "Widget".to_string(),
            reference: "W1".to_string(),
            quantite: BigDecimal::from(qty),
            conformite: CONFORME.to_string(),
            remarques: None,
        }];

        let consumed = aggregated
            .get("W1")
            .map(|r| &r.good + &r.disputed)
            .unwrap_or_else(BigDecimal::zero);
        let fits = &consumed + BigDecimal::from(qty) <= BigDecimal::from(ordered);
        prop_assert_eq!(check_capacity(&order, &aggregated, &incoming).is_ok(), fits);
    }
}
