//! Merges ad-spend aggregates with CRM aggregates into one row per
//! dimension value. A value present on only one side still appears, with
//! the other side's metrics zero-filled; rows are never dropped for
//! partial data. Cross-source ratios are computed here, after the join,
//! from the merged raw sums.

use crate::store::{AdSpendAgg, BehaviorAgg, OrderAgg};
use std::collections::HashMap;

/// The uniform division policy for every derived metric: zero-over-zero
/// and anything-over-zero both resolve to 0, never an arithmetic error.
pub fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// A reconciled aggregate for one dimension value.
#[derive(Debug, Clone)]
pub struct MergedRow {
    pub attribute: String,
    pub metrics: HashMap<String, f64>,
}

fn spend_metrics(row: &AdSpendAgg) -> HashMap<String, f64> {
    HashMap::from([
        ("cost".to_string(), row.cost),
        ("impressions".to_string(), row.impressions as f64),
        ("clicks".to_string(), row.clicks as f64),
        ("ctr".to_string(), row.ctr),
        ("cpc".to_string(), row.cpc),
    ])
}

fn order_metrics(row: &OrderAgg) -> HashMap<String, f64> {
    HashMap::from([
        ("subscriptions".to_string(), row.subscriptions as f64),
        ("approved".to_string(), row.approved as f64),
        ("revenue".to_string(), row.revenue),
    ])
}

/// Derived cross-source metrics, recomputed from the merged sums — never
/// averaged from per-row ratios.
fn finish(mut metrics: HashMap<String, f64>) -> HashMap<String, f64> {
    let cost = metrics.get("cost").copied().unwrap_or(0.0);
    let subscriptions = metrics.get("subscriptions").copied().unwrap_or(0.0);
    let approved = metrics.get("approved").copied().unwrap_or(0.0);
    metrics.insert("cpa".to_string(), ratio(cost, subscriptions));
    metrics.insert("approval_rate".to_string(), ratio(approved, subscriptions));
    metrics
}

const SPEND_ZERO: [(&str, f64); 5] = [
    ("cost", 0.0),
    ("impressions", 0.0),
    ("clicks", 0.0),
    ("ctr", 0.0),
    ("cpc", 0.0),
];

const ORDER_ZERO: [(&str, f64); 3] = [("subscriptions", 0.0), ("approved", 0.0), ("revenue", 0.0)];

fn zero_fill(metrics: &mut HashMap<String, f64>, side: &[(&str, f64)]) {
    for (id, value) in side {
        metrics.insert(id.to_string(), *value);
    }
}

/// Full outer merge keyed by dimension value. Ad-spend ordering (already
/// sorted by the statement) is preserved; CRM-only values append in their
/// own query order.
pub fn merge(spend: &[AdSpendAgg], orders: &[OrderAgg]) -> Vec<MergedRow> {
    let by_attribute: HashMap<&str, &OrderAgg> = orders
        .iter()
        .map(|row| (row.attribute.as_str(), row))
        .collect();

    let mut merged = Vec::with_capacity(spend.len());
    for row in spend {
        let mut metrics = spend_metrics(row);
        match by_attribute.get(row.attribute.as_str()) {
            Some(order) => metrics.extend(order_metrics(order)),
            None => zero_fill(&mut metrics, &ORDER_ZERO),
        }
        merged.push(MergedRow {
            attribute: row.attribute.clone(),
            metrics: finish(metrics),
        });
    }

    let spend_attributes: std::collections::HashSet<&str> =
        spend.iter().map(|row| row.attribute.as_str()).collect();
    for order in orders {
        if spend_attributes.contains(order.attribute.as_str()) {
            continue;
        }
        let mut metrics = order_metrics(order);
        zero_fill(&mut metrics, &SPEND_ZERO);
        merged.push(MergedRow {
            attribute: order.attribute.clone(),
            metrics: finish(metrics),
        });
    }

    merged
}

/// Single-source conversion for CRM-only report families.
pub fn orders_rows(orders: &[OrderAgg]) -> Vec<MergedRow> {
    orders
        .iter()
        .map(|row| {
            let mut metrics = order_metrics(row);
            metrics.insert(
                "approval_rate".to_string(),
                ratio(row.approved as f64, row.subscriptions as f64),
            );
            MergedRow {
                attribute: row.attribute.clone(),
                metrics,
            }
        })
        .collect()
}

/// Single-source conversion for behavior-event report families.
pub fn behavior_rows(rows: &[BehaviorAgg]) -> Vec<MergedRow> {
    rows.iter()
        .map(|row| MergedRow {
            attribute: row.attribute.clone(),
            metrics: HashMap::from([
                ("events".to_string(), row.events as f64),
                ("visitors".to_string(), row.visitors as f64),
                ("conversions".to_string(), row.conversions as f64),
                ("conversion_rate".to_string(), row.conversion_rate),
            ]),
        })
        .collect()
}
