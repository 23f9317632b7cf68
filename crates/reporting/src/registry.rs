//! Dimension and metric registry — the closed allow-list of groupable
//! identifiers per report family. Every dimension id that reaches a query
//! must resolve here; identifiers are never assembled from caller input.

use serde::{Deserialize, Serialize};
use tracklens_core::error::{ReportError, ReportResult};

/// The report families the engine serves. Each family has its own
/// dimension map and source routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportFamily {
    /// Ad spend reconciled against attributed CRM orders.
    Advertising,
    /// CRM orders broken down by geography/product, baseline eligibility.
    Geography,
    /// On-page behavior events.
    OnPage,
    /// Session-level behavior events.
    Session,
}

/// Physical tables a statement can aggregate over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTable {
    AdSpend,
    CrmOrders,
    BehaviorEvents,
}

impl SourceTable {
    pub fn name(&self) -> &'static str {
        match self {
            SourceTable::AdSpend => "ad_spend",
            SourceTable::CrmOrders => "crm_orders",
            SourceTable::BehaviorEvents => "behavior_events",
        }
    }
}

/// A logical grouping key and its physical column expression per source.
/// A `None` expression means the dimension does not exist in that source.
#[derive(Debug, Clone, Copy)]
pub struct DimensionDef {
    pub id: &'static str,
    /// UI category; not load-bearing for query semantics.
    pub group: &'static str,
    /// Temporal dimensions force newest-first ordering in statements.
    pub temporal: bool,
    pub spend_expr: Option<&'static str>,
    pub orders_expr: Option<&'static str>,
    pub events_expr: Option<&'static str>,
}

impl DimensionDef {
    /// Physical expression of this dimension in the given source table.
    pub fn expr(&self, source: SourceTable) -> Option<&'static str> {
        match source {
            SourceTable::AdSpend => self.spend_expr,
            SourceTable::CrmOrders => self.orders_expr,
            SourceTable::BehaviorEvents => self.events_expr,
        }
    }
}

const fn dim(
    id: &'static str,
    group: &'static str,
    temporal: bool,
    spend_expr: Option<&'static str>,
    orders_expr: Option<&'static str>,
    events_expr: Option<&'static str>,
) -> DimensionDef {
    DimensionDef {
        id,
        group,
        temporal,
        spend_expr,
        orders_expr,
        events_expr,
    }
}

/// Advertising drill-down path: network → campaign → ad set → ad, plus
/// date and country. The CRM side carries the same tracking sub-ids
/// parsed at ingest, so both sources resolve every id.
static ADVERTISING_DIMENSIONS: &[DimensionDef] = &[
    dim("network", "traffic", false, Some("network"), Some("network"), None),
    dim("campaign", "traffic", false, Some("campaign"), Some("campaign"), None),
    dim("adset", "traffic", false, Some("adset"), Some("adset"), None),
    dim("ad", "traffic", false, Some("ad"), Some("ad"), None),
    dim("date", "time", true, Some("spend_date"), Some("order_date"), None),
    dim("country", "geo", false, Some("country"), Some("country"), None),
];

static GEOGRAPHY_DIMENSIONS: &[DimensionDef] = &[
    dim("country", "geo", false, None, Some("country"), None),
    dim("product", "catalog", false, None, Some("product"), None),
    dim("date", "time", true, None, Some("order_date"), None),
    dim("source", "traffic", false, None, Some("source"), None),
];

static ONPAGE_DIMENSIONS: &[DimensionDef] = &[
    dim("page", "content", false, None, None, Some("page_path")),
    dim("referrer", "traffic", false, None, None, Some("referrer")),
    dim("date", "time", true, None, None, Some("event_date")),
    dim("country", "geo", false, None, None, Some("country")),
];

static SESSION_DIMENSIONS: &[DimensionDef] = &[
    dim("device", "tech", false, None, None, Some("device_type")),
    dim("browser", "tech", false, None, None, Some("browser")),
    dim("os", "tech", false, None, None, Some("os")),
    dim("date", "time", true, None, None, Some("event_date")),
    dim("country", "geo", false, None, None, Some("country")),
];

pub fn dimensions(family: ReportFamily) -> &'static [DimensionDef] {
    match family {
        ReportFamily::Advertising => ADVERTISING_DIMENSIONS,
        ReportFamily::Geography => GEOGRAPHY_DIMENSIONS,
        ReportFamily::OnPage => ONPAGE_DIMENSIONS,
        ReportFamily::Session => SESSION_DIMENSIONS,
    }
}

/// Look up a dimension id in the family's map. Unknown ids are a hard
/// validation failure, never silently ignored.
pub fn resolve_dimension(family: ReportFamily, id: &str) -> ReportResult<&'static DimensionDef> {
    dimensions(family)
        .iter()
        .find(|d| d.id == id)
        .ok_or_else(|| ReportError::UnknownDimension(id.to_string()))
}

/// The temporal dimension of a family, used for date-range filtering in
/// every statement regardless of the grouped dimension.
pub fn date_column(family: ReportFamily, source: SourceTable) -> ReportResult<&'static str> {
    dimensions(family)
        .iter()
        .find(|d| d.temporal)
        .and_then(|d| d.expr(source))
        .ok_or_else(|| {
            ReportError::UnknownDimension(format!(
                "no temporal dimension for {:?} in {}",
                family,
                source.name()
            ))
        })
}

/// Metric ids a caller may sort by, per source. Sorting is resolved
/// against this list only; anything else falls back to the default sort.
pub fn sortable_metrics(source: SourceTable) -> &'static [&'static str] {
    match source {
        SourceTable::AdSpend => &["cost", "impressions", "clicks", "ctr", "cpc"],
        SourceTable::CrmOrders => &["subscriptions", "approved", "revenue"],
        SourceTable::BehaviorEvents => &["events", "visitors", "conversions", "conversion_rate"],
    }
}

/// Default sort metric per source, applied when the caller specifies
/// nothing (or something outside the allow-list).
pub fn default_sort_metric(source: SourceTable) -> &'static str {
    match source {
        SourceTable::AdSpend => "cost",
        SourceTable::CrmOrders => "subscriptions",
        SourceTable::BehaviorEvents => "events",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_known_dimension() {
        let def = resolve_dimension(ReportFamily::Advertising, "campaign").unwrap();
        assert_eq!(def.expr(SourceTable::AdSpend), Some("campaign"));
        assert_eq!(def.expr(SourceTable::CrmOrders), Some("campaign"));
        assert_eq!(def.expr(SourceTable::BehaviorEvents), None);
    }

    #[test]
    fn test_unknown_dimension_is_hard_failure() {
        let err = resolve_dimension(ReportFamily::Advertising, "product").unwrap_err();
        assert!(matches!(err, ReportError::UnknownDimension(id) if id == "product"));
    }

    #[test]
    fn test_families_have_distinct_maps() {
        // "product" groups CRM orders but is meaningless for ad spend.
        assert!(resolve_dimension(ReportFamily::Geography, "product").is_ok());
        assert!(resolve_dimension(ReportFamily::Advertising, "product").is_err());
        assert!(resolve_dimension(ReportFamily::Session, "device").is_ok());
        assert!(resolve_dimension(ReportFamily::OnPage, "device").is_err());
    }

    #[test]
    fn test_date_column_is_source_specific() {
        assert_eq!(
            date_column(ReportFamily::Advertising, SourceTable::AdSpend).unwrap(),
            "spend_date"
        );
        assert_eq!(
            date_column(ReportFamily::Advertising, SourceTable::CrmOrders).unwrap(),
            "order_date"
        );
        assert_eq!(
            date_column(ReportFamily::Session, SourceTable::BehaviorEvents).unwrap(),
            "event_date"
        );
    }

    #[test]
    fn test_every_family_has_exactly_one_temporal_dimension() {
        for family in [
            ReportFamily::Advertising,
            ReportFamily::Geography,
            ReportFamily::OnPage,
            ReportFamily::Session,
        ] {
            let count = dimensions(family).iter().filter(|d| d.temporal).count();
            assert_eq!(count, 1, "{family:?}");
        }
    }
}
