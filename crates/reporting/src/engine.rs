//! The report service facade: one call per expand-one-level interaction.
//!
//! Each request is stateless; drill-down tree state lives with the caller.
//! A reconciled report runs its two source queries concurrently and merges
//! only after both succeed — a failed or cancelled source fails the whole
//! request, never a partially merged level.

use crate::dates::{self, ResolvedView, SavedView};
use crate::eligibility::EligibilityLevel;
use crate::query::{self, QueryOptions};
use crate::reconcile::{self, MergedRow};
use crate::registry::{self, ReportFamily, SourceTable};
use crate::store::ReportStore;
use crate::tree::{self, ReportRow};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info};
use tracklens_core::config::ReportingConfig;
use tracklens_core::error::{ReportError, ReportResult};
use tracklens_core::types::{CallerIdentity, DateRange, SortDirection};

/// One expand-one-level request. `parent_key` is the drill key of the row
/// being expanded (`None` for the root level); ancestor equality filters
/// are derived from it, and `filters` adds any further conditions a saved
/// view carries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRequest {
    pub family: ReportFamily,
    pub dimensions: Vec<String>,
    pub depth: usize,
    pub date_range: DateRange,
    #[serde(default)]
    pub parent_key: Option<String>,
    #[serde(default)]
    pub filters: BTreeMap<String, String>,
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub sort_direction: SortDirection,
    #[serde(default)]
    pub limit: Option<u32>,
}

pub struct ReportEngine<S> {
    store: Arc<S>,
    config: ReportingConfig,
}

impl<S: ReportStore> ReportEngine<S> {
    pub fn new(store: Arc<S>, config: ReportingConfig) -> Self {
        Self { store, config }
    }

    /// Serve one drill-down level for the request.
    pub async fn query(
        &self,
        req: &ReportRequest,
        caller: &CallerIdentity,
    ) -> ReportResult<Vec<ReportRow>> {
        let result = self.query_inner(req).await;
        match &result {
            Ok(rows) => {
                metrics::counter!("reports.executed").increment(1);
                metrics::counter!("reports.rows").increment(rows.len() as u64);
                info!(
                    user = %caller.email,
                    family = ?req.family,
                    depth = req.depth,
                    rows = rows.len(),
                    "report level served"
                );
            }
            Err(e) => {
                metrics::counter!("reports.failed").increment(1);
                error!(
                    user = %caller.email,
                    family = ?req.family,
                    depth = req.depth,
                    error = %e,
                    "report request failed"
                );
            }
        }
        result
    }

    async fn query_inner(&self, req: &ReportRequest) -> ReportResult<Vec<ReportRow>> {
        req.date_range.validate()?;
        let filters = self.ancestor_filters(req)?;

        let merged = match req.family {
            ReportFamily::Advertising => {
                let spend_query =
                    self.build(req, SourceTable::AdSpend, EligibilityLevel::Attribution, &filters)?;
                let orders_query = self.build(
                    req,
                    SourceTable::CrmOrders,
                    EligibilityLevel::Attribution,
                    &filters,
                )?;
                let (spend, orders) = tokio::join!(
                    self.store.fetch_ad_spend(&spend_query),
                    self.store.fetch_orders(&orders_query)
                );
                reconcile::merge(&spend?, &orders?)
            }
            ReportFamily::Geography => {
                let orders_query = self.build(
                    req,
                    SourceTable::CrmOrders,
                    EligibilityLevel::Baseline,
                    &filters,
                )?;
                reconcile::orders_rows(&self.store.fetch_orders(&orders_query).await?)
            }
            ReportFamily::OnPage | ReportFamily::Session => {
                let events_query = self.build(
                    req,
                    SourceTable::BehaviorEvents,
                    EligibilityLevel::Baseline,
                    &filters,
                )?;
                reconcile::behavior_rows(&self.store.fetch_behavior(&events_query).await?)
            }
        };

        self.assemble(req, merged)
    }

    /// Equality filters for the requested level: the expanded row's value
    /// sequence, plus any extra saved-view filters (ancestors win on
    /// collision).
    fn ancestor_filters(&self, req: &ReportRequest) -> ReportResult<BTreeMap<String, String>> {
        let mut filters = match &req.parent_key {
            Some(key) => {
                let ancestors = tree::build_parent_filters(key, &req.dimensions)?;
                if ancestors.len() != req.depth {
                    return Err(ReportError::ReconciliationMismatch(format!(
                        "parent key {key:?} holds {} values but depth {} was requested",
                        ancestors.len(),
                        req.depth
                    )));
                }
                ancestors
            }
            None => {
                if req.depth != 0 {
                    return Err(ReportError::ReconciliationMismatch(format!(
                        "depth {} requested without a parent key",
                        req.depth
                    )));
                }
                BTreeMap::new()
            }
        };

        for (id, value) in &req.filters {
            filters.entry(id.clone()).or_insert_with(|| value.clone());
        }
        Ok(filters)
    }

    fn build(
        &self,
        req: &ReportRequest,
        source: SourceTable,
        eligibility: EligibilityLevel,
        filters: &BTreeMap<String, String>,
    ) -> ReportResult<query::PreparedQuery> {
        query::build_query(
            &QueryOptions {
                family: req.family,
                source,
                date_range: req.date_range,
                dimensions: &req.dimensions,
                depth: req.depth,
                parent_filters: filters,
                sort_by: req.sort_by.as_deref(),
                sort_direction: req.sort_direction,
                limit: req.limit,
                eligibility,
            },
            &self.config,
        )
    }

    fn assemble(&self, req: &ReportRequest, merged: Vec<MergedRow>) -> ReportResult<Vec<ReportRow>> {
        let has_children = req.depth + 1 < req.dimensions.len();
        let mut rows = Vec::with_capacity(merged.len());
        for item in merged {
            let key = tree::encode_child_key(req.parent_key.as_deref(), &item.attribute)?;
            let row = ReportRow {
                key,
                attribute: item.attribute,
                depth: req.depth,
                has_children,
                metrics: item.metrics,
                children: Vec::new(),
            };
            tree::check_consistency(&row)?;
            rows.push(row);
        }
        Ok(rows)
    }

    /// Resolve a saved view into concrete query parameters, re-validating
    /// its dimension and filter ids against the registry.
    pub fn resolve_saved_view(&self, view: &SavedView) -> ReportResult<ResolvedView> {
        self.resolve_saved_view_on(Utc::now().date_naive(), view)
    }

    pub fn resolve_saved_view_on(
        &self,
        today: chrono::NaiveDate,
        view: &SavedView,
    ) -> ReportResult<ResolvedView> {
        let resolved = dates::resolve_view_on(today, view)?;
        for id in &resolved.dimensions {
            registry::resolve_dimension(resolved.family, id)?;
        }
        for id in resolved.filters.keys() {
            registry::resolve_dimension(resolved.family, id)?;
        }
        Ok(resolved)
    }
}
