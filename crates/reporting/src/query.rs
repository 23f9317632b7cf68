//! Builds one parameterized aggregation statement per drill-down depth.
//!
//! Identifiers (tables, columns) come only from the registry's closed maps;
//! every variable value crosses the boundary as a `?` bind in declaration
//! order. The statement text never contains a caller-supplied literal.

use crate::eligibility::{self, EligibilityLevel};
use crate::registry::{self, ReportFamily, SourceTable};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracklens_core::config::ReportingConfig;
use tracklens_core::error::{ReportError, ReportResult};
use tracklens_core::types::{DateRange, SortDirection};

/// A value bound to a `?` placeholder. Dates bind as ISO-8601 strings,
/// which ClickHouse coerces against `Date` columns.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Str(String),
    Date(NaiveDate),
}

impl ParamValue {
    pub fn render(&self) -> String {
        match self {
            ParamValue::Str(s) => s.clone(),
            ParamValue::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }
}

/// A statement plus its bind values, placeholder order matching
/// parameter order.
#[derive(Debug, Clone)]
pub struct PreparedQuery {
    pub sql: String,
    pub params: Vec<ParamValue>,
}

impl PreparedQuery {
    pub fn placeholder_count(&self) -> usize {
        self.sql.matches('?').count()
    }
}

#[derive(Debug, Clone)]
pub struct QueryOptions<'a> {
    pub family: ReportFamily,
    pub source: SourceTable,
    pub date_range: DateRange,
    pub dimensions: &'a [String],
    pub depth: usize,
    pub parent_filters: &'a BTreeMap<String, String>,
    pub sort_by: Option<&'a str>,
    pub sort_direction: SortDirection,
    pub limit: Option<u32>,
    /// Eligibility applied when the source is CRM orders.
    pub eligibility: EligibilityLevel,
}

/// Aggregate SELECT list per source. Raw metrics are summed; derived
/// metrics are recomputed from the summed components inside the same
/// statement, with division by zero resolving to the zero sentinel.
fn select_list(source: SourceTable) -> &'static str {
    match source {
        SourceTable::AdSpend => {
            "sum(cost) AS cost, \
             sum(impressions) AS impressions, \
             sum(clicks) AS clicks, \
             if(sum(impressions) = 0, 0, sum(clicks) / sum(impressions)) AS ctr, \
             if(sum(clicks) = 0, 0, sum(cost) / sum(clicks)) AS cpc"
        }
        SourceTable::CrmOrders => {
            "count() AS subscriptions, \
             countIf(status = 'approved') AS approved, \
             sum(amount) AS revenue"
        }
        SourceTable::BehaviorEvents => {
            "count() AS events, \
             uniqExact(visitor_id) AS visitors, \
             countIf(converted = 1) AS conversions, \
             if(count() = 0, 0, countIf(converted = 1) / count()) AS conversion_rate"
        }
    }
}

pub fn build_query(opts: &QueryOptions, config: &ReportingConfig) -> ReportResult<PreparedQuery> {
    opts.date_range.validate()?;

    if opts.depth >= opts.dimensions.len() {
        return Err(ReportError::DepthOutOfRange {
            depth: opts.depth,
            dimensions: opts.dimensions.len(),
        });
    }

    // Resolve the whole path up front so an unknown id anywhere in the
    // request fails before any SQL is assembled.
    for id in opts.dimensions {
        registry::resolve_dimension(opts.family, id)?;
    }

    let current = registry::resolve_dimension(opts.family, &opts.dimensions[opts.depth])?;
    let group_expr = current.expr(opts.source).ok_or_else(|| {
        ReportError::UnknownDimension(format!(
            "{} not available in {}",
            current.id,
            opts.source.name()
        ))
    })?;

    let date_col = registry::date_column(opts.family, opts.source)?;

    let mut sql = format!(
        "SELECT toString({group_expr}) AS attribute, {} FROM {} WHERE {date_col} >= ? AND {date_col} <= ?",
        select_list(opts.source),
        opts.source.name(),
    );
    let mut params = vec![
        ParamValue::Date(opts.date_range.start),
        ParamValue::Date(opts.date_range.end),
    ];

    // One equality condition per ancestor value, keyed order for
    // deterministic statement text.
    for (id, value) in opts.parent_filters {
        let def = registry::resolve_dimension(opts.family, id)?;
        let expr = def.expr(opts.source).ok_or_else(|| {
            ReportError::UnknownDimension(format!("{id} not available in {}", opts.source.name()))
        })?;
        sql.push_str(&format!(" AND toString({expr}) = ?"));
        params.push(ParamValue::Str(value.clone()));
    }

    if opts.source == SourceTable::CrmOrders {
        sql.push_str(&format!(" AND {}", eligibility::sql_condition(opts.eligibility)));
    }

    sql.push_str(" GROUP BY attribute");

    // Temporal dimensions always read newest-first; otherwise honor the
    // caller's sort when it names a known metric, defaulting per source.
    if current.temporal {
        sql.push_str(" ORDER BY attribute DESC");
    } else {
        let sort_col = opts
            .sort_by
            .filter(|candidate| registry::sortable_metrics(opts.source).contains(candidate))
            .unwrap_or_else(|| registry::default_sort_metric(opts.source));
        sql.push_str(&format!(
            " ORDER BY {sort_col} {}, attribute ASC",
            opts.sort_direction.as_sql()
        ));
    }

    let limit = opts
        .limit
        .unwrap_or(config.default_limit)
        .clamp(1, config.max_limit);
    sql.push_str(&format!(" LIMIT {limit}"));

    Ok(PreparedQuery { sql, params })
}
