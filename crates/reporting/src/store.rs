//! Backing-store boundary. One async fetch per source family, typed row
//! structs matching the fixed SELECT lists the query builder emits, and a
//! ClickHouse implementation that binds parameters in declaration order.

use crate::query::{ParamValue, PreparedQuery};
use async_trait::async_trait;
use clickhouse::Row;
use serde::{Deserialize, Serialize};
use tracklens_core::config::ClickHouseConfig;
use tracklens_core::error::{ReportError, ReportResult};

/// One ad-spend aggregate per dimension value. Field order matches the
/// statement's SELECT list.
#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct AdSpendAgg {
    pub attribute: String,
    pub cost: f64,
    pub impressions: u64,
    pub clicks: u64,
    pub ctr: f64,
    pub cpc: f64,
}

/// One CRM order aggregate per dimension value, already filtered by the
/// statement's eligibility condition.
#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct OrderAgg {
    pub attribute: String,
    pub subscriptions: u64,
    pub approved: u64,
    pub revenue: f64,
}

/// One behavior-event aggregate per dimension value.
#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct BehaviorAgg {
    pub attribute: String,
    pub events: u64,
    pub visitors: u64,
    pub conversions: u64,
    pub conversion_rate: f64,
}

/// Read-only aggregation boundary. Implementations execute exactly the
/// prepared statement they are handed; no retries happen at this layer.
#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn fetch_ad_spend(&self, query: &PreparedQuery) -> ReportResult<Vec<AdSpendAgg>>;
    async fn fetch_orders(&self, query: &PreparedQuery) -> ReportResult<Vec<OrderAgg>>;
    async fn fetch_behavior(&self, query: &PreparedQuery) -> ReportResult<Vec<BehaviorAgg>>;
}

/// ClickHouse-backed store.
pub struct ClickHouseStore {
    client: clickhouse::Client,
}

impl ClickHouseStore {
    pub fn new(config: &ClickHouseConfig) -> Self {
        let client = clickhouse::Client::default()
            .with_url(&config.url)
            .with_database(&config.database);
        Self { client }
    }

    fn bind_all(&self, query: &PreparedQuery) -> clickhouse::query::Query {
        let mut bound = self.client.query(&query.sql);
        for param in &query.params {
            bound = match param {
                ParamValue::Str(s) => bound.bind(s.as_str()),
                // Dates cross as ISO strings; ClickHouse coerces them
                // against Date columns.
                ParamValue::Date(_) => bound.bind(param.render()),
            };
        }
        bound
    }
}

#[async_trait]
impl ReportStore for ClickHouseStore {
    async fn fetch_ad_spend(&self, query: &PreparedQuery) -> ReportResult<Vec<AdSpendAgg>> {
        self.bind_all(query)
            .fetch_all::<AdSpendAgg>()
            .await
            .map_err(|e| ReportError::BackingStore(e.to_string()))
    }

    async fn fetch_orders(&self, query: &PreparedQuery) -> ReportResult<Vec<OrderAgg>> {
        self.bind_all(query)
            .fetch_all::<OrderAgg>()
            .await
            .map_err(|e| ReportError::BackingStore(e.to_string()))
    }

    async fn fetch_behavior(&self, query: &PreparedQuery) -> ReportResult<Vec<BehaviorAgg>> {
        self.bind_all(query)
            .fetch_all::<BehaviorAgg>()
            .await
            .map_err(|e| ReportError::BackingStore(e.to_string()))
    }
}
