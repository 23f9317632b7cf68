//! Canonical order-eligibility rules. This is the single module deciding
//! which CRM records count toward a metric; every aggregation path — the
//! geography dashboard, the attribution report, out-of-band reconciliation
//! jobs — goes through these predicates or the SQL conditions derived from
//! them. Never inline a copy elsewhere.

use serde::{Deserialize, Serialize};

/// Invoice tag prefix marking an order as the upsell child of another
/// subscription. Child orders are never counted against the parent.
pub const UPSELL_TAG_PREFIX: &str = "parent-sub-id=";

/// A flattened subscription/invoice join row, as produced by the CRM
/// ingest. Missing fields mean the join found nothing on that side.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderFlags {
    pub subscription_deleted: bool,
    pub invoice_deleted: bool,
    /// Id of the matched invoice of the relevant type; `None` when no such
    /// invoice exists for the subscription.
    pub invoice_id: Option<u64>,
    pub invoice_tag: Option<String>,
    pub tracking_id: Option<String>,
    pub source: Option<String>,
}

/// Which eligibility level a statement counts orders at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EligibilityLevel {
    Baseline,
    Attribution,
}

/// Whether the row counts as a real, non-duplicate order.
///
/// Rules apply in order; the first failing rule excludes the row. A row
/// whose eligibility cannot be determined (missing invoice) is excluded,
/// never an error.
pub fn is_eligible_for_baseline(row: &OrderFlags) -> bool {
    if row.subscription_deleted {
        return false;
    }
    if row.invoice_deleted {
        return false;
    }
    if row.invoice_id.is_none() {
        // No invoice of the relevant type: not a countable order.
        return false;
    }
    if row
        .invoice_tag
        .as_deref()
        .is_some_and(|tag| tag.starts_with(UPSELL_TAG_PREFIX))
    {
        return false;
    }
    true
}

/// Baseline rules plus the attribution fields required to join the order
/// back to ad spend. The true set is always a subset of the baseline set.
pub fn is_eligible_for_attribution(row: &OrderFlags) -> bool {
    if !is_eligible_for_baseline(row) {
        return false;
    }
    if row.tracking_id.as_deref().map_or(true, str::is_empty) {
        return false;
    }
    if row.source.as_deref().map_or(true, str::is_empty) {
        return false;
    }
    true
}

pub fn is_eligible(row: &OrderFlags, level: EligibilityLevel) -> bool {
    match level {
        EligibilityLevel::Baseline => is_eligible_for_baseline(row),
        EligibilityLevel::Attribution => is_eligible_for_attribution(row),
    }
}

/// The same rules as a ClickHouse WHERE condition, for statements that
/// count orders in-store. Column conventions mirror `OrderFlags`: absent
/// invoice is id 0, absent tag/tracking/source are empty strings.
pub fn sql_condition(level: EligibilityLevel) -> String {
    let baseline = format!(
        "subscription_deleted = 0 AND invoice_deleted = 0 AND invoice_id != 0 \
         AND NOT startsWith(invoice_tag, '{UPSELL_TAG_PREFIX}')"
    );
    match level {
        EligibilityLevel::Baseline => baseline,
        EligibilityLevel::Attribution => {
            format!("{baseline} AND tracking_id != '' AND source != ''")
        }
    }
}
