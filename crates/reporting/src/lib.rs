//! Hierarchical dimensional reporting — joins paid-ad spend with CRM
//! orders and serves drill-down reports by arbitrary dimension path, with
//! both sources counted under one canonical set of eligibility rules.

pub mod dates;
pub mod eligibility;
pub mod engine;
pub mod query;
pub mod reconcile;
pub mod registry;
pub mod store;
pub mod tree;
pub mod views;

pub use dates::{DatePreset, SavedView};
pub use eligibility::{is_eligible_for_attribution, is_eligible_for_baseline, OrderFlags};
pub use engine::{ReportEngine, ReportRequest};
pub use registry::ReportFamily;
pub use store::{ClickHouseStore, ReportStore};
pub use tree::ReportRow;
pub use views::SavedViewStore;
