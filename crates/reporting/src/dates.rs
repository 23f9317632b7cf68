//! Resolves relative date presets and saved views into concrete inclusive
//! ranges at query time. "Today" is the UTC calendar date; every resolver
//! also takes an explicit `today` so resolution is a pure function.

use crate::registry::ReportFamily;
use chrono::{DateTime, Datelike, Days, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracklens_core::error::{ReportError, ReportResult};
use tracklens_core::types::{DateRange, SortDirection};
use uuid::Uuid;

/// The closed set of relative presets a saved view may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatePreset {
    Today,
    Yesterday,
    Last7Days,
    Last14Days,
    Last30Days,
    Last90Days,
    ThisWeek,
    LastWeek,
    ThisMonth,
    LastMonth,
}

/// Detection precedence: the first preset in this order that reproduces a
/// range wins when two presets coincide (e.g. last_7_days and this_week
/// both ending on a Sunday).
pub const ALL_PRESETS: [DatePreset; 10] = [
    DatePreset::Today,
    DatePreset::Yesterday,
    DatePreset::Last7Days,
    DatePreset::Last14Days,
    DatePreset::Last30Days,
    DatePreset::Last90Days,
    DatePreset::ThisWeek,
    DatePreset::LastWeek,
    DatePreset::ThisMonth,
    DatePreset::LastMonth,
];

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.day0()))
}

fn last_n_days(today: NaiveDate, n: u64) -> DateRange {
    DateRange {
        start: today - Days::new(n - 1),
        end: today,
    }
}

/// Resolve a preset against an explicit "today". Weeks start on Monday;
/// last month's end is computed as the day before the first of this
/// month, landing on the prior month's last day regardless of length.
pub fn resolve_preset_on(today: NaiveDate, preset: DatePreset) -> DateRange {
    match preset {
        DatePreset::Today => DateRange {
            start: today,
            end: today,
        },
        DatePreset::Yesterday => {
            let yesterday = today - Days::new(1);
            DateRange {
                start: yesterday,
                end: yesterday,
            }
        }
        DatePreset::Last7Days => last_n_days(today, 7),
        DatePreset::Last14Days => last_n_days(today, 14),
        DatePreset::Last30Days => last_n_days(today, 30),
        DatePreset::Last90Days => last_n_days(today, 90),
        DatePreset::ThisWeek => {
            let week = today.week(Weekday::Mon);
            DateRange {
                start: week.first_day(),
                end: week.last_day(),
            }
        }
        DatePreset::LastWeek => {
            let monday = today.week(Weekday::Mon).first_day();
            DateRange {
                start: monday - Days::new(7),
                end: monday - Days::new(1),
            }
        }
        DatePreset::ThisMonth => {
            let start = first_of_month(today);
            let next_month = start + Days::new(31);
            DateRange {
                start,
                end: first_of_month(next_month) - Days::new(1),
            }
        }
        DatePreset::LastMonth => {
            let end = first_of_month(today) - Days::new(1);
            DateRange {
                start: first_of_month(end),
                end,
            }
        }
    }
}

/// Resolve a preset against the current UTC date.
pub fn resolve_preset(preset: DatePreset) -> DateRange {
    resolve_preset_on(Utc::now().date_naive(), preset)
}

/// Structural inverse of [`resolve_preset_on`], used by the save UI to
/// round-trip a picked range back into a preset.
pub fn detect_preset_on(today: NaiveDate, start: NaiveDate, end: NaiveDate) -> Option<DatePreset> {
    ALL_PRESETS.into_iter().find(|&preset| {
        let range = resolve_preset_on(today, preset);
        range.start == start && range.end == end
    })
}

pub fn detect_preset(start: NaiveDate, end: NaiveDate) -> Option<DatePreset> {
    detect_preset_on(Utc::now().date_naive(), start, end)
}

/// Parse an ISO-8601 calendar date from transport input.
pub fn parse_date(input: &str) -> ReportResult<NaiveDate> {
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .map_err(|e| ReportError::InvalidDateRange(format!("unparseable date {input:?}: {e}")))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateMode {
    Relative,
    Absolute,
}

/// A persisted report configuration. Relative views re-resolve their
/// preset every time they are used; absolute views pin concrete dates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedView {
    pub id: Uuid,
    pub name: String,
    pub family: ReportFamily,
    pub date_mode: DateMode,
    pub date_preset: Option<DatePreset>,
    pub date_start: Option<NaiveDate>,
    pub date_end: Option<NaiveDate>,
    pub dimensions: Vec<String>,
    pub filters: BTreeMap<String, String>,
    pub sort_by: Option<String>,
    pub sort_direction: SortDirection,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Concrete query parameters produced from a saved view at use time.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedView {
    pub family: ReportFamily,
    pub date_range: DateRange,
    pub dimensions: Vec<String>,
    pub filters: BTreeMap<String, String>,
    pub sort_by: Option<String>,
    pub sort_direction: SortDirection,
}

pub fn resolve_view_on(today: NaiveDate, view: &SavedView) -> ReportResult<ResolvedView> {
    let date_range = match view.date_mode {
        DateMode::Relative => {
            let preset = view.date_preset.ok_or_else(|| {
                ReportError::InvalidDateRange("relative view without a preset".to_string())
            })?;
            resolve_preset_on(today, preset)
        }
        DateMode::Absolute => {
            let (Some(start), Some(end)) = (view.date_start, view.date_end) else {
                return Err(ReportError::InvalidDateRange(
                    "absolute view without start and end".to_string(),
                ));
            };
            DateRange::new(start, end)?
        }
    };

    Ok(ResolvedView {
        family: view.family,
        date_range,
        dimensions: view.dimensions.clone(),
        filters: view.filters.clone(),
        sort_by: view.sort_by.clone(),
        sort_direction: view.sort_direction,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn view(mode: DateMode) -> SavedView {
        SavedView {
            id: Uuid::new_v4(),
            name: "Campaign overview".into(),
            family: ReportFamily::Advertising,
            date_mode: mode,
            date_preset: None,
            date_start: None,
            date_end: None,
            dimensions: vec!["network".into(), "campaign".into()],
            filters: BTreeMap::new(),
            sort_by: Some("cost".into()),
            sort_direction: SortDirection::Descending,
            created_by: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_last_7_days_window() {
        let range = resolve_preset_on(d(2026, 2, 10), DatePreset::Last7Days);
        assert_eq!(range.start, d(2026, 2, 4));
        assert_eq!(range.end, d(2026, 2, 10));
        assert_eq!(range.days(), 7);
    }

    #[test]
    fn test_today_and_yesterday() {
        let today = d(2026, 3, 1);
        assert_eq!(
            resolve_preset_on(today, DatePreset::Today),
            DateRange {
                start: today,
                end: today
            }
        );
        assert_eq!(
            resolve_preset_on(today, DatePreset::Yesterday),
            DateRange {
                start: d(2026, 2, 28),
                end: d(2026, 2, 28)
            }
        );
    }

    #[test]
    fn test_weeks_start_on_monday() {
        // 2026-02-10 is a Tuesday.
        let range = resolve_preset_on(d(2026, 2, 10), DatePreset::ThisWeek);
        assert_eq!(range.start, d(2026, 2, 9));
        assert_eq!(range.end, d(2026, 2, 15));

        let last = resolve_preset_on(d(2026, 2, 10), DatePreset::LastWeek);
        assert_eq!(last.start, d(2026, 2, 2));
        assert_eq!(last.end, d(2026, 2, 8));
    }

    #[test]
    fn test_week_spanning_year_boundary() {
        // 2026-01-01 is a Thursday; its Monday-start week began in 2025.
        let range = resolve_preset_on(d(2026, 1, 1), DatePreset::ThisWeek);
        assert_eq!(range.start, d(2025, 12, 29));
        assert_eq!(range.end, d(2026, 1, 4));

        let last = resolve_preset_on(d(2026, 1, 1), DatePreset::LastWeek);
        assert_eq!(last.start, d(2025, 12, 22));
        assert_eq!(last.end, d(2025, 12, 28));
    }

    #[test]
    fn test_last_month_lands_on_prior_month_end() {
        // 31-day prior month.
        let range = resolve_preset_on(d(2026, 8, 6), DatePreset::LastMonth);
        assert_eq!(range.start, d(2026, 7, 1));
        assert_eq!(range.end, d(2026, 7, 31));

        // 28-day prior month.
        let range = resolve_preset_on(d(2026, 3, 15), DatePreset::LastMonth);
        assert_eq!(range.start, d(2026, 2, 1));
        assert_eq!(range.end, d(2026, 2, 28));

        // January from a January date reaches back across the year.
        let range = resolve_preset_on(d(2026, 1, 10), DatePreset::LastMonth);
        assert_eq!(range.start, d(2025, 12, 1));
        assert_eq!(range.end, d(2025, 12, 31));
    }

    #[test]
    fn test_this_month_covers_full_calendar_month() {
        let range = resolve_preset_on(d(2026, 2, 10), DatePreset::ThisMonth);
        assert_eq!(range.start, d(2026, 2, 1));
        assert_eq!(range.end, d(2026, 2, 28));
    }

    #[test]
    fn test_detect_is_inverse_of_resolve() {
        // Fixed dates chosen so no two presets coincide.
        for today in [d(2026, 2, 10), d(2026, 8, 6), d(2025, 12, 31)] {
            for preset in ALL_PRESETS {
                let range = resolve_preset_on(today, preset);
                assert_eq!(
                    detect_preset_on(today, range.start, range.end),
                    Some(preset),
                    "{preset:?} on {today}"
                );
            }
        }
    }

    #[test]
    fn test_detect_precedence_on_coinciding_ranges() {
        // 2026-02-15 is a Sunday: this_week and last_7_days are the same
        // window, and the earlier-listed preset wins.
        let today = d(2026, 2, 15);
        let week = resolve_preset_on(today, DatePreset::ThisWeek);
        assert_eq!(week, resolve_preset_on(today, DatePreset::Last7Days));
        assert_eq!(
            detect_preset_on(today, week.start, week.end),
            Some(DatePreset::Last7Days)
        );
    }

    #[test]
    fn test_detect_returns_none_for_custom_range() {
        assert_eq!(detect_preset_on(d(2026, 2, 10), d(2026, 1, 3), d(2026, 1, 17)), None);
    }

    #[test]
    fn test_relative_view_re_resolves_at_use_time() {
        let mut saved = view(DateMode::Relative);
        saved.date_preset = Some(DatePreset::Last7Days);

        let first = resolve_view_on(d(2026, 2, 10), &saved).unwrap();
        let week_later = resolve_view_on(d(2026, 2, 17), &saved).unwrap();
        assert_eq!(first.date_range.start, d(2026, 2, 4));
        assert_eq!(week_later.date_range.start, d(2026, 2, 11));
        assert_ne!(first.date_range, week_later.date_range);
    }

    #[test]
    fn test_absolute_view_bypasses_preset_resolution() {
        let mut saved = view(DateMode::Absolute);
        saved.date_start = Some(d(2026, 1, 1));
        saved.date_end = Some(d(2026, 1, 31));
        saved.date_preset = Some(DatePreset::Last7Days);

        let resolved = resolve_view_on(d(2026, 2, 10), &saved).unwrap();
        assert_eq!(resolved.date_range.start, d(2026, 1, 1));
        assert_eq!(resolved.date_range.end, d(2026, 1, 31));
    }

    #[test]
    fn test_malformed_views_fail_validation() {
        let saved = view(DateMode::Relative);
        assert!(matches!(
            resolve_view_on(d(2026, 2, 10), &saved),
            Err(ReportError::InvalidDateRange(_))
        ));

        let mut saved = view(DateMode::Absolute);
        saved.date_start = Some(d(2026, 2, 10));
        saved.date_end = Some(d(2026, 2, 1));
        assert!(matches!(
            resolve_view_on(d(2026, 2, 10), &saved),
            Err(ReportError::InvalidDateRange(_))
        ));
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2026-02-10").unwrap(), d(2026, 2, 10));
        assert!(matches!(
            parse_date("02/10/2026"),
            Err(ReportError::InvalidDateRange(_))
        ));
    }
}
