// Period/comparison window resolution.
//
// Given the full record set, a view filter and a comparison mode, this
// module computes the "current" and "previous" sub-sequences that the
// aggregator and renderers consume. Everything here is a pure function of
// its inputs; each consumer gets its own owned copy.
use crate::loader::NO_PROMO;
use crate::types::{ComparisonMode, DailyMetric, ViewFilter};
use chrono::{Duration, Months, NaiveDate};

/// Inclusive calendar-date filter, `[start, end]`.
pub fn filter_by_date_range(
    data: &[DailyMetric],
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<DailyMetric> {
    data.iter()
        .filter(|d| d.date >= start && d.date <= end)
        .cloned()
        .collect()
}

/// All rows tagged with `promo`, across the whole dataset. Promotion
/// selection deliberately ignores any active date range.
pub fn filter_by_promo(data: &[DailyMetric], promo: &str) -> Vec<DailyMetric> {
    data.iter().filter(|d| d.promo == promo).cloned().collect()
}

/// Distinct promotion labels (the "no promotion" sentinel excluded), sorted.
pub fn unique_promos(data: &[DailyMetric]) -> Vec<String> {
    let mut promos: Vec<String> = data
        .iter()
        .map(|d| d.promo.clone())
        .filter(|p| !p.is_empty() && p != NO_PROMO)
        .collect();
    promos.sort();
    promos.dedup();
    promos
}

/// Resolve the current and previous windows in one step.
pub fn resolve_windows(
    data: &[DailyMetric],
    view: &ViewFilter,
    mode: &ComparisonMode,
) -> (Vec<DailyMetric>, Vec<DailyMetric>) {
    let current = current_window(data, view);
    let previous = previous_window(data, view, mode, &current);
    (current, previous)
}

/// Current set: a selected promotion wins over the date range; with neither
/// a promotion nor a complete date range the set is empty (no implicit
/// "everything" fallback).
fn current_window(data: &[DailyMetric], view: &ViewFilter) -> Vec<DailyMetric> {
    if let Some(promo) = &view.promo {
        return filter_by_promo(data, promo);
    }
    match (view.start, view.end) {
        (Some(start), Some(end)) => filter_by_date_range(data, start, end),
        _ => Vec::new(),
    }
}

fn previous_window(
    data: &[DailyMetric],
    view: &ViewFilter,
    mode: &ComparisonMode,
    current: &[DailyMetric],
) -> Vec<DailyMetric> {
    if data.is_empty() {
        return Vec::new();
    }
    match mode {
        ComparisonMode::None => Vec::new(),
        ComparisonMode::Promotion { label } => filter_by_promo(data, label),
        ComparisonMode::Manual { start, end } => filter_by_date_range(data, *start, *end),
        ComparisonMode::PreviousPeriod
        | ComparisonMode::PreviousWeek
        | ComparisonMode::PreviousMonth => {
            let Some((start, end)) = anchor_span(view, current) else {
                return Vec::new();
            };
            let (prev_start, prev_end) = shift_span(mode, start, end);
            filter_by_date_range(data, prev_start, prev_end)
        }
    }
}

/// The anchor span whose duration drives the relative shift: the observed
/// min/max dates of a promotion-filtered current set, otherwise the explicit
/// view range.
fn anchor_span(view: &ViewFilter, current: &[DailyMetric]) -> Option<(NaiveDate, NaiveDate)> {
    if view.promo.is_some() && !current.is_empty() {
        let start = current.iter().map(|d| d.date).min()?;
        let end = current.iter().map(|d| d.date).max()?;
        return Some((start, end));
    }
    match (view.start, view.end) {
        (Some(start), Some(end)) => Some((start, end)),
        _ => None,
    }
}

fn shift_span(mode: &ComparisonMode, start: NaiveDate, end: NaiveDate) -> (NaiveDate, NaiveDate) {
    match mode {
        ComparisonMode::PreviousPeriod => {
            // Shift by the inclusive window length so the windows abut
            // without overlapping: a 14-day range moves back 14 days.
            let shift = Duration::days((end - start).num_days() + 1);
            (start - shift, end - shift)
        }
        ComparisonMode::PreviousWeek => {
            let week = Duration::days(7);
            (start - week, end - week)
        }
        ComparisonMode::PreviousMonth => (
            start.checked_sub_months(Months::new(1)).unwrap_or(start),
            end.checked_sub_months(Months::new(1)).unwrap_or(end),
        ),
        _ => (start, end),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn metric_on(date: NaiveDate, promo: &str) -> DailyMetric {
        DailyMetric {
            date,
            date_str: date.format("%d/%m/%Y").to_string(),
            display_date: date.format("%d/%m/%Y").to_string(),
            weekday: String::new(),
            spend: 10.0,
            impressions: 100,
            clicks: 10,
            installs: 0,
            purchases: 1,
            title_cost: 0.0,
            revenue: 0.0,
            clients: 0,
            promo: promo.to_string(),
            ctr: 0.0,
            cpm: 0.0,
            cpc: 0.0,
            cpi: 0.0,
            cpa: 0.0,
            install_rate: 0.0,
            conversion_rate: 0.0,
            roas: 0.0,
            titles_per_client: 0.0,
        }
    }

    fn daily_range(start: NaiveDate, end: NaiveDate) -> Vec<DailyMetric> {
        let mut out = Vec::new();
        let mut day = start;
        while day <= end {
            out.push(metric_on(day, NO_PROMO));
            day += Duration::days(1);
        }
        out
    }

    fn dates(records: &[DailyMetric]) -> Vec<NaiveDate> {
        records.iter().map(|r| r.date).collect()
    }

    fn view(start: NaiveDate, end: NaiveDate) -> ViewFilter {
        ViewFilter {
            start: Some(start),
            end: Some(end),
            promo: None,
        }
    }

    #[test]
    fn previous_period_shifts_by_inclusive_length_14_days() {
        let data = daily_range(d(2024, 2, 1), d(2024, 3, 31));
        let v = view(d(2024, 3, 1), d(2024, 3, 14));
        let (current, previous) = resolve_windows(&data, &v, &ComparisonMode::PreviousPeriod);
        assert_eq!(current.len(), 14);
        assert_eq!(previous.len(), 14);
        assert_eq!(previous.first().unwrap().date, d(2024, 2, 16));
        assert_eq!(previous.last().unwrap().date, d(2024, 2, 29));
    }

    #[test]
    fn previous_period_shifts_by_inclusive_length_7_days() {
        let data = daily_range(d(2024, 2, 20), d(2024, 3, 20));
        let v = view(d(2024, 3, 8), d(2024, 3, 14));
        let (_, previous) = resolve_windows(&data, &v, &ComparisonMode::PreviousPeriod);
        assert_eq!(previous.first().unwrap().date, d(2024, 3, 1));
        assert_eq!(previous.last().unwrap().date, d(2024, 3, 7));
    }

    #[test]
    fn previous_week_shifts_exactly_seven_days() {
        let data = daily_range(d(2024, 2, 20), d(2024, 3, 20));
        let v = view(d(2024, 3, 8), d(2024, 3, 14));
        let (_, previous) = resolve_windows(&data, &v, &ComparisonMode::PreviousWeek);
        assert_eq!(previous.first().unwrap().date, d(2024, 3, 1));
        assert_eq!(previous.last().unwrap().date, d(2024, 3, 7));
    }

    #[test]
    fn previous_month_clamps_day_of_month() {
        let data = daily_range(d(2024, 2, 1), d(2024, 3, 31));
        let v = view(d(2024, 3, 31), d(2024, 3, 31));
        let (_, previous) = resolve_windows(&data, &v, &ComparisonMode::PreviousMonth);
        // March 31 minus one calendar month clamps to February 29 (2024 is
        // a leap year).
        assert_eq!(dates(&previous), vec![d(2024, 2, 29)]);
    }

    #[test]
    fn promotion_filter_ignores_date_range() {
        let mut data = daily_range(d(2024, 3, 1), d(2024, 3, 10));
        data.push(metric_on(d(2023, 11, 24), "BlackFriday"));
        data.push(metric_on(d(2024, 3, 5), "BlackFriday"));
        let v = ViewFilter {
            start: Some(d(2024, 3, 1)),
            end: Some(d(2024, 3, 2)),
            promo: Some("BlackFriday".to_string()),
        };
        let (current, _) = resolve_windows(&data, &v, &ComparisonMode::None);
        assert_eq!(current.len(), 2);
        assert!(current.iter().all(|r| r.promo == "BlackFriday"));
    }

    #[test]
    fn no_promo_and_blank_dates_yield_empty_current_set() {
        let data = daily_range(d(2024, 3, 1), d(2024, 3, 10));
        let (current, previous) =
            resolve_windows(&data, &ViewFilter::default(), &ComparisonMode::PreviousPeriod);
        assert!(current.is_empty());
        assert!(previous.is_empty());
    }

    #[test]
    fn mode_none_yields_empty_previous_set() {
        let data = daily_range(d(2024, 3, 1), d(2024, 3, 10));
        let v = view(d(2024, 3, 1), d(2024, 3, 5));
        let (current, previous) = resolve_windows(&data, &v, &ComparisonMode::None);
        assert_eq!(current.len(), 5);
        assert!(previous.is_empty());
    }

    #[test]
    fn promotion_benchmark_without_matching_rows_is_empty() {
        let data = daily_range(d(2024, 3, 1), d(2024, 3, 10));
        let v = view(d(2024, 3, 1), d(2024, 3, 5));
        let mode = ComparisonMode::Promotion {
            label: "Natal".to_string(),
        };
        let (_, previous) = resolve_windows(&data, &v, &mode);
        assert!(previous.is_empty());
    }

    #[test]
    fn manual_mode_uses_independent_range() {
        let data = daily_range(d(2024, 2, 1), d(2024, 3, 31));
        let v = view(d(2024, 3, 10), d(2024, 3, 20));
        let mode = ComparisonMode::Manual {
            start: d(2024, 2, 5),
            end: d(2024, 2, 7),
        };
        let (_, previous) = resolve_windows(&data, &v, &mode);
        assert_eq!(
            dates(&previous),
            vec![d(2024, 2, 5), d(2024, 2, 6), d(2024, 2, 7)]
        );
    }

    #[test]
    fn promotion_view_anchors_relative_window_on_its_span() {
        let mut data = daily_range(d(2024, 3, 1), d(2024, 3, 20));
        data.push(metric_on(d(2024, 3, 10), "Promo10"));
        data.push(metric_on(d(2024, 3, 12), "Promo10"));
        data.sort_by_key(|r| r.date);
        let v = ViewFilter {
            start: None,
            end: None,
            promo: Some("Promo10".to_string()),
        };
        // Promo span is 10..12 (3 days inclusive), so the previous period
        // is 07..09.
        let (_, previous) = resolve_windows(&data, &v, &ComparisonMode::PreviousPeriod);
        assert_eq!(
            dates(&previous),
            vec![d(2024, 3, 7), d(2024, 3, 8), d(2024, 3, 9)]
        );
    }

    #[test]
    fn unique_promos_excludes_sentinel_and_sorts() {
        let mut data = daily_range(d(2024, 3, 1), d(2024, 3, 3));
        data.push(metric_on(d(2024, 3, 4), "Natal"));
        data.push(metric_on(d(2024, 3, 5), "BlackFriday"));
        data.push(metric_on(d(2024, 3, 6), "Natal"));
        assert_eq!(unique_promos(&data), vec!["BlackFriday", "Natal"]);
    }
}
