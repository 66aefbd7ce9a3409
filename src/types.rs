use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tabled::Tabled;

/// One day of traffic performance (or one promotion-tagged row).
///
/// Raw quantities come straight from the sheet; every ratio is derived once
/// at ingestion and never recomputed downstream. A ratio whose denominator
/// is zero is stored as `0.0`, never NaN or infinity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyMetric {
    pub date: NaiveDate,
    /// Original date cell text, exactly as it appeared in the sheet.
    pub date_str: String,
    /// Localized (pt-BR) display form, `DD/MM/YYYY`.
    pub display_date: String,
    /// Localized weekday name, e.g. `segunda-feira`.
    pub weekday: String,
    pub spend: f64,
    pub impressions: u64,
    pub clicks: u64,
    pub installs: u64,
    pub purchases: u64,
    pub title_cost: f64,
    pub revenue: f64,
    pub clients: u64,
    /// Campaign tag; rows without one carry the `Sem Promo` sentinel.
    pub promo: String,
    pub ctr: f64,
    pub cpm: f64,
    pub cpc: f64,
    pub cpi: f64,
    pub cpa: f64,
    pub install_rate: f64,
    pub conversion_rate: f64,
    pub roas: f64,
    pub titles_per_client: f64,
}

/// Summed raw quantities over a record sequence.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Totals {
    pub spend: f64,
    pub impressions: u64,
    pub clicks: u64,
    pub installs: u64,
    pub purchases: u64,
    pub title_cost: f64,
    pub revenue: f64,
    pub clients: u64,
}

/// Ratio metrics derived from `Totals` (weighted by volume, never an
/// arithmetic mean of per-day ratios).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Averages {
    pub cpm: f64,
    pub ctr: f64,
    pub cpc: f64,
    pub cpi: f64,
    pub cpa: f64,
    pub conversion_rate: f64,
    pub install_rate: f64,
    pub roas: f64,
    pub avg_title_cost: f64,
    pub titles_per_client: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateResult {
    pub totals: Totals,
    pub averages: Averages,
}

/// The primary viewing window. A selected promotion overrides the date
/// range entirely; with no promotion and no dates the current set is empty.
#[derive(Debug, Clone, Default)]
pub struct ViewFilter {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub promo: Option<String>,
}

/// The five comparison modes plus "no comparison", dispatched through a
/// single resolver so each mode's date arithmetic stays independently
/// testable.
#[derive(Debug, Clone, PartialEq)]
pub enum ComparisonMode {
    None,
    PreviousPeriod,
    PreviousWeek,
    PreviousMonth,
    Manual { start: NaiveDate, end: NaiveDate },
    Promotion { label: String },
}

/// Structured answer from the summary collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryResponse {
    #[serde(default)]
    pub executive_summary: Vec<String>,
    #[serde(default)]
    pub action_plan: Vec<String>,
    #[serde(default)]
    pub risks: Vec<String>,
}

#[derive(Debug, Clone, Tabled)]
pub struct KpiRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Current")]
    pub current: String,
    #[tabled(rename = "Previous")]
    pub previous: String,
    #[tabled(rename = "Delta")]
    pub delta: String,
}

#[derive(Debug, Clone, Tabled)]
pub struct DayRow {
    #[tabled(rename = "Date")]
    pub date: String,
    #[tabled(rename = "Weekday")]
    pub weekday: String,
    #[tabled(rename = "Spend")]
    pub spend: String,
    #[tabled(rename = "Clicks")]
    pub clicks: String,
    #[tabled(rename = "Purchases")]
    pub purchases: String,
    #[tabled(rename = "CPA")]
    pub cpa: String,
    #[tabled(rename = "ROAS")]
    pub roas: String,
    #[tabled(rename = "Promo")]
    pub promo: String,
}
