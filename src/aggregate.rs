// Reduction of a record sequence into totals and weighted averages.
use crate::types::{AggregateResult, Averages, DailyMetric, Totals};
use crate::util::ratio;

/// Pure reduction: totals are sums, ratio averages are derived from the
/// totals (weighted by volume) rather than averaged per day, so low-volume
/// days cannot skew them. Empty input yields all zeros.
pub fn aggregate(records: &[DailyMetric]) -> AggregateResult {
    let mut totals = Totals::default();
    for r in records {
        totals.spend += r.spend;
        totals.impressions += r.impressions;
        totals.clicks += r.clicks;
        totals.installs += r.installs;
        totals.purchases += r.purchases;
        totals.title_cost += r.title_cost;
        totals.revenue += r.revenue;
        totals.clients += r.clients;
    }

    let averages = Averages {
        cpm: ratio(totals.spend, totals.impressions as f64) * 1000.0,
        ctr: ratio(totals.clicks as f64, totals.impressions as f64) * 100.0,
        cpc: ratio(totals.spend, totals.clicks as f64),
        cpi: ratio(totals.spend, totals.installs as f64),
        cpa: ratio(totals.spend, totals.purchases as f64),
        conversion_rate: ratio(totals.purchases as f64, totals.clicks as f64) * 100.0,
        install_rate: ratio(totals.installs as f64, totals.clicks as f64) * 100.0,
        roas: ratio(totals.revenue, totals.spend),
        // These two are the exceptions: per-day mean and per-client ratio.
        avg_title_cost: ratio(totals.title_cost, records.len() as f64),
        titles_per_client: ratio(totals.purchases as f64, totals.clients as f64),
    };

    AggregateResult { totals, averages }
}
