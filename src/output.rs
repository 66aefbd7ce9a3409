// Console rendering and JSON export of the resolved windows.
use crate::types::{AggregateResult, DailyMetric, DayRow, KpiRow};
use crate::util::{format_currency, format_int, format_number};
use anyhow::Result;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

pub fn write_json<T: Serialize>(path: &str, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}

fn delta(current: f64, previous: f64) -> String {
    if previous.abs() < f64::EPSILON {
        return "-".to_string();
    }
    let pct = (current - previous) / previous * 100.0;
    let sign = if pct >= 0.0 { "+" } else { "" };
    format!("{}{}%", sign, format_number(pct, 1))
}

enum Kpi {
    Currency(&'static str, fn(&AggregateResult) -> f64),
    Percent(&'static str, fn(&AggregateResult) -> f64),
    Plain(&'static str, fn(&AggregateResult) -> f64),
    Count(&'static str, fn(&AggregateResult) -> u64),
}

const KPIS: &[Kpi] = &[
    Kpi::Currency("Investimento", |a| a.totals.spend),
    Kpi::Currency("CPM", |a| a.averages.cpm),
    Kpi::Percent("CTR", |a| a.averages.ctr),
    Kpi::Currency("CPC", |a| a.averages.cpc),
    Kpi::Currency("CPI", |a| a.averages.cpi),
    Kpi::Currency("CPA", |a| a.averages.cpa),
    Kpi::Count("Clientes", |a| a.totals.clients),
    Kpi::Count("Instalações", |a| a.totals.installs),
    Kpi::Count("Compras", |a| a.totals.purchases),
    Kpi::Percent("Taxa Conv.", |a| a.averages.conversion_rate),
    Kpi::Currency("Custo Título", |a| a.averages.avg_title_cost),
    Kpi::Currency("Receita", |a| a.totals.revenue),
    Kpi::Plain("ROAS", |a| a.averages.roas),
    Kpi::Plain("Títulos/Cliente", |a| a.averages.titles_per_client),
];

/// One row per KPI card: current value, previous value and relative change.
pub fn kpi_rows(current: &AggregateResult, previous: &AggregateResult) -> Vec<KpiRow> {
    KPIS.iter()
        .map(|kpi| match kpi {
            Kpi::Currency(label, get) => KpiRow {
                metric: label.to_string(),
                current: format_currency(get(current)),
                previous: format_currency(get(previous)),
                delta: delta(get(current), get(previous)),
            },
            Kpi::Percent(label, get) => KpiRow {
                metric: label.to_string(),
                current: format!("{}%", format_number(get(current), 2)),
                previous: format!("{}%", format_number(get(previous), 2)),
                delta: delta(get(current), get(previous)),
            },
            Kpi::Plain(label, get) => KpiRow {
                metric: label.to_string(),
                current: format_number(get(current), 2),
                previous: format_number(get(previous), 2),
                delta: delta(get(current), get(previous)),
            },
            Kpi::Count(label, get) => KpiRow {
                metric: label.to_string(),
                current: format_int(get(current)),
                previous: format_int(get(previous)),
                delta: delta(get(current) as f64, get(previous) as f64),
            },
        })
        .collect()
}

pub fn daily_rows(records: &[DailyMetric]) -> Vec<DayRow> {
    records
        .iter()
        .map(|r| DayRow {
            date: r.display_date.clone(),
            weekday: r.weekday.clone(),
            spend: format_currency(r.spend),
            clicks: format_int(r.clicks),
            purchases: format_int(r.purchases),
            cpa: format_currency(r.cpa),
            roas: format_number(r.roas, 2),
            promo: r.promo.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;

    #[test]
    fn delta_is_dash_when_previous_is_zero() {
        assert_eq!(delta(10.0, 0.0), "-");
        assert_eq!(delta(150.0, 100.0), "+50,0%");
        assert_eq!(delta(50.0, 100.0), "-50,0%");
    }

    #[test]
    fn kpi_rows_cover_the_card_set() {
        let empty = aggregate(&[]);
        let rows = kpi_rows(&empty, &empty);
        assert_eq!(rows.len(), KPIS.len());
        assert_eq!(rows[0].metric, "Investimento");
        assert_eq!(rows[0].current, "R$ 0,00");
        assert_eq!(rows[0].delta, "-");
    }
}
