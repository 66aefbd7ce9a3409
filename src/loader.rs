// Ingestion pipeline: raw CSV text -> date-sorted `DailyMetric` records.
//
// The source is a published, human-edited spreadsheet export, so this stage
// is deliberately forgiving: it scans for the header row instead of assuming
// line 0, resolves columns by synonym instead of position, and rejects bad
// rows silently instead of failing the whole file. Only the HTTP transport
// (handled upstream in `fetch`) can make a load fail.
use crate::columns::ColumnMap;
use crate::types::DailyMetric;
use crate::util::{
    display_date_pt, parse_count, parse_currency, parse_date_or, ratio, weekday_name_pt,
};
use chrono::{Local, NaiveDate};

/// Rows carrying this promo label (or none at all) count as "no promotion".
pub const NO_PROMO: &str = "Sem Promo";

/// How many leading rows are scanned for a date-like header cell.
const HEADER_SCAN_ROWS: usize = 5;

/// Ingestion diagnostics, printed after each load.
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    pub total_rows: usize,
    pub kept_rows: usize,
    pub rejected_rows: usize,
    pub header_row: usize,
    pub headers: Vec<String>,
    pub missing_fields: Vec<&'static str>,
}

/// Tokenize the raw blob into trimmed rows of fields.
///
/// The `csv` reader handles commas inside double-quote spans and doubled
/// quotes; `flexible` accepts ragged row lengths and `Trim::All` strips
/// field whitespace. Rows that fail to decode and all-empty rows are
/// dropped, never propagated.
pub fn tokenize_rows(raw: &str) -> Vec<Vec<String>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(raw.as_bytes());
    let mut rows = Vec::new();
    for record in rdr.records() {
        let Ok(record) = record else { continue };
        if record.iter().all(|cell| cell.is_empty()) {
            continue;
        }
        rows.push(record.iter().map(|cell| cell.to_string()).collect());
    }
    rows
}

fn cell<'a>(row: &'a [String], idx: Option<usize>) -> &'a str {
    idx.and_then(|i| row.get(i)).map(String::as_str).unwrap_or("")
}

fn looks_like_header(row: &[String]) -> bool {
    row.iter().any(|c| {
        let n = c.to_lowercase();
        n.contains("data") || n.contains("date")
    })
}

/// Summary/footer rows ("Total", "Resumo geral", ...) carry aggregate text
/// in the date column and must not become records.
fn is_summary_marker(date_cell: &str) -> bool {
    let n = date_cell.to_lowercase();
    n.contains("total") || n.contains("resumo")
}

pub fn ingest(raw: &str) -> (Vec<DailyMetric>, IngestReport) {
    ingest_with_fallback_date(raw, Local::now().date_naive())
}

/// Same as [`ingest`] with the unparseable-date fallback injected, so tests
/// can pin it.
pub fn ingest_with_fallback_date(
    raw: &str,
    fallback_date: NaiveDate,
) -> (Vec<DailyMetric>, IngestReport) {
    let rows = tokenize_rows(raw);
    if rows.is_empty() {
        return (Vec::new(), IngestReport::default());
    }

    // The header is the first of the leading rows containing a date-like
    // cell; if none qualifies, row 0 is used by default.
    let header_row = rows
        .iter()
        .take(HEADER_SCAN_ROWS)
        .position(|row| looks_like_header(row))
        .unwrap_or(0);
    let headers = rows[header_row].clone();
    let map = ColumnMap::resolve(&headers);

    let mut records: Vec<DailyMetric> = Vec::new();
    let mut rejected_rows = 0usize;
    let total_rows = rows.len() - header_row - 1;

    for row in &rows[header_row + 1..] {
        match build_record(row, &map, fallback_date) {
            Some(record) => records.push(record),
            None => rejected_rows += 1,
        }
    }

    // Stable, so promotion rows sharing a date keep their sheet order.
    records.sort_by_key(|r| r.date);

    let report = IngestReport {
        total_rows,
        kept_rows: records.len(),
        rejected_rows,
        header_row,
        headers,
        missing_fields: map.missing_fields(),
    };
    (records, report)
}

/// Build one record, or `None` when the row is rejected.
///
/// Rejection rules:
/// - the date column is absent from the sheet, or the date cell is empty;
/// - the date cell is a summary marker ("total"/"resumo");
/// - spend parses to 0 while both the purchases and clicks cells are empty
///   (a blank/summary row, as opposed to a genuine zero-spend day).
fn build_record(row: &[String], map: &ColumnMap, fallback_date: NaiveDate) -> Option<DailyMetric> {
    let date_idx = map.date?;
    let date_cell = cell(row, Some(date_idx));
    if date_cell.is_empty() || is_summary_marker(date_cell) {
        return None;
    }

    let spend = parse_currency(cell(row, map.spend));
    let purchases_cell = cell(row, map.purchases);
    let clicks_cell = cell(row, map.clicks);
    if spend == 0.0 && purchases_cell.is_empty() && clicks_cell.is_empty() {
        return None;
    }

    let date = parse_date_or(date_cell, fallback_date);
    let clicks = parse_count(clicks_cell);
    let purchases = parse_count(purchases_cell);
    let installs = parse_count(cell(row, map.installs));
    let impressions = parse_count(cell(row, map.impressions));
    let clients = parse_count(cell(row, map.clients));
    let title_cost = parse_currency(cell(row, map.title_cost));
    let sheet_revenue = parse_currency(cell(row, map.revenue));

    // A sheet without a revenue column (or with a zero cell) falls back to
    // purchases times unit title cost.
    let revenue = if sheet_revenue > 0.0 {
        sheet_revenue
    } else {
        purchases as f64 * title_cost
    };

    let promo = match cell(row, map.promo) {
        "" => NO_PROMO.to_string(),
        tag => tag.to_string(),
    };

    Some(DailyMetric {
        date,
        date_str: date_cell.to_string(),
        display_date: display_date_pt(date),
        weekday: weekday_name_pt(date).to_string(),
        spend,
        impressions,
        clicks,
        installs,
        purchases,
        title_cost,
        revenue,
        clients,
        promo,
        ctr: ratio(clicks as f64, impressions as f64) * 100.0,
        cpm: ratio(spend, impressions as f64) * 1000.0,
        cpc: ratio(spend, clicks as f64),
        cpi: ratio(spend, installs as f64),
        cpa: ratio(spend, purchases as f64),
        install_rate: ratio(installs as f64, clicks as f64) * 100.0,
        conversion_rate: ratio(purchases as f64, clicks as f64) * 100.0,
        roas: ratio(revenue, spend),
        titles_per_client: ratio(purchases as f64, clients as f64),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn fb() -> NaiveDate {
        d(2020, 1, 1)
    }

    #[test]
    fn tokenizes_quoted_fields() {
        let rows = tokenize_rows("a,\"b,c\",d");
        assert_eq!(rows, vec![vec!["a", "b,c", "d"]]);
    }

    #[test]
    fn tokenizes_escaped_quotes() {
        let rows = tokenize_rows("a,\"he said \"\"hi\"\"\",c");
        assert_eq!(rows, vec![vec!["a", "he said \"hi\"", "c"]]);
    }

    #[test]
    fn skips_blank_lines() {
        let rows = tokenize_rows("a,b\n\n ,\nc,d\n");
        assert_eq!(rows, vec![vec!["a", "b"], vec!["c", "d"]]);
    }

    #[test]
    fn end_to_end_rejects_total_row_and_sorts() {
        let csv = "Data,Investimento,Cliques,Compras\n\
                   02/03/2024,R$200,20,1\n\
                   01/03/2024,R$100,10,2\n\
                   Total,R$300,30,3\n";
        let (records, report) = ingest_with_fallback_date(csv, fb());
        assert_eq!(records.len(), 2);
        assert_eq!(report.rejected_rows, 1);
        assert_eq!(records[0].date, d(2024, 3, 1));
        assert_eq!(records[1].date, d(2024, 3, 2));
        assert_eq!(records[1].cpa, 200.0);
        assert_eq!(records[0].cpa, 50.0);
    }

    #[test]
    fn header_row_is_scanned_not_assumed() {
        let csv = "Relatório de Tráfego\n\
                   Exportado em 10/03/2024 10:00\n\
                   Data,Investimento,Cliques\n\
                   01/03/2024,R$50,5\n";
        let (records, report) = ingest_with_fallback_date(csv, fb());
        assert_eq!(report.header_row, 2);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].spend, 50.0);
    }

    #[test]
    fn permuted_columns_yield_identical_records() {
        let canonical = "Data,Investimento,Cliques,Compras\n01/03/2024,R$100,10,2\n";
        let permuted = "Compras,Data,Investimento,Cliques\n2,01/03/2024,R$100,10\n";
        let (a, _) = ingest_with_fallback_date(canonical, fb());
        let (b, _) = ingest_with_fallback_date(permuted, fb());
        assert_eq!(a, b);
    }

    #[test]
    fn zero_spend_with_empty_metrics_is_rejected() {
        let csv = "Data,Investimento,Cliques,Compras\n\
                   01/03/2024,R$0,,\n\
                   02/03/2024,R$0,5,\n";
        let (records, _) = ingest_with_fallback_date(csv, fb());
        // The first row is a blank day; the second has real click traffic.
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].date, d(2024, 3, 2));
        assert_eq!(records[0].spend, 0.0);
    }

    #[test]
    fn missing_date_column_yields_no_records() {
        let csv = "Investimento,Cliques\nR$100,10\n";
        let (records, report) = ingest_with_fallback_date(csv, fb());
        assert!(records.is_empty());
        assert_eq!(report.rejected_rows, 1);
    }

    #[test]
    fn empty_date_cell_is_rejected() {
        let csv = "Data,Investimento,Cliques\n,R$100,10\n01/03/2024,R$50,5\n";
        let (records, _) = ingest_with_fallback_date(csv, fb());
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn derived_ratios_are_zero_on_zero_denominators() {
        let csv = "Data,Investimento,Impressões,Cliques,Compras\n\
                   01/03/2024,R$100,0,0,0\n";
        let (records, _) = ingest_with_fallback_date(csv, fb());
        let r = &records[0];
        assert_eq!(r.ctr, 0.0);
        assert_eq!(r.cpm, 0.0);
        assert_eq!(r.cpc, 0.0);
        assert_eq!(r.cpa, 0.0);
        assert_eq!(r.roas, 0.0);
        assert_eq!(r.titles_per_client, 0.0);
    }

    #[test]
    fn revenue_defaults_to_purchases_times_title_cost() {
        let csv = "Data,Investimento,Cliques,Compras,Custo Título\n\
                   01/03/2024,R$100,10,2,\"R$ 12,50\"\n";
        let (records, _) = ingest_with_fallback_date(csv, fb());
        assert_eq!(records[0].revenue, 25.0);
        assert_eq!(records[0].roas, 0.25);
    }

    #[test]
    fn explicit_revenue_column_wins() {
        let csv = "Data,Investimento,Cliques,Compras,Custo Título,Receita\n\
                   01/03/2024,R$100,10,2,\"R$ 12,50\",R$500\n";
        let (records, _) = ingest_with_fallback_date(csv, fb());
        assert_eq!(records[0].revenue, 500.0);
        assert_eq!(records[0].roas, 5.0);
    }

    #[test]
    fn promo_defaults_to_sentinel() {
        let csv = "Data,Investimento,Cliques,Promo\n\
                   01/03/2024,R$100,10,BlackFriday\n\
                   02/03/2024,R$100,10,\n";
        let (records, _) = ingest_with_fallback_date(csv, fb());
        assert_eq!(records[0].promo, "BlackFriday");
        assert_eq!(records[1].promo, NO_PROMO);
    }

    #[test]
    fn quoted_promo_keeps_embedded_comma() {
        let csv = "Data,Investimento,Cliques,Promo\n\
                   01/03/2024,R$100,10,\"Black, Friday\"\n";
        let (records, _) = ingest_with_fallback_date(csv, fb());
        assert_eq!(records[0].promo, "Black, Friday");
    }

    #[test]
    fn unparseable_date_uses_fallback_policy() {
        let csv = "Data,Investimento,Cliques\nquando?,R$100,10\n";
        let (records, _) = ingest_with_fallback_date(csv, fb());
        assert_eq!(records[0].date, fb());
        assert_eq!(records[0].date_str, "quando?");
    }

    #[test]
    fn localized_display_fields_are_populated() {
        let csv = "Data,Investimento,Cliques\n01/03/2024,R$100,10\n";
        let (records, _) = ingest_with_fallback_date(csv, fb());
        assert_eq!(records[0].display_date, "01/03/2024");
        assert_eq!(records[0].weekday, "sexta-feira");
    }
}
