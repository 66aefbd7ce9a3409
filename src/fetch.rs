// HTTP input feed: the published-spreadsheet CSV export.
//
// This is the only fallible stage of a load. A transport failure propagates
// to the caller as one error (the previous record set stays untouched);
// everything after the fetch recovers row by row.
use anyhow::{Context, Result};
use chrono::Utc;
use std::time::Duration;

const SHEET_ID: &str = "1PzalyjV_OJZAhkk5L7Dk7lpScjDT3jxnnzQ8_mBCqcQ";

pub fn default_base_url() -> String {
    format!(
        "https://docs.google.com/spreadsheets/d/{}/gviz/tq?tqx=out:csv",
        SHEET_ID
    )
}

pub fn build_client() -> Result<reqwest::blocking::Client> {
    reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(120))
        .user_agent(concat!("traffic-report/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to build HTTP client")
}

/// Fetch one sheet tab as raw CSV text. The `t` parameter is a cache-busting
/// timestamp; the export endpoint otherwise serves stale copies.
pub fn fetch_sheet_csv(
    client: &reqwest::blocking::Client,
    base_url: &str,
    sheet_name: &str,
) -> Result<String> {
    let ts = Utc::now().timestamp_millis().to_string();
    let response = client
        .get(base_url)
        .query(&[("sheet", sheet_name), ("t", ts.as_str())])
        .send()
        .with_context(|| format!("request for sheet '{}' failed", sheet_name))?
        .error_for_status()
        .context("sheet export returned an error status")?;
    response.text().context("failed to read sheet response body")
}
