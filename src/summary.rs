// Generative summary collaborator.
//
// The core hands the model a compact statistical digest of both windows
// (totals, weighted CPA/CTR/CPM, the two worst-CPA purchase days) and asks
// for strict JSON. Any failure along the way (missing key, transport,
// refused request, malformed answer) degrades to a fixed fallback object;
// the rest of the dashboard keeps working.
use crate::types::{DailyMetric, SummaryResponse};
use crate::util::{format_number, ratio};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::time::Duration;

const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models";

struct PeriodDigest {
    spend: f64,
    purchases: u64,
    cpa: f64,
    ctr: f64,
    cpm: f64,
}

fn digest(records: &[DailyMetric]) -> PeriodDigest {
    let spend: f64 = records.iter().map(|d| d.spend).sum();
    let purchases: u64 = records.iter().map(|d| d.purchases).sum();
    let impressions: u64 = records.iter().map(|d| d.impressions).sum();
    let clicks: u64 = records.iter().map(|d| d.clicks).sum();
    PeriodDigest {
        spend,
        purchases,
        cpa: ratio(spend, purchases as f64),
        ctr: ratio(clicks as f64, impressions as f64) * 100.0,
        cpm: ratio(spend, impressions as f64) * 1000.0,
    }
}

/// The two worst days by CPA among days with at least one purchase, as a
/// compact `date: CPA` list for the prompt.
fn worst_cpa_days(records: &[DailyMetric]) -> String {
    let mut days: Vec<&DailyMetric> = records.iter().filter(|d| d.purchases > 0).collect();
    days.sort_by(|a, b| b.cpa.partial_cmp(&a.cpa).unwrap_or(Ordering::Equal));
    days.iter()
        .take(2)
        .map(|d| format!("{}: CPA R${}", d.date_str, format_number(d.cpa, 2)))
        .collect::<Vec<_>>()
        .join("; ")
}

pub fn build_prompt(current: &[DailyMetric], previous: &[DailyMetric]) -> String {
    let cur = digest(current);
    let prev = digest(previous);
    let outliers = worst_cpa_days(current);

    format!(
        "Atue como um Head de Performance reportando para um CEO. Seja extremamente direto, sem jargão excessivo.\n\
         \n\
         DADOS DO PERÍODO ATUAL:\n\
         - Investimento: R$ {}\n\
         - Compras: {}\n\
         - CPA (Custo/Venda): R$ {}\n\
         - CTR: {}%\n\
         - CPM: R$ {}\n\
         \n\
         COMPARAÇÃO (ANTERIOR):\n\
         - Investimento: R$ {}\n\
         - CPA Anterior: R$ {}\n\
         - CTR Anterior: {}%\n\
         \n\
         OUTLIERS (Dias ruins): {}\n\
         \n\
         Gere um JSON estrito com estas chaves:\n\
         {{\n\
           \"executive_summary\": [\"3 bullet points curtos focados no resultado financeiro.\"],\n\
           \"action_plan\": [\"3 ações táticas e priorizadas começando com verbos no imperativo. Baseie-se nos dados.\"],\n\
           \"risks\": [\"Liste alertas SOMENTE SE: CPA subiu, CTR caiu, CPM explodiu ou Vendas zeraram. Se estiver tudo bem, diga 'Métricas estáveis'.\"]\n\
         }}",
        format_number(cur.spend, 2),
        cur.purchases,
        format_number(cur.cpa, 2),
        format_number(cur.ctr, 2),
        format_number(cur.cpm, 2),
        format_number(prev.spend, 2),
        format_number(prev.cpa, 2),
        format_number(prev.ctr, 2),
        outliers,
    )
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<RequestContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct RequestContent {
    parts: Vec<RequestPart>,
}

#[derive(Serialize)]
struct RequestPart {
    text: String,
}

#[derive(Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: String,
}

/// Pull the structured summary out of a raw `generateContent` body.
fn summary_from_response(body: &str) -> Result<SummaryResponse> {
    let response: GenerateResponse =
        serde_json::from_str(body).context("malformed generateContent response")?;
    let text = response
        .candidates
        .first()
        .and_then(|c| c.content.parts.first())
        .map(|p| p.text.as_str())
        .context("empty model answer")?;
    serde_json::from_str(text.trim()).context("model answer is not the expected JSON")
}

fn request_summary(
    current: &[DailyMetric],
    previous: &[DailyMetric],
    api_key: Option<&str>,
    model: &str,
) -> Result<SummaryResponse> {
    let key = api_key.context("GEMINI_API_KEY is not set")?;
    let request = GenerateRequest {
        contents: vec![RequestContent {
            parts: vec![RequestPart {
                text: build_prompt(current, previous),
            }],
        }],
        generation_config: GenerationConfig {
            response_mime_type: "application/json".to_string(),
        },
    };
    let client = reqwest::blocking::Client::builder()
        .timeout(Duration::from_secs(60))
        .build()
        .context("failed to build HTTP client")?;
    let url = format!("{}/{}:generateContent?key={}", GEMINI_ENDPOINT, model, key);
    let body = client
        .post(&url)
        .json(&request)
        .send()
        .context("generateContent request failed")?
        .error_for_status()
        .context("generateContent returned an error status")?
        .text()
        .context("failed to read generateContent body")?;
    summary_from_response(&body)
}

/// Generate the prose summary, never failing: errors are logged and replaced
/// by [`fallback_summary`].
pub fn generate_summary(
    current: &[DailyMetric],
    previous: &[DailyMetric],
    api_key: Option<&str>,
    model: &str,
) -> SummaryResponse {
    match request_summary(current, previous, api_key, model) {
        Ok(summary) => summary,
        Err(err) => {
            eprintln!("AI summary unavailable: {:#}", err);
            fallback_summary()
        }
    }
}

pub fn fallback_summary() -> SummaryResponse {
    SummaryResponse {
        executive_summary: vec!["Sistema indisponível momentaneamente.".to_string()],
        action_plan: vec!["Verifique a conexão ou a chave de API.".to_string()],
        risks: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn metric(day: u32, spend: f64, purchases: u64, clicks: u64, impressions: u64) -> DailyMetric {
        let date = NaiveDate::from_ymd_opt(2024, 3, day).unwrap();
        DailyMetric {
            date,
            date_str: format!("{:02}/03/2024", day),
            display_date: format!("{:02}/03/2024", day),
            weekday: String::new(),
            spend,
            impressions,
            clicks,
            installs: 0,
            purchases,
            title_cost: 0.0,
            revenue: 0.0,
            clients: 0,
            promo: "Sem Promo".to_string(),
            ctr: 0.0,
            cpm: 0.0,
            cpc: 0.0,
            cpi: 0.0,
            cpa: ratio(spend, purchases as f64),
            install_rate: 0.0,
            conversion_rate: 0.0,
            roas: 0.0,
            titles_per_client: 0.0,
        }
    }

    #[test]
    fn prompt_carries_weighted_stats_and_outliers() {
        let current = vec![
            metric(1, 100.0, 2, 10, 1000),
            metric(2, 300.0, 1, 10, 1000),
        ];
        let previous = vec![metric(20, 50.0, 1, 5, 500)];
        let prompt = build_prompt(&current, &previous);
        // Weighted CPA: 400 / 3.
        assert!(prompt.contains("CPA (Custo/Venda): R$ 133,33"));
        assert!(prompt.contains("Investimento: R$ 400,00"));
        // Worst CPA day (300/1) is listed before the other outlier.
        assert!(prompt.contains("02/03/2024: CPA R$300,00; 01/03/2024: CPA R$50,00"));
        assert!(prompt.contains("CPA Anterior: R$ 50,00"));
    }

    #[test]
    fn outliers_ignore_days_without_purchases() {
        let current = vec![metric(1, 100.0, 0, 10, 1000), metric(2, 10.0, 1, 10, 1000)];
        assert_eq!(worst_cpa_days(&current), "02/03/2024: CPA R$10,00");
    }

    #[test]
    fn extracts_summary_from_generate_content_body() {
        let inner = r#"{"executive_summary":["ok"],"action_plan":["agir"],"risks":[]}"#;
        let body = serde_json::json!({
            "candidates": [{
                "content": { "parts": [{ "text": inner }] }
            }]
        })
        .to_string();
        let summary = summary_from_response(&body).unwrap();
        assert_eq!(summary.executive_summary, vec!["ok"]);
        assert_eq!(summary.action_plan, vec!["agir"]);
        assert!(summary.risks.is_empty());
    }

    #[test]
    fn malformed_answers_are_errors_not_panics() {
        assert!(summary_from_response("not json").is_err());
        assert!(summary_from_response(r#"{"candidates":[]}"#).is_err());
        let body = serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": "plain prose" }] } }]
        })
        .to_string();
        assert!(summary_from_response(&body).is_err());
    }

    #[test]
    fn generate_summary_degrades_to_fallback_without_key() {
        let summary = generate_summary(&[], &[], None, "gemini-2.0-flash");
        assert_eq!(summary, fallback_summary());
    }
}
