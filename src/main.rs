// Entry point and high-level CLI flow.
//
// The binary is a menu-driven console dashboard over a published
// spreadsheet:
// - Option [1] fetches and ingests the active sheet tab, printing
//   diagnostics.
// - Options [2]..[5] switch tabs, render the KPI/day tables and adjust the
//   view and comparison filters.
// - Option [6] asks the Gemini collaborator for a prose summary; option [7]
//   exports the aggregate pair as JSON.
mod aggregate;
mod columns;
mod compare;
mod fetch;
mod loader;
mod output;
mod summary;
mod types;
mod util;

use anyhow::Result;
use chrono::{Duration, NaiveDate};
use clap::Parser;
use once_cell::sync::Lazy;
use std::io::{self, Write};
use std::sync::Mutex;
use types::{ComparisonMode, DailyMetric, ViewFilter};
use util::format_int;

/// Dashboard tabs: (label, sheet tab name on the published spreadsheet).
const DASHBOARD_TABS: &[(&str, &str)] = &[
    ("Visão Geral", "Geral Tráfego"),
    ("TP-Site", "TP-Site"),
    ("TP-APP", "TP-APP"),
    ("Meta Ads", "Meta Ads"),
    ("Google Ads", "Google Ads"),
    ("Tiktok Ads", "Tiktok Ads"),
];

#[derive(Parser, Debug)]
#[command(
    name = "traffic_report",
    about = "Marketing traffic performance report over a published spreadsheet"
)]
struct Args {
    /// CSV export base URL (defaults to the published dashboard sheet; can
    /// also be set through SHEET_BASE_URL)
    #[arg(long)]
    base_url: Option<String>,

    /// Sheet tab to load on startup (defaults to the first dashboard tab)
    #[arg(long)]
    sheet: Option<String>,

    /// Gemini model used for the AI summary
    #[arg(long, default_value = "gemini-2.0-flash")]
    model: String,
}

// Simple in-memory app state: the record set, the active filters and a
// fetch-generation counter so a stale, slow response can never overwrite a
// newer one. The record set is replaced atomically on each successful load.
static APP_STATE: Lazy<Mutex<AppState>> = Lazy::new(|| Mutex::new(AppState::new()));

struct AppState {
    data: Option<Vec<DailyMetric>>,
    fetch_generation: u64,
    sheet: String,
    view: ViewFilter,
    mode: ComparisonMode,
    promos: Vec<String>,
    benchmark_promo: Option<String>,
    manual_range: Option<(NaiveDate, NaiveDate)>,
}

impl AppState {
    fn new() -> Self {
        AppState {
            data: None,
            fetch_generation: 0,
            sheet: DASHBOARD_TABS[0].1.to_string(),
            view: ViewFilter::default(),
            mode: ComparisonMode::PreviousPeriod,
            promos: Vec::new(),
            benchmark_promo: None,
            manual_range: None,
        }
    }
}

/// Explicit post-load initialization of the filter state: default the view
/// to the last 14 days of data, the manual benchmark to the 14 days before
/// that, and the benchmark promotion to the first known label.
fn init_defaults(state: &mut AppState) {
    let Some(data) = &state.data else { return };
    state.promos = compare::unique_promos(data);
    if state.benchmark_promo.is_none() {
        state.benchmark_promo = state.promos.first().cloned();
    }
    if state.view.start.is_none() {
        if let Some(last) = data.last().map(|d| d.date) {
            let start = last - Duration::days(13);
            state.view.start = Some(start);
            state.view.end = Some(last);
            let prev_end = start - Duration::days(1);
            state.manual_range = Some((prev_end - Duration::days(13), prev_end));
        }
    }
}

fn read_line(prompt: &str) -> String {
    print!("{}", prompt);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    io::stdin().read_line(&mut buf).ok();
    buf.trim().to_string()
}

fn read_choice() -> String {
    read_line("Enter choice: ")
}

/// Read a date in ISO form; empty input keeps `current`.
fn read_date(prompt: &str, current: Option<NaiveDate>) -> Option<NaiveDate> {
    let hint = current
        .map(|d| format!(" [{}]", d))
        .unwrap_or_default();
    let input = read_line(&format!("{}{} (YYYY-MM-DD): ", prompt, hint));
    if input.is_empty() {
        return current;
    }
    match NaiveDate::parse_from_str(&input, "%Y-%m-%d") {
        Ok(d) => Some(d),
        Err(_) => {
            println!("Invalid date, keeping previous value.");
            current
        }
    }
}

fn base_url(args: &Args) -> String {
    args.base_url
        .clone()
        .or_else(|| std::env::var("SHEET_BASE_URL").ok())
        .unwrap_or_else(fetch::default_base_url)
}

/// Handle option [1]: fetch the active sheet tab and ingest it.
///
/// The generation counter is bumped before the request; the result is only
/// applied if no newer load started in the meantime.
fn handle_load(args: &Args) {
    let (generation, sheet) = {
        let mut state = APP_STATE.lock().unwrap();
        state.fetch_generation += 1;
        (state.fetch_generation, state.sheet.clone())
    };

    println!("Fetching sheet '{}'...", sheet);
    let fetched: Result<String> = fetch::build_client()
        .and_then(|client| fetch::fetch_sheet_csv(&client, &base_url(args), &sheet));

    match fetched {
        Ok(raw) => {
            let (records, report) = loader::ingest(&raw);
            let mut state = APP_STATE.lock().unwrap();
            if state.fetch_generation != generation {
                println!("Discarding stale response for '{}'.\n", sheet);
                return;
            }
            println!(
                "Processing sheet... ({} rows read, {} kept, {} rejected)",
                format_int(report.total_rows as u64),
                format_int(report.kept_rows as u64),
                format_int(report.rejected_rows as u64)
            );
            if !report.headers.is_empty() {
                println!("Headers (row {}): {}", report.header_row, report.headers.join(" | "));
            }
            if !report.missing_fields.is_empty() {
                println!("Note: unresolved columns: {}", report.missing_fields.join(", "));
            }
            println!();
            state.data = Some(records);
            init_defaults(&mut state);
        }
        Err(e) => {
            // Transport failure: one visible error, previous data retained.
            eprintln!("Failed to load sheet data: {:#}\n", e);
        }
    }
}

/// Handle option [2]: switch the dashboard tab and reload.
fn handle_switch_tab(args: &Args) {
    println!("Dashboard tabs:");
    for (i, (label, sheet)) in DASHBOARD_TABS.iter().enumerate() {
        println!("[{}] {} ({})", i + 1, label, sheet);
    }
    let choice = read_choice();
    let Ok(idx) = choice.parse::<usize>() else {
        println!("Invalid choice.\n");
        return;
    };
    let Some((_, sheet)) = DASHBOARD_TABS.get(idx.wrapping_sub(1)) else {
        println!("Invalid choice.\n");
        return;
    };
    {
        let mut state = APP_STATE.lock().unwrap();
        state.sheet = sheet.to_string();
    }
    handle_load(args);
}

/// Build the effective comparison label for the selection summary line.
fn mode_label(mode: &ComparisonMode) -> String {
    match mode {
        ComparisonMode::None => "Sem Comparação".to_string(),
        ComparisonMode::PreviousPeriod => "Período Anterior".to_string(),
        ComparisonMode::PreviousWeek => "Semana Anterior".to_string(),
        ComparisonMode::PreviousMonth => "Mês Anterior".to_string(),
        ComparisonMode::Manual { start, end } => format!("Manual {} a {}", start, end),
        ComparisonMode::Promotion { label } => format!("Benchmark: {}", label),
    }
}

/// Handle option [3]: resolve both windows and render the dashboard tables.
fn handle_dashboard() {
    let state = APP_STATE.lock().unwrap();
    let Some(data) = &state.data else {
        println!("Error: No data loaded. Please load the sheet first (option 1).\n");
        return;
    };
    let (current, previous) = compare::resolve_windows(data, &state.view, &state.mode);

    let analysis = match &state.view.promo {
        Some(promo) => format!("Promoção: {}", promo),
        None => "Período Cronológico".to_string(),
    };
    println!(
        "Análise: {} | VS: {} | Amostra: {} dias | Benchmark: {} dias\n",
        analysis,
        mode_label(&state.mode),
        current.len(),
        previous.len()
    );

    let current_agg = aggregate::aggregate(&current);
    let previous_agg = aggregate::aggregate(&previous);
    output::preview_table_rows(&output::kpi_rows(&current_agg, &previous_agg), usize::MAX);

    println!("Daily breakdown (first 10 of {}):", current.len());
    output::preview_table_rows(&output::daily_rows(&current), 10);
}

/// Handle option [4]: choose the primary window (promotion or date range).
fn handle_view_filter() {
    let mut state = APP_STATE.lock().unwrap();
    if state.data.is_none() {
        println!("Error: No data loaded. Please load the sheet first (option 1).\n");
        return;
    }

    println!("View filter:");
    println!("[0] All periods (chronological date range)");
    for (i, promo) in state.promos.iter().enumerate() {
        println!("[{}] Promo: {}", i + 1, promo);
    }
    let choice = read_choice();
    match choice.parse::<usize>() {
        Ok(0) => {
            state.view.promo = None;
            state.view.start = read_date("Start date", state.view.start);
            state.view.end = read_date("End date", state.view.end);
        }
        Ok(n) if n <= state.promos.len() => {
            state.view.promo = Some(state.promos[n - 1].clone());
        }
        _ => println!("Invalid choice."),
    }
    println!();
}

/// Handle option [5]: pick the comparison mode (and its parameters).
fn handle_comparison() {
    let mut state = APP_STATE.lock().unwrap();
    println!("Comparison mode:");
    println!("[1] Período Anterior");
    println!("[2] Semana Anterior");
    println!("[3] Mês Anterior");
    println!("[4] Personalizado (Manual)");
    println!("[5] Comparar Promoções");
    println!("[6] Sem Comparação");
    match read_choice().as_str() {
        "1" => state.mode = ComparisonMode::PreviousPeriod,
        "2" => state.mode = ComparisonMode::PreviousWeek,
        "3" => state.mode = ComparisonMode::PreviousMonth,
        "4" => {
            let (default_start, default_end) = match state.manual_range {
                Some((s, e)) => (Some(s), Some(e)),
                None => (None, None),
            };
            let start = read_date("Benchmark start", default_start);
            let end = read_date("Benchmark end", default_end);
            match (start, end) {
                (Some(start), Some(end)) => {
                    state.manual_range = Some((start, end));
                    state.mode = ComparisonMode::Manual { start, end };
                }
                _ => println!("Manual comparison needs both dates; mode unchanged."),
            }
        }
        "5" => {
            if state.promos.is_empty() {
                // No promotion list yet: the benchmark set stays empty until
                // promotions are available.
                state.mode = ComparisonMode::Promotion {
                    label: String::new(),
                };
                println!("No promotions known yet; benchmark will be empty.");
            } else {
                for (i, promo) in state.promos.iter().enumerate() {
                    println!("[{}] {}", i + 1, promo);
                }
                let default = state.benchmark_promo.clone();
                let label = match read_choice().parse::<usize>() {
                    Ok(n) if n >= 1 && n <= state.promos.len() => state.promos[n - 1].clone(),
                    _ => default.unwrap_or_default(),
                };
                state.benchmark_promo = Some(label.clone());
                state.mode = ComparisonMode::Promotion { label };
            }
        }
        "6" => state.mode = ComparisonMode::None,
        _ => println!("Invalid choice."),
    }
    println!();
}

/// Handle option [6]: ask the summary collaborator about the current
/// selection. Failures inside the collaborator degrade to its fixed
/// fallback, so this never errors.
fn handle_ai_summary(args: &Args) {
    let (current, previous) = {
        let state = APP_STATE.lock().unwrap();
        let Some(data) = &state.data else {
            println!("Error: No data loaded. Please load the sheet first (option 1).\n");
            return;
        };
        compare::resolve_windows(data, &state.view, &state.mode)
    };
    if current.is_empty() {
        println!("Nothing selected; adjust the view filter first.\n");
        return;
    }

    println!("Generating AI summary ({} days vs {} days)...\n", current.len(), previous.len());
    let api_key = std::env::var("GEMINI_API_KEY").ok();
    let result = summary::generate_summary(&current, &previous, api_key.as_deref(), &args.model);

    println!("Resumo Executivo:");
    for line in &result.executive_summary {
        println!("  - {}", line);
    }
    println!("Plano de Ação:");
    for line in &result.action_plan {
        println!("  - {}", line);
    }
    if !result.risks.is_empty() {
        println!("Riscos:");
        for line in &result.risks {
            println!("  - {}", line);
        }
    }
    println!();
}

/// Handle option [7]: export both aggregates as pretty JSON.
fn handle_export() {
    let state = APP_STATE.lock().unwrap();
    let Some(data) = &state.data else {
        println!("Error: No data loaded. Please load the sheet first (option 1).\n");
        return;
    };
    let (current, previous) = compare::resolve_windows(data, &state.view, &state.mode);
    let payload = serde_json::json!({
        "sheet": state.sheet,
        "sample_days": current.len(),
        "benchmark_days": previous.len(),
        "current": aggregate::aggregate(&current),
        "previous": aggregate::aggregate(&previous),
    });
    match output::write_json("summary.json", &payload) {
        Ok(()) => println!("Aggregates exported to summary.json\n"),
        Err(e) => eprintln!("Write error: {:#}\n", e),
    }
}

fn main() {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    if let Some(sheet) = &args.sheet {
        let mut state = APP_STATE.lock().unwrap();
        state.sheet = sheet.clone();
    }

    loop {
        {
            let state = APP_STATE.lock().unwrap();
            println!("Traffic Performance Report (sheet: {})", state.sheet);
        }
        println!("[1] Load / refresh sheet data");
        println!("[2] Switch dashboard tab");
        println!("[3] Show dashboard");
        println!("[4] Configure view filter");
        println!("[5] Configure comparison mode");
        println!("[6] Generate AI summary");
        println!("[7] Export aggregates (summary.json)");
        println!("[0] Quit\n");
        match read_choice().as_str() {
            "1" => handle_load(&args),
            "2" => handle_switch_tab(&args),
            "3" => handle_dashboard(),
            "4" => handle_view_filter(),
            "5" => handle_comparison(),
            "6" => handle_ai_summary(&args),
            "7" => handle_export(),
            "0" | "q" | "Q" => {
                println!("Exiting the program.");
                break;
            }
            _ => println!("Invalid choice.\n"),
        }
    }
}
