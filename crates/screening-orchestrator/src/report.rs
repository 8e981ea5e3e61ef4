//! Markdown rendering of a screening run.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use qualitative_scoring::PREFERRED_AXIS_ORDER;
use screener_core::{Candidate, PipelineResult};
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

fn axis_label(axis_id: &str) -> &str {
    match axis_id {
        "temporary_lag_factor" => "Q-Temp",
        "growth_driver_confidence" => "Q-Growth",
        "management_and_capital_policy" => "Q-Mgmt",
        "competitive_advantage" => "Q-Edge",
        "risk_resilience" => "Q-Risk",
        other => other,
    }
}

/// Axis columns present on any candidate: known axes first, extras sorted.
fn axis_columns(candidates: &[Candidate]) -> Vec<String> {
    let present: BTreeSet<&str> = candidates
        .iter()
        .flat_map(|c| c.qualitative_scores.keys().map(String::as_str))
        .collect();

    let mut columns: Vec<String> = PREFERRED_AXIS_ORDER
        .iter()
        .filter(|id| present.contains(*id))
        .map(|id| id.to_string())
        .collect();
    columns.extend(
        present
            .iter()
            .filter(|id| !PREFERRED_AXIS_ORDER.contains(*id))
            .map(|id| id.to_string()),
    );
    columns
}

/// Pipe characters would split a cell
fn cell(text: &str) -> String {
    text.replace('|', "/")
}

pub fn candidate_table(candidates: &[Candidate]) -> String {
    let axes = axis_columns(candidates);
    let mut out = String::from("|Ticker|Company|Sector|Quant|Q(Price)|Q(Fund)|Qual|Composite|Excluded|Reasons");
    for axis in &axes {
        let _ = write!(out, "|{}", axis_label(axis));
    }
    out.push_str("|\n|---|---|---|---:|---:|---:|---:|---:|---|---");
    out.push_str(&"|---:".repeat(axes.len()));
    out.push('|');

    for c in candidates {
        let _ = write!(
            out,
            "\n|{}|{}|{}|{:.2}|{:.2}|{:.2}|{:.2}|{:.2}|{}|{}",
            cell(&c.ticker),
            cell(&c.company_name),
            cell(&c.sector),
            c.quantitative_score,
            c.quantitative_score_price_now,
            c.quantitative_score_fundamentals_base,
            c.qualitative_score_total,
            c.composite_score,
            if c.excluded { "yes" } else { "no" },
            cell(&c.exclusion_reasons.join(", ")),
        );
        for axis in &axes {
            let _ = write!(out, "|{:.2}", c.qualitative_scores.get(axis).copied().unwrap_or(0.0));
        }
        out.push('|');
    }
    out
}

fn joined(items: &[String]) -> String {
    if items.is_empty() {
        "N/A".to_string()
    } else {
        items.join(", ")
    }
}

pub fn render_report(result: &PipelineResult, as_of: NaiveDate) -> String {
    let mut lines = vec![
        format!("# Screening Report ({})", as_of.format("%Y-%m-%d")),
        String::new(),
        "Quantitative score is split into two tracks: `Q(Price)` and `Q(Fund)`.".to_string(),
        String::new(),
        "## Candidate Table".to_string(),
        String::new(),
        candidate_table(&result.candidates),
        String::new(),
        "## Top Recommendations".to_string(),
        String::new(),
    ];

    if result.top_recommendations.is_empty() {
        lines.push("No recommendations generated.".to_string());
    }
    for rec in &result.top_recommendations {
        lines.push(format!("### {} - {}", rec.ticker, rec.decision));
        lines.push(format!("- Reasons: {}", joined(&rec.reasons)));
        lines.push(format!("- Risks: {}", joined(&rec.risks)));
        lines.push(format!("- Assumptions: {}", joined(&rec.assumptions)));
        lines.push(format!("- Peer strengths: {}", joined(&rec.peer_strengths)));
        lines.push(format!("- Peer weaknesses: {}", joined(&rec.peer_weaknesses)));
        lines.push(format!("- Re-evaluate when: {}", joined(&rec.reevaluation_triggers)));
        lines.push(String::new());
    }

    lines.join("\n")
}

/// Write `{YYYYMMDD}_report.md` under `output_dir`, creating it if needed.
pub fn write_report(result: &PipelineResult, output_dir: &Path, as_of: NaiveDate) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;
    let path = output_dir.join(format!("{}_report.md", as_of.format("%Y%m%d")));
    std::fs::write(&path, render_report(result, as_of))
        .with_context(|| format!("Failed to write report {}", path.display()))?;
    tracing::info!("📝 Report written to {}", path.display());
    Ok(path)
}
