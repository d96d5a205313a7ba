//! Terminal card rendering for reports and health status.

use clauseguard_core::{ClauseResult, ComplianceReport};
use clauseguard_pipeline::HealthStatus;

const MAX_RATIONALE_CHARS: usize = 160;
const MAX_CANDIDATES_SHOWN: usize = 3;

// ── Report card ──

/// Print a document report as a vertical card: totals first, then one
/// block per clause.
pub fn print_report(report: &ComplianceReport) {
    println!("=== {} ===", report.document_id);
    println!();
    println!("  {:<26} {}", "clauses", report.totals.total());
    println!("  {:<26} {}", "compliant", report.totals.compliant);
    println!("  {:<26} {}", "non-compliant", report.totals.non_compliant);
    println!("  {:<26} {}", "undetermined", report.totals.undetermined);
    println!("  {:<26} {:.3}", "overall score", report.overall_score);
    println!(
        "  {:<26} {}",
        "elevated severity",
        report.severity_counts.elevated()
    );
    println!("  {:<26} {}", "anomalies", report.anomaly_count);
    println!("  {:<26} {}", "generated", report.generated_at);
    println!("  {:<26} {} ms", "elapsed", report.elapsed_ms);
    println!();

    for clause in &report.clauses {
        print_clause(clause);
    }
}

fn print_clause(result: &ClauseResult) {
    println!("{}", result.clause_id);
    println!("  {:<26} {}", "verdict", result.verdict.compliant.as_str());
    println!("  {:<26} {:.2}", "confidence", result.verdict.confidence);

    let providers = if result.verdict.contributing_providers.is_empty() {
        "-".to_string()
    } else {
        result.verdict.contributing_providers.join(", ")
    };
    println!("  {:<26} {}", "providers", providers);
    println!(
        "  {:<26} {} ({})",
        "risk",
        result.risk.severity.as_str(),
        result.risk.category
    );
    println!("  {:<26} {:.2}", "risk score", result.risk.score);
    println!(
        "  {:<26} {}",
        "anomalous",
        if result.anomaly.is_outlier { "yes" } else { "no" }
    );
    if !result.verdict.rationale.is_empty() {
        println!(
            "  {:<26} {}",
            "rationale",
            truncate(&result.verdict.rationale, MAX_RATIONALE_CHARS)
        );
    }

    if !result.candidates.is_empty() {
        println!("  matched rules ({}):", result.candidates.len());
        for candidate in result.candidates.iter().take(MAX_CANDIDATES_SHOWN) {
            println!("    {:<30} {:.3}", candidate.rule_id, candidate.score);
        }
        if result.candidates.len() > MAX_CANDIDATES_SHOWN {
            println!(
                "    ... and {} more",
                result.candidates.len() - MAX_CANDIDATES_SHOWN
            );
        }
    }

    if let Some(note) = &result.note {
        println!("  {:<26} {}", "note", note);
    }
    println!();
}

// ── Health card ──

pub fn print_health(status: &HealthStatus) {
    println!("=== clauseguard health ===");
    println!();
    println!(
        "  {:<26} {}",
        "index loaded",
        if status.index_loaded { "yes" } else { "no" }
    );
    println!("  {:<26} {}", "rules", status.rules);
    for provider in &status.providers {
        println!(
            "  {:<26} {}",
            provider.id,
            if provider.reachable {
                "reachable"
            } else {
                "unreachable"
            }
        );
    }
    println!();
    println!(
        "  {:<26} {}",
        "healthy",
        if status.healthy { "yes" } else { "no" }
    );
}

/// Character-safe truncation; LLM rationales are multibyte text.
fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{cut}...")
}
