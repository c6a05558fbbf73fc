use std::fmt::Write;

use crate::models::ProductRecord;
use crate::search::{SearchReport, SourceStatus};

fn describe(record: &ProductRecord) -> String {
    format!(
        "{}: {} on {} ({})",
        record.name, record.price, record.source, record.availability
    )
}

/// Human-readable ranking: cheapest offer first, then the runners-up, then
/// per-source status lines.
pub fn render(report: &SearchReport) -> String {
    let mut out = String::new();

    match report.cheapest() {
        None => {
            let _ = writeln!(out, "No products found on any source for the selected criteria.");
        }
        Some(cheapest) => {
            let _ = writeln!(out, "Cheapest offer:");
            let _ = writeln!(out, "  {}", cheapest.name);
            let _ = writeln!(out, "  Price: {} on {}", cheapest.price, cheapest.source);

            let others = &report.ranked[1..];
            if !others.is_empty() {
                let _ = writeln!(out);
                let _ = writeln!(out, "Next {} offers by price:", others.len());
                for record in others {
                    let _ = writeln!(out, "  - {}", describe(record));
                }
            }

            if let Some(summary) = &report.summary {
                if summary.priced_count > 1 {
                    let _ = writeln!(out);
                    let _ = write!(
                        out,
                        "Spread: {:.2} to {:.2} (avg {:.2})",
                        summary.cheapest.price_value, summary.most_expensive.price_value, summary.average
                    );
                    if let (Some(savings), Some(pct)) = (summary.savings(), summary.savings_percentage()) {
                        let _ = write!(out, ", save {} ({}%)", savings, pct);
                    }
                    let _ = writeln!(out);
                }
            }
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Sources:");
    for source in &report.sources {
        let status = match &source.status {
            SourceStatus::Completed => "ok".to_string(),
            SourceStatus::TimedOut => "timed out, partial results".to_string(),
            SourceStatus::Unavailable { reason } => format!("unavailable: {}", reason),
        };
        let _ = writeln!(
            out,
            "  {}: {} matches, {} ({} ms)",
            source.source, source.records_found, status, source.elapsed_ms
        );
    }

    out
}
