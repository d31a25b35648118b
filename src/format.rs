use chrono::{DateTime, Local, Utc};
use colored::Colorize;

use crate::api::{CountResult, PricingInfo};
use crate::catalog::{Category, ModelCatalog};
use crate::channel::ConnectionState;
use crate::history::HistoryEntry;
use crate::selection::Selection;

/// Group digits in threes: `1234567` becomes `1,234,567`.
pub fn format_count(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Estimated cost. Sub-cent amounts keep six decimals.
pub fn format_cost(cost: Option<f64>) -> String {
    match cost {
        None => "-".to_string(),
        Some(c) if c < 0.01 => format!("~${c:.6}"),
        Some(c) => format!("~${c:.4}"),
    }
}

/// Context window as `NM`, `NK` or `N`, truncating.
pub fn format_window(window: u64) -> String {
    if window >= 1_000_000 {
        format!("{}M", window / 1_000_000)
    } else if window >= 1_000 {
        format!("{}K", window / 1_000)
    } else {
        window.to_string()
    }
}

pub fn format_context_usage(percent: Option<f64>, window: Option<u64>) -> String {
    match (percent, window) {
        (Some(p), Some(w)) => format!("{p:.2}% of {}", format_window(w)),
        _ => "-".to_string(),
    }
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    let local = ts.with_timezone(&Local);
    local.format("%Y-%m-%d %H:%M").to_string()
}

/// One line per model: name, tokens, cost, context usage.
pub fn format_results(results: &[CountResult]) -> String {
    let width = results.iter().map(|r| r.model.len()).max().unwrap_or(0);
    results
        .iter()
        .map(|r| {
            format!(
                "{:<width$}  {:>12}  {:>12}  {}",
                r.model.cyan().bold(),
                format_count(r.token_count).bold(),
                format_cost(r.cost_usd).green(),
                format_context_usage(r.context_usage_percent, r.context_window).yellow(),
                width = width
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// History table, newest first.
pub fn format_history(entries: &[HistoryEntry]) -> String {
    if entries.is_empty() {
        return "no history yet".dimmed().to_string();
    }
    let input_width = entries
        .iter()
        .map(|e| e.input.chars().count())
        .max()
        .unwrap_or(0);
    let model_width = entries.iter().map(|e| e.model.len()).max().unwrap_or(0);
    entries
        .iter()
        .map(|e| {
            format!(
                "{}  {:<iw$}  {:<mw$}  {:>10}",
                format_timestamp(&e.timestamp).dimmed(),
                e.input,
                e.model.cyan(),
                format_count(e.token_count),
                iw = input_width,
                mw = model_width
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Models of one category with selection markers.
pub fn format_models(models: &[String], selection: Option<&Selection>) -> String {
    if models.is_empty() {
        return "no models available".dimmed().to_string();
    }
    models
        .iter()
        .map(|m| match selection {
            Some(sel) if sel.contains(m) => format!("  {} {}", "*".green().bold(), m.bold()),
            _ => format!("    {m}"),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_catalog(catalog: &ModelCatalog) -> String {
    let mut out = String::new();
    for category in [Category::Commercial, Category::HuggingFace] {
        out.push_str(&format!(
            "{} {}\n",
            category.as_str().bold(),
            format!("({})", catalog.models(category).len()).dimmed()
        ));
        out.push_str(&format_models(catalog.models(category), None));
        out.push('\n');
    }
    let version = format!("version {}", catalog.version);
    out.push_str(&version.dimmed().to_string());
    out
}

pub fn format_connection(state: &ConnectionState) -> String {
    if state.connected {
        format!("{}", "connected".green())
    } else if state.reconnect_attempts > 0 {
        format!(
            "{} {}",
            "disconnected".red(),
            format!("(reconnect attempt {})", state.reconnect_attempts).dimmed()
        )
    } else {
        format!("{}", "disconnected".red())
    }
}

pub fn format_pricing(info: &PricingInfo) -> String {
    let price = info
        .input_price
        .map(|p| format!("${p} / 1M input tokens"))
        .unwrap_or_else(|| "-".to_string());
    let window = info
        .context_window_formatted
        .clone()
        .or_else(|| info.context_window.map(format_window))
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{}\n  price:   {}\n  context: {}",
        info.model.cyan().bold(),
        price,
        window
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_count_groups_thousands() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1000), "1,000");
        assert_eq!(format_count(1234567), "1,234,567");
    }

    #[test]
    fn test_format_cost_precision() {
        assert_eq!(format_cost(None), "-");
        assert_eq!(format_cost(Some(0.00002)), "~$0.000020");
        assert_eq!(format_cost(Some(0.0125)), "~$0.0125");
        assert_eq!(format_cost(Some(1.5)), "~$1.5000");
    }

    #[test]
    fn test_format_context_usage() {
        assert_eq!(
            format_context_usage(Some(0.0015), Some(128_000)),
            "0.00% of 128K"
        );
        assert_eq!(
            format_context_usage(Some(12.5), Some(1_048_576)),
            "12.50% of 1M"
        );
        assert_eq!(format_context_usage(Some(50.0), Some(512)), "50.00% of 512");
        assert_eq!(format_context_usage(None, Some(8192)), "-");
    }

    #[test]
    fn test_format_models_marks_selection() {
        colored::control::set_override(false);
        let models = vec!["gpt-4".to_string(), "gpt-4o".to_string()];
        let mut sel = Selection::default();
        sel.toggle_model("gpt-4o");
        assert_eq!(format_models(&models, Some(&sel)), "    gpt-4\n  * gpt-4o");
    }
}
