use rust_decimal::Decimal;

use crate::scraper::odds::OddsObservation;
use crate::types::{MatchSnapshot, StakeSide};

pub const NO_PREDICTION: &str = "❌ No prediction matches the template";

/// Escape text for Telegram's HTML parse mode.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Alert body for a snapshot. Deterministic: same snapshot, same text.
pub fn render_alert(snapshot: &MatchSnapshot) -> String {
    let mut text = format!(
        "⚽ <b>{}</b>\n⏰ Time: {}\n🔢 Score: {}\n\n💰 <b>Odds found:</b>\n",
        escape_html(&snapshot.teams),
        escape_html(&snapshot.time),
        escape_html(&snapshot.score),
    );

    for (label, group) in group_by_market(&snapshot.odds) {
        let values: Vec<String> = group.iter().map(|o| o.value().to_string()).collect();
        text.push_str(&format!("• {}: {}\n", escape_html(label), values.join(", ")));
        for obs in group {
            text.push_str(&format!("   {}: {}\n", escape_html(obs.detail()), obs.value()));
        }
    }

    text.push_str(&format!("\n📊 <b>Prediction:</b>\n{}\n", predict(&snapshot.odds)));
    text
}

/// Observations grouped by market label, groups in first-appearance order.
fn group_by_market(odds: &[OddsObservation]) -> Vec<(&str, Vec<&OddsObservation>)> {
    let mut groups: Vec<(&str, Vec<&OddsObservation>)> = Vec::new();
    for obs in odds {
        match groups.iter_mut().find(|(label, _)| *label == obs.market_label()) {
            Some((_, group)) => group.push(obs),
            None => groups.push((obs.market_label(), vec![obs])),
        }
    }
    groups
}

/// Template-based annotation over the "over" totals, keyed by goal line.
pub fn predict(odds: &[OddsObservation]) -> String {
    let over_at = |line: Decimal| -> Vec<Decimal> {
        let mut values: Vec<Decimal> = odds
            .iter()
            .filter(|o| o.side() == StakeSide::Over && o.line() == Some(line))
            .map(|o| o.value())
            .collect();
        values.sort();
        values
    };
    let probe = Decimal::new(257, 2);

    let mut lines = Vec::new();
    if over_at(Decimal::ONE).contains(&probe) {
        lines.push("⚠️ Low risk: total 0.5 as a probe (0.5%)");
    }
    if over_at(Decimal::new(5, 1)).contains(&probe) {
        lines.push("🔥 Risky entry: total 0.5 (high odds)");
    }
    let ladder = [Decimal::new(183, 2), Decimal::new(221, 2), Decimal::new(257, 2)];
    if over_at(Decimal::new(15, 1)) == ladder {
        lines.push("✅ Low risk: build on total 1 (via 1.5)");
    }

    if lines.is_empty() {
        NO_PREDICTION.to_string()
    } else {
        lines.join("\n")
    }
}
