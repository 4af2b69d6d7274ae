use std::str::FromStr;

use rust_decimal::Decimal;

use crate::error::ParseFailure;
use crate::types::StakeSide;

/// Ancestor class fragment → market label. Order matters: first match wins.
pub const MARKET_TABLE: &[(&str, &str)] = &[
    ("lv_market_results", "1-X-2"),
    ("lv_market-doubleChance", "Double chance"),
    ("lv_market-overUnder", "Total"),
    ("lv_market-handicap", "Handicap"),
    ("lv_market-bothTeamsToScore", "Both teams to score"),
    ("lv_market-correctScore", "Correct score"),
];

pub const UNKNOWN_MARKET: &str = "Unknown market";

/// Label for a stake given the class attribute of its enclosing market block.
pub fn classify_market(ancestor_classes: &str) -> &'static str {
    MARKET_TABLE
        .iter()
        .find(|(fragment, _)| ancestor_classes.contains(fragment))
        .map(|&(_, label)| label)
        .unwrap_or(UNKNOWN_MARKET)
}

/// Over when the stake label carries the site's "over" word, under otherwise.
pub fn classify_side(stake_label: &str, over_keyword: &str) -> StakeSide {
    if stake_label.contains(over_keyword) {
        StakeSide::Over
    } else {
        StakeSide::Under
    }
}

/// Parse a rendered odds factor ("2.21", "2,21", " 1.83 "). Input that does
/// not fit a `Decimal` without rounding is rejected.
pub fn parse_factor(text: &str) -> Result<Decimal, ParseFailure> {
    let cleaned = text.trim().replace(',', ".");
    if cleaned.is_empty() {
        return Err(ParseFailure(text.to_string()));
    }
    Decimal::from_str_exact(&cleaned).map_err(|_| ParseFailure(text.to_string()))
}

/// Last numeric token of a stake label: "Больше 1.5" → 1.5, "Меньше (2,5)" → 2.5.
pub fn parse_line(stake_label: &str) -> Option<Decimal> {
    stake_label
        .split(|c: char| c.is_whitespace() || c == '(' || c == ')')
        .filter(|token| !token.is_empty())
        .filter_map(|token| parse_factor(token).ok())
        .last()
}

// ---------------------------------------------------------------------------
// TargetOdds
// ---------------------------------------------------------------------------

/// The fixed set of odds worth alerting on.
///
/// Membership is exact decimal equality. The site renders factors with fixed
/// two-digit precision, so "2.21" on the page equals 2.21 here; a site that
/// starts rendering "2.205" would silently stop matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetOdds(Vec<Decimal>);

impl TargetOdds {
    pub fn new(values: impl IntoIterator<Item = Decimal>) -> Self {
        let mut values: Vec<Decimal> = values.into_iter().map(|v| v.normalize()).collect();
        values.sort();
        values.dedup();
        Self(values)
    }

    pub fn contains(&self, value: Decimal) -> bool {
        self.0.iter().any(|target| *target == value)
    }

    pub fn values(&self) -> &[Decimal] {
        &self.0
    }

    /// Build an observation when `value` is a target; `None` otherwise.
    pub fn observe(
        &self,
        value: Decimal,
        market_label: &str,
        side: StakeSide,
        line: Option<Decimal>,
        detail: String,
    ) -> Option<OddsObservation> {
        if !self.contains(value) {
            return None;
        }
        Some(OddsObservation {
            value: value.normalize(),
            market_label: market_label.to_string(),
            side,
            line: line.map(|l| l.normalize()),
            detail,
        })
    }
}

impl Default for TargetOdds {
    fn default() -> Self {
        Self::new([Decimal::new(257, 2), Decimal::new(183, 2), Decimal::new(221, 2)])
    }
}

impl FromStr for TargetOdds {
    type Err = ParseFailure;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values = s
            .split(',')
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(parse_factor)
            .collect::<Result<Vec<_>, _>>()?;
        if values.is_empty() {
            return Err(ParseFailure(s.to_string()));
        }
        Ok(Self::new(values))
    }
}

// ---------------------------------------------------------------------------
// OddsObservation
// ---------------------------------------------------------------------------

/// A stake whose factor is in the target set. Only `TargetOdds::observe`
/// constructs these, so `value` is always a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OddsObservation {
    value: Decimal,
    market_label: String,
    side: StakeSide,
    line: Option<Decimal>,
    detail: String,
}

impl OddsObservation {
    pub fn value(&self) -> Decimal {
        self.value
    }

    pub fn market_label(&self) -> &str {
        &self.market_label
    }

    pub fn side(&self) -> StakeSide {
        self.side
    }

    /// Goal line of a total stake ("Больше 1.5" → 1.5), when the label has one.
    pub fn line(&self) -> Option<Decimal> {
        self.line
    }

    /// Human-readable line, e.g. "Тотал 1-й тайм Больше 1.5".
    pub fn detail(&self) -> &str {
        &self.detail
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn accepts_exact_targets_only() {
        let targets = TargetOdds::default();
        assert!(targets.contains(dec!(2.57)));
        assert!(targets.contains(dec!(1.83)));
        assert!(targets.contains(dec!(2.21)));
        assert!(!targets.contains(dec!(2.58)));
        assert!(!targets.contains(dec!(1.830001)));
        assert!(!targets.contains(dec!(1.8)));
    }

    #[test]
    fn trailing_zero_is_the_same_value() {
        let targets = TargetOdds::default();
        assert!(targets.contains(parse_factor("2.210").unwrap()));
    }

    #[test]
    fn parse_factor_handles_comma_and_whitespace() {
        assert_eq!(parse_factor(" 1.83 "), Ok(dec!(1.83)));
        assert_eq!(parse_factor("2,57"), Ok(dec!(2.57)));
    }

    #[test]
    fn parse_factor_rejects_non_numeric() {
        assert_eq!(parse_factor("abc"), Err(ParseFailure("abc".to_string())));
        assert!(parse_factor("").is_err());
        assert!(parse_factor("—").is_err());
    }

    #[test]
    fn over_long_factors_are_rejected_not_rounded() {
        let targets = TargetOdds::default();
        for raw in ["1.83000000000000000000000000001", "2.2099999999999999999999999999999"] {
            assert_eq!(parse_factor(raw), Err(ParseFailure(raw.to_string())));
        }
        let padded = parse_factor("1.8300000000000000000000000000").unwrap();
        assert!(targets.contains(padded));
    }

    #[test]
    fn observe_builds_only_for_targets() {
        let targets = TargetOdds::default();
        let obs = targets
            .observe(
                dec!(2.21),
                "Total",
                StakeSide::Over,
                Some(dec!(1.5)),
                "Тотал Больше 1.5".to_string(),
            )
            .expect("2.21 is a target");
        assert_eq!(obs.value(), dec!(2.21));
        assert_eq!(obs.market_label(), "Total");
        assert_eq!(obs.side(), StakeSide::Over);
        assert_eq!(obs.line(), Some(dec!(1.5)));
        assert!(targets
            .observe(dec!(2.22), "Total", StakeSide::Over, None, String::new())
            .is_none());
    }

    #[test]
    fn classify_market_first_match_wins() {
        assert_eq!(classify_market("lv_event_market lv_market-overUnder"), "Total");
        assert_eq!(classify_market("lv_market lv_market_results"), "1-X-2");
        assert_eq!(classify_market("lv_market lv_market-correctScore"), "Correct score");
        assert_eq!(classify_market("lv_market lv_market-handicap lv_market-overUnder"), "Total");
        assert_eq!(classify_market("lv_market something-else"), UNKNOWN_MARKET);
        assert_eq!(classify_market(""), UNKNOWN_MARKET);
    }

    #[test]
    fn classify_side_by_keyword() {
        assert_eq!(classify_side("Больше 1.5", "Больше"), StakeSide::Over);
        assert_eq!(classify_side("Меньше 1.5", "Больше"), StakeSide::Under);
    }

    #[test]
    fn parse_line_takes_last_number() {
        assert_eq!(parse_line("Больше 1.5"), Some(dec!(1.5)));
        assert_eq!(parse_line("Меньше (2,5)"), Some(dec!(2.5)));
        assert_eq!(parse_line("Больше"), None);
        assert_eq!(parse_line(""), None);
    }

    #[test]
    fn target_odds_from_env_string() {
        let parsed: TargetOdds = "2.57, 1.83,2.21,".parse().unwrap();
        assert_eq!(parsed, TargetOdds::default());
        assert!("".parse::<TargetOdds>().is_err());
        assert!("2.57,x".parse::<TargetOdds>().is_err());
    }
}
