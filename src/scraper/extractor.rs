use tracing::{debug, error, warn};

use crate::browser::{wait_for_root, DocumentSession, ElementRef, Root, Scope};
use crate::config::{selectors, ScrapeSettings};
use crate::error::ScrapeError;
use crate::scraper::odds::{
    classify_market, classify_side, parse_factor, parse_line, OddsObservation,
};
use crate::types::MatchSnapshot;

/// Reads one opened detail view into a `MatchSnapshot`.
pub struct DetailExtractor<'a> {
    session: &'a dyn DocumentSession,
    settings: &'a ScrapeSettings,
}

impl<'a> DetailExtractor<'a> {
    pub fn new(session: &'a dyn DocumentSession, settings: &'a ScrapeSettings) -> Self {
        Self { session, settings }
    }

    /// Never fails: any error degrades to `MatchSnapshot::empty(url)`.
    pub async fn extract(&self, url: &str) -> MatchSnapshot {
        match self.try_extract(url).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!(url, error = %e, "Detail extraction failed");
                MatchSnapshot::empty(url)
            }
        }
    }

    pub async fn try_extract(&self, url: &str) -> Result<MatchSnapshot, ScrapeError> {
        let s = self.settings;
        let root = wait_for_root(self.session, &s.host_tag, s.host_timeout, s.poll_step).await?;
        let scope = Scope::new(self.session, &root);

        let home = required_text(&scope, selectors::HOME_TEAM, "home team").await?;
        let away = required_text(&scope, selectors::AWAY_TEAM, "away team").await?;
        let time = scope.text_of(selectors::TIMER).await?.unwrap_or_default();
        let score = read_score(&scope).await?;

        if let Err(e) = self.select_sub_tab(&scope).await {
            warn!(url, error = %e, "Sub-tab selection failed, reading default view");
        }

        let odds = self.read_odds(&scope).await?;
        debug!(
            url,
            teams = %format!("{home} - {away}"),
            odds = odds.len(),
            "Extracted detail view"
        );

        Ok(MatchSnapshot {
            teams: format!("{home} - {away}"),
            score,
            time,
            detail_url: url.to_string(),
            odds,
        })
    }

    /// Click the configured sub-tab when the view offers it. Absence is fine.
    async fn select_sub_tab(&self, scope: &Scope<'_>) -> Result<bool, ScrapeError> {
        for tab in scope.all(selectors::FILTER_TAB).await? {
            let title = self.session.attribute(&tab, "title").await?;
            if title.as_deref() == Some(self.settings.sub_tab_title.as_str()) {
                self.session.click(&tab).await?;
                tokio::time::sleep(self.settings.tab_settle).await;
                return Ok(true);
            }
        }
        debug!(tab = %self.settings.sub_tab_title, "Sub-tab not offered");
        Ok(false)
    }

    async fn read_odds(&self, scope: &Scope<'_>) -> Result<Vec<OddsObservation>, ScrapeError> {
        let mut odds = Vec::new();
        for market in scope.all(selectors::MARKET).await? {
            match self.read_market(&market).await {
                Ok(found) => odds.extend(found),
                // A stale market means the whole view re-rendered; nothing else is readable.
                Err(e) if e.is_stale() => return Err(e),
                Err(e) => warn!(error = %e, "Skipping unreadable market"),
            }
        }
        Ok(odds)
    }

    async fn read_market(&self, market: &ElementRef) -> Result<Vec<OddsObservation>, ScrapeError> {
        let root = Root::Element(market.clone());
        let scope = Scope::new(self.session, &root);

        let Some(header) = scope.text_of(selectors::MARKET_HEADER).await? else {
            return Ok(Vec::new());
        };
        if !header.contains(self.settings.market_keyword.as_str()) {
            return Ok(Vec::new());
        }

        let classes = self.session.attribute(market, "class").await?.unwrap_or_default();
        let market_label = classify_market(&classes);

        let mut found = Vec::new();
        for stake in scope.all(selectors::STAKE).await? {
            if let Some(obs) = self.read_stake(&stake, &header, market_label).await? {
                found.push(obs);
            }
        }
        Ok(found)
    }

    async fn read_stake(
        &self,
        stake: &ElementRef,
        header: &str,
        market_label: &str,
    ) -> Result<Option<OddsObservation>, ScrapeError> {
        let root = Root::Element(stake.clone());
        let scope = Scope::new(self.session, &root);

        let label = scope.text_of(selectors::STAKE_LABEL).await?.unwrap_or_default();
        let Some(factor_text) = scope.text_of(selectors::STAKE_FACTOR).await? else {
            return Ok(None);
        };
        let value = match parse_factor(&factor_text) {
            Ok(v) => v,
            Err(e) => {
                debug!(label = %label, error = %e, "Unparsable factor");
                return Ok(None);
            }
        };

        Ok(self.settings.target_odds.observe(
            value,
            market_label,
            classify_side(&label, &self.settings.over_keyword),
            parse_line(&label),
            format!("{header} {label}"),
        ))
    }
}

async fn required_text(
    scope: &Scope<'_>,
    selector: &str,
    what: &str,
) -> Result<String, ScrapeError> {
    match scope.text_of(selector).await? {
        Some(text) if !text.is_empty() => Ok(text),
        _ => Err(ScrapeError::ExtractionFailure(format!("{what} not found"))),
    }
}

async fn read_score(scope: &Scope<'_>) -> Result<String, ScrapeError> {
    let cells = scope.all(selectors::SCORE).await?;
    if cells.len() < 2 {
        return Ok("unknown".to_string());
    }
    let home = scope.session().text(&cells[0]).await?;
    let away = scope.session().text(&cells[1]).await?;
    Ok(format!("{}:{}", home.trim(), away.trim()))
}
