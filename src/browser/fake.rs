//! Scripted in-memory document used by the scraper and monitor tests.
//!
//! The listing is a sequence of snapshots: every load of the listing URL shows
//! the next one (the last repeats), which models a list that re-renders between
//! visits. Element references carry the page generation they were issued in and
//! go stale on the next navigation.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::browser::{DocumentSession, ElementRef, Root, SessionFactory};
use crate::config::selectors;
use crate::error::ScrapeError;

pub const LISTING_URL: &str = "https://fake.test/live/football";
pub const HOST_TAG: &str = "sport-latino-view";

pub fn detail_url(index: usize) -> String {
    format!("https://fake.test/event-details/{index}")
}

// ---------------------------------------------------------------------------
// Site description
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeNav {
    /// Click opens the detail view.
    Opens,
    /// Click does nothing; the URL never changes.
    Hangs,
    /// The handle is invalidated right before the click lands.
    StaleOnClick,
    /// The click raises a generic session error.
    Fails,
}

#[derive(Debug, Clone)]
pub struct FakeStake {
    pub label: Option<String>,
    pub factor: Option<String>,
}

impl FakeStake {
    pub fn new(label: &str, factor: &str) -> Self {
        Self { label: Some(label.to_string()), factor: Some(factor.to_string()) }
    }
}

#[derive(Debug, Clone)]
pub struct FakeMarket {
    pub class: String,
    pub header: Option<String>,
    pub stakes: Vec<FakeStake>,
}

impl FakeMarket {
    pub fn total(header: &str, stakes: Vec<FakeStake>) -> Self {
        Self {
            class: "lv_market lv_market-overUnder".to_string(),
            header: Some(header.to_string()),
            stakes,
        }
    }

    pub fn with_class(mut self, class: &str) -> Self {
        self.class = class.to_string();
        self
    }
}

#[derive(Debug, Clone)]
pub struct FakeDetail {
    pub has_root: bool,
    pub home: Option<String>,
    pub away: Option<String>,
    pub timer: Option<String>,
    pub scores: Vec<String>,
    pub tabs: Vec<String>,
    pub markets: Vec<FakeMarket>,
}

impl FakeDetail {
    pub fn new(home: &str, away: &str, timer: &str) -> Self {
        Self {
            has_root: true,
            home: Some(home.to_string()),
            away: Some(away.to_string()),
            timer: Some(timer.to_string()),
            scores: vec!["0".to_string(), "0".to_string()],
            tabs: vec!["Матч".to_string(), "1-й тайм".to_string()],
            markets: Vec::new(),
        }
    }

    pub fn with_market(mut self, market: FakeMarket) -> Self {
        self.markets.push(market);
        self
    }
}

#[derive(Debug, Clone)]
pub struct FakeEntry {
    pub teams_title: String,
    pub time_title: Option<String>,
    pub has_link: bool,
    pub nav: FakeNav,
    pub detail: FakeDetail,
}

impl FakeEntry {
    pub fn opens(teams: &str, time: &str, detail: FakeDetail) -> Self {
        Self {
            teams_title: teams.to_string(),
            time_title: Some(time.to_string()),
            has_link: true,
            nav: FakeNav::Opens,
            detail,
        }
    }

    pub fn with_nav(mut self, nav: FakeNav) -> Self {
        self.nav = nav;
        self
    }

    pub fn without_link(mut self) -> Self {
        self.has_link = false;
        self
    }
}

#[derive(Debug, Clone)]
pub struct FakeSite {
    pub listings: Vec<Vec<FakeEntry>>,
    pub listing_has_root: bool,
    /// Listing loads beyond this many fail at the transport level.
    pub listing_load_limit: Option<usize>,
}

impl FakeSite {
    pub fn new(listing: Vec<FakeEntry>) -> Self {
        Self { listings: vec![listing], listing_has_root: true, listing_load_limit: None }
    }

    pub fn listing_fails_after(mut self, loads: usize) -> Self {
        self.listing_load_limit = Some(loads);
        self
    }

    /// Each further listing load shows the next snapshot.
    pub fn then(mut self, listing: Vec<FakeEntry>) -> Self {
        self.listings.push(listing);
        self
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct FakeState {
    url: String,
    generation: u64,
    listing_loads: usize,
    /// Entry index whose detail view is open.
    detail: Option<usize>,
    tab_clicks: usize,
    closed: bool,
    /// "nav:<url>" and "click:<index>" in order.
    events: Vec<String>,
}

#[derive(Clone)]
pub struct FakeSession {
    site: Arc<FakeSite>,
    state: Arc<Mutex<FakeState>>,
}

/// Decoded element reference: `g<generation>/<kind>/<a>/<b>`.
struct Handle {
    generation: u64,
    kind: String,
    a: usize,
    b: usize,
}

impl FakeSession {
    pub fn new(site: FakeSite) -> Self {
        Self {
            site: Arc::new(site),
            state: Arc::new(Mutex::new(FakeState {
                url: "about:blank".to_string(),
                ..FakeState::default()
            })),
        }
    }

    pub fn events(&self) -> Vec<String> {
        self.state.lock().unwrap().events.clone()
    }

    pub fn url(&self) -> String {
        self.state.lock().unwrap().url.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }

    pub fn tab_clicks(&self) -> usize {
        self.state.lock().unwrap().tab_clicks
    }

    /// Jump straight to a detail view of the first listing snapshot.
    pub fn open_detail(&self, index: usize) {
        let mut st = self.state.lock().unwrap();
        st.listing_loads = st.listing_loads.max(1);
        st.generation += 1;
        st.url = detail_url(index);
        st.detail = Some(index);
    }

    fn listing(&self, st: &FakeState) -> &[FakeEntry] {
        if st.listing_loads == 0 {
            return &[];
        }
        let idx = (st.listing_loads - 1).min(self.site.listings.len() - 1);
        &self.site.listings[idx]
    }

    fn detail(&self, st: &FakeState) -> Option<&FakeDetail> {
        let idx = st.detail?;
        self.listing(st).get(idx).map(|e| &e.detail)
    }

    fn make(st: &FakeState, kind: &str, a: usize, b: usize) -> ElementRef {
        ElementRef(format!("g{}/{kind}/{a}/{b}", st.generation))
    }

    fn make_all(st: &FakeState, kind: &str, count: usize) -> Vec<ElementRef> {
        (0..count).map(|k| Self::make(st, kind, k, 0)).collect()
    }

    fn decode(&self, st: &FakeState, el: &ElementRef) -> Result<Handle, ScrapeError> {
        let parts: Vec<&str> = el.0.split('/').collect();
        let generation = parts
            .first()
            .and_then(|g| g.trim_start_matches('g').parse::<u64>().ok())
            .ok_or_else(|| ScrapeError::Session(format!("bad handle {}", el.0)))?;
        if generation != st.generation {
            return Err(ScrapeError::StaleReference(el.0.clone()));
        }
        Ok(Handle {
            generation,
            kind: parts.get(1).copied().unwrap_or_default().to_string(),
            a: parts.get(2).and_then(|v| v.parse().ok()).unwrap_or(0),
            b: parts.get(3).and_then(|v| v.parse().ok()).unwrap_or(0),
        })
    }

    fn shadow_children(&self, st: &FakeState, selector: &str) -> Vec<ElementRef> {
        if st.url == LISTING_URL {
            if selector == selectors::EVENT_ROW {
                return Self::make_all(st, "row", self.listing(st).len());
            }
            return Vec::new();
        }
        let Some(detail) = self.detail(st) else {
            return Vec::new();
        };
        match selector {
            s if s == selectors::HOME_TEAM && detail.home.is_some() => {
                vec![Self::make(st, "home", 0, 0)]
            }
            s if s == selectors::AWAY_TEAM && detail.away.is_some() => {
                vec![Self::make(st, "away", 0, 0)]
            }
            s if s == selectors::TIMER && detail.timer.is_some() => {
                vec![Self::make(st, "timer", 0, 0)]
            }
            s if s == selectors::SCORE => Self::make_all(st, "score", detail.scores.len()),
            s if s == selectors::FILTER_TAB => Self::make_all(st, "tab", detail.tabs.len()),
            s if s == selectors::MARKET => Self::make_all(st, "market", detail.markets.len()),
            _ => Vec::new(),
        }
    }

    fn element_children(&self, st: &FakeState, h: &Handle, selector: &str) -> Vec<ElementRef> {
        let listing = self.listing(st);
        match h.kind.as_str() {
            "row" => {
                let Some(entry) = listing.get(h.a) else { return Vec::new() };
                match selector {
                    s if s == selectors::EVENT_LINK && entry.has_link => {
                        vec![Self::make(st, "link", h.a, 0)]
                    }
                    s if s == selectors::EVENT_TIME && entry.time_title.is_some() => {
                        vec![Self::make(st, "rowtime", h.a, 0)]
                    }
                    s if s == selectors::EVENT_TEAMS => vec![Self::make(st, "rowteams", h.a, 0)],
                    _ => Vec::new(),
                }
            }
            "market" => {
                let Some(market) = self.detail(st).and_then(|d| d.markets.get(h.a)) else {
                    return Vec::new();
                };
                match selector {
                    s if s == selectors::MARKET_HEADER && market.header.is_some() => {
                        vec![Self::make(st, "header", h.a, 0)]
                    }
                    s if s == selectors::STAKE => {
                        (0..market.stakes.len()).map(|s| Self::make(st, "stake", h.a, s)).collect()
                    }
                    _ => Vec::new(),
                }
            }
            "stake" => {
                let Some(stake) = self
                    .detail(st)
                    .and_then(|d| d.markets.get(h.a))
                    .and_then(|m| m.stakes.get(h.b))
                else {
                    return Vec::new();
                };
                match selector {
                    s if s == selectors::STAKE_LABEL && stake.label.is_some() => {
                        vec![Self::make(st, "label", h.a, h.b)]
                    }
                    s if s == selectors::STAKE_FACTOR && stake.factor.is_some() => {
                        vec![Self::make(st, "factor", h.a, h.b)]
                    }
                    _ => Vec::new(),
                }
            }
            _ => Vec::new(),
        }
    }
}

#[async_trait]
impl DocumentSession for FakeSession {
    async fn navigate(&self, url: &str) -> Result<(), ScrapeError> {
        let mut st = self.state.lock().unwrap();
        let exhausted = self.site.listing_load_limit.is_some_and(|n| st.listing_loads >= n);
        if url == LISTING_URL && exhausted {
            st.events.push(format!("navfail:{url}"));
            return Err(ScrapeError::Session("net::ERR_CONNECTION_RESET".to_string()));
        }
        st.generation += 1;
        st.url = url.to_string();
        st.detail = None;
        if url == LISTING_URL {
            st.listing_loads += 1;
        } else if let Some(idx) = url.rsplit('/').next().and_then(|i| i.parse().ok()) {
            st.detail = Some(idx);
        }
        st.events.push(format!("nav:{url}"));
        Ok(())
    }

    async fn current_url(&self) -> Result<String, ScrapeError> {
        Ok(self.state.lock().unwrap().url.clone())
    }

    async fn ready_state(&self) -> Result<String, ScrapeError> {
        Ok("complete".to_string())
    }

    async fn find_host(&self, tag: &str) -> Result<Option<ElementRef>, ScrapeError> {
        let st = self.state.lock().unwrap();
        if tag != HOST_TAG {
            return Ok(None);
        }
        let present = if st.url == LISTING_URL {
            self.site.listing_has_root
        } else {
            self.detail(&st).map(|d| d.has_root).unwrap_or(false)
        };
        Ok(present.then(|| Self::make(&st, "host", 0, 0)))
    }

    async fn query(&self, root: &Root, selector: &str) -> Result<Option<ElementRef>, ScrapeError> {
        Ok(self.query_all(root, selector).await?.into_iter().next())
    }

    async fn query_all(&self, root: &Root, selector: &str) -> Result<Vec<ElementRef>, ScrapeError> {
        let st = self.state.lock().unwrap();
        match root {
            Root::Shadow(host) => {
                self.decode(&st, host)?;
                Ok(self.shadow_children(&st, selector))
            }
            Root::Element(el) => {
                let h = self.decode(&st, el)?;
                Ok(self.element_children(&st, &h, selector))
            }
        }
    }

    async fn text(&self, element: &ElementRef) -> Result<String, ScrapeError> {
        let st = self.state.lock().unwrap();
        let h = self.decode(&st, element)?;
        let detail = self.detail(&st);
        let market = detail.and_then(|d| d.markets.get(h.a));
        let stake = market.and_then(|m| m.stakes.get(h.b));
        let text = match h.kind.as_str() {
            "home" => detail.and_then(|d| d.home.clone()),
            "away" => detail.and_then(|d| d.away.clone()),
            "timer" => detail.and_then(|d| d.timer.clone()),
            "score" => detail.and_then(|d| d.scores.get(h.a).cloned()),
            "header" => market.and_then(|m| m.header.clone()),
            "label" => stake.and_then(|s| s.label.clone()),
            "factor" => stake.and_then(|s| s.factor.clone()),
            _ => None,
        };
        Ok(text.unwrap_or_default())
    }

    async fn attribute(
        &self,
        element: &ElementRef,
        name: &str,
    ) -> Result<Option<String>, ScrapeError> {
        let st = self.state.lock().unwrap();
        let h = self.decode(&st, element)?;
        let listing = self.listing(&st);
        let value = match (h.kind.as_str(), name) {
            ("rowtime", "title") => listing.get(h.a).and_then(|e| e.time_title.clone()),
            ("rowteams", "title") => listing.get(h.a).map(|e| e.teams_title.clone()),
            ("tab", "title") => self.detail(&st).and_then(|d| d.tabs.get(h.a).cloned()),
            ("market", "class") => self
                .detail(&st)
                .and_then(|d| d.markets.get(h.a))
                .map(|m| m.class.clone()),
            _ => None,
        };
        Ok(value)
    }

    async fn click(&self, element: &ElementRef) -> Result<(), ScrapeError> {
        let mut st = self.state.lock().unwrap();
        let h = self.decode(&st, element)?;
        match h.kind.as_str() {
            "link" => {
                let nav = self
                    .listing(&st)
                    .get(h.a)
                    .map(|e| e.nav)
                    .ok_or_else(|| ScrapeError::StaleReference(element.0.clone()))?;
                st.events.push(format!("click:{}", h.a));
                match nav {
                    FakeNav::Opens => {
                        st.generation = h.generation + 1;
                        st.url = detail_url(h.a);
                        st.detail = Some(h.a);
                    }
                    FakeNav::Hangs => {}
                    FakeNav::StaleOnClick => {
                        st.generation += 1;
                        return Err(ScrapeError::StaleReference(element.0.clone()));
                    }
                    FakeNav::Fails => {
                        let msg = "javascript error: click failed".to_string();
                        return Err(ScrapeError::Session(msg));
                    }
                }
            }
            "tab" => st.tab_clicks += 1,
            _ => {}
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), ScrapeError> {
        self.state.lock().unwrap().closed = true;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

pub struct FakeFactory {
    site: FakeSite,
    sessions: Mutex<Vec<FakeSession>>,
    /// Number of upcoming `acquire` calls that fail.
    failures: AtomicU32,
}

impl FakeFactory {
    pub fn new(site: FakeSite) -> Self {
        Self { site, sessions: Mutex::new(Vec::new()), failures: AtomicU32::new(0) }
    }

    pub fn fail_next(&self, n: u32) {
        self.failures.store(n, Ordering::SeqCst);
    }

    pub fn sessions(&self) -> Vec<FakeSession> {
        self.sessions.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionFactory for FakeFactory {
    async fn acquire(&self) -> Result<Box<dyn DocumentSession>, ScrapeError> {
        if self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(ScrapeError::Session("chromedriver unreachable".to_string()));
        }
        let session = FakeSession::new(self.site.clone());
        self.sessions.lock().unwrap().push(session.clone());
        Ok(Box::new(session))
    }
}
