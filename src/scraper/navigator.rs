use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::api::latency::LatencyStats;
use crate::browser::{wait_for_root, wait_until, DocumentSession, Root, Scope};
use crate::config::{selectors, ScrapeSettings, RETURN_ATTEMPTS};
use crate::error::ScrapeError;
use crate::scraper::extractor::DetailExtractor;
use crate::scraper::listing::{enumerate_entries, screen_entry, EntryVerdict};
use crate::types::MatchSnapshot;

/// Where the navigator believes the document is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavState {
    AtListing,
    Navigating(usize),
    AtDetail(usize),
    Returning,
}

/// Per-cycle outcome counters.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NavStats {
    /// Entry count at snapshot time; the loop bound.
    pub listed: usize,
    pub visited: usize,
    pub extracted: usize,
    /// Index no longer present after the list re-rendered.
    pub shrunk: usize,
    pub no_link: usize,
    pub filtered: usize,
    pub stale: usize,
    pub timeouts: usize,
    pub extraction_failures: usize,
    pub root_missing: usize,
    pub failures: usize,
}

#[derive(Debug)]
pub struct NavOutcome {
    pub snapshots: Vec<MatchSnapshot>,
    pub stats: NavStats,
    /// The listing became unreachable mid-pass; `snapshots` holds what was
    /// collected before that.
    pub abandoned: bool,
}

/// Walks every listing entry once: open detail, extract, return to listing.
///
/// Element handles never survive a navigation, so the list is re-enumerated
/// for each index and an index past the end of the fresh list is skipped.
/// The document always goes back to the listing after an index, whatever
/// happened while processing it.
pub struct DetailNavigator<'a> {
    session: &'a dyn DocumentSession,
    settings: &'a ScrapeSettings,
    latency: Option<&'a LatencyStats>,
    state: NavState,
    stats: NavStats,
}

impl<'a> DetailNavigator<'a> {
    pub fn new(session: &'a dyn DocumentSession, settings: &'a ScrapeSettings) -> Self {
        Self {
            session,
            settings,
            latency: None,
            state: NavState::AtListing,
            stats: NavStats::default(),
        }
    }

    pub fn with_latency(mut self, latency: &'a LatencyStats) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn state(&self) -> NavState {
        self.state
    }

    /// One full pass over the listing. Failing to load it at the start is an
    /// error; losing it mid-pass ends the pass early but keeps the snapshots.
    pub async fn run(mut self) -> Result<NavOutcome, ScrapeError> {
        self.load_listing().await?;
        let n = enumerate_entries(self.session, &self.settings.host_tag).await?.len();
        self.stats.listed = n;
        info!(entries = n, "Listing snapshot taken");

        let mut snapshots = Vec::new();
        let mut abandoned = false;
        for i in 0..n {
            let started = Instant::now();
            if let Some(snapshot) = self.step(i).await {
                snapshots.push(snapshot);
            }
            let returned = self.return_to_listing().await;
            if let Some(latency) = self.latency {
                latency.record(started.elapsed());
            }
            if let Err(e) = returned {
                error!(index = i, remaining = n - i - 1, error = %e, "Abandoning pass");
                abandoned = true;
                break;
            }
        }

        info!(
            listed = self.stats.listed,
            visited = self.stats.visited,
            extracted = self.stats.extracted,
            shrunk = self.stats.shrunk,
            filtered = self.stats.filtered,
            stale = self.stats.stale,
            timeouts = self.stats.timeouts,
            failures = self.stats.failures,
            abandoned,
            "Navigation pass complete"
        );
        Ok(NavOutcome { snapshots, stats: self.stats, abandoned })
    }

    /// Process index `i`, absorbing every per-entry error into the counters.
    async fn step(&mut self, i: usize) -> Option<MatchSnapshot> {
        match self.try_step(i).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                match &e {
                    ScrapeError::StaleReference(_) => {
                        self.stats.stale += 1;
                        warn!(index = i, error = %e, "Entry went stale, skipping");
                    }
                    ScrapeError::NavigationTimeout(_) => {
                        self.stats.timeouts += 1;
                        warn!(index = i, error = %e, "Detail view did not open, skipping");
                    }
                    ScrapeError::RootUnavailable(_) => {
                        self.stats.root_missing += 1;
                        warn!(index = i, error = %e, "Listing root missing, skipping");
                    }
                    _ => {
                        self.stats.failures += 1;
                        error!(index = i, error = %e, "Entry processing failed");
                    }
                }
                None
            }
        }
    }

    async fn try_step(&mut self, i: usize) -> Result<Option<MatchSnapshot>, ScrapeError> {
        let session = self.session;
        let s = self.settings;

        let entries = enumerate_entries(session, &s.host_tag).await?;
        let Some(entry) = entries.get(i) else {
            self.stats.shrunk += 1;
            info!(index = i, available = entries.len(), "Listing shrank, skipping index");
            return Ok(None);
        };

        match screen_entry(session, entry, s).await? {
            EntryVerdict::Open => {}
            EntryVerdict::WrongPhase(phase) => {
                self.stats.filtered += 1;
                info!(index = i, phase = %phase, "Skipping entry outside target phases");
                return Ok(None);
            }
            EntryVerdict::Virtual(teams) => {
                self.stats.filtered += 1;
                info!(index = i, teams = %teams, "Skipping virtual fixture");
                return Ok(None);
            }
        }

        let row = Root::Element(entry.clone());
        let Some(link) = Scope::new(session, &row).one(selectors::EVENT_LINK).await? else {
            self.stats.no_link += 1;
            debug!(index = i, "Entry has no link");
            return Ok(None);
        };

        self.state = NavState::Navigating(i);
        session.click(&link).await?;
        let marker = s.detail_url_marker.as_str();
        let opened = wait_until(s.nav_timeout, s.poll_step, move || async move {
            Ok(session.current_url().await?.contains(marker))
        })
        .await?;
        if !opened {
            return Err(ScrapeError::NavigationTimeout(s.nav_timeout));
        }

        self.state = NavState::AtDetail(i);
        self.stats.visited += 1;
        tokio::time::sleep(s.detail_settle).await;

        let url = session.current_url().await?;
        let snapshot = DetailExtractor::new(session, s).extract(&url).await;
        if snapshot.is_empty() {
            self.stats.extraction_failures += 1;
            return Ok(None);
        }
        self.stats.extracted += 1;
        Ok(Some(snapshot))
    }

    async fn return_to_listing(&mut self) -> Result<(), ScrapeError> {
        self.state = NavState::Returning;
        for attempt in 1..=RETURN_ATTEMPTS {
            match self.load_listing().await {
                Ok(()) => return Ok(()),
                Err(e) => warn!(attempt, error = %e, "Return to listing failed"),
            }
        }
        Err(ScrapeError::RootUnavailable(self.settings.host_tag.clone()))
    }

    /// Navigate to the listing and wait until it is usable: URL, readyState,
    /// shadow host, then a short settle.
    async fn load_listing(&mut self) -> Result<(), ScrapeError> {
        let session = self.session;
        let s = self.settings;
        let listing = s.listing_url.as_str();

        session.navigate(listing).await?;
        let ready = wait_until(s.ready_timeout, s.poll_step, move || async move {
            Ok(session.current_url().await?.starts_with(listing)
                && session.ready_state().await? == "complete")
        })
        .await?;
        if !ready {
            return Err(ScrapeError::NavigationTimeout(s.ready_timeout));
        }
        wait_for_root(session, &s.host_tag, s.host_timeout, s.poll_step).await?;
        tokio::time::sleep(s.listing_settle).await;
        self.state = NavState::AtListing;
        Ok(())
    }
}
