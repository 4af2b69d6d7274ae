use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::alerts::AlertDispatcher;
use crate::api::health::HealthState;
use crate::api::latency::LatencyStats;
use crate::browser::SessionFactory;
use crate::config::{ScrapeSettings, ERROR_BACKOFF_SECS, INTER_ALERT_DELAY_SECS, POLL_INTERVAL_SECS};
use crate::error::ScrapeError;
use crate::scraper::{DetailNavigator, NavStats};
use crate::types::now_ns;

#[derive(Debug)]
pub struct CycleReport {
    pub snapshots: usize,
    pub with_targets: usize,
    pub dispatched: usize,
    pub stats: NavStats,
    /// The pass stopped early; what it had collected was still dispatched.
    pub abandoned: bool,
}

/// The perpetual scrape → match → alert loop.
pub struct MonitorLoop {
    factory: Arc<dyn SessionFactory>,
    dispatcher: Arc<AlertDispatcher>,
    settings: ScrapeSettings,
    health: Arc<HealthState>,
    latency: Arc<LatencyStats>,
    poll_interval: Duration,
    error_backoff: Duration,
    inter_alert_delay: Duration,
}

impl MonitorLoop {
    pub fn new(
        factory: Arc<dyn SessionFactory>,
        dispatcher: Arc<AlertDispatcher>,
        settings: ScrapeSettings,
        health: Arc<HealthState>,
        latency: Arc<LatencyStats>,
    ) -> Self {
        Self {
            factory,
            dispatcher,
            settings,
            health,
            latency,
            poll_interval: Duration::from_secs(POLL_INTERVAL_SECS),
            error_backoff: Duration::from_secs(ERROR_BACKOFF_SECS),
            inter_alert_delay: Duration::from_secs(INTER_ALERT_DELAY_SECS),
        }
    }

    pub fn with_timing(
        mut self,
        poll_interval: Duration,
        error_backoff: Duration,
        inter_alert_delay: Duration,
    ) -> Self {
        self.poll_interval = poll_interval;
        self.error_backoff = error_backoff;
        self.inter_alert_delay = inter_alert_delay;
        self
    }

    /// Never returns; errors only change how long the loop sleeps.
    pub async fn run(self) {
        info!(
            poll_secs = self.poll_interval.as_secs(),
            targets = ?self.settings.target_odds.values(),
            "Monitor loop started"
        );
        loop {
            match self.run_cycle().await {
                Ok(report) if report.abandoned => {
                    self.health.record_cycle(false, now_ns());
                    error!(
                        snapshots = report.snapshots,
                        dispatched = report.dispatched,
                        visited = report.stats.visited,
                        listed = report.stats.listed,
                        backoff_secs = self.error_backoff.as_secs(),
                        "Cycle abandoned, listing unreachable"
                    );
                    tokio::time::sleep(self.error_backoff).await;
                }
                Ok(report) => {
                    self.health.record_cycle(true, now_ns());
                    info!(
                        snapshots = report.snapshots,
                        with_targets = report.with_targets,
                        dispatched = report.dispatched,
                        visited = report.stats.visited,
                        skipped = report.stats.listed - report.stats.visited,
                        "Cycle complete"
                    );
                    tokio::time::sleep(self.poll_interval).await;
                }
                Err(e) => {
                    self.health.record_cycle(false, now_ns());
                    error!(error = %e, backoff_secs = self.error_backoff.as_secs(), "Cycle failed");
                    tokio::time::sleep(self.error_backoff).await;
                }
            }
        }
    }

    /// One cycle. The session is released before any alert goes out, and
    /// snapshots from an abandoned pass are dispatched like any other.
    pub async fn run_cycle(&self) -> Result<CycleReport, ScrapeError> {
        let session = self.factory.acquire().await?;
        self.health.set_session_active(true);

        let outcome = DetailNavigator::new(session.as_ref(), &self.settings)
            .with_latency(&self.latency)
            .run()
            .await;

        if let Err(e) = session.close().await {
            warn!(error = %e, "Session close failed");
        }
        self.health.set_session_active(false);
        let outcome = outcome?;

        let mut report = CycleReport {
            snapshots: outcome.snapshots.len(),
            with_targets: 0,
            dispatched: 0,
            stats: outcome.stats,
            abandoned: outcome.abandoned,
        };

        for snapshot in &outcome.snapshots {
            if !snapshot.has_target() {
                info!(teams = %snapshot.teams, "No target odds");
                continue;
            }
            report.with_targets += 1;

            let identity = snapshot.identity();
            if !self.dispatcher.should_alert(&identity) {
                debug!(identity = %identity, teams = %snapshot.teams, "Already alerted, skipping");
                continue;
            }
            if self.dispatcher.dispatch(snapshot).await.is_some() {
                report.dispatched += 1;
                self.health.inc_alerts_sent();
                tokio::time::sleep(self.inter_alert_delay).await;
            }
        }
        Ok(report)
    }
}
