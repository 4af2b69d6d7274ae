pub mod extractor;
pub mod listing;
pub mod navigator;
pub mod odds;

pub use navigator::{DetailNavigator, NavStats};

#[cfg(test)]
pub(crate) fn test_settings() -> crate::config::ScrapeSettings {
    use std::time::Duration;

    use crate::browser::fake::{HOST_TAG, LISTING_URL};

    let mut s = crate::config::ScrapeSettings::with_defaults(odds::TargetOdds::default());
    s.listing_url = LISTING_URL.to_string();
    s.host_tag = HOST_TAG.to_string();
    s.nav_timeout = Duration::from_millis(20);
    s.host_timeout = Duration::from_millis(20);
    s.ready_timeout = Duration::from_millis(20);
    s.poll_step = Duration::from_millis(1);
    s.detail_settle = Duration::ZERO;
    s.listing_settle = Duration::ZERO;
    s.tab_settle = Duration::ZERO;
    s.phase_keywords = vec!["first half".to_string(), "halftime".to_string()];
    s
}
