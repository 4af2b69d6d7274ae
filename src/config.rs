use std::time::Duration;

use crate::error::{AppError, Result};
use crate::scraper::odds::TargetOdds;

pub const LISTING_URL: &str = "https://pm.by/ru/sport/live/football/flt-IntcIjFcIjp7fX0i-sub";
pub const WEBDRIVER_URL: &str = "http://localhost:9515";
pub const TELEGRAM_API_URL: &str = "https://api.telegram.org";

/// Custom element whose shadow root holds the whole sportsbook UI.
pub const SHADOW_HOST_TAG: &str = "sport-latino-view";

/// Substring of the URL once a detail view is open.
pub const DETAIL_URL_MARKER: &str = "/event-details/";

/// Sub-tab selected on the detail view before reading markets.
pub const SUB_TAB_TITLE: &str = "1-й тайм";

/// Market headers must contain this to be scanned.
pub const MARKET_KEYWORD: &str = "Тотал";

/// Stake labels containing this are the "over" side.
pub const OVER_KEYWORD: &str = "Больше";

/// Listing phases worth opening: first half and halftime.
pub const DEFAULT_PHASE_KEYWORDS: &[&str] = &["1-й тайм", "перерыв"];

pub const DEFAULT_TARGET_ODDS: &str = "2.57,1.83,2.21";

/// Max wait for the shadow host on a freshly loaded page (seconds).
pub const HOST_WAIT_SECS: u64 = 10;

/// Max wait for `document.readyState == "complete"` after returning to the listing (seconds).
pub const READY_WAIT_SECS: u64 = 10;

/// Poll step for all bounded waits (milliseconds).
pub const WAIT_POLL_MS: u64 = 250;

pub const DETAIL_SETTLE_MS: u64 = 1_000;
pub const LISTING_SETTLE_MS: u64 = 500;
pub const TAB_SETTLE_MS: u64 = 2_000;

pub const POLL_INTERVAL_SECS: u64 = 30;
pub const ERROR_BACKOFF_SECS: u64 = 60;
pub const INTER_ALERT_DELAY_SECS: u64 = 10;
pub const NAV_TIMEOUT_SECS: u64 = 10;

/// Attempts at returning to the listing before the cycle is abandoned.
pub const RETURN_ATTEMPTS: u32 = 2;

/// First segment of the status-control callback token (`action:<verb>:<identity>`).
pub const CALLBACK_ACTION: &str = "action";

/// Long-poll timeout for Telegram `getUpdates` (seconds).
pub const UPDATES_LONG_POLL_SECS: u64 = 25;

/// Callback poller backoff after a failed `getUpdates` (milliseconds).
pub const UPDATES_BACKOFF_MS: &[u64] = &[1_000, 2_000, 5_000, 10_000];

/// CSS selectors inside the sportsbook shadow tree.
pub mod selectors {
    pub const EVENT_ROW: &str = ".lv_event_row";
    pub const EVENT_LINK: &str = ".lv_event_info.lv__pointer";
    pub const EVENT_TIME: &str = ".lv_event_time";
    pub const EVENT_TEAMS: &str = ".lv_teams";

    pub const HOME_TEAM: &str = ".lv_team-home .lv_team_name_text";
    pub const AWAY_TEAM: &str = ".lv_team-away .lv_team_name_text";
    pub const TIMER: &str = ".lv_timer";
    pub const SCORE: &str = "div.lv_live_scores span.lv_score";
    pub const FILTER_TAB: &str = "button.lv_filter_tab";

    pub const MARKET: &str = "div.lv_market";
    pub const MARKET_HEADER: &str = "span.lv_header_text";
    pub const STAKE: &str = "button.lv_marketStake";
    pub const STAKE_LABEL: &str = "span.lv_stake_holder";
    pub const STAKE_FACTOR: &str = "span.lv_stake_factor";
}

/// Everything the navigator and extractor need to walk the site.
#[derive(Debug, Clone)]
pub struct ScrapeSettings {
    pub listing_url: String,
    pub host_tag: String,
    pub detail_url_marker: String,
    /// Bound on click → detail URL.
    pub nav_timeout: Duration,
    pub host_timeout: Duration,
    pub ready_timeout: Duration,
    pub poll_step: Duration,
    pub detail_settle: Duration,
    pub listing_settle: Duration,
    pub tab_settle: Duration,
    pub sub_tab_title: String,
    pub market_keyword: String,
    pub over_keyword: String,
    /// Lower-cased phase keywords; empty disables the phase filter.
    pub phase_keywords: Vec<String>,
    pub skip_virtual: bool,
    pub target_odds: TargetOdds,
}

impl ScrapeSettings {
    pub fn with_defaults(target_odds: TargetOdds) -> Self {
        Self {
            listing_url: LISTING_URL.to_string(),
            host_tag: SHADOW_HOST_TAG.to_string(),
            detail_url_marker: DETAIL_URL_MARKER.to_string(),
            nav_timeout: Duration::from_secs(NAV_TIMEOUT_SECS),
            host_timeout: Duration::from_secs(HOST_WAIT_SECS),
            ready_timeout: Duration::from_secs(READY_WAIT_SECS),
            poll_step: Duration::from_millis(WAIT_POLL_MS),
            detail_settle: Duration::from_millis(DETAIL_SETTLE_MS),
            listing_settle: Duration::from_millis(LISTING_SETTLE_MS),
            tab_settle: Duration::from_millis(TAB_SETTLE_MS),
            sub_tab_title: SUB_TAB_TITLE.to_string(),
            market_keyword: MARKET_KEYWORD.to_string(),
            over_keyword: OVER_KEYWORD.to_string(),
            phase_keywords: DEFAULT_PHASE_KEYWORDS.iter().map(|k| k.to_lowercase()).collect(),
            skip_virtual: true,
            target_odds,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub telegram_token: String,
    pub telegram_api_url: String,
    /// Primary destination, receives every alert with an event link.
    pub group_chat_id: i64,
    /// Administrative destination, receives alerts with status controls.
    pub admin_chat_id: i64,
    pub webdriver_url: String,
    pub headless: bool,
    pub poll_interval: Duration,
    pub error_backoff: Duration,
    pub inter_alert_delay: Duration,
    pub log_level: String,
    pub api_port: u16,
    pub scrape: ScrapeSettings,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let telegram_token = std::env::var("TELEGRAM_TOKEN")
            .map_err(|_| AppError::Config("TELEGRAM_TOKEN is required".to_string()))?;
        let group_chat_id = required_chat_id("GROUP_CHAT_ID")?;
        let admin_chat_id = required_chat_id("ADMIN_CHAT_ID")?;

        let target_odds = std::env::var("TARGET_ODDS")
            .unwrap_or_else(|_| DEFAULT_TARGET_ODDS.to_string())
            .parse::<TargetOdds>()
            .map_err(|e| AppError::Config(format!("TARGET_ODDS: {e}")))?;

        let mut scrape = ScrapeSettings::with_defaults(target_odds);
        if let Ok(url) = std::env::var("LISTING_URL") {
            scrape.listing_url = url;
        }
        scrape.nav_timeout = Duration::from_secs(env_u64("NAV_TIMEOUT_SECS", NAV_TIMEOUT_SECS));
        if let Ok(raw) = std::env::var("PHASE_KEYWORDS") {
            scrape.phase_keywords =
                split_list(&raw).into_iter().map(|k| k.to_lowercase()).collect();
        }
        scrape.skip_virtual = env_bool("SKIP_VIRTUAL", true);

        Ok(Self {
            telegram_token,
            telegram_api_url: std::env::var("TELEGRAM_API_URL")
                .unwrap_or_else(|_| TELEGRAM_API_URL.to_string()),
            group_chat_id,
            admin_chat_id,
            webdriver_url: std::env::var("WEBDRIVER_URL")
                .unwrap_or_else(|_| WEBDRIVER_URL.to_string()),
            headless: env_bool("HEADLESS", true),
            poll_interval: Duration::from_secs(env_u64("POLL_INTERVAL_SECS", POLL_INTERVAL_SECS)),
            error_backoff: Duration::from_secs(env_u64("ERROR_BACKOFF_SECS", ERROR_BACKOFF_SECS)),
            inter_alert_delay: Duration::from_secs(env_u64(
                "INTER_ALERT_DELAY_SECS",
                INTER_ALERT_DELAY_SECS,
            )),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            scrape,
        })
    }
}

fn required_chat_id(key: &str) -> Result<i64> {
    std::env::var(key)
        .map_err(|_| AppError::Config(format!("{key} is required")))?
        .trim()
        .parse::<i64>()
        .map_err(|_| AppError::Config(format!("{key} must be a numeric chat id")))
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<bool>().ok())
        .unwrap_or(default)
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
