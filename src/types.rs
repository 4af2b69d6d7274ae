use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::scraper::odds::OddsObservation;

// ---------------------------------------------------------------------------
// MatchSnapshot
// ---------------------------------------------------------------------------

/// One successful read of an event's detail view. Never mutated after extraction.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchSnapshot {
    /// "home - away"
    pub teams: String,
    /// "h:a", or "unknown" when the score widget is absent.
    pub score: String,
    /// Raw timer / phase text, empty when absent.
    pub time: String,
    pub detail_url: String,
    pub odds: Vec<OddsObservation>,
}

impl MatchSnapshot {
    /// Placeholder returned when extraction fails; carries no identity.
    pub fn empty(detail_url: &str) -> Self {
        Self {
            teams: String::new(),
            score: String::new(),
            time: String::new(),
            detail_url: detail_url.to_string(),
            odds: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }

    pub fn has_target(&self) -> bool {
        !self.odds.is_empty()
    }

    pub fn identity(&self) -> AlertIdentity {
        AlertIdentity::from_parts(&self.teams, &self.time)
    }
}

// ---------------------------------------------------------------------------
// Stake side
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StakeSide {
    Over,
    Under,
}

impl std::fmt::Display for StakeSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StakeSide::Over => write!(f, "Over"),
            StakeSide::Under => write!(f, "Under"),
        }
    }
}

// ---------------------------------------------------------------------------
// Alert identity
// ---------------------------------------------------------------------------

/// Content-addressed alert key: first 10 hex chars of SHA-256("{teams}_{time}").
///
/// Stable across restarts. A new phase label in `time` produces a new identity,
/// so the same match can alert once per phase text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct AlertIdentity(String);

impl AlertIdentity {
    pub const LEN: usize = 10;

    pub fn from_parts(teams: &str, time: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(format!("{teams}_{time}").as_bytes());
        let hex = format!("{:x}", hasher.finalize());
        Self(hex[..Self::LEN].to_string())
    }

    /// Wrap an identity received back from a callback token. No validation beyond
    /// non-emptiness: unknown identities simply miss the store.
    pub fn from_token(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            None
        } else {
            Some(Self(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AlertIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Alert status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Pending,
    Win,
    Lose,
}

impl AlertStatus {
    pub const ALL: [AlertStatus; 3] = [AlertStatus::Win, AlertStatus::Lose, AlertStatus::Pending];

    pub fn verb(self) -> &'static str {
        match self {
            AlertStatus::Pending => "pending",
            AlertStatus::Win => "win",
            AlertStatus::Lose => "lose",
        }
    }

    pub fn banner(self) -> &'static str {
        match self {
            AlertStatus::Win => "✅ Bet WON",
            AlertStatus::Lose => "❌ Bet LOST",
            AlertStatus::Pending => "🔄 Awaiting result",
        }
    }

    pub fn button_text(self) -> &'static str {
        match self {
            AlertStatus::Win => "✅ Won",
            AlertStatus::Lose => "❌ Lost",
            AlertStatus::Pending => "🔄 Pending",
        }
    }
}

impl FromStr for AlertStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(AlertStatus::Pending),
            "win" => Ok(AlertStatus::Win),
            "lose" => Ok(AlertStatus::Lose),
            other => Err(format!("unknown status verb: {other}")),
        }
    }
}

impl std::fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.verb())
    }
}

// ---------------------------------------------------------------------------
// Messaging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    Group,
    Admin,
}

impl std::fmt::Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Destination::Group => write!(f, "group"),
            Destination::Admin => write!(f, "admin"),
        }
    }
}

/// Address of a message already delivered by the messenger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MessageRef {
    pub chat_id: i64,
    pub message_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SentMessage {
    pub destination: Destination,
    pub message: MessageRef,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ButtonAction {
    Url(String),
    Callback(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineButton {
    pub text: String,
    pub action: ButtonAction,
}

/// Inline keyboard attached under a message, row by row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keyboard {
    pub rows: Vec<Vec<InlineButton>>,
}

impl Keyboard {
    pub fn row(mut self, buttons: Vec<InlineButton>) -> Self {
        self.rows.push(buttons);
        self
    }
}

// ---------------------------------------------------------------------------
// AlertRecord
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertRecord {
    pub identity: AlertIdentity,
    pub teams: String,
    pub time: String,
    pub detail_url: String,
    /// Rendered body without any status banner.
    pub text: String,
    /// One entry per destination that accepted the message.
    pub messages: Vec<SentMessage>,
    pub status: Option<AlertStatus>,
    pub created_at_ns: u64,
}

/// Wall-clock nanoseconds since the Unix epoch.
pub fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}
