use tracing::debug;

use crate::browser::{shadow_root, DocumentSession, ElementRef, Root, Scope};
use crate::config::{selectors, ScrapeSettings};
use crate::error::ScrapeError;

/// Event rows currently rendered under the shadow host, in page order.
/// Handles are only good until the next navigation.
pub async fn enumerate_entries(
    session: &dyn DocumentSession,
    host_tag: &str,
) -> Result<Vec<ElementRef>, ScrapeError> {
    let root = shadow_root(session, host_tag).await?;
    let rows = Scope::new(session, &root).all(selectors::EVENT_ROW).await?;
    debug!(rows = rows.len(), "Enumerated event rows");
    Ok(rows)
}

/// Why a listing row is (not) worth opening.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryVerdict {
    Open,
    /// Phase text matched none of the configured keywords.
    WrongPhase(String),
    /// Virtual / e-sports fixture.
    Virtual(String),
}

/// Cheap pre-checks on a listing row before paying for a detail navigation.
pub async fn screen_entry(
    session: &dyn DocumentSession,
    entry: &ElementRef,
    settings: &ScrapeSettings,
) -> Result<EntryVerdict, ScrapeError> {
    let root = Root::Element(entry.clone());
    let scope = Scope::new(session, &root);

    if !settings.phase_keywords.is_empty() {
        if let Some(title) = scope.attribute_of(selectors::EVENT_TIME, "title").await? {
            let lower = title.to_lowercase();
            if !settings.phase_keywords.iter().any(|k| lower.contains(k.as_str())) {
                return Ok(EntryVerdict::WrongPhase(title));
            }
        }
    }

    if settings.skip_virtual {
        if let Some(teams) = scope.attribute_of(selectors::EVENT_TEAMS, "title").await? {
            if is_virtual_fixture(&teams) {
                return Ok(EntryVerdict::Virtual(teams));
            }
        }
    }

    Ok(EntryVerdict::Open)
}

/// Virtual football rows carry the player's nickname in Latin letters inside
/// parentheses, e.g. "Arsenal (Nick) - Chelsea (Bob)".
pub fn is_virtual_fixture(teams: &str) -> bool {
    teams.match_indices('(').any(|(open, _)| {
        let rest = &teams[open + 1..];
        let Some(close) = rest.find(')') else {
            return false;
        };
        let inner = &rest[..close];
        !inner.is_empty()
            && inner.chars().all(|c| c.is_ascii_alphabetic() || c.is_whitespace())
    })
}
