use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::alerts::messenger::Messenger;
use crate::alerts::render::render_alert;
use crate::alerts::store::AlertStore;
use crate::config::CALLBACK_ACTION;
use crate::types::{
    now_ns, AlertIdentity, AlertRecord, AlertStatus, ButtonAction, Destination, InlineButton,
    Keyboard, MatchSnapshot, SentMessage,
};

const EVENT_LINK_TEXT: &str = "📌 Event link";
const ADMIN_MARKER: &str = "📢 ADMIN";

/// `action:<verb>:<identity>`
pub fn status_token(status: AlertStatus, identity: &AlertIdentity) -> String {
    format!("{CALLBACK_ACTION}:{}:{identity}", status.verb())
}

pub fn parse_status_token(token: &str) -> Option<(AlertStatus, AlertIdentity)> {
    let mut parts = token.splitn(3, ':');
    if parts.next()? != CALLBACK_ACTION {
        return None;
    }
    let status = parts.next()?.parse::<AlertStatus>().ok()?;
    let identity = AlertIdentity::from_token(parts.next()?)?;
    Some((status, identity))
}

/// Win / lose / pending controls for the admin copy.
pub fn status_keyboard(identity: &AlertIdentity) -> Keyboard {
    Keyboard::default().row(
        AlertStatus::ALL
            .iter()
            .map(|&status| InlineButton {
                text: status.button_text().to_string(),
                action: ButtonAction::Callback(status_token(status, identity)),
            })
            .collect(),
    )
}

fn link_keyboard(url: &str) -> Keyboard {
    Keyboard::default().row(vec![InlineButton {
        text: EVENT_LINK_TEXT.to_string(),
        action: ButtonAction::Url(url.to_string()),
    }])
}

/// Sends alerts to the group and admin chats and applies status edits.
pub struct AlertDispatcher {
    messenger: Arc<dyn Messenger>,
    store: Arc<AlertStore>,
    group_chat_id: i64,
    admin_chat_id: i64,
}

impl AlertDispatcher {
    pub fn new(
        messenger: Arc<dyn Messenger>,
        store: Arc<AlertStore>,
        group_chat_id: i64,
        admin_chat_id: i64,
    ) -> Self {
        Self { messenger, store, group_chat_id, admin_chat_id }
    }

    pub fn store(&self) -> &Arc<AlertStore> {
        &self.store
    }

    pub fn should_alert(&self, identity: &AlertIdentity) -> bool {
        self.store.should_alert(identity)
    }

    /// Send the snapshot once per identity. `None` when already alerted, when
    /// there is nothing to report, or when no destination accepted the message.
    pub async fn dispatch(&self, snapshot: &MatchSnapshot) -> Option<AlertRecord> {
        if !snapshot.has_target() {
            return None;
        }
        let identity = snapshot.identity();
        if !self.store.try_reserve(&identity) {
            debug!(identity = %identity, "Already alerted");
            return None;
        }

        let text = render_alert(snapshot);
        let mut messages = Vec::with_capacity(2);

        let targets = [
            (Destination::Group, self.group_chat_id, link_keyboard(&snapshot.detail_url)),
            (Destination::Admin, self.admin_chat_id, status_keyboard(&identity)),
        ];
        for (destination, chat_id, keyboard) in targets {
            match self.messenger.send_message(chat_id, &text, Some(&keyboard)).await {
                Ok(message) => messages.push(SentMessage { destination, message }),
                Err(e) => {
                    error!(identity = %identity, %destination, error = %e, "Alert delivery failed")
                }
            }
        }

        if messages.is_empty() {
            self.store.release(&identity);
            warn!(
                identity = %identity,
                teams = %snapshot.teams,
                "No destination accepted the alert"
            );
            return None;
        }

        let record = AlertRecord {
            identity: identity.clone(),
            teams: snapshot.teams.clone(),
            time: snapshot.time.clone(),
            detail_url: snapshot.detail_url.clone(),
            text,
            messages,
            status: None,
            created_at_ns: now_ns(),
        };
        self.store.insert(record.clone());
        info!(
            identity = %identity,
            teams = %record.teams,
            destinations = record.messages.len(),
            "Alert sent"
        );
        Some(record)
    }

    /// Edit every stored message of `identity` with the status banner.
    /// Returns false (and edits nothing) for an unknown identity.
    pub async fn update_status(&self, identity: &AlertIdentity, status: AlertStatus) -> bool {
        let Some(record) = self.store.set_status(identity, status) else {
            warn!(identity = %identity, %status, "Status update for unknown alert");
            return false;
        };

        let controls = status_keyboard(identity);
        for sent in &record.messages {
            let (text, keyboard) = match sent.destination {
                Destination::Group => (format!("{}\n\n{}", status.banner(), record.text), None),
                Destination::Admin => (
                    format!("{ADMIN_MARKER} | {}\n\n{}", status.banner(), record.text),
                    Some(&controls),
                ),
            };
            if let Err(e) = self.messenger.edit_message(sent.message, &text, keyboard).await {
                error!(
                    identity = %identity,
                    destination = %sent.destination,
                    error = %e,
                    "Status edit failed"
                );
            }
        }
        info!(identity = %identity, %status, "Alert status updated");
        true
    }
}
