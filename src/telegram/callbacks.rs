use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::alerts::dispatcher::{parse_status_token, AlertDispatcher};
use crate::config::{UPDATES_BACKOFF_MS, UPDATES_LONG_POLL_SECS};
use crate::telegram::client::{CallbackQuery, TelegramClient};

/// Long-polls Telegram for status-control presses and applies them.
pub struct CallbackPoller {
    client: Arc<TelegramClient>,
    dispatcher: Arc<AlertDispatcher>,
}

impl CallbackPoller {
    pub fn new(client: Arc<TelegramClient>, dispatcher: Arc<AlertDispatcher>) -> Self {
        Self { client, dispatcher }
    }

    pub async fn run(self) {
        info!("Callback poller started");
        let mut offset = 0i64;
        let mut failures = 0usize;
        loop {
            match self.client.get_updates(offset, UPDATES_LONG_POLL_SECS).await {
                Ok(updates) => {
                    failures = 0;
                    for update in updates {
                        offset = offset.max(update.update_id + 1);
                        if let Some(query) = update.callback_query {
                            self.answer(query).await;
                        }
                    }
                }
                Err(e) => {
                    let delay = backoff_delay(failures);
                    failures += 1;
                    warn!(error = %e, retry_in_ms = delay.as_millis() as u64, "getUpdates failed");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    async fn answer(&self, query: CallbackQuery) {
        let reply = handle_callback(&self.dispatcher, query.data.as_deref()).await;
        if let Err(e) = self.client.answer_callback(&query.id, &reply).await {
            warn!(error = %e, "answerCallbackQuery failed");
        }
    }
}

/// Apply one callback payload; returns the toast text shown to the presser.
pub async fn handle_callback(dispatcher: &AlertDispatcher, data: Option<&str>) -> String {
    let Some((status, identity)) = data.and_then(parse_status_token) else {
        debug!(data = ?data, "Ignoring unrecognised callback");
        return "Unknown action".to_string();
    };
    if dispatcher.update_status(&identity, status).await {
        format!("Status updated: {status}")
    } else {
        "Alert not found".to_string()
    }
}

fn backoff_delay(failures: usize) -> Duration {
    let idx = failures.min(UPDATES_BACKOFF_MS.len() - 1);
    Duration::from_millis(UPDATES_BACKOFF_MS[idx])
}
