use async_trait::async_trait;

use crate::error::DispatchError;
use crate::types::{Keyboard, MessageRef};

/// Outbound chat capability: send, and edit in place.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// HTML-formatted message with an optional inline keyboard.
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<MessageRef, DispatchError>;

    /// Replace text (and keyboard; `None` removes it) of a delivered message.
    async fn edit_message(
        &self,
        message: MessageRef,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<(), DispatchError>;
}
