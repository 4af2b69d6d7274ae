pub mod callbacks;
pub mod client;

pub use callbacks::CallbackPoller;
pub use client::TelegramClient;
