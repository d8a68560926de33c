/// Command and attachment handlers
pub mod handlers;
/// Attachment extraction from Telegram messages
pub mod media;
/// Status text delivery respecting Telegram message limits
pub mod messaging;
/// Resilient messaging with automatic retry for Telegram API operations
pub mod resilient;
/// Telegram implementation of the relay transport
pub mod transport;

pub use media::extract_attachment;
pub use transport::TelegramRelayTransport;
