//! Notification error types.

use common::MerchantId;
use thiserror::Error;

/// Errors raised while delivering a single notification.
///
/// These stop at the dispatcher: it logs them and moves on.
#[derive(Debug, Error)]
pub enum NotificationError {
    /// The delivery channel refused or could not reach the recipient.
    #[error("Notification channel unavailable: {0}")]
    ChannelUnavailable(String),

    /// No profile is registered for the merchant named in the notice.
    #[error("Unknown merchant {0}")]
    UnknownMerchant(MerchantId),

    #[error("Directory error: {0}")]
    Directory(String),
}

pub type Result<T> = std::result::Result<T, NotificationError>;
