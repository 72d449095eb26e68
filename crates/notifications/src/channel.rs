//! Delivery channel trait and in-memory implementation.

use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;

use crate::error::{NotificationError, Result};
use crate::message::{Notification, Recipient};

/// An outbound delivery channel (push, SMS, e-mail, ...).
///
/// One call is one attempt. Implementations should not retry internally.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn send(&self, recipient: &Recipient, notification: &Notification) -> Result<()>;
}

#[derive(Debug, Default)]
struct InMemoryChannelState {
    sent: Vec<(Recipient, Notification)>,
    fail_all: bool,
    failing: HashSet<Recipient>,
}

/// Records every delivered notification. Can be told to fail, either for
/// everyone or for chosen recipients.
#[derive(Debug, Clone, Default)]
pub struct InMemoryChannel {
    state: Arc<RwLock<InMemoryChannelState>>,
}

impl InMemoryChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent send fail until switched back.
    pub fn set_fail_all(&self, fail: bool) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .fail_all = fail;
    }

    /// Makes sends to `recipient` fail.
    pub fn fail_for(&self, recipient: Recipient) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .failing
            .insert(recipient);
    }

    pub fn sent(&self) -> Vec<(Recipient, Notification)> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .sent
            .clone()
    }

    pub fn sent_to(&self, recipient: &Recipient) -> Vec<Notification> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .sent
            .iter()
            .filter(|(to, _)| to == recipient)
            .map(|(_, notification)| notification.clone())
            .collect()
    }

    pub fn sent_count(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .sent
            .len()
    }
}

#[async_trait]
impl NotificationChannel for InMemoryChannel {
    async fn send(&self, recipient: &Recipient, notification: &Notification) -> Result<()> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);

        if state.fail_all || state.failing.contains(recipient) {
            return Err(NotificationError::ChannelUnavailable(format!(
                "cannot reach {recipient}"
            )));
        }

        state.sent.push((*recipient, notification.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{CustomerId, DriverId, OrderId};
    use domain::OrderStatus;

    fn update() -> Notification {
        Notification::StatusUpdate {
            order_id: OrderId::new(),
            status: OrderStatus::AcceptedByMerchant,
            merchant_name: "Noodle Bar".to_string(),
        }
    }

    #[tokio::test]
    async fn records_sends_per_recipient() {
        let channel = InMemoryChannel::new();
        let alice = Recipient::Customer(CustomerId::new());
        let bob = Recipient::Driver(DriverId::new());

        channel.send(&alice, &update()).await.unwrap();
        channel.send(&bob, &update()).await.unwrap();
        channel.send(&alice, &update()).await.unwrap();

        assert_eq!(channel.sent_count(), 3);
        assert_eq!(channel.sent_to(&alice).len(), 2);
        assert_eq!(channel.sent_to(&bob).len(), 1);
    }

    #[tokio::test]
    async fn fail_switches() {
        let channel = InMemoryChannel::new();
        let alice = Recipient::Customer(CustomerId::new());
        let bob = Recipient::Customer(CustomerId::new());

        channel.fail_for(bob);
        assert!(channel.send(&alice, &update()).await.is_ok());
        assert!(matches!(
            channel.send(&bob, &update()).await,
            Err(NotificationError::ChannelUnavailable(_))
        ));

        channel.set_fail_all(true);
        assert!(channel.send(&alice, &update()).await.is_err());
        channel.set_fail_all(false);
        assert!(channel.send(&alice, &update()).await.is_ok());

        assert_eq!(channel.sent_count(), 2);
    }
}
