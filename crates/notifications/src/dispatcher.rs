//! Post-commit notification fanout.

use common::MerchantId;
use domain::Notice;

use crate::channel::NotificationChannel;
use crate::directory::{Directory, MerchantProfile};
use crate::error::{NotificationError, Result};
use crate::message::{Notification, Recipient};

/// Counts from one [`NotificationDispatcher::dispatch`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub sent: usize,
    pub failed: usize,
}

impl DispatchReport {
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// Turns committed [`Notice`]s into channel sends.
///
/// Must only be called after the transition that produced the notices has
/// committed. Every notice gets a single attempt; failures are logged and
/// counted, and `dispatch` itself cannot fail.
pub struct NotificationDispatcher<C, D>
where
    C: NotificationChannel,
    D: Directory,
{
    channel: C,
    directory: D,
}

impl<C, D> NotificationDispatcher<C, D>
where
    C: NotificationChannel,
    D: Directory,
{
    pub fn new(channel: C, directory: D) -> Self {
        Self { channel, directory }
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    #[tracing::instrument(skip_all, fields(notices = notices.len()))]
    pub async fn dispatch(&self, notices: &[Notice]) -> DispatchReport {
        let mut report = DispatchReport::default();

        for notice in notices {
            let deliveries = match self.address(notice).await {
                Ok(deliveries) => deliveries,
                Err(err) => {
                    metrics::counter!("notifications_failed_total", "kind" => notice_kind(notice))
                        .increment(1);
                    tracing::warn!(order_id = %notice.order_id(), error = %err, "notification not addressed");
                    report.failed += 1;
                    continue;
                }
            };

            for (recipient, notification) in deliveries {
                match self.channel.send(&recipient, &notification).await {
                    Ok(()) => {
                        metrics::counter!("notifications_sent_total", "kind" => notification.kind())
                            .increment(1);
                        report.sent += 1;
                    }
                    Err(err) => {
                        metrics::counter!("notifications_failed_total", "kind" => notification.kind())
                            .increment(1);
                        tracing::warn!(
                            order_id = %notification.order_id(),
                            %recipient,
                            error = %err,
                            "notification delivery failed"
                        );
                        report.failed += 1;
                    }
                }
            }
        }

        tracing::debug!(sent = report.sent, failed = report.failed, "notices dispatched");
        report
    }

    /// Resolves who receives a notice and what they are told.
    async fn address(&self, notice: &Notice) -> Result<Vec<(Recipient, Notification)>> {
        match notice {
            Notice::CustomerStatusUpdate {
                customer_id,
                order_id,
                merchant_id,
                status,
            } => {
                let profile = self.merchant(*merchant_id).await?;
                Ok(vec![(
                    Recipient::Customer(*customer_id),
                    Notification::StatusUpdate {
                        order_id: *order_id,
                        status: *status,
                        merchant_name: profile.name,
                    },
                )])
            }
            Notice::OrderAvailable {
                order_id,
                merchant_id,
            } => {
                let profile = self.merchant(*merchant_id).await?;
                let notification = Notification::OrderAvailable {
                    order_id: *order_id,
                    merchant_name: profile.name,
                    pickup_address: profile.pickup_address,
                };
                let pool = self.directory.driver_pool().await?;
                Ok(pool
                    .into_iter()
                    .map(|driver| (Recipient::Driver(driver), notification.clone()))
                    .collect())
            }
        }
    }

    async fn merchant(&self, merchant_id: MerchantId) -> Result<MerchantProfile> {
        self.directory
            .merchant_profile(merchant_id)
            .await?
            .ok_or(NotificationError::UnknownMerchant(merchant_id))
    }
}

fn notice_kind(notice: &Notice) -> &'static str {
    match notice {
        Notice::CustomerStatusUpdate { .. } => "status_update",
        Notice::OrderAvailable { .. } => "order_available",
    }
}
