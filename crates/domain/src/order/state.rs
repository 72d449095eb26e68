//! Order lifecycle state machine.

use serde::{Deserialize, Serialize};

use super::OrderError;

/// The lifecycle status of an order.
///
/// ```text
/// Pending            ──► AcceptedByMerchant | RejectedByMerchant
/// AcceptedByMerchant ──► InPreparation      | CanceledByMerchant
/// InPreparation      ──► ReadyToDeliver     | CanceledByMerchant
/// ReadyToDeliver     ──► AcceptedByDriver   | CanceledByMerchant
/// AcceptedByDriver   ──► OnTheWay           | CanceledByDriver
/// OnTheWay           ──► Completed          | CanceledByDriver
/// ```
///
/// `RejectedByDriver` exists for compatibility with stored orders but no edge
/// leads to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    AcceptedByMerchant,
    InPreparation,
    ReadyToDeliver,
    AcceptedByDriver,
    OnTheWay,
    Completed,
    RejectedByMerchant,
    RejectedByDriver,
    CanceledByMerchant,
    CanceledByDriver,
}

/// Coarse classification used by analytics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeBucket {
    Completed,
    Canceled,
    Rejected,
    /// Still moving through the lifecycle.
    Pending,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 11] = [
        OrderStatus::Pending,
        OrderStatus::AcceptedByMerchant,
        OrderStatus::InPreparation,
        OrderStatus::ReadyToDeliver,
        OrderStatus::AcceptedByDriver,
        OrderStatus::OnTheWay,
        OrderStatus::Completed,
        OrderStatus::RejectedByMerchant,
        OrderStatus::RejectedByDriver,
        OrderStatus::CanceledByMerchant,
        OrderStatus::CanceledByDriver,
    ];

    /// The transition table.
    pub fn allowed_targets(&self) -> &'static [OrderStatus] {
        use OrderStatus::*;
        match self {
            Pending => &[AcceptedByMerchant, RejectedByMerchant],
            AcceptedByMerchant => &[InPreparation, CanceledByMerchant],
            InPreparation => &[ReadyToDeliver, CanceledByMerchant],
            ReadyToDeliver => &[AcceptedByDriver, CanceledByMerchant],
            AcceptedByDriver => &[OnTheWay, CanceledByDriver],
            OnTheWay => &[Completed, CanceledByDriver],
            Completed | RejectedByMerchant | RejectedByDriver | CanceledByMerchant
            | CanceledByDriver => &[],
        }
    }

    pub fn can_transition_to(&self, target: OrderStatus) -> bool {
        self.allowed_targets().contains(&target)
    }

    /// Fails with [`OrderError::InvalidTransition`] unless `target` is an edge
    /// out of `self`.
    pub fn ensure_transition(&self, target: OrderStatus) -> Result<(), OrderError> {
        if self.can_transition_to(target) {
            Ok(())
        } else {
            Err(OrderError::InvalidTransition {
                from: *self,
                to: target,
            })
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.allowed_targets().is_empty()
    }

    /// Targets a merchant may request. The rest belong to the assigned driver.
    pub fn is_merchant_target(&self) -> bool {
        matches!(
            self,
            OrderStatus::AcceptedByMerchant
                | OrderStatus::InPreparation
                | OrderStatus::ReadyToDeliver
                | OrderStatus::RejectedByMerchant
                | OrderStatus::CanceledByMerchant
        )
    }

    pub fn bucket(&self) -> OutcomeBucket {
        match self {
            OrderStatus::Completed => OutcomeBucket::Completed,
            OrderStatus::CanceledByMerchant | OrderStatus::CanceledByDriver => {
                OutcomeBucket::Canceled
            }
            OrderStatus::RejectedByMerchant | OrderStatus::RejectedByDriver => {
                OutcomeBucket::Rejected
            }
            _ => OutcomeBucket::Pending,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::AcceptedByMerchant => "ACCEPTED_BY_MERCHANT",
            OrderStatus::InPreparation => "IN_PREPARATION",
            OrderStatus::ReadyToDeliver => "READY_TO_DELIVER",
            OrderStatus::AcceptedByDriver => "ACCEPTED_BY_DRIVER",
            OrderStatus::OnTheWay => "ON_THE_WAY",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::RejectedByMerchant => "REJECTED_BY_MERCHANT",
            OrderStatus::RejectedByDriver => "REJECTED_BY_DRIVER",
            OrderStatus::CanceledByMerchant => "CANCELED_BY_MERCHANT",
            OrderStatus::CanceledByDriver => "CANCELED_BY_DRIVER",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| OrderError::UnknownStatus {
                status: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_status_is_pending() {
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
    }

    #[test]
    fn no_self_loops() {
        for status in OrderStatus::ALL {
            assert!(!status.can_transition_to(status), "{status} loops");
        }
    }

    #[test]
    fn terminal_states() {
        let terminal: Vec<_> = OrderStatus::ALL
            .into_iter()
            .filter(|s| s.is_terminal())
            .collect();
        assert_eq!(
            terminal,
            vec![
                OrderStatus::Completed,
                OrderStatus::RejectedByMerchant,
                OrderStatus::RejectedByDriver,
                OrderStatus::CanceledByMerchant,
                OrderStatus::CanceledByDriver,
            ]
        );
    }

    #[test]
    fn ensure_transition_reports_both_ends() {
        let err = OrderStatus::Pending
            .ensure_transition(OrderStatus::Completed)
            .unwrap_err();
        assert!(matches!(
            err,
            OrderError::InvalidTransition {
                from: OrderStatus::Pending,
                to: OrderStatus::Completed
            }
        ));
    }

    #[test]
    fn buckets() {
        assert_eq!(OrderStatus::Completed.bucket(), OutcomeBucket::Completed);
        assert_eq!(OrderStatus::CanceledByDriver.bucket(), OutcomeBucket::Canceled);
        assert_eq!(OrderStatus::RejectedByMerchant.bucket(), OutcomeBucket::Rejected);
        assert_eq!(OrderStatus::OnTheWay.bucket(), OutcomeBucket::Pending);
        assert_eq!(OrderStatus::Pending.bucket(), OutcomeBucket::Pending);
    }

    #[test]
    fn string_form_round_trips_through_serde_and_from_str() {
        for status in OrderStatus::ALL {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
            assert_eq!(status.as_str().parse::<OrderStatus>().unwrap(), status);
        }
        assert!("SHIPPED".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn merchant_targets_exclude_driver_edges() {
        assert!(OrderStatus::ReadyToDeliver.is_merchant_target());
        assert!(!OrderStatus::AcceptedByDriver.is_merchant_target());
        assert!(!OrderStatus::OnTheWay.is_merchant_target());
        assert!(!OrderStatus::Completed.is_merchant_target());
        assert!(!OrderStatus::CanceledByDriver.is_merchant_target());
    }
}
