use std::fmt;

use rewardnet_model::{AccountId, Amount, RequestId, RequestKind, TaskId};

/// A message to a member.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "template", rename_all = "snake_case")]
pub enum Notification {
    /// A task completion was credited to the pending commission.
    TaskCompleted {
        /// Task.
        task: TaskId,
        /// Credited reward.
        reward: Amount,
    },
    /// A request was approved.
    RequestApproved {
        /// Request.
        request: RequestId,
        /// Kind.
        kind: RequestKind,
        /// Amount.
        amount: Amount,
    },
    /// A request was rejected.
    RequestRejected {
        /// Request.
        request: RequestId,
        /// Kind.
        kind: RequestKind,
        /// Operator feedback, verbatim.
        reason: String,
    },
    /// Pending commission was released to the balance.
    CommissionReleased {
        /// Released amount.
        amount: Amount,
    },
    /// A salary was credited.
    SalaryCredited {
        /// Tier.
        tier: u32,
        /// Amount.
        amount: Amount,
    },
    /// A referral bonus was credited.
    ReferralBonus {
        /// Referral level.
        level: u8,
        /// The member whose activity earned the bonus.
        from: String,
        /// Amount.
        amount: Amount,
    },
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TaskCompleted { task, reward } => write!(
                f,
                "Task {task} completed. {reward} was added to your pending commission."
            ),
            Self::RequestApproved {
                request,
                kind,
                amount,
            } => write!(f, "Your {kind} request #{request} of {amount} was approved."),
            Self::RequestRejected {
                request,
                kind,
                reason,
            } => write!(f, "Your {kind} request #{request} was rejected: {reason}"),
            Self::CommissionReleased { amount } => {
                write!(f, "{amount} of commission was released to your balance.")
            }
            Self::SalaryCredited { tier, amount } => {
                write!(f, "Your tier {tier} salary of {amount} was credited.")
            }
            Self::ReferralBonus {
                level,
                from,
                amount,
            } => write!(
                f,
                "You earned a level-{level} referral bonus of {amount} from {from}."
            ),
        }
    }
}

/// Error returned by a [`Notifier`].
pub type NotifyError = Box<dyn std::error::Error + Send + Sync>;

/// Notification sender.
///
/// Notifications are sent after the ledger mutation is committed. A failure
/// is logged and never rolls the mutation back.
pub trait Notifier: Send + Sync {
    /// Send a notification to a member.
    fn notify(&self, member: AccountId, notification: &Notification) -> Result<(), NotifyError>;
}

/// A notifier that only logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, member: AccountId, notification: &Notification) -> Result<(), NotifyError> {
        tracing::info!(%member, "notify: {notification}");
        Ok(())
    }
}

/// A notifier that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _member: AccountId, _notification: &Notification) -> Result<(), NotifyError> {
        Ok(())
    }
}

/// Utils for testing.
#[cfg(any(test, feature = "test"))]
pub mod test {
    use parking_lot::Mutex;

    use super::*;

    /// A notifier that records every notification.
    #[derive(Debug, Default)]
    pub struct RecordingNotifier {
        sent: Mutex<Vec<(AccountId, Notification)>>,
    }

    impl RecordingNotifier {
        /// Get the sent notifications.
        pub fn sent(&self) -> Vec<(AccountId, Notification)> {
            self.sent.lock().clone()
        }

        /// Get the notifications sent to the given member.
        pub fn sent_to(&self, member: AccountId) -> Vec<Notification> {
            self.sent
                .lock()
                .iter()
                .filter(|(to, _)| *to == member)
                .map(|(_, notification)| notification.clone())
                .collect()
        }
    }

    impl Notifier for RecordingNotifier {
        fn notify(
            &self,
            member: AccountId,
            notification: &Notification,
        ) -> Result<(), NotifyError> {
            self.sent.lock().push((member, notification.clone()));
            Ok(())
        }
    }

    /// A notifier that always fails.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct FailingNotifier;

    impl Notifier for FailingNotifier {
        fn notify(&self, _member: AccountId, _notification: &Notification) -> Result<(), NotifyError> {
            Err("mail server unreachable".into())
        }
    }
}
