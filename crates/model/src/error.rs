use crate::{amount::Amount, request::RequestId};

/// The kind of records that can be looked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Entity {
    /// Member account.
    Account,
    /// Referral code.
    ReferralCode,
    /// Approval request.
    Request,
    /// Task.
    Task,
    /// Salary tier.
    SalaryTier,
}

/// Error type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Unknown record.
    #[error("{0} not found: {1}")]
    NotFound(Entity, String),
    /// Uniqueness violation.
    #[error("conflict: {0} `{1}` already exists")]
    Conflict(&'static str, String),
    /// The evidence is already referenced by a pending or approved request.
    #[error("duplicate evidence: `{0}` is already referenced by another request")]
    DuplicateEvidence(String),
    /// Illegal state transition.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),
    /// The request has already reached a terminal state.
    #[error("request {0} has already been processed")]
    AlreadyProcessed(RequestId),
    /// Daily task cap reached.
    #[error("daily task limit of {0} reached")]
    DailyLimitReached(u32),
    /// Withdrawals are closed at this time.
    #[error("outside of the withdrawal window ({0}:00 to {1}:00 on open days)")]
    OutsideWindow(u8, u8),
    /// The member has no active plan.
    #[error("no active plan")]
    NotActivated,
    /// Insufficient balance.
    #[error("insufficient balance, required={required}, available={available}")]
    InsufficientBalance {
        /// Required amount.
        required: Amount,
        /// Available amount.
        available: Amount,
    },
    /// A withdrawal has already been requested today.
    #[error("a withdrawal has already been requested today")]
    DuplicateWithdrawalToday,
    /// Salary has already been claimed in this month.
    #[error("salary has already been claimed this month")]
    AlreadyClaimedThisPeriod,
    /// Referral thresholds of the salary tier are not met.
    #[error("referral threshold not met, required={required_direct}/{required_indirect}, actual={direct}/{indirect}")]
    ThresholdNotMet {
        /// Required direct referrals.
        required_direct: u32,
        /// Required indirect referrals.
        required_indirect: u32,
        /// Direct referrals.
        direct: u32,
        /// Indirect referrals.
        indirect: u32,
    },
    /// Self referral.
    #[error("an account cannot refer itself")]
    SelfReferral,
    /// The referral would close a cycle.
    #[error("referral would close a cycle")]
    ReferralCycle,
    /// Transient storage failure.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
    /// Invalid argument.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    /// Invalid amount.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
    /// Overflow.
    #[error("overflow")]
    Overflow,
    /// Unknown computation error.
    #[error("unknown computation error: {0}")]
    Computation(&'static str),
    /// Credited shares do not add up to the distributed amount.
    #[error("conservation violated: amount={amount}, accounted={accounted}")]
    Conservation {
        /// Distributed amount.
        amount: Amount,
        /// Sum of shares, residual and unallocated part.
        accounted: Amount,
    },
}

/// Stable error kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "snake_case")]
#[non_exhaustive]
pub enum ErrorKind {
    /// See [`Error::NotFound`].
    NotFound,
    /// See [`Error::Conflict`].
    Conflict,
    /// See [`Error::DuplicateEvidence`].
    DuplicateEvidence,
    /// See [`Error::InvalidState`].
    InvalidState,
    /// See [`Error::AlreadyProcessed`].
    AlreadyProcessed,
    /// See [`Error::DailyLimitReached`].
    DailyLimitReached,
    /// See [`Error::OutsideWindow`].
    OutsideWindow,
    /// See [`Error::NotActivated`].
    NotActivated,
    /// See [`Error::InsufficientBalance`].
    InsufficientBalance,
    /// See [`Error::DuplicateWithdrawalToday`].
    DuplicateWithdrawalToday,
    /// See [`Error::AlreadyClaimedThisPeriod`].
    AlreadyClaimedThisPeriod,
    /// See [`Error::ThresholdNotMet`].
    ThresholdNotMet,
    /// See [`Error::SelfReferral`].
    SelfReferral,
    /// See [`Error::ReferralCycle`].
    ReferralCycle,
    /// See [`Error::StorageUnavailable`].
    StorageUnavailable,
    /// Invalid argument or amount.
    InvalidArgument,
    /// Arithmetic failures.
    Computation,
}

impl Error {
    /// Get the stable kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(..) => ErrorKind::NotFound,
            Self::Conflict(..) => ErrorKind::Conflict,
            Self::DuplicateEvidence(_) => ErrorKind::DuplicateEvidence,
            Self::InvalidState(_) => ErrorKind::InvalidState,
            Self::AlreadyProcessed(_) => ErrorKind::AlreadyProcessed,
            Self::DailyLimitReached(_) => ErrorKind::DailyLimitReached,
            Self::OutsideWindow(..) => ErrorKind::OutsideWindow,
            Self::NotActivated => ErrorKind::NotActivated,
            Self::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            Self::DuplicateWithdrawalToday => ErrorKind::DuplicateWithdrawalToday,
            Self::AlreadyClaimedThisPeriod => ErrorKind::AlreadyClaimedThisPeriod,
            Self::ThresholdNotMet { .. } => ErrorKind::ThresholdNotMet,
            Self::SelfReferral => ErrorKind::SelfReferral,
            Self::ReferralCycle => ErrorKind::ReferralCycle,
            Self::StorageUnavailable(_) => ErrorKind::StorageUnavailable,
            Self::InvalidArgument(_) | Self::InvalidAmount(_) => ErrorKind::InvalidArgument,
            Self::Overflow | Self::Computation(_) | Self::Conservation { .. } => {
                ErrorKind::Computation
            }
        }
    }

    /// Returns whether the failed operation may succeed when retried.
    ///
    /// Only infrastructure failures are retryable; business rule rejections
    /// are returned to the caller as they are.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StorageUnavailable(_))
    }

    pub(crate) fn account_not_found(id: impl ToString) -> Self {
        Self::NotFound(Entity::Account, id.to_string())
    }
}
